//! Parser for `AirPlay` TXT record data

use crate::types::{AirPlayDevice, DeviceCapabilities};
use std::collections::HashMap;
use std::net::IpAddr;

/// Parse TXT records from mDNS response
#[must_use]
pub fn parse_txt_records(records: &[String]) -> HashMap<String, String> {
    records
        .iter()
        .filter_map(|record| {
            let mut parts = record.splitn(2, '=');
            let key = parts.next()?.to_string();
            let value = parts.next().unwrap_or("").to_string();
            Some((key, value))
        })
        .collect()
}

/// Parse features flags from TXT record
///
/// The features value can be in hex format: "0x5A7FFFF7"
/// or comma-separated: "0x5A7FFFF7,0x1E" (low word first)
#[must_use]
pub fn parse_features(features_str: &str) -> Option<DeviceCapabilities> {
    let features = match features_str.split_once(',') {
        Some((lo, hi)) => {
            let lo = parse_hex(lo)?;
            let hi = parse_hex(hi)?;
            (hi << 32) | (lo & 0xFFFF_FFFF)
        }
        None => parse_hex(features_str)?,
    };

    Some(DeviceCapabilities::from_features(features))
}

/// Parse hex string to u64
fn parse_hex(s: &str) -> Option<u64> {
    let s = s.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u64::from_str_radix(s, 16).ok()
}

/// Parse device model from model string
#[must_use]
pub fn parse_model_name(model: &str) -> &str {
    match model {
        "AppleTV2,1" => "Apple TV (2nd generation)",
        "AppleTV3,1" | "AppleTV3,2" => "Apple TV (3rd generation)",
        "AppleTV5,3" => "Apple TV (4th generation)",
        "AppleTV6,2" => "Apple TV 4K",
        "AppleTV11,1" => "Apple TV 4K (2nd generation)",
        "AppleTV14,1" => "Apple TV 4K (3rd generation)",
        "AudioAccessory5,1" => "HomePod mini",
        _ => model,
    }
}

/// Build a device from a resolved `_airplay._tcp` service
///
/// The device id falls back to the instance name when the receiver does not
/// publish `deviceid`.
pub(crate) fn device_from_service(
    fullname: &str,
    port: u16,
    mut addresses: Vec<IpAddr>,
    txt_records: HashMap<String, String>,
) -> AirPlayDevice {
    let instance = fullname
        .strip_suffix(super::AIRPLAY_SERVICE_TYPE)
        .map_or(fullname, |s| s.trim_end_matches('.'));

    let id = txt_records
        .get(txt_keys::DEVICE_ID)
        .cloned()
        .unwrap_or_else(|| instance.to_string());

    let capabilities = txt_records
        .get(txt_keys::FEATURES)
        .and_then(|f| parse_features(f))
        .unwrap_or_default();

    // HashSet iteration order is arbitrary
    addresses.sort();

    AirPlayDevice {
        id,
        name: instance.to_string(),
        model: txt_records.get(txt_keys::MODEL).cloned(),
        addresses,
        port,
        capabilities,
        txt_records,
    }
}

/// Known TXT record keys for `AirPlay`
pub mod txt_keys {
    /// Device ID (MAC address format)
    pub const DEVICE_ID: &str = "deviceid";
    /// Features bitmask
    pub const FEATURES: &str = "features";
    /// Flags
    pub const FLAGS: &str = "flags";
    /// Model identifier
    pub const MODEL: &str = "model";
    /// Protocol version
    pub const PROTOCOL_VERSION: &str = "protovers";
    /// Source version
    pub const SOURCE_VERSION: &str = "srcvers";
    /// Video receivers publish a password flag here
    pub const PASSWORD: &str = "pw";
}

/// `AirPlay` feature bits relevant to video playback
///
/// Reference: <https://openairplay.github.io/airplay-spec/features.html>
pub mod feature_bits {
    /// Video supported
    pub const VIDEO: u64 = 1 << 0;
    /// Photo supported
    pub const PHOTO: u64 = 1 << 1;
    /// FairPlay protected video
    pub const VIDEO_FAIRPLAY: u64 = 1 << 2;
    /// Video volume control
    pub const VIDEO_VOLUME_CONTROL: u64 = 1 << 3;
    /// Video HTTP live streaming
    pub const VIDEO_HLS: u64 = 1 << 4;
    /// Slideshow supported
    pub const SLIDESHOW: u64 = 1 << 5;
    /// Screen mirroring
    pub const SCREEN: u64 = 1 << 7;
    /// Audio supported
    pub const AUDIO: u64 = 1 << 9;
    /// Supports `AirPlay` 2 / APv2.5
    pub const AIRPLAY_2: u64 = 1 << 48;
}
