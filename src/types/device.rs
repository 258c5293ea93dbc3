use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

/// Represents a discovered `AirPlay` receiver on the network
#[derive(Debug, Clone, PartialEq)]
pub struct AirPlayDevice {
    /// Unique device identifier (from TXT record `deviceid`)
    pub id: String,

    /// Human-readable device name (e.g., "Living Room Apple TV")
    pub name: String,

    /// Device model identifier (e.g., "AppleTV5,3")
    pub model: Option<String>,

    /// Resolved IP addresses
    pub addresses: Vec<IpAddr>,

    /// `AirPlay` service port
    pub port: u16,

    /// Device capabilities parsed from features flags
    pub capabilities: DeviceCapabilities,

    /// Raw TXT record data
    pub txt_records: HashMap<String, String>,
}

/// Device capability flags parsed from `AirPlay` features
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct DeviceCapabilities {
    /// A features value was advertised at all
    pub features_known: bool,

    /// Supports video playback of a URL
    pub supports_video: bool,

    /// Supports HTTP Live Streaming URLs
    pub supports_hls: bool,

    /// Supports photos
    pub supports_photo: bool,

    /// Supports screen mirroring (not used, for info only)
    pub supports_screen: bool,

    /// Supports audio streaming
    pub supports_audio: bool,

    /// Supports `AirPlay` 2 protocol
    pub airplay2: bool,

    /// Raw features bitmask
    pub raw_features: u64,
}

impl DeviceCapabilities {
    /// Parse capabilities from `AirPlay` features bitmask
    ///
    /// Features are documented at:
    /// <https://openairplay.github.io/airplay-spec/features.html>
    #[must_use]
    pub fn from_features(features: u64) -> Self {
        let bit = |n: u32| features & (1u64 << n) != 0;
        Self {
            features_known: true,
            // Bit 0: Video
            supports_video: bit(0),
            // Bit 4: HTTP Live Streaming
            supports_hls: bit(4),
            // Bit 1: Photo
            supports_photo: bit(1),
            // Bit 7: Screen mirroring
            supports_screen: bit(7),
            // Bit 9: Audio
            supports_audio: bit(9),
            // Bit 48: AirPlay 2
            airplay2: bit(48),
            raw_features: features,
        }
    }
}

impl AirPlayDevice {
    /// Create a device reachable at a single address, with unknown features
    pub fn new(id: impl Into<String>, name: impl Into<String>, address: IpAddr, port: u16) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            model: None,
            addresses: vec![address],
            port,
            capabilities: DeviceCapabilities::default(),
            txt_records: HashMap::new(),
        }
    }

    /// Whether the receiver can be asked to play a URL
    ///
    /// Receivers that advertise no features at all are given the benefit of
    /// the doubt.
    #[must_use]
    pub fn can_play_video(&self) -> bool {
        !self.capabilities.features_known || self.capabilities.supports_video
    }

    /// Server software version (TXT `srcvers`)
    #[must_use]
    pub fn source_version(&self) -> Option<&str> {
        self.txt_records.get("srcvers").map(String::as_str)
    }

    /// Get the primary IP address (prefers IPv4 for better connectivity)
    #[must_use]
    pub fn address(&self) -> IpAddr {
        // IPv6 link-local addresses need a scope id we do not carry
        self.addresses
            .iter()
            .find(|addr| addr.is_ipv4())
            .or_else(|| {
                self.addresses
                    .iter()
                    .find(|addr| matches!(addr, IpAddr::V6(v6) if v6.segments()[0] != 0xfe80))
            })
            .or_else(|| self.addresses.first())
            .copied()
            .unwrap_or(IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED))
    }

    /// Address and port of the video endpoint
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address(), self.port)
    }
}
