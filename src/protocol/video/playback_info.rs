use crate::error::AirPlayError;
use crate::protocol::http::HttpResponse;
use crate::protocol::plist::{self, PlistValue};

/// Time range reported by the receiver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    /// Start time in seconds
    pub start: f64,
    /// Duration in seconds
    pub duration: f64,
}

/// Parsed `/playback-info` reply
///
/// Receivers omit `duration` and `position` until the media has loaded and
/// again once it has finished, so both are optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackInfo {
    /// Current position in seconds
    pub position: Option<f64>,
    /// Total duration in seconds
    pub duration: Option<f64>,
    /// Playback rate (1.0 = normal, 0.0 = paused)
    pub rate: Option<f64>,
    /// Media is loaded and can play
    pub ready_to_play: bool,
    /// Receiver has run out of buffered media
    pub playback_buffer_empty: bool,
    /// Loaded time ranges
    pub loaded_time_ranges: Vec<TimeRange>,
    /// Seekable time ranges
    pub seekable_time_ranges: Vec<TimeRange>,
}

impl PlaybackInfo {
    /// Parse a `/playback-info` response
    ///
    /// An empty body is what receivers send when nothing is loaded.
    ///
    /// # Errors
    ///
    /// Returns `CodecError` if the body is not a dictionary plist.
    pub fn parse(response: &HttpResponse) -> Result<Self, AirPlayError> {
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let plist = plist::decode(&response.body)?;
        Self::from_plist(&plist)
    }

    /// Build from an already decoded plist
    ///
    /// # Errors
    ///
    /// Returns `CodecError` if `value` is not a dictionary.
    pub fn from_plist(value: &PlistValue) -> Result<Self, AirPlayError> {
        let dict = value.as_dict().ok_or_else(|| AirPlayError::CodecError {
            message: "expected dictionary in playback info".to_string(),
        })?;

        let get_f64 = |key: &str| dict.get(key).and_then(PlistValue::as_f64);
        let get_bool = |key: &str| {
            dict.get(key)
                .and_then(|v| v.as_bool().or_else(|| v.as_i64().map(|i| i != 0)))
                .unwrap_or(false)
        };
        let get_time_ranges = |key: &str| -> Vec<TimeRange> {
            dict.get(key)
                .and_then(PlistValue::as_array)
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| {
                            Some(TimeRange {
                                start: v.get("start").and_then(PlistValue::as_f64)?,
                                duration: v.get("duration").and_then(PlistValue::as_f64)?,
                            })
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        Ok(Self {
            position: get_f64("position"),
            duration: get_f64("duration"),
            rate: get_f64("rate"),
            ready_to_play: get_bool("readyToPlay"),
            playback_buffer_empty: get_bool("playbackBufferEmpty"),
            loaded_time_ranges: get_time_ranges("loadedTimeRanges"),
            seekable_time_ranges: get_time_ranges("seekableTimeRanges"),
        })
    }

    /// Whether the receiver reports a stopped rate
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.rate.is_some_and(|r| r == 0.0)
    }

    /// Check a seek target against the seekable ranges, or the duration when
    /// the receiver reports none
    #[must_use]
    pub fn can_seek_to(&self, position: f64) -> bool {
        if position < 0.0 {
            return false;
        }
        if self.seekable_time_ranges.is_empty() {
            return self.duration.is_none_or(|d| position <= d);
        }
        self.seekable_time_ranges
            .iter()
            .any(|r| position >= r.start && position <= r.start + r.duration)
    }
}

/// Parsed `/server-info` reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerInfo {
    /// Receiver device id (MAC address form)
    pub device_id: Option<String>,
    /// Feature bitmask
    pub features: Option<u64>,
    /// Model identifier (e.g. `AppleTV3,2`)
    pub model: Option<String>,
    /// Protocol version
    pub protocol_version: Option<String>,
    /// Server software version
    pub source_version: Option<String>,
    /// Operating system build
    pub os_build_version: Option<String>,
}

impl ServerInfo {
    /// Parse a `/server-info` response body
    ///
    /// # Errors
    ///
    /// Returns `CodecError` if the body is not a dictionary plist.
    pub fn parse(response: &HttpResponse) -> Result<Self, AirPlayError> {
        Self::from_plist(&plist::decode(&response.body)?)
    }

    /// Build from an already decoded plist
    ///
    /// # Errors
    ///
    /// Returns `CodecError` if `value` is not a dictionary.
    pub fn from_plist(value: &PlistValue) -> Result<Self, AirPlayError> {
        if value.as_dict().is_none() {
            return Err(AirPlayError::CodecError {
                message: "expected dictionary in server info".to_string(),
            });
        }
        let text = |key: &str| value.get(key).and_then(PlistValue::as_str).map(String::from);

        Ok(Self {
            device_id: text("deviceid").or_else(|| text("macAddress")),
            features: value
                .get("features")
                .and_then(PlistValue::as_i64)
                .and_then(|f| u64::try_from(f).ok()),
            model: text("model"),
            protocol_version: text("protovers"),
            source_version: text("srcvers"),
            os_build_version: text("osBuildVersion"),
        })
    }
}
