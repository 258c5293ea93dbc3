//! Media handed to the receiver
//!
//! A receiver plays a URL it fetches itself. The session asks a
//! [`VideoManager`] for that URL when it starts and tells it when the paused
//! state changes or playback ends. [`StaticVideo`] hands over a fixed URL;
//! [`MediaServer`] serves a local file over HTTP.

mod server;

pub use server::{MediaServer, content_type_for, local_ip_for};

use async_trait::async_trait;

use crate::error::AirPlayError;
use crate::types::AirPlayDevice;


/// What the receiver is asked to play
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSource {
    /// URL sent as `Content-Location`
    pub url: String,
    /// Where to start, as a fraction of the duration (0.0 - 1.0)
    pub start_position: f64,
    /// MIME type, when known
    pub content_type: Option<String>,
}

impl MediaSource {
    /// Play `url` from the beginning
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            start_position: 0.0,
            content_type: None,
        }
    }

    /// Set the start position
    #[must_use]
    pub fn with_start_position(mut self, position: f64) -> Self {
        self.start_position = position;
        self
    }

    /// Set the MIME type
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Check the URL can be fetched by a receiver
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` for non-HTTP URLs or a start position outside 0.0 - 1.0.
    pub fn validate(&self) -> Result<(), AirPlayError> {
        let invalid = |reason: &str| AirPlayError::InvalidUrl {
            url: self.url.clone(),
            reason: reason.to_string(),
        };

        let rest = self
            .url
            .strip_prefix("http://")
            .or_else(|| self.url.strip_prefix("https://"))
            .ok_or_else(|| invalid("receivers only fetch http and https URLs"))?;
        if rest.is_empty() || rest.starts_with('/') {
            return Err(invalid("missing host"));
        }
        if self.url.chars().any(char::is_whitespace) {
            return Err(invalid("contains whitespace"));
        }
        if !(0.0..=1.0).contains(&self.start_position) {
            return Err(invalid("start position must be between 0 and 1"));
        }
        Ok(())
    }
}

/// Supplies media to a session and follows its progress
///
/// The session drives the manager but does not own it; one manager may be
/// shared by consecutive sessions.
#[async_trait]
pub trait VideoManager: Send + Sync {
    /// Produce the media for `device`
    ///
    /// # Errors
    ///
    /// Returns an error if no media can be offered to this receiver. The
    /// session then stops with that error.
    async fn prepare(&self, device: &AirPlayDevice) -> Result<MediaSource, AirPlayError>;

    /// The receiver was paused or resumed
    async fn paused_changed(&self, _paused: bool) {}

    /// The session ended
    async fn playback_stopped(&self) {}
}

/// Hands over a fixed, already reachable URL
#[derive(Debug, Clone)]
pub struct StaticVideo {
    source: MediaSource,
}

impl StaticVideo {
    /// Play `url` from the beginning
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            source: MediaSource::new(url),
        }
    }

    /// Wrap a prepared source
    #[must_use]
    pub fn from_source(source: MediaSource) -> Self {
        Self { source }
    }

    /// The source handed to every receiver
    #[must_use]
    pub fn source(&self) -> &MediaSource {
        &self.source
    }
}

#[async_trait]
impl VideoManager for StaticVideo {
    async fn prepare(&self, _device: &AirPlayDevice) -> Result<MediaSource, AirPlayError> {
        self.source.validate()?;
        Ok(self.source.clone())
    }
}
