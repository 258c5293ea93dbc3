use std::io;
use thiserror::Error;

/// Errors that can occur while controlling an `AirPlay` receiver
#[derive(Debug, Error)]
pub enum AirPlayError {
    // ===== Discovery Errors =====
    /// Device was not found during discovery or its handle went stale
    #[error("device not found: {device_id}")]
    DeviceNotFound {
        /// The ID (or handle) of the device that was not found
        device_id: String,
    },

    /// mDNS discovery failed
    #[error("discovery failed: {message}")]
    DiscoveryFailed {
        /// Description of the failure
        message: String,
        /// The underlying source of the error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ===== Connection Errors =====
    /// Failed to establish connection to device
    #[error("connection failed to {device_name}: {message}")]
    ConnectionFailed {
        /// The name of the device
        device_name: String,
        /// Description of the failure
        message: String,
        /// The underlying source of the error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connection was closed unexpectedly
    #[error("device disconnected: {device_name}")]
    Disconnected {
        /// The name of the device
        device_name: String,
    },

    /// Connection timed out
    #[error("connection timeout after {duration:?}")]
    ConnectionTimeout {
        /// The duration of the timeout
        duration: std::time::Duration,
    },

    // ===== Protocol Errors =====
    /// The receiver answered with a non-success HTTP status
    #[error("HTTP error: {message}")]
    HttpError {
        /// Description of the error
        message: String,
        /// HTTP status code if available
        status_code: Option<u16>,
    },

    /// Unexpected protocol response
    #[error("unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse {
        /// What was expected
        expected: String,
        /// What was actually received
        actual: String,
    },

    /// Protocol message encoding/decoding failed
    #[error("codec error: {message}")]
    CodecError {
        /// Description of the error
        message: String,
    },

    // ===== Playback Errors =====
    /// Playback error reported by the receiver
    #[error("playback error: {message}")]
    PlaybackError {
        /// Description of the error
        message: String,
    },

    /// Invalid URL for streaming
    #[error("invalid URL: {url} - {reason}")]
    InvalidUrl {
        /// The invalid URL
        url: String,
        /// Reason why it is invalid
        reason: String,
    },

    /// The receiver does not advertise a feature the operation needs
    #[error("{device_name} does not support {feature}")]
    UnsupportedFeature {
        /// The name of the device
        device_name: String,
        /// The missing feature
        feature: String,
    },

    /// Seek position out of range
    #[error("seek position {position} out of range (duration: {duration:?})")]
    SeekOutOfRange {
        /// The requested position
        position: f64,
        /// The duration of the media
        duration: Option<f64>,
    },

    // ===== Media Errors =====
    /// The video manager could not provide media for the receiver
    #[error("media unavailable: {message}")]
    MediaUnavailable {
        /// Description of the failure
        message: String,
        /// The underlying source of the error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ===== I/O Errors =====
    /// Network I/O error
    #[error("network error: {0}")]
    NetworkError(#[from] io::Error),

    /// Operation timed out
    #[error("operation timed out")]
    Timeout,

    // ===== State Errors =====
    /// Operation not valid in current state
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of why the state is invalid
        message: String,
        /// The current state
        current_state: String,
    },

    /// The session was terminated while the operation was in flight
    #[error("session terminated: {reason}")]
    SessionTerminated {
        /// The error that ended the session
        reason: String,
    },

    // ===== Internal Errors =====
    /// Internal library error
    #[error("internal error: {message}")]
    InternalError {
        /// Description of the error
        message: String,
    },
}

impl AirPlayError {
    /// Check if this error is recoverable by retrying
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::Timeout | Self::NetworkError(_)
        )
    }

    /// Check if this error indicates connection loss
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            Self::Disconnected { .. }
                | Self::ConnectionFailed { .. }
                | Self::ConnectionTimeout { .. }
        )
    }

    /// HTTP status code carried by the error, if any
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpError { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

impl From<crate::protocol::http::HttpCodecError> for AirPlayError {
    fn from(e: crate::protocol::http::HttpCodecError) -> Self {
        Self::CodecError {
            message: e.to_string(),
        }
    }
}

impl From<crate::protocol::plist::PlistError> for AirPlayError {
    fn from(e: crate::protocol::plist::PlistError) -> Self {
        Self::CodecError {
            message: format!("plist: {e}"),
        }
    }
}

/// Result type alias for `AirPlay` operations
pub type Result<T> = std::result::Result<T, AirPlayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AirPlayError::DeviceNotFound {
            device_id: "ABC123".to_string(),
        };
        assert_eq!(err.to_string(), "device not found: ABC123");

        let err = AirPlayError::UnsupportedFeature {
            device_name: "Bedroom".to_string(),
            feature: "video".to_string(),
        };
        assert_eq!(err.to_string(), "Bedroom does not support video");
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(AirPlayError::Timeout.is_recoverable());

        let err = AirPlayError::InvalidState {
            message: "not started".to_string(),
            current_state: "Idle".to_string(),
        };
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_error_is_connection_lost() {
        let err = AirPlayError::Disconnected {
            device_name: "Apple TV".to_string(),
        };
        assert!(err.is_connection_lost());
        assert!(!AirPlayError::Timeout.is_connection_lost());
    }

    #[test]
    fn test_status_code() {
        let err = AirPlayError::HttpError {
            message: "POST /play".to_string(),
            status_code: Some(453),
        };
        assert_eq!(err.status_code(), Some(453));
        assert_eq!(AirPlayError::Timeout.status_code(), None);
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let err: AirPlayError = io_err.into();

        assert!(matches!(err, AirPlayError::NetworkError(_)));
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AirPlayError>();
    }
}
