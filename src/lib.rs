//! # airplay-video
//!
//! A pure Rust library for handing video playback off to `AirPlay` receivers.
//!
//! ## Features
//!
//! - Device discovery via mDNS
//! - Video hand-off by URL, or from a local file served over HTTP
//! - Play/pause, seek and stop control
//! - Position, duration and paused-state notifications
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use airplay_video::media::StaticVideo;
//! use airplay_video::{AirPlaySession, DeviceRegistry};
//!
//! # async fn example() -> Result<(), airplay_video::AirPlayError> {
//! // Discover devices
//! let devices = airplay_video::scan(Duration::from_secs(5)).await?;
//!
//! if let Some(device) = devices.into_iter().next() {
//!     let video = Arc::new(StaticVideo::new("http://192.168.1.10:8000/movie.mp4"));
//!     let session = AirPlaySession::new(DeviceRegistry::new(), video);
//!
//!     session.set_target_device(device).await?;
//!     session.start().await?;
//!
//!     // ...
//!     session.toggle_paused().await?;
//!     session.stop().await;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! - **High-level**: `AirPlaySession` - One video on one receiver
//! - **Mid-level**: `DeviceRegistry`, discovery and the `VideoManager` sources
//! - **Low-level**: Protocol modules - Direct protocol access

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
/// Error types
pub mod error;
/// Core types
pub mod types;

/// Testing utilities
pub mod testing;

pub mod connection;
pub mod discovery;
pub mod media;
pub mod protocol;
pub mod registry;
pub mod session;

// Re-exports
pub use discovery::{DiscoveryEvent, discover, scan};
pub use error::AirPlayError;
pub use media::{MediaServer, MediaSource, StaticVideo, VideoManager};
pub use registry::{DeviceRegistry, TargetHandle};
pub use session::{AirPlaySession, SessionEvent, SessionObserver};
pub use types::{
    AirPlayConfig, AirPlayDevice, DeviceCapabilities, PlayBody, PlaybackSnapshot, SessionState,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
///
/// Convenient re-exports
pub mod prelude {
    pub use crate::{
        AirPlayConfig, AirPlayDevice, AirPlayError, AirPlaySession, DeviceRegistry, MediaServer,
        MediaSource, SessionEvent, SessionObserver, SessionState, StaticVideo, TargetHandle,
        VideoManager, discover, scan,
    };
}
