//! Core types module

mod config;
mod device;
mod state;

#[cfg(test)]
mod tests;

pub use config::{AirPlayConfig, AirPlayConfigBuilder, PlayBody};
pub use device::{AirPlayDevice, DeviceCapabilities};
pub use state::{PlaybackSnapshot, SessionState};
