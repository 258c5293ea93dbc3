pub mod mock_receiver;
#[cfg(test)]
/// Unit tests for the mock receiver.
pub mod tests;

use std::collections::HashMap;
use std::net::IpAddr;

pub use mock_receiver::{MockReceiver, MockReceiverConfig, RecordedRequest};

use crate::types::{AirPlayDevice, DeviceCapabilities};

/// Helper to create an `AirPlayDevice` for testing.
///
/// The device advertises video support; clear `capabilities` to simulate a
/// receiver that advertises nothing.
#[must_use]
pub fn create_test_device(id: &str, name: &str, address: IpAddr, port: u16) -> AirPlayDevice {
    AirPlayDevice {
        id: id.to_string(),
        name: name.to_string(),
        model: Some("TestModel".to_string()),
        addresses: vec![address],
        port,
        capabilities: DeviceCapabilities::from_features(
            crate::discovery::parser::feature_bits::VIDEO,
        ),
        txt_records: HashMap::new(),
    }
}
