use super::*;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

// --- config.rs tests ---

#[test]
fn test_config_defaults() {
    let config = AirPlayConfig::default();

    assert_eq!(config.discovery_timeout, Duration::from_secs(5));
    assert_eq!(config.connection_timeout, Duration::from_secs(10));
    assert_eq!(config.request_timeout, Duration::from_secs(5));
    assert_eq!(config.state_poll_interval, Duration::from_millis(500));
    assert!(!config.debug_protocol);
    assert_eq!(config.user_agent, "MediaControl/1.0");
    assert_eq!(config.play_body, PlayBody::TextParameters);
    assert_eq!(config.max_response_size, 1024 * 1024);
    assert_eq!(config.event_capacity, 100);
}

#[test]
fn test_config_builder() {
    let config = AirPlayConfig::builder()
        .discovery_timeout(Duration::from_secs(10))
        .connection_timeout(Duration::from_secs(20))
        .request_timeout(Duration::from_secs(2))
        .state_poll_interval(Duration::from_secs(1))
        .debug_protocol(true)
        .user_agent("AirPlay/320.20")
        .play_body(PlayBody::XmlPlist)
        .event_capacity(0)
        .build();

    assert_eq!(config.discovery_timeout, Duration::from_secs(10));
    assert_eq!(config.connection_timeout, Duration::from_secs(20));
    assert_eq!(config.request_timeout, Duration::from_secs(2));
    assert_eq!(config.state_poll_interval, Duration::from_secs(1));
    assert!(config.debug_protocol);
    assert_eq!(config.user_agent, "AirPlay/320.20");
    assert_eq!(config.play_body, PlayBody::XmlPlist);
    assert_eq!(config.event_capacity, 1);
}

// --- device.rs tests ---

#[test]
fn test_device_capabilities_apple_tv() {
    // Apple TV 3 features value
    let features = 0x5A7F_FFF7;
    let caps = DeviceCapabilities::from_features(features);

    assert!(caps.features_known);
    assert!(caps.supports_video);
    assert!(caps.supports_photo);
    assert!(caps.supports_hls);
    assert!(caps.supports_screen);
    assert!(caps.supports_audio);
    assert!(!caps.airplay2);
    assert_eq!(caps.raw_features, features);
}

#[test]
fn test_device_capabilities_audio_only() {
    let caps = DeviceCapabilities::from_features(1 << 9);
    assert!(caps.supports_audio);
    assert!(!caps.supports_video);
}

#[test]
fn test_device_capabilities_default_unknown() {
    let caps = DeviceCapabilities::default();
    assert!(!caps.features_known);
    assert_eq!(caps.raw_features, 0);
}

#[test]
fn test_can_play_video() {
    let mut device = AirPlayDevice::new("AA:BB", "TV", IpAddr::V4(Ipv4Addr::LOCALHOST), 7000);
    assert!(device.can_play_video());

    device.capabilities = DeviceCapabilities::from_features(1 << 9);
    assert!(!device.can_play_video());

    device.capabilities = DeviceCapabilities::from_features(1);
    assert!(device.can_play_video());
}

#[test]
fn test_device_address_prefers_ipv4() {
    let mut device = AirPlayDevice::new(
        "id",
        "TV",
        IpAddr::V6("fe80::1".parse::<Ipv6Addr>().unwrap()),
        7000,
    );
    device.addresses.push(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)));

    assert_eq!(device.address(), IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)));
    assert_eq!(device.socket_addr().to_string(), "192.168.1.20:7000");
}

#[test]
fn test_device_address_skips_link_local_ipv6() {
    let mut device = AirPlayDevice::new(
        "id",
        "TV",
        IpAddr::V6("fe80::1".parse::<Ipv6Addr>().unwrap()),
        7000,
    );
    let global: Ipv6Addr = "2001:db8::5".parse().unwrap();
    device.addresses.push(IpAddr::V6(global));

    assert_eq!(device.address(), IpAddr::V6(global));
}

#[test]
fn test_device_address_empty() {
    let mut device = AirPlayDevice::new("id", "TV", IpAddr::V4(Ipv4Addr::LOCALHOST), 7000);
    device.addresses.clear();
    assert_eq!(device.address(), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
}

#[test]
fn test_source_version() {
    let mut device = AirPlayDevice::new("id", "TV", IpAddr::V4(Ipv4Addr::LOCALHOST), 7000);
    assert_eq!(device.source_version(), None);
    device
        .txt_records
        .insert("srcvers".to_string(), "220.68".to_string());
    assert_eq!(device.source_version(), Some("220.68"));
}

// --- state.rs tests ---

#[test]
fn test_session_state_predicates() {
    assert!(!SessionState::Idle.has_started());
    assert!(!SessionState::TargetSet.has_started());
    assert!(SessionState::Starting.has_started());
    assert!(!SessionState::Starting.is_active());
    assert!(SessionState::Streaming.is_active());
    assert!(SessionState::Paused.is_active());
    assert!(SessionState::Stopped.is_terminal());
    assert!(!SessionState::Paused.is_terminal());
}

#[test]
fn test_session_state_display() {
    assert_eq!(SessionState::TargetSet.to_string(), "TargetSet");
    assert_eq!(SessionState::default().to_string(), "Idle");
}

#[test]
fn test_snapshot_default() {
    let snapshot = PlaybackSnapshot::default();
    assert_eq!(snapshot.state, SessionState::Idle);
    assert!(!snapshot.paused);
    assert!(snapshot.position.is_none());
    assert!(snapshot.duration.is_none());
}
