use super::parser::{self, feature_bits};
use super::{AIRPLAY_SERVICE_TYPE, DiscoveryEvent};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};

fn txt(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn test_parse_txt_records() {
    let records = vec![
        "deviceid=58:55:CA:1A:E2:88".to_string(),
        "model=AppleTV3,2".to_string(),
        "pw=".to_string(),
    ];

    let parsed = parser::parse_txt_records(&records);

    assert_eq!(parsed.get("deviceid"), Some(&"58:55:CA:1A:E2:88".to_string()));
    assert_eq!(parsed.get("model"), Some(&"AppleTV3,2".to_string()));
    assert_eq!(parsed.get("pw"), Some(&String::new()));
}

#[test]
fn test_parse_hex_forms() {
    let caps = parser::parse_features("0x1234").unwrap();
    assert_eq!(caps.raw_features, 0x1234);

    let caps = parser::parse_features("1234").unwrap();
    assert_eq!(caps.raw_features, 0x1234);

    let caps = parser::parse_features("0X1234").unwrap();
    assert_eq!(caps.raw_features, 0x1234);

    assert!(parser::parse_features("zz").is_none());
}

#[test]
fn test_parse_features_video_receiver() {
    let caps = parser::parse_features("0x5A7FFFF7").unwrap();
    assert!(caps.supports_video);
    assert!(caps.supports_hls);
    assert_eq!(caps.raw_features & feature_bits::VIDEO, feature_bits::VIDEO);
}

#[test]
fn test_parse_features_comma() {
    let caps = parser::parse_features("0x5A7FFFF7,0x1E").unwrap();
    let expected = (0x1E_u64 << 32) | 0x5A7F_FFF7_u64;
    assert_eq!(caps.raw_features, expected);
}

#[test]
fn test_parse_features_audio_only() {
    let caps = parser::parse_features(&format!("{:#x}", feature_bits::AUDIO)).unwrap();
    assert!(caps.supports_audio);
    assert!(!caps.supports_video);
}

#[test]
fn test_parse_model_name() {
    assert_eq!(
        parser::parse_model_name("AppleTV3,2"),
        "Apple TV (3rd generation)"
    );
    assert_eq!(parser::parse_model_name("Unknown"), "Unknown");
}

#[test]
fn test_device_from_service() {
    let fullname = format!("Living Room.{AIRPLAY_SERVICE_TYPE}");
    let device = parser::device_from_service(
        &fullname,
        7000,
        vec![
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 30)),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 4)),
        ],
        txt(&[
            ("deviceid", "58:55:CA:1A:E2:88"),
            ("features", "0x5A7FFFF7,0x1E"),
            ("model", "AppleTV3,2"),
        ]),
    );

    assert_eq!(device.id, "58:55:CA:1A:E2:88");
    assert_eq!(device.name, "Living Room");
    assert_eq!(device.model.as_deref(), Some("AppleTV3,2"));
    assert_eq!(device.port, 7000);
    assert_eq!(device.addresses[0], IpAddr::V4(Ipv4Addr::new(10, 0, 0, 4)));
    assert!(device.can_play_video());
}

#[test]
fn test_device_from_service_without_txt() {
    let fullname = format!("Bedroom.{AIRPLAY_SERVICE_TYPE}");
    let device = parser::device_from_service(
        &fullname,
        7000,
        vec![IpAddr::V4(Ipv4Addr::LOCALHOST)],
        HashMap::new(),
    );

    assert_eq!(device.id, "Bedroom");
    assert!(!device.capabilities.features_known);
    assert!(device.can_play_video());
}

#[test]
fn test_discovery_event_device_id() {
    let device = parser::device_from_service(
        "Den._airplay._tcp.local.",
        7000,
        vec![IpAddr::V4(Ipv4Addr::LOCALHOST)],
        txt(&[("deviceid", "AA")]),
    );
    assert_eq!(DiscoveryEvent::Added(device.clone()).device_id(), "AA");
    assert_eq!(DiscoveryEvent::Updated(device).device_id(), "AA");
    assert_eq!(DiscoveryEvent::Removed("BB".to_string()).device_id(), "BB");
}

#[tokio::test]
async fn test_scan_with_timeout() {
    use super::scan;
    use std::time::Duration;

    // May find nothing, but must not fail on a host with multicast
    let result = scan(Duration::from_millis(100)).await;
    assert!(result.is_ok());
}
