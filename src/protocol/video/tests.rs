use super::*;
use crate::media::MediaSource;
use crate::plist_dict;
use crate::protocol::http::headers::{content_types, names};
use crate::protocol::http::{HttpResponse, Method, StatusCode};
use crate::protocol::plist::{self, PlistValue, xml};
use crate::types::PlayBody;

const SESSION: &str = "1A2B3C4D-0000-4000-8000-00000000ABCD";

fn requests() -> VideoRequests {
    VideoRequests::new(SESSION, "MediaControl/1.0")
}

fn plist_response(value: &PlistValue) -> HttpResponse {
    HttpResponse::new(StatusCode::OK).with_body(content_types::XML_PLIST, xml::encode(value))
}

#[test]
fn test_every_request_carries_session() {
    let requests = requests();
    let media = MediaSource::new("http://10.0.0.2/a.mp4");

    for request in [
        requests.play(&media, PlayBody::TextParameters),
        requests.rate(1.0),
        requests.scrub(3.0),
        requests.stop(),
        requests.playback_info(),
        requests.server_info(),
    ] {
        assert_eq!(request.headers.session_id(), Some(SESSION));
        assert_eq!(request.headers.get(names::USER_AGENT), Some("MediaControl/1.0"));
    }
    assert_eq!(requests.session_id(), SESSION);
}

#[test]
fn test_play_text_parameters() {
    let media = MediaSource::new("http://10.0.0.2:8080/movie.mp4").with_start_position(0.25);
    let request = requests().play(&media, PlayBody::TextParameters);

    assert_eq!(request.method, Method::Post);
    assert_eq!(request.path, endpoints::PLAY);
    assert_eq!(request.headers.content_type(), Some(content_types::TEXT_PARAMETERS));
    assert_eq!(
        String::from_utf8(request.body).unwrap(),
        "Content-Location: http://10.0.0.2:8080/movie.mp4\nStart-Position: 0.250000\n"
    );
}

#[test]
fn test_play_plist() {
    let media = MediaSource::new("http://10.0.0.2/a.m3u8").with_start_position(0.5);
    let request = requests().play(&media, PlayBody::XmlPlist);

    assert_eq!(request.headers.content_type(), Some(content_types::XML_PLIST));
    let body = plist::decode(&request.body).unwrap();
    assert_eq!(
        body.get("Content-Location").and_then(PlistValue::as_str),
        Some("http://10.0.0.2/a.m3u8")
    );
    assert_eq!(body.get("Start-Position").and_then(PlistValue::as_f64), Some(0.5));
}

#[test]
fn test_rate_and_scrub_paths() {
    let requests = requests();

    assert_eq!(requests.rate(0.0).path, "/rate?value=0.000000");
    assert_eq!(requests.rate(1.0).path, "/rate?value=1.000000");
    assert_eq!(requests.scrub(42.125).path, "/scrub?position=42.125000");
    assert_eq!(requests.rate(1.0).query_param("value"), Some("1.000000"));
}

#[test]
fn test_empty_post_has_content_length() {
    let encoded = String::from_utf8(requests().stop().encode()).unwrap();

    assert!(encoded.starts_with("POST /stop HTTP/1.1\r\n"));
    assert!(encoded.contains("Content-Length: 0\r\n"));
}

#[test]
fn test_get_requests() {
    let requests = requests();

    assert_eq!(requests.playback_info().method, Method::Get);
    assert_eq!(requests.playback_info().path, "/playback-info");
    assert_eq!(requests.server_info().path, "/server-info");
    assert!(requests.server_info().body.is_empty());
}

#[test]
fn test_format_play_parameters() {
    assert_eq!(
        format_play_parameters("http://h/x.mp4", 0.0),
        "Content-Location: http://h/x.mp4\nStart-Position: 0.000000\n"
    );
}

#[test]
#[allow(clippy::float_cmp)]
fn test_parse_playback_info() {
    let dict = plist_dict! {
        "position" => 10.5,
        "duration" => 120.0,
        "rate" => 1.0,
        "readyToPlay" => true,
        "playbackBufferEmpty" => false,
        "loadedTimeRanges" => vec![plist_dict! { "start" => 0.0, "duration" => 30.0 }],
        "seekableTimeRanges" => vec![plist_dict! { "start" => 0.0, "duration" => 120.0 }],
    };

    let info = PlaybackInfo::parse(&plist_response(&dict)).unwrap();

    assert_eq!(info.position, Some(10.5));
    assert_eq!(info.duration, Some(120.0));
    assert_eq!(info.rate, Some(1.0));
    assert!(info.ready_to_play);
    assert!(!info.playback_buffer_empty);
    assert!(!info.is_paused());
    assert_eq!(
        info.loaded_time_ranges,
        vec![TimeRange {
            start: 0.0,
            duration: 30.0
        }]
    );
    assert!(info.can_seek_to(60.0));
    assert!(!info.can_seek_to(121.0));
    assert!(!info.can_seek_to(-1.0));
}

#[test]
fn test_playback_info_integer_flags() {
    let dict = plist_dict! {
        "duration" => 30,
        "readyToPlay" => 1,
        "rate" => 0,
    };

    let info = PlaybackInfo::from_plist(&dict).unwrap();
    assert_eq!(info.duration, Some(30.0));
    assert!(info.ready_to_play);
    assert!(info.is_paused());
}

#[test]
fn test_playback_info_empty_body() {
    let response = HttpResponse::new(StatusCode::OK);
    assert_eq!(PlaybackInfo::parse(&response).unwrap(), PlaybackInfo::default());

    let response = HttpResponse::new(StatusCode::OK).with_body("text/plain", b"\r\n".to_vec());
    assert_eq!(PlaybackInfo::parse(&response).unwrap(), PlaybackInfo::default());
}

#[test]
fn test_playback_info_after_media_end() {
    let info = PlaybackInfo::from_plist(&plist_dict! { "readyToPlay" => false }).unwrap();

    assert!(info.duration.is_none());
    assert!(info.position.is_none());
    assert!(!info.is_paused());
    // No ranges and no duration: anything non-negative is allowed
    assert!(info.can_seek_to(10.0));
}

#[test]
fn test_playback_info_rejects_non_dict() {
    let value = PlistValue::Array(vec![PlistValue::from(1.0)]);
    assert!(PlaybackInfo::from_plist(&value).is_err());

    let response = HttpResponse::new(StatusCode::OK).with_body("text/plain", b"garbage".to_vec());
    assert!(PlaybackInfo::parse(&response).is_err());
}

#[test]
fn test_parse_server_info() {
    let dict = plist_dict! {
        "deviceid" => "58:55:CA:1A:E2:88",
        "features" => 0x5A7F_FFF7_i64,
        "model" => "AppleTV3,2",
        "protovers" => "1.0",
        "srcvers" => "220.68",
        "osBuildVersion" => "12B435",
    };

    let info = ServerInfo::parse(&plist_response(&dict)).unwrap();

    assert_eq!(info.device_id.as_deref(), Some("58:55:CA:1A:E2:88"));
    assert_eq!(info.features, Some(0x5A7F_FFF7));
    assert_eq!(info.model.as_deref(), Some("AppleTV3,2"));
    assert_eq!(info.protocol_version.as_deref(), Some("1.0"));
    assert_eq!(info.source_version.as_deref(), Some("220.68"));
    assert_eq!(info.os_build_version.as_deref(), Some("12B435"));
}

#[test]
fn test_server_info_mac_address_fallback() {
    let dict = plist_dict! { "macAddress" => "AA:BB:CC:DD:EE:FF", "features" => -1_i64 };

    let info = ServerInfo::from_plist(&dict).unwrap();
    assert_eq!(info.device_id.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
    assert_eq!(info.features, None);
}
