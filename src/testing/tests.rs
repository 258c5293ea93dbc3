use super::mock_receiver::{MockReceiver, MockReceiverConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::protocol::http::{HttpCodec, HttpResponse};
use crate::protocol::plist;

async fn exchange(stream: &mut TcpStream, request: &str) -> HttpResponse {
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut codec = HttpCodec::new();
    let mut buf = [0u8; 4096];
    loop {
        if let Some(response) = codec.decode().unwrap() {
            return response;
        }
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "receiver closed the connection");
        codec.feed(&buf[..n]).unwrap();
    }
}

fn post(path: &str, body: &str) -> String {
    format!(
        "POST {path} HTTP/1.1\r\nContent-Type: text/parameters\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    )
}

fn get(path: &str) -> String {
    format!("GET {path} HTTP/1.1\r\n\r\n")
}

#[tokio::test]
async fn test_mock_receiver_starts() {
    let receiver = MockReceiver::start().await.unwrap();

    assert!(receiver.address().port() > 0);
    assert!(receiver.address().ip().is_loopback());
    assert!(receiver.device().can_play_video());
}

#[tokio::test]
async fn test_server_info() {
    let receiver = MockReceiver::start().await.unwrap();
    let mut stream = TcpStream::connect(receiver.address()).await.unwrap();

    let response = exchange(&mut stream, &get("/server-info")).await;
    assert!(response.is_success());
    let value = plist::decode(&response.body).unwrap();
    assert_eq!(value.get("model").and_then(|v| v.as_str()), Some("AppleTV3,2"));
    assert!(value.get("features").and_then(|v| v.as_i64()).unwrap() & 1 == 1);
}

#[tokio::test]
async fn test_server_info_missing() {
    let config = MockReceiverConfig {
        features: None,
        ..MockReceiverConfig::default()
    };
    let receiver = MockReceiver::start_with_config(config).await.unwrap();
    let mut stream = TcpStream::connect(receiver.address()).await.unwrap();

    let response = exchange(&mut stream, &get("/server-info")).await;
    assert_eq!(response.status.as_u16(), 404);
    assert!(!receiver.device().capabilities.features_known);
}

#[tokio::test]
async fn test_play_then_poll() {
    let receiver = MockReceiver::start().await.unwrap();
    let mut stream = TcpStream::connect(receiver.address()).await.unwrap();

    let body = "Content-Location: http://10.0.0.2/a.mp4\nStart-Position: 0.500000\n";
    let response = exchange(&mut stream, &post("/play", body)).await;
    assert!(response.is_success());
    assert_eq!(
        receiver.media_url().await.as_deref(),
        Some("http://10.0.0.2/a.mp4")
    );
    assert!((receiver.start_position().await - 0.5).abs() < 1e-9);

    // First poll is still loading
    let loading = exchange(&mut stream, &get("/playback-info")).await;
    let value = plist::decode(&loading.body).unwrap();
    assert_eq!(value.get("readyToPlay").and_then(|v| v.as_bool()), Some(false));
    assert!(value.get("duration").is_none());

    let ready = exchange(&mut stream, &get("/playback-info")).await;
    let value = plist::decode(&ready.body).unwrap();
    assert_eq!(value.get("readyToPlay").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(value.get("duration").and_then(|v| v.as_f64()), Some(60.0));
    assert_eq!(value.get("position").and_then(|v| v.as_f64()), Some(30.0));

    assert_eq!(receiver.poll_count().await, 2);
    assert_eq!(receiver.commands().await, vec!["POST /play"]);
}

#[tokio::test]
async fn test_rate_scrub_stop() {
    let receiver = MockReceiver::start().await.unwrap();
    let mut stream = TcpStream::connect(receiver.address()).await.unwrap();

    let body = "Content-Location: http://10.0.0.2/a.mp4\nStart-Position: 0.000000\n";
    exchange(&mut stream, &post("/play", body)).await;

    exchange(&mut stream, &post("/rate?value=0.000000", "")).await;
    assert_eq!(receiver.rate().await, 0.0);

    exchange(&mut stream, &post("/scrub?position=12.500000", "")).await;
    assert!((receiver.position().await - 12.5).abs() < 1e-9);

    exchange(&mut stream, &post("/stop", "")).await;
    assert!(!receiver.is_playing_media().await);

    assert_eq!(
        receiver.commands().await,
        vec!["POST /play", "POST /rate", "POST /scrub", "POST /stop"]
    );
}

#[tokio::test]
async fn test_finish_drops_duration() {
    let config = MockReceiverConfig {
        load_polls: 0,
        ..MockReceiverConfig::default()
    };
    let receiver = MockReceiver::start_with_config(config).await.unwrap();
    let mut stream = TcpStream::connect(receiver.address()).await.unwrap();

    let body = "Content-Location: http://10.0.0.2/a.mp4\n";
    exchange(&mut stream, &post("/play", body)).await;
    receiver.finish_media().await;

    let response = exchange(&mut stream, &get("/playback-info")).await;
    let value = plist::decode(&response.body).unwrap();
    assert!(value.get("duration").is_none());
}

#[tokio::test]
async fn test_failure_injection() {
    let receiver = MockReceiver::start().await.unwrap();
    let mut stream = TcpStream::connect(receiver.address()).await.unwrap();

    receiver.fail_route("/rate", 500).await;
    let response = exchange(&mut stream, &post("/rate?value=1.000000", "")).await;
    assert_eq!(response.status.as_u16(), 500);

    receiver.clear_failure("/rate").await;
    let response = exchange(&mut stream, &post("/rate?value=1.000000", "")).await;
    assert!(response.is_success());
}

#[tokio::test]
async fn test_bad_play_body() {
    let receiver = MockReceiver::start().await.unwrap();
    let mut stream = TcpStream::connect(receiver.address()).await.unwrap();

    let response = exchange(&mut stream, &post("/play", "Start-Position: 0.1\n")).await;
    assert_eq!(response.status.as_u16(), 400);
    assert!(receiver.media_url().await.is_none());
}

#[tokio::test]
async fn test_shutdown_closes_connections() {
    let receiver = MockReceiver::start().await.unwrap();
    let mut stream = TcpStream::connect(receiver.address()).await.unwrap();
    exchange(&mut stream, &get("/server-info")).await;

    receiver.shutdown();

    let mut buf = [0u8; 16];
    let n = tokio::time::timeout(std::time::Duration::from_secs(2), stream.read(&mut buf))
        .await
        .unwrap()
        .unwrap_or(0);
    assert_eq!(n, 0);
}
