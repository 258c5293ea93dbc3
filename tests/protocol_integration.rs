use airplay_video::connection::{HttpConnection, Transport};
use airplay_video::media::MediaSource;
use airplay_video::protocol::video::{PlaybackInfo, ServerInfo, VideoRequests};
use airplay_video::testing::{MockReceiver, MockReceiverConfig};
use airplay_video::{AirPlayConfig, AirPlayError, PlayBody};

#[tokio::test]
async fn test_video_protocol_over_one_connection() {
    let receiver = MockReceiver::start_with_config(MockReceiverConfig {
        load_polls: 0,
        ..MockReceiverConfig::default()
    })
    .await
    .unwrap();
    let config = AirPlayConfig::default();
    let mut connection = HttpConnection::connect(&receiver.device(), &config)
        .await
        .unwrap();
    let requests = VideoRequests::new("5D3B1D9C-0C3A-4E4B-9E8B-7A7B0A4D9E11", &config.user_agent);

    let info = ServerInfo::parse(&connection.send(requests.server_info()).await.unwrap()).unwrap();
    assert_eq!(info.model.as_deref(), Some("AppleTV3,2"));

    let media = MediaSource::new("http://10.0.0.5/video.mp4");
    connection
        .send(requests.play(&media, PlayBody::TextParameters))
        .await
        .unwrap();

    let reply = connection.send(requests.playback_info()).await.unwrap();
    let info = PlaybackInfo::parse(&reply).unwrap();
    assert!(info.ready_to_play);
    assert_eq!(info.duration, Some(60.0));
    assert!(!info.is_paused());

    connection.send(requests.rate(0.0)).await.unwrap();
    let info = PlaybackInfo::parse(&connection.send(requests.playback_info()).await.unwrap())
        .unwrap();
    assert!(info.is_paused());

    connection.send(requests.stop()).await.unwrap();

    // All of it went over a single keep-alive connection
    assert_eq!(connection.stats().reconnects, 0);
    assert_eq!(connection.stats().requests, 6);
    connection.close().await;
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let receiver = MockReceiver::start().await.unwrap();
    receiver.fail_route("/play", 453).await;

    let config = AirPlayConfig::default();
    let mut connection = HttpConnection::connect(&receiver.device(), &config)
        .await
        .unwrap();
    let requests = VideoRequests::new("S", &config.user_agent);

    let err = connection
        .send(requests.play(&MediaSource::new("http://h/v.mp4"), PlayBody::XmlPlist))
        .await
        .unwrap_err();
    assert!(matches!(err, AirPlayError::HttpError { status_code: Some(453), .. }));

    // The connection survives an error status
    assert!(connection.send(requests.server_info()).await.is_ok());
    assert_eq!(connection.stats().reconnects, 0);
}
