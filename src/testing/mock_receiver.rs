//! Mock `AirPlay` video receiver for testing purposes.
//!
//! Serves the video control endpoints over real TCP on loopback and keeps a
//! simulated player: media loads after a configurable number of polls,
//! advances while playing and reports the end of the media by dropping the
//! duration from `/playback-info`, like an Apple TV does.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::discovery::parser::feature_bits;
use crate::plist_dict;
use crate::protocol::http::headers::{content_types, names};
use crate::protocol::http::{HttpRequest, HttpResponse, Method, StatusCode};
use crate::protocol::plist::{self, PlistValue, xml};
use crate::protocol::video::endpoints;
use crate::types::{AirPlayDevice, DeviceCapabilities};

/// Configuration for the mock receiver.
#[derive(Debug, Clone)]
pub struct MockReceiverConfig {
    /// Name reported for the device.
    pub device_name: String,
    /// Length of every video, in seconds.
    pub duration: f64,
    /// `/playback-info` replies answered as still loading after `/play`.
    pub load_polls: u32,
    /// Seconds the position advances per `/playback-info` while playing.
    pub advance_per_poll: f64,
    /// Features served by `/server-info`; `None` answers it with 404.
    pub features: Option<u64>,
    /// Delay before every reply.
    pub latency: Duration,
}

impl Default for MockReceiverConfig {
    fn default() -> Self {
        Self {
            device_name: "Mock Apple TV".to_string(),
            duration: 60.0,
            load_polls: 1,
            advance_per_poll: 0.5,
            features: Some(
                feature_bits::VIDEO
                    | feature_bits::PHOTO
                    | feature_bits::VIDEO_VOLUME_CONTROL
                    | feature_bits::VIDEO_HLS
                    | feature_bits::SCREEN
                    | feature_bits::AUDIO,
            ),
            latency: Duration::ZERO,
        }
    }
}

/// A request as the mock receiver saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// Request method.
    pub method: Method,
    /// Full request target, including the query.
    pub path: String,
    /// `X-Apple-Session-ID` header, if sent.
    pub session_id: Option<String>,
    /// `User-Agent` header, if sent.
    pub user_agent: Option<String>,
    /// Request body.
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// `"METHOD /route"` without the query, handy for assertions.
    #[must_use]
    pub fn line(&self) -> String {
        let route = self.path.split('?').next().unwrap_or_default();
        format!("{} {route}", self.method)
    }
}

/// Simulated player behind the endpoints.
#[derive(Debug, Default)]
struct PlayerState {
    requests: Vec<RecordedRequest>,
    media_url: Option<String>,
    start_position: f64,
    loaded: bool,
    polls_until_ready: u32,
    rate: f64,
    position: f64,
    finished: bool,
    /// Status codes to answer routes with instead of handling them.
    failures: HashMap<String, u16>,
}

/// A mock `AirPlay` video receiver.
pub struct MockReceiver {
    config: MockReceiverConfig,
    state: Arc<RwLock<PlayerState>>,
    address: SocketAddr,
    cancel: CancellationToken,
}

impl MockReceiver {
    /// Starts a receiver with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with_config(MockReceiverConfig::default()).await
    }

    /// Starts a receiver on an ephemeral loopback port.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound.
    pub async fn start_with_config(config: MockReceiverConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let address = listener.local_addr()?;
        let state = Arc::new(RwLock::new(PlayerState::default()));
        let cancel = CancellationToken::new();

        tokio::spawn(accept_loop(
            listener,
            Arc::clone(&state),
            config.clone(),
            cancel.clone(),
        ));

        Ok(Self {
            config,
            state,
            address,
            cancel,
        })
    }

    /// Address the receiver listens on.
    #[must_use]
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// A device pointing at this receiver, as discovery would report it.
    #[must_use]
    pub fn device(&self) -> AirPlayDevice {
        let mut device = AirPlayDevice::new(
            format!("MOCK-{}", self.address.port()),
            &self.config.device_name,
            self.address.ip(),
            self.address.port(),
        );
        device.model = Some("AppleTV3,2".to_string());
        if let Some(features) = self.config.features {
            device.capabilities = DeviceCapabilities::from_features(features);
        }
        device
    }

    /// Every request received so far, in order.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.read().await.requests.clone()
    }

    /// Request lines (`"POST /play"`) received so far, without polls.
    pub async fn commands(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .requests
            .iter()
            .map(RecordedRequest::line)
            .filter(|line| line != "GET /playback-info")
            .collect()
    }

    /// Number of `/playback-info` polls answered.
    pub async fn poll_count(&self) -> usize {
        self.state
            .read()
            .await
            .requests
            .iter()
            .filter(|r| r.path == endpoints::PLAYBACK_INFO)
            .count()
    }

    /// URL handed over by the last `/play`.
    pub async fn media_url(&self) -> Option<String> {
        self.state.read().await.media_url.clone()
    }

    /// Start position sent with the last `/play`.
    pub async fn start_position(&self) -> f64 {
        self.state.read().await.start_position
    }

    /// Current playback rate.
    pub async fn rate(&self) -> f64 {
        self.state.read().await.rate
    }

    /// Current position, in seconds.
    pub async fn position(&self) -> f64 {
        self.state.read().await.position
    }

    /// Whether media is loaded.
    pub async fn is_playing_media(&self) -> bool {
        self.state.read().await.loaded
    }

    /// Pause or resume as if from the receiver's own remote.
    pub async fn set_rate(&self, rate: f64) {
        self.state.write().await.rate = rate;
    }

    /// Play to the end; the next poll reports no duration.
    pub async fn finish_media(&self) {
        let mut state = self.state.write().await;
        state.position = self.config.duration;
        state.finished = true;
    }

    /// Answer `route` with `status` until cleared.
    pub async fn fail_route(&self, route: &str, status: u16) {
        self.state
            .write()
            .await
            .failures
            .insert(route.to_string(), status);
    }

    /// Handle `route` normally again.
    pub async fn clear_failure(&self, route: &str) {
        self.state.write().await.failures.remove(route);
    }

    /// Stops listening and drops every open connection.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for MockReceiver {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn accept_loop(
    listener: TcpListener,
    state: Arc<RwLock<PlayerState>>,
    config: MockReceiverConfig,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            result = listener.accept() => match result {
                Ok((stream, _)) => {
                    let state = Arc::clone(&state);
                    let config = config.clone();
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        tokio::select! {
                            () = cancel.cancelled() => {}
                            () = handle_connection(stream, state, config) => {}
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                }
            },
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    state: Arc<RwLock<PlayerState>>,
    config: MockReceiverConfig,
) {
    let mut buffer = Vec::new();
    let mut temp_buf = vec![0u8; 4096];

    loop {
        let n = match stream.read(&mut temp_buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buffer.extend_from_slice(&temp_buf[..n]);

        // Several requests may be buffered
        loop {
            let request = match HttpRequest::parse(&buffer) {
                Ok(Some((request, consumed))) => {
                    buffer.drain(..consumed);
                    request
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Mock receiver got a malformed request: {e}");
                    return;
                }
            };

            if !config.latency.is_zero() {
                tokio::time::sleep(config.latency).await;
            }

            let response = {
                let mut state = state.write().await;
                handle_request(&request, &mut state, &config)
            };
            if stream.write_all(&response.encode()).await.is_err() {
                return;
            }
            if request.headers.wants_close() {
                return;
            }
        }
    }
}

fn handle_request(
    request: &HttpRequest,
    state: &mut PlayerState,
    config: &MockReceiverConfig,
) -> HttpResponse {
    state.requests.push(RecordedRequest {
        method: request.method,
        path: request.path.clone(),
        session_id: request.headers.session_id().map(String::from),
        user_agent: request.headers.get(names::USER_AGENT).map(String::from),
        body: request.body.clone(),
    });

    let route = request.route();
    if let Some(&status) = state.failures.get(route) {
        return HttpResponse::new(StatusCode(status));
    }

    match (request.method, route) {
        (Method::Get, endpoints::SERVER_INFO) => match config.features {
            Some(features) => plist_reply(&plist_dict! {
                "deviceid" => "58:55:CA:1A:E2:88",
                "features" => i64::try_from(features).unwrap_or(i64::MAX),
                "model" => "AppleTV3,2",
                "protovers" => "1.0",
                "srcvers" => "220.68",
            }),
            None => HttpResponse::new(StatusCode::NOT_FOUND),
        },
        (Method::Post, endpoints::PLAY) => match parse_play_body(request) {
            Some((url, start_position)) => {
                state.media_url = Some(url);
                state.start_position = start_position;
                state.loaded = true;
                state.finished = false;
                state.polls_until_ready = config.load_polls;
                state.rate = 1.0;
                state.position = start_position * config.duration;
                HttpResponse::new(StatusCode::OK)
            }
            None => HttpResponse::new(StatusCode::BAD_REQUEST),
        },
        (Method::Post, endpoints::RATE) => {
            match request.query_param("value").and_then(|v| v.parse::<f64>().ok()) {
                Some(rate) => {
                    state.rate = rate;
                    HttpResponse::new(StatusCode::OK)
                }
                None => HttpResponse::new(StatusCode::BAD_REQUEST),
            }
        }
        (Method::Post, endpoints::SCRUB) => {
            match request
                .query_param("position")
                .and_then(|v| v.parse::<f64>().ok())
            {
                Some(position) => {
                    state.position = position.clamp(0.0, config.duration);
                    HttpResponse::new(StatusCode::OK)
                }
                None => HttpResponse::new(StatusCode::BAD_REQUEST),
            }
        }
        (Method::Post, endpoints::STOP) => {
            state.loaded = false;
            state.rate = 0.0;
            HttpResponse::new(StatusCode::OK)
        }
        (Method::Get, endpoints::PLAYBACK_INFO) => plist_reply(&playback_info(state, config)),
        _ => HttpResponse::new(StatusCode::NOT_FOUND),
    }
}

/// Current `/playback-info`, advancing the simulated clock
fn playback_info(state: &mut PlayerState, config: &MockReceiverConfig) -> PlistValue {
    if !state.loaded || state.finished {
        return plist_dict! { "readyToPlay" => false };
    }
    if state.polls_until_ready > 0 {
        state.polls_until_ready -= 1;
        return plist_dict! {
            "readyToPlay" => false,
            "rate" => 0.0,
        };
    }

    let reply = plist_dict! {
        "duration" => config.duration,
        "position" => state.position,
        "rate" => state.rate,
        "readyToPlay" => true,
        "playbackBufferEmpty" => false,
        "playbackLikelyToKeepUp" => true,
        "loadedTimeRanges" => vec![time_range(0.0, config.duration)],
        "seekableTimeRanges" => vec![time_range(0.0, config.duration)],
    };

    if state.rate > 0.0 {
        state.position = (state.position + config.advance_per_poll * state.rate).min(config.duration);
        if state.position >= config.duration {
            state.finished = true;
        }
    }
    reply
}

fn time_range(start: f64, duration: f64) -> PlistValue {
    plist_dict! { "start" => start, "duration" => duration }
}

fn plist_reply(value: &PlistValue) -> HttpResponse {
    HttpResponse::new(StatusCode::OK).with_body(content_types::XML_PLIST, xml::encode(value))
}

/// Media URL and start fraction from either play body format
fn parse_play_body(request: &HttpRequest) -> Option<(String, f64)> {
    let is_plist = request
        .headers
        .content_type()
        .is_some_and(|ct| ct.contains("plist"));

    if is_plist {
        let value = plist::decode(&request.body).ok()?;
        let url = value.get("Content-Location")?.as_str()?.to_string();
        let start = value
            .get("Start-Position")
            .and_then(PlistValue::as_f64)
            .unwrap_or(0.0);
        return Some((url, start));
    }

    let text = std::str::from_utf8(&request.body).ok()?;
    let mut url = None;
    let mut start = 0.0;
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "Content-Location" => url = Some(value.trim().to_string()),
            "Start-Position" => start = value.trim().parse().unwrap_or(0.0),
            _ => {}
        }
    }
    url.map(|url| (url, start))
}

