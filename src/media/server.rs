use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use local_ip_address::{list_afinet_netifas, local_ip};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

use super::{MediaSource, VideoManager};
use crate::error::AirPlayError;
use crate::types::AirPlayDevice;

/// Guess a MIME type from a file extension
#[must_use]
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" | "qt" => "video/quicktime",
        "m3u8" => "application/vnd.apple.mpegurl",
        "ts" => "video/mp2t",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

/// Local address a receiver at `target` can reach this host on
///
/// Prefers an interface on the receiver's subnet (same /24, or /64 for
/// IPv6). A multi-homed host's default interface may face another network,
/// so that is only the fallback.
///
/// # Errors
///
/// Returns `MediaUnavailable` if no local address can be determined.
pub fn local_ip_for(target: IpAddr) -> Result<IpAddr, AirPlayError> {
    if target.is_loopback() {
        return Ok(target);
    }

    let interfaces = list_afinet_netifas().unwrap_or_else(|e| {
        tracing::warn!("Failed to list network interfaces: {e}");
        Vec::new()
    });
    if let Some((name, ip)) = interfaces
        .into_iter()
        .find(|(_, ip)| !ip.is_loopback() && same_subnet(*ip, target))
    {
        tracing::debug!("Using interface {name} ({ip}) for {target}");
        return Ok(ip);
    }

    local_ip().map_err(|e| AirPlayError::MediaUnavailable {
        message: format!("no local address reachable from {target}: {e}"),
        source: Some(Box::new(e)),
    })
}

fn same_subnet(local: IpAddr, target: IpAddr) -> bool {
    match (local, target) {
        (IpAddr::V4(a), IpAddr::V4(b)) => a.octets()[..3] == b.octets()[..3],
        (IpAddr::V6(a), IpAddr::V6(b)) => a.segments()[..4] == b.segments()[..4],
        _ => false,
    }
}

/// Serves one local file to receivers over HTTP
///
/// The file is exposed under an unguessable path. GET and HEAD are answered,
/// with `Range` requests getting `206 Partial Content` so receivers can seek.
/// The listener stops when the server is shut down or dropped; transfers
/// already in flight run to completion.
pub struct MediaServer {
    path: PathBuf,
    route: String,
    content_type: &'static str,
    local_addr: SocketAddr,
    start_position: f64,
    requests: Arc<AtomicU64>,
    cancel: CancellationToken,
}

impl MediaServer {
    /// Serve `path` on an ephemeral port of every interface
    ///
    /// # Errors
    ///
    /// Returns `MediaUnavailable` if the file cannot be read, or a network
    /// error if the listener cannot be bound.
    pub async fn bind(path: impl Into<PathBuf>) -> Result<Self, AirPlayError> {
        Self::bind_to(path, SocketAddr::from(([0, 0, 0, 0], 0))).await
    }

    /// Serve `path` on a specific address
    ///
    /// # Errors
    ///
    /// Returns `MediaUnavailable` if the file cannot be read, or a network
    /// error if the listener cannot be bound.
    pub async fn bind_to(path: impl Into<PathBuf>, addr: SocketAddr) -> Result<Self, AirPlayError> {
        let path = path.into();
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| AirPlayError::MediaUnavailable {
                message: format!("cannot read {}: {e}", path.display()),
                source: Some(Box::new(e)),
            })?;
        if !metadata.is_file() {
            return Err(AirPlayError::MediaUnavailable {
                message: format!("{} is not a regular file", path.display()),
                source: None,
            });
        }

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        // Receivers sniff the container from the URL suffix
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let route = format!("/{}{ext}", uuid::Uuid::new_v4().simple());
        let content_type = content_type_for(&path);
        let requests = Arc::new(AtomicU64::new(0));

        let app = Router::new()
            .route_service(
                &route,
                ServeFile::new_with_mime(&path, &content_type.parse::<mime::Mime>().expect("valid mime")),
            )
            .layer(middleware::from_fn_with_state(
                Arc::clone(&requests),
                count_requests,
            ))
            .layer(TraceLayer::new_for_http());

        let cancel = CancellationToken::new();
        let shutdown = cancel.clone().cancelled_owned();
        let served = route.clone();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                tracing::warn!("Media server for {served} failed: {e}");
            }
            tracing::debug!("Media server for {served} stopped");
        });
        tracing::info!(
            "Serving {} ({} bytes) on {local_addr}",
            path.display(),
            metadata.len()
        );

        Ok(Self {
            path,
            route,
            content_type,
            local_addr,
            start_position: 0.0,
            requests,
            cancel,
        })
    }

    /// Start playback at a fraction of the duration
    #[must_use]
    pub fn with_start_position(mut self, position: f64) -> Self {
        self.start_position = position;
        self
    }

    /// Address the listener is bound to
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Path component the file is served under
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Local file being served
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// URL of the file as reachable through `host`
    #[must_use]
    pub fn url_for(&self, host: IpAddr) -> String {
        let addr = SocketAddr::new(host, self.local_addr.port());
        format!("http://{addr}{}", self.route)
    }

    /// Requests answered so far
    #[must_use]
    pub fn requests_served(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Stop accepting connections
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for MediaServer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl VideoManager for MediaServer {
    async fn prepare(&self, device: &AirPlayDevice) -> Result<MediaSource, AirPlayError> {
        if self.cancel.is_cancelled() {
            return Err(AirPlayError::MediaUnavailable {
                message: "media server has been shut down".to_string(),
                source: None,
            });
        }

        let host = if self.local_addr.ip().is_unspecified() {
            local_ip_for(device.address())?
        } else {
            self.local_addr.ip()
        };

        Ok(MediaSource::new(self.url_for(host))
            .with_start_position(self.start_position)
            .with_content_type(self.content_type))
    }

    async fn paused_changed(&self, paused: bool) {
        tracing::debug!("Receiver paused={paused} while serving {}", self.route);
    }

    async fn playback_stopped(&self) {
        tracing::debug!(
            "Playback of {} ended after {} requests",
            self.route,
            self.requests_served()
        );
    }
}

async fn count_requests(
    State(requests): State<Arc<AtomicU64>>,
    request: Request,
    next: Next,
) -> Response {
    tracing::debug!("Media {} {}", request.method(), request.uri());
    requests.fetch_add(1, Ordering::Relaxed);
    next.run(request).await
}
