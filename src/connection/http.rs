use std::net::SocketAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::{ConnectionState, ConnectionStats, Transport};
use crate::error::AirPlayError;
use crate::protocol::http::headers::names;
use crate::protocol::http::{HttpCodec, HttpRequest, HttpResponse};
use crate::types::{AirPlayConfig, AirPlayDevice};

/// Keep-alive HTTP/1.1 connection to a receiver
///
/// Requests are strictly sequential. When the receiver closes the socket
/// between requests the next request reopens it.
pub struct HttpConnection {
    stream: Option<TcpStream>,
    codec: HttpCodec,
    addr: SocketAddr,
    device_name: String,
    connection_timeout: Duration,
    request_timeout: Duration,
    max_response_size: usize,
    debug: bool,
    // Set while an exchange is in progress; still set on entry means the
    // previous caller was cancelled mid-message
    in_flight: bool,
    state: ConnectionState,
    stats: ConnectionStats,
}

impl HttpConnection {
    /// Connect to the receiver's video endpoint
    ///
    /// # Errors
    ///
    /// Returns `ConnectionTimeout` if the connect does not finish within
    /// `connection_timeout`, `ConnectionFailed` otherwise.
    pub async fn connect(
        device: &AirPlayDevice,
        config: &AirPlayConfig,
    ) -> Result<Self, AirPlayError> {
        let mut connection = Self {
            stream: None,
            codec: HttpCodec::new().with_max_size(config.max_response_size),
            addr: device.socket_addr(),
            device_name: device.name.clone(),
            connection_timeout: config.connection_timeout,
            request_timeout: config.request_timeout,
            max_response_size: config.max_response_size,
            debug: config.debug_protocol,
            in_flight: false,
            state: ConnectionState::Disconnected,
            stats: ConnectionStats::default(),
        };
        connection.open().await?;
        Ok(connection)
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Traffic statistics
    #[must_use]
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Address of the receiver
    #[must_use]
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    async fn open(&mut self) -> Result<(), AirPlayError> {
        tracing::debug!("Connecting to {} ({})", self.device_name, self.addr);

        let stream = tokio::time::timeout(self.connection_timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| AirPlayError::ConnectionTimeout {
                duration: self.connection_timeout,
            })?
            .map_err(|e| AirPlayError::ConnectionFailed {
                device_name: self.device_name.clone(),
                message: format!("connect to {} failed: {e}", self.addr),
                source: Some(Box::new(e)),
            })?;
        let _ = stream.set_nodelay(true);

        if self.stats.connected_at.is_some() {
            self.stats.reconnects += 1;
        }
        self.stats.connected_at = Some(Instant::now());
        self.stream = Some(stream);
        self.codec = HttpCodec::new().with_max_size(self.max_response_size);
        self.state = ConnectionState::Connected;
        Ok(())
    }

    fn drop_stream(&mut self) {
        self.stream = None;
        if self.state != ConnectionState::Closed {
            self.state = ConnectionState::Disconnected;
        }
    }

    async fn exchange(&mut self, request: &HttpRequest) -> Result<HttpResponse, AirPlayError> {
        let encoded = request.encode();
        if self.debug {
            tracing::debug!(
                ">> {} {}\n{}",
                request.method,
                request.path,
                String::from_utf8_lossy(&encoded).trim_end()
            );
        } else {
            tracing::debug!(">> {} {}", request.method, request.path);
        }

        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| AirPlayError::Disconnected {
                device_name: self.device_name.clone(),
            })?;
        stream.write_all(&encoded).await?;
        stream.flush().await?;
        self.stats.record_sent(encoded.len());

        let mut buf = vec![0u8; 4096];
        loop {
            if let Some(response) = self.codec.decode()? {
                return Ok(response);
            }

            let n = stream.read(&mut buf).await?;
            if n == 0 {
                return Err(AirPlayError::Disconnected {
                    device_name: self.device_name.clone(),
                });
            }
            self.codec.feed(&buf[..n])?;
            self.stats.record_received(n);
        }
    }
}

#[async_trait]
impl Transport for HttpConnection {
    async fn send(&mut self, mut request: HttpRequest) -> Result<HttpResponse, AirPlayError> {
        if self.state == ConnectionState::Closed {
            return Err(AirPlayError::Disconnected {
                device_name: self.device_name.clone(),
            });
        }
        if self.in_flight {
            tracing::debug!("Discarding connection left mid-exchange");
            self.drop_stream();
            self.in_flight = false;
        }
        if self.stream.is_none() {
            self.open().await?;
        }
        if !request.headers.contains(names::HOST) {
            request.headers.insert(names::HOST, self.addr.to_string());
        }

        self.in_flight = true;
        let result = match tokio::time::timeout(self.request_timeout, self.exchange(&request)).await
        {
            Ok(result) => result,
            Err(_) => Err(AirPlayError::Timeout),
        };
        self.in_flight = false;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                // The stream is mid-message; it cannot be reused
                self.stats.last_error = Some(e.to_string());
                self.drop_stream();
                return Err(e);
            }
        };

        self.stats.requests += 1;
        if response.headers.wants_close() {
            self.drop_stream();
        }
        if self.debug {
            tracing::debug!(
                "<< {} {} ({} bytes)\n{}",
                response.status.as_u16(),
                response.reason,
                response.body.len(),
                String::from_utf8_lossy(&response.body).trim_end()
            );
        } else {
            tracing::debug!("<< {} {}", response.status.as_u16(), response.reason);
        }

        if !response.is_success() {
            tracing::warn!(
                "{} {} failed: {} {}",
                request.method,
                request.path,
                response.status.as_u16(),
                response.reason
            );
            return Err(AirPlayError::HttpError {
                message: format!(
                    "{} {} returned {} {}",
                    request.method,
                    request.route(),
                    response.status.as_u16(),
                    response.reason
                ),
                status_code: Some(response.status.as_u16()),
            });
        }

        Ok(response)
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        self.state = ConnectionState::Closed;
    }
}
