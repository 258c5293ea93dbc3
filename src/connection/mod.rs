//! Connection management
//!
//! A session talks to its receiver over one keep-alive HTTP/1.1 connection.
//! [`Transport`] is the seam the session drives; [`Connector`] opens one for
//! a device so tests can substitute their own.

mod http;
mod state;

pub use http::HttpConnection;
pub use state::{ConnectionState, ConnectionStats};

use async_trait::async_trait;

use crate::error::AirPlayError;
use crate::protocol::http::{HttpRequest, HttpResponse};
use crate::types::{AirPlayConfig, AirPlayDevice};


/// A request/response channel to one receiver
#[async_trait]
pub trait Transport: Send {
    /// Send a request and wait for its response
    ///
    /// # Errors
    ///
    /// Returns `HttpError` for non-2xx replies, `Timeout` when the receiver
    /// does not answer in time, and connection errors when the socket fails.
    async fn send(&mut self, request: HttpRequest) -> Result<HttpResponse, AirPlayError>;

    /// Close the underlying connection
    async fn close(&mut self);
}

/// Opens transports to receivers
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to `device`
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` or `ConnectionTimeout` if the receiver is unreachable.
    async fn connect(
        &self,
        device: &AirPlayDevice,
        config: &AirPlayConfig,
    ) -> Result<Box<dyn Transport>, AirPlayError>;
}

/// Default connector using [`HttpConnection`] over TCP
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(
        &self,
        device: &AirPlayDevice,
        config: &AirPlayConfig,
    ) -> Result<Box<dyn Transport>, AirPlayError> {
        let connection = HttpConnection::connect(device, config).await?;
        Ok(Box::new(connection))
    }
}
