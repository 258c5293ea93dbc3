//! Connection state management

use std::time::Instant;

/// Connection state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected; the next request reconnects
    #[default]
    Disconnected,
    /// Socket open and idle
    Connected,
    /// Closed by the owner, no further requests
    Closed,
}

impl ConnectionState {
    /// Check if fully connected
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Connection statistics
#[derive(Debug, Clone, Default)]
pub struct ConnectionStats {
    /// Time the current socket was established
    pub connected_at: Option<Instant>,
    /// Number of bytes sent
    pub bytes_sent: u64,
    /// Number of bytes received
    pub bytes_received: u64,
    /// Requests answered
    pub requests: u64,
    /// Times the socket was reopened after the receiver closed it
    pub reconnects: u32,
    /// Last error message
    pub last_error: Option<String>,
}

impl ConnectionStats {
    /// Get connection uptime
    #[must_use]
    pub fn uptime(&self) -> Option<std::time::Duration> {
        self.connected_at.map(|t| t.elapsed())
    }

    /// Record bytes sent
    pub fn record_sent(&mut self, bytes: usize) {
        self.bytes_sent += bytes as u64;
    }

    /// Record bytes received
    pub fn record_received(&mut self, bytes: usize) {
        self.bytes_received += bytes as u64;
    }
}
