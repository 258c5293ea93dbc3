use std::time::Duration;

/// Encoding of the `POST /play` body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayBody {
    /// `text/parameters` key/value lines, understood by every receiver
    #[default]
    TextParameters,
    /// XML property list, preferred by newer receivers
    XmlPlist,
}

/// Configuration for `AirPlay` session behavior
#[derive(Debug, Clone)]
pub struct AirPlayConfig {
    /// Timeout for device discovery scan (default: 5 seconds)
    pub discovery_timeout: Duration,

    /// Timeout for connection attempts (default: 10 seconds)
    pub connection_timeout: Duration,

    /// Timeout for a single request/response exchange (default: 5 seconds)
    pub request_timeout: Duration,

    /// Interval for polling playback state (default: 500ms)
    pub state_poll_interval: Duration,

    /// Enable debug logging of protocol messages
    pub debug_protocol: bool,

    /// `User-Agent` sent with every request
    pub user_agent: String,

    /// Body format of the play request
    pub play_body: PlayBody,

    /// Largest response accepted from a receiver, in bytes (default: 1 MiB)
    pub max_response_size: usize,

    /// Buffered events per subscriber before the slowest one lags (default: 100)
    pub event_capacity: usize,
}

impl Default for AirPlayConfig {
    fn default() -> Self {
        Self {
            discovery_timeout: Duration::from_secs(5),
            connection_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
            state_poll_interval: Duration::from_millis(500),
            debug_protocol: false,
            user_agent: "MediaControl/1.0".to_string(),
            play_body: PlayBody::default(),
            max_response_size: 1024 * 1024,
            event_capacity: 100,
        }
    }
}

impl AirPlayConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> AirPlayConfigBuilder {
        AirPlayConfigBuilder::default()
    }
}

/// Builder for `AirPlayConfig`
#[derive(Debug, Clone, Default)]
pub struct AirPlayConfigBuilder {
    config: AirPlayConfig,
}

impl AirPlayConfigBuilder {
    /// Set discovery timeout
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.config.discovery_timeout = timeout;
        self
    }

    /// Set connection timeout
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    /// Set per-request timeout
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set state polling interval
    #[must_use]
    pub fn state_poll_interval(mut self, interval: Duration) -> Self {
        self.config.state_poll_interval = interval;
        self
    }

    /// Enable protocol debug logging
    #[must_use]
    pub fn debug_protocol(mut self, enable: bool) -> Self {
        self.config.debug_protocol = enable;
        self
    }

    /// Set the `User-Agent` header value
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Choose the play request body format
    #[must_use]
    pub fn play_body(mut self, body: PlayBody) -> Self {
        self.config.play_body = body;
        self
    }

    /// Set the response size limit
    #[must_use]
    pub fn max_response_size(mut self, size: usize) -> Self {
        self.config.max_response_size = size;
        self
    }

    /// Set the event channel capacity (at least 1)
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity.max(1);
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> AirPlayConfig {
        self.config
    }
}
