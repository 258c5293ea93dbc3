//! Sans-IO HTTP/1.1 messages for the `AirPlay` video endpoints
//!
//! Receivers speak plain HTTP on the advertised `_airplay._tcp` port. Only
//! the subset the control protocol needs is implemented: `Content-Length`
//! framed bodies on a keep-alive connection.

pub mod codec;
pub mod headers;
pub mod request;
pub mod response;


pub use codec::{HttpCodec, HttpCodecError};
pub use headers::Headers;
pub use request::{HttpRequest, HttpRequestBuilder};
pub use response::{HttpResponse, StatusCode};

/// HTTP methods used by `AirPlay` video senders and the local media server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Fetch state (`/playback-info`, `/server-info`) or media bytes
    Get,
    /// Fetch media headers only
    Head,
    /// Issue a command (`/play`, `/rate`, `/scrub`, `/stop`)
    Post,
    /// Upload (photos); accepted for completeness
    Put,
}

impl Method {
    /// Convert to the request-line token
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }

    /// Parse from a request-line token
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(Method::Get),
            "HEAD" => Some(Method::Head),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            _ => None,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
