use super::Headers;
use super::headers::{content_types, names};
use crate::protocol::plist::{self, PlistError, PlistValue};

/// HTTP status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const FORBIDDEN: StatusCode = StatusCode(403);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const INTERNAL_ERROR: StatusCode = StatusCode(500);
    pub const NOT_IMPLEMENTED: StatusCode = StatusCode(501);
    pub const SERVICE_UNAVAILABLE: StatusCode = StatusCode(503);

    /// Check if this is a success status (2xx)
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    /// Check if this is a client error (4xx)
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.0)
    }

    /// Check if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.0)
    }

    /// Get status code as u16
    #[must_use]
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Canonical reason phrase
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            400 => "Bad Request",
            403 => "Forbidden",
            404 => "Not Found",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            503 => "Service Unavailable",
            _ => "",
        }
    }
}

/// An HTTP response message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Protocol version (usually "HTTP/1.1")
    pub version: String,
    /// Status code
    pub status: StatusCode,
    /// Reason phrase (e.g., "OK")
    pub reason: String,
    /// Response headers
    pub headers: Headers,
    /// Response body (may be empty)
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a response with the canonical reason phrase
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            version: "HTTP/1.1".to_string(),
            status,
            reason: status.reason().to_string(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// Attach a header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a body and its content type
    #[must_use]
    pub fn with_body(mut self, content_type: &str, body: Vec<u8>) -> Self {
        self.headers.insert(names::CONTENT_TYPE, content_type);
        self.body = body;
        self
    }

    /// Check if response indicates success
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Check if the body is a property list (XML or binary)
    #[must_use]
    pub fn is_plist(&self) -> bool {
        self.headers.content_type().is_some_and(|ct| {
            ct.contains(content_types::XML_PLIST)
                || ct.contains(content_types::BINARY_PLIST)
                || ct.contains("application/x-plist")
        })
    }

    /// Parse body as a property list, sniffing XML vs binary
    ///
    /// # Errors
    ///
    /// Returns `PlistError` if the body is neither a valid XML nor binary plist.
    pub fn body_as_plist(&self) -> Result<PlistValue, PlistError> {
        plist::decode(&self.body)
    }

    /// Encode the response head and body (server side)
    ///
    /// `Content-Length` is derived from the body unless already set, so a
    /// HEAD reply can advertise the length of a body it does not carry.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut output = Vec::with_capacity(128 + self.body.len());
        output.extend_from_slice(
            format!("{} {} {}\r\n", self.version, self.status.0, self.reason).as_bytes(),
        );
        self.headers.write_to(&mut output);
        if !self.headers.contains(names::CONTENT_LENGTH) {
            output.extend_from_slice(
                format!("{}: {}\r\n", names::CONTENT_LENGTH, self.body.len()).as_bytes(),
            );
        }
        output.extend_from_slice(b"\r\n");
        output.extend_from_slice(&self.body);
        output
    }
}
