use super::headers::names;
use super::{Headers, HttpCodecError, Method};

/// Largest header section accepted from a peer
pub(crate) const MAX_HEADER_SIZE: usize = 64 * 1024;

/// An HTTP request message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Request target, path plus optional query (e.g. `/rate?value=1.000000`)
    pub path: String,
    /// Request headers
    pub headers: Headers,
    /// Request body (may be empty)
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Create a new request
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// Create a builder for constructing requests
    pub fn builder(method: Method, path: impl Into<String>) -> HttpRequestBuilder {
        HttpRequestBuilder::new(method, path)
    }

    /// Path without the query string
    #[must_use]
    pub fn route(&self) -> &str {
        self.path.split_once('?').map_or(&self.path, |(p, _)| p)
    }

    /// Look up a query parameter
    #[must_use]
    pub fn query_param(&self, key: &str) -> Option<&str> {
        let (_, query) = self.path.split_once('?')?;
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// Encode request to bytes
    ///
    /// `Content-Length` is always written for POST and PUT, since receivers
    /// wait for it even when the body is empty.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut output = Vec::with_capacity(256 + self.body.len());

        output.extend_from_slice(self.method.as_str().as_bytes());
        output.push(b' ');
        output.extend_from_slice(self.path.as_bytes());
        output.extend_from_slice(b" HTTP/1.1\r\n");

        self.headers.write_to(&mut output);

        let needs_length =
            !self.body.is_empty() || matches!(self.method, Method::Post | Method::Put);
        if needs_length && !self.headers.contains(names::CONTENT_LENGTH) {
            let len_header = format!("{}: {}\r\n", names::CONTENT_LENGTH, self.body.len());
            output.extend_from_slice(len_header.as_bytes());
        }

        output.extend_from_slice(b"\r\n");
        output.extend_from_slice(&self.body);

        output
    }

    /// Parse one request from the front of `data`
    ///
    /// Returns `Ok(None)` while the request is incomplete, otherwise the
    /// request and the number of bytes it occupied.
    ///
    /// # Errors
    ///
    /// Returns `HttpCodecError` if the request line or headers are malformed.
    pub fn parse(data: &[u8]) -> Result<Option<(Self, usize)>, HttpCodecError> {
        let Some(header_end) = data.windows(4).position(|w| w == b"\r\n\r\n") else {
            if data.len() > MAX_HEADER_SIZE {
                return Err(HttpCodecError::MessageTooLarge { size: data.len() });
            }
            return Ok(None);
        };

        let head =
            std::str::from_utf8(&data[..header_end]).map_err(|_| HttpCodecError::InvalidUtf8)?;
        let (request_line, header_block) = head.split_once("\r\n").unwrap_or((head, ""));

        let mut parts = request_line.split_whitespace();
        let (Some(method), Some(path), Some(version)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(HttpCodecError::InvalidStartLine(request_line.to_string()));
        };
        if !version.starts_with("HTTP/") {
            return Err(HttpCodecError::InvalidStartLine(request_line.to_string()));
        }
        let method = Method::parse(method)
            .ok_or_else(|| HttpCodecError::InvalidStartLine(request_line.to_string()))?;

        let headers = Headers::parse_block(header_block)?;
        let content_length = match headers.get(names::CONTENT_LENGTH) {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .map_err(|_| HttpCodecError::InvalidContentLength)?,
            None => 0,
        };

        let body_start = header_end + 4;
        if data.len() < body_start + content_length {
            return Ok(None);
        }

        let request = HttpRequest {
            method,
            path: path.to_string(),
            headers,
            body: data[body_start..body_start + content_length].to_vec(),
        };
        Ok(Some((request, body_start + content_length)))
    }
}

/// Builder for HTTP requests
#[derive(Debug)]
pub struct HttpRequestBuilder {
    request: HttpRequest,
}

impl HttpRequestBuilder {
    /// Create a new builder
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request: HttpRequest::new(method, path),
        }
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.insert(name, value);
        self
    }

    /// Set Content-Type header
    #[must_use]
    pub fn content_type(self, content_type: &str) -> Self {
        self.header(names::CONTENT_TYPE, content_type)
    }

    /// Set User-Agent header
    #[must_use]
    pub fn user_agent(self, agent: &str) -> Self {
        self.header(names::USER_AGENT, agent)
    }

    /// Set the `AirPlay` session id header
    #[must_use]
    pub fn session(self, session_id: &str) -> Self {
        self.header(names::X_APPLE_SESSION_ID, session_id)
    }

    /// Set body as raw bytes
    #[must_use]
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.request.body = body;
        self
    }

    /// Build the request
    #[must_use]
    pub fn build(self) -> HttpRequest {
        self.request
    }
}
