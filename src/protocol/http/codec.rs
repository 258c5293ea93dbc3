use bytes::{Buf, BytesMut};
use thiserror::Error;

use super::headers::names;
use super::{Headers, HttpResponse, StatusCode};

/// Errors during HTTP parsing
#[derive(Debug, Error)]
pub enum HttpCodecError {
    #[error("invalid start line: {0}")]
    InvalidStartLine(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("invalid content length")]
    InvalidContentLength,

    #[error("unsupported transfer encoding: {0}")]
    UnsupportedTransferEncoding(String),

    #[error("message too large: {size} bytes")]
    MessageTooLarge { size: usize },

    #[error("invalid UTF-8 in message head")]
    InvalidUtf8,
}

/// Sans-IO HTTP codec for parsing responses
///
/// Feed bytes with `feed()`, poll for complete responses with `decode()`.
/// Several pipelined responses can sit in the buffer at once.
pub struct HttpCodec {
    buffer: BytesMut,
    max_size: usize,
    state: ParseState,
}

#[derive(Debug, Clone)]
enum ParseState {
    Head,
    Body {
        status: StatusCode,
        version: String,
        reason: String,
        headers: Headers,
        content_length: usize,
    },
}

impl HttpCodec {
    /// Create a new codec with a 1 MiB message limit
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            max_size: 1024 * 1024,
            state: ParseState::Head,
        }
    }

    /// Set maximum message size
    #[must_use]
    pub fn with_max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    /// Feed bytes into the codec
    ///
    /// # Errors
    ///
    /// Returns `HttpCodecError::MessageTooLarge` if the buffer would exceed the limit.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), HttpCodecError> {
        let size = self.buffer.len() + bytes.len();
        if size > self.max_size {
            return Err(HttpCodecError::MessageTooLarge { size });
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Try to decode a complete response
    ///
    /// Returns `Ok(Some(response))` when one is available and `Ok(None)` if
    /// more data is needed.
    ///
    /// # Errors
    ///
    /// Returns `HttpCodecError` if the response is malformed.
    pub fn decode(&mut self) -> Result<Option<HttpResponse>, HttpCodecError> {
        loop {
            match &self.state {
                ParseState::Head => {
                    let Some(head_end) = self.buffer.windows(4).position(|w| w == b"\r\n\r\n")
                    else {
                        return Ok(None);
                    };

                    let head = std::str::from_utf8(&self.buffer[..head_end])
                        .map_err(|_| HttpCodecError::InvalidUtf8)?;
                    let (status_line, header_block) =
                        head.split_once("\r\n").unwrap_or((head, ""));
                    let (version, status, reason) = Self::parse_status_line(status_line)?;
                    let headers = Headers::parse_block(header_block)?;

                    if let Some(te) = headers.get(names::TRANSFER_ENCODING) {
                        if !te.eq_ignore_ascii_case("identity") {
                            return Err(HttpCodecError::UnsupportedTransferEncoding(
                                te.to_string(),
                            ));
                        }
                    }

                    let content_length = match headers.get(names::CONTENT_LENGTH) {
                        Some(v) => v
                            .trim()
                            .parse::<usize>()
                            .map_err(|_| HttpCodecError::InvalidContentLength)?,
                        None => 0,
                    };
                    if content_length > self.max_size {
                        return Err(HttpCodecError::MessageTooLarge {
                            size: content_length,
                        });
                    }

                    self.buffer.advance(head_end + 4);
                    self.state = ParseState::Body {
                        status,
                        version,
                        reason,
                        headers,
                        content_length,
                    };
                }

                ParseState::Body { content_length, .. } => {
                    let content_length = *content_length;
                    if self.buffer.len() < content_length {
                        return Ok(None);
                    }
                    let body = self.buffer.split_to(content_length).to_vec();
                    if let ParseState::Body {
                        status,
                        version,
                        reason,
                        headers,
                        ..
                    } = std::mem::replace(&mut self.state, ParseState::Head)
                    {
                        return Ok(Some(HttpResponse {
                            version,
                            status,
                            reason,
                            headers,
                            body,
                        }));
                    }
                }
            }
        }
    }

    /// Clear the codec buffer and reset state
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = ParseState::Head;
    }

    /// Get current buffer length
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    fn parse_status_line(line: &str) -> Result<(String, StatusCode, String), HttpCodecError> {
        // Format: "HTTP/1.1 200 OK"
        let mut parts = line.splitn(3, ' ');
        let invalid = || HttpCodecError::InvalidStartLine(line.to_string());

        let version = parts.next().filter(|v| v.starts_with("HTTP/")).ok_or_else(invalid)?;
        let status = parts
            .next()
            .and_then(|s| s.parse::<u16>().ok())
            .filter(|s| (100..1000).contains(s))
            .ok_or_else(invalid)?;
        let reason = parts.next().unwrap_or("").to_string();

        Ok((version.to_string(), StatusCode(status), reason))
    }
}

impl Default for HttpCodec {
    fn default() -> Self {
        Self::new()
    }
}
