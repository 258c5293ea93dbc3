/// Well-known header names used when talking to `AirPlay` receivers
pub mod names {
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const CONTENT_LENGTH: &str = "Content-Length";
    pub const CONNECTION: &str = "Connection";
    pub const HOST: &str = "Host";
    pub const SERVER: &str = "Server";
    pub const TRANSFER_ENCODING: &str = "Transfer-Encoding";
    pub const USER_AGENT: &str = "User-Agent";
    pub const X_APPLE_SESSION_ID: &str = "X-Apple-Session-ID";
    pub const X_APPLE_DEVICE_ID: &str = "X-Apple-Device-ID";
}

/// Content types spoken by the video endpoints
pub mod content_types {
    pub const TEXT_PARAMETERS: &str = "text/parameters";
    pub const XML_PLIST: &str = "text/x-apple-plist+xml";
    pub const BINARY_PLIST: &str = "application/x-apple-binary-plist";
}

/// HTTP header collection
///
/// Lookups are case-insensitive. Insertion order is kept so encoded messages
/// are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    inner: Vec<(String, String)>,
}

impl Headers {
    /// Create empty headers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any existing value with the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self
            .inner
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            *slot = (name, value);
        } else {
            self.inner.push((name, value));
        }
    }

    /// Remove a header, returning its value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self
            .inner
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.inner.remove(pos).1)
    }

    /// Get header value (case-insensitive)
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Check if header exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get Content-Length value
    #[must_use]
    pub fn content_length(&self) -> Option<usize> {
        self.get(names::CONTENT_LENGTH)?.trim().parse().ok()
    }

    /// Get Content-Type value
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.get(names::CONTENT_TYPE)
    }

    /// Get the `AirPlay` session id
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.get(names::X_APPLE_SESSION_ID)
    }

    /// Whether the peer asked to close the connection after this message
    #[must_use]
    pub fn wants_close(&self) -> bool {
        self.get(names::CONNECTION)
            .is_some_and(|v| v.eq_ignore_ascii_case("close"))
    }

    /// Iterate over all headers in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        for (name, value) in &self.inner {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
    }

    /// Parse a header block (lines separated by CRLF, without the blank line)
    pub(crate) fn parse_block(block: &str) -> Result<Self, super::HttpCodecError> {
        let mut headers = Headers::new();
        for line in block.split("\r\n") {
            if line.is_empty() {
                continue;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| super::HttpCodecError::InvalidHeader(line.to_string()))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(super::HttpCodecError::InvalidHeader(line.to_string()));
            }
            headers.insert(name, value.trim());
        }
        Ok(headers)
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}
