//! Property list values exchanged with `AirPlay` receivers
//!
//! Receivers answer `/playback-info` and `/server-info` with XML plists;
//! newer firmware sometimes switches to binary plists. Both are decoded into
//! the same [`PlistValue`] tree. Only XML is ever written.

pub mod binary;
pub mod xml;


use std::collections::BTreeMap;

use thiserror::Error;

/// Errors produced while reading or writing property lists
#[derive(Debug, Error)]
pub enum PlistError {
    #[error("empty document")]
    Empty,

    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("unexpected element <{0}>")]
    UnexpectedElement(String),

    #[error("dictionary value without a key")]
    MissingKey,

    #[error("invalid {kind} value: {value:?}")]
    InvalidValue { kind: &'static str, value: String },

    #[error("invalid magic: expected 'bplist00', got {0:?}")]
    InvalidMagic([u8; 8]),

    #[error("buffer too small: need {needed} bytes, have {have}")]
    BufferTooSmall { needed: usize, have: usize },

    #[error("invalid trailer")]
    InvalidTrailer,

    #[error("invalid object type marker: 0x{0:02x}")]
    InvalidObjectMarker(u8),

    #[error("invalid offset: {0}")]
    InvalidOffset(u64),

    #[error("string is not valid UTF-8/UTF-16")]
    InvalidUtf8,

    #[error("circular or too deeply nested reference")]
    CircularReference,

    #[error("object references expand past the decode limit")]
    TooManyObjects,
}

/// A property list value
#[derive(Debug, Clone, PartialEq)]
pub enum PlistValue {
    /// Boolean value
    Boolean(bool),
    /// Signed integer
    Integer(i64),
    /// Floating point number
    Real(f64),
    /// UTF-8 string
    String(String),
    /// Binary data
    Data(Vec<u8>),
    /// Date as seconds since 2001-01-01 00:00:00 UTC
    Date(f64),
    /// Array of values
    Array(Vec<PlistValue>),
    /// Dictionary, keys kept sorted so encoding is deterministic
    Dictionary(BTreeMap<String, PlistValue>),
}

impl PlistValue {
    /// Try to get as boolean
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PlistValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PlistValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as f64; integers are widened
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PlistValue::Real(f) => Some(*f),
            #[allow(clippy::cast_precision_loss)]
            PlistValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as string reference
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PlistValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as byte slice
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PlistValue::Data(d) => Some(d),
            _ => None,
        }
    }

    /// Try to get as array reference
    #[must_use]
    pub fn as_array(&self) -> Option<&[PlistValue]> {
        match self {
            PlistValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Try to get as dictionary reference
    #[must_use]
    pub fn as_dict(&self) -> Option<&BTreeMap<String, PlistValue>> {
        match self {
            PlistValue::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// Look up a key when this value is a dictionary
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PlistValue> {
        self.as_dict()?.get(key)
    }
}

impl From<bool> for PlistValue {
    fn from(v: bool) -> Self {
        PlistValue::Boolean(v)
    }
}

impl From<i32> for PlistValue {
    fn from(v: i32) -> Self {
        PlistValue::Integer(i64::from(v))
    }
}

impl From<i64> for PlistValue {
    fn from(v: i64) -> Self {
        PlistValue::Integer(v)
    }
}

impl From<f64> for PlistValue {
    fn from(v: f64) -> Self {
        PlistValue::Real(v)
    }
}

impl From<String> for PlistValue {
    fn from(v: String) -> Self {
        PlistValue::String(v)
    }
}

impl From<&str> for PlistValue {
    fn from(v: &str) -> Self {
        PlistValue::String(v.to_string())
    }
}

impl From<Vec<u8>> for PlistValue {
    fn from(v: Vec<u8>) -> Self {
        PlistValue::Data(v)
    }
}

impl From<Vec<PlistValue>> for PlistValue {
    fn from(v: Vec<PlistValue>) -> Self {
        PlistValue::Array(v)
    }
}

/// Builder for creating plist dictionaries
#[derive(Debug, Default)]
pub struct DictBuilder {
    map: BTreeMap<String, PlistValue>,
}

impl DictBuilder {
    /// Create a new dictionary builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key-value pair
    #[must_use]
    pub fn insert(mut self, key: impl Into<String>, value: impl Into<PlistValue>) -> Self {
        self.map.insert(key.into(), value.into());
        self
    }

    /// Insert if value is Some
    #[must_use]
    pub fn insert_opt<V: Into<PlistValue>>(
        mut self,
        key: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        if let Some(v) = value {
            self.map.insert(key.into(), v.into());
        }
        self
    }

    /// Build the dictionary
    #[must_use]
    pub fn build(self) -> PlistValue {
        PlistValue::Dictionary(self.map)
    }
}

/// Convenience macro for creating plist dictionaries
#[macro_export]
macro_rules! plist_dict {
    ($($key:expr => $value:expr),* $(,)?) => {
        $crate::protocol::plist::DictBuilder::new()
            $(.insert($key, $value))*
            .build()
    };
}

/// Decode a property list, choosing the binary or XML reader by its prefix
///
/// # Errors
///
/// Returns `PlistError` if the data is neither a valid binary nor XML plist.
pub fn decode(data: &[u8]) -> Result<PlistValue, PlistError> {
    if data.starts_with(binary::MAGIC) {
        binary::decode(data)
    } else {
        xml::decode(data)
    }
}
