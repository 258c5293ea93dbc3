//! XML property list reader and writer

use std::collections::BTreeMap;
use std::fmt::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use quick_xml::Reader;
use quick_xml::events::Event;

use super::{PlistError, PlistValue};

const HEADER: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
    "<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" ",
    "\"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n",
    "<plist version=\"1.0\">\n",
);

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z
const APPLE_EPOCH_OFFSET: i64 = 978_307_200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leaf {
    Key,
    String,
    Integer,
    Real,
    Date,
    Data,
    True,
    False,
}

impl Leaf {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        Some(match tag {
            b"key" => Leaf::Key,
            b"string" => Leaf::String,
            b"integer" => Leaf::Integer,
            b"real" => Leaf::Real,
            b"date" => Leaf::Date,
            b"data" => Leaf::Data,
            b"true" => Leaf::True,
            b"false" => Leaf::False,
            _ => return None,
        })
    }
}

enum Frame {
    Array(Vec<PlistValue>),
    Dict {
        map: BTreeMap<String, PlistValue>,
        key: Option<String>,
    },
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Frame>,
    root: Option<PlistValue>,
}

impl TreeBuilder {
    fn push_value(&mut self, value: PlistValue) -> Result<(), PlistError> {
        match self.stack.last_mut() {
            None => {
                if self.root.is_some() {
                    return Err(PlistError::Xml("more than one root value".to_string()));
                }
                self.root = Some(value);
            }
            Some(Frame::Array(items)) => items.push(value),
            Some(Frame::Dict { map, key }) => {
                let key = key.take().ok_or(PlistError::MissingKey)?;
                map.insert(key, value);
            }
        }
        Ok(())
    }

    fn set_key(&mut self, text: String) -> Result<(), PlistError> {
        match self.stack.last_mut() {
            Some(Frame::Dict { key, .. }) if key.is_none() => {
                *key = Some(text);
                Ok(())
            }
            _ => Err(PlistError::UnexpectedElement("key".to_string())),
        }
    }

    fn close(&mut self, tag: &[u8]) -> Result<(), PlistError> {
        let value = match (tag, self.stack.pop()) {
            (b"array", Some(Frame::Array(items))) => PlistValue::Array(items),
            (b"dict", Some(Frame::Dict { map, key: None })) => PlistValue::Dictionary(map),
            (b"dict", Some(Frame::Dict { .. })) => return Err(PlistError::MissingKey),
            _ => {
                return Err(PlistError::UnexpectedElement(
                    String::from_utf8_lossy(tag).into_owned(),
                ));
            }
        };
        self.push_value(value)
    }
}

/// Decode an XML property list
///
/// # Errors
///
/// Returns `PlistError` on malformed XML, unknown elements, or values that do
/// not parse as their declared type.
pub fn decode(data: &[u8]) -> Result<PlistValue, PlistError> {
    let mut reader = Reader::from_reader(data);
    let mut buf = Vec::new();
    let mut tree = TreeBuilder::default();
    let mut leaf: Option<Leaf> = None;
    let mut text = String::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| PlistError::Xml(e.to_string()))?;
        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"plist" => {}
                b"array" => tree.stack.push(Frame::Array(Vec::new())),
                b"dict" => tree.stack.push(Frame::Dict {
                    map: BTreeMap::new(),
                    key: None,
                }),
                other => {
                    leaf = Some(Leaf::from_tag(other).ok_or_else(|| {
                        PlistError::UnexpectedElement(String::from_utf8_lossy(other).into_owned())
                    })?);
                    text.clear();
                }
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"plist" => {}
                b"array" => tree.push_value(PlistValue::Array(Vec::new()))?,
                b"dict" => tree.push_value(PlistValue::Dictionary(BTreeMap::new()))?,
                other => {
                    let kind = Leaf::from_tag(other).ok_or_else(|| {
                        PlistError::UnexpectedElement(String::from_utf8_lossy(other).into_owned())
                    })?;
                    finish_leaf(&mut tree, kind, "")?;
                }
            },
            Event::Text(e) if leaf.is_some() => {
                let unescaped = e.unescape().map_err(|e| PlistError::Xml(e.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::CData(e) if leaf.is_some() => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Event::End(e) => match e.name().as_ref() {
                b"plist" => {}
                b"array" | b"dict" => tree.close(e.name().as_ref())?,
                other => {
                    let kind = leaf.take().ok_or_else(|| {
                        PlistError::UnexpectedElement(String::from_utf8_lossy(other).into_owned())
                    })?;
                    finish_leaf(&mut tree, kind, &text)?;
                    text.clear();
                }
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !tree.stack.is_empty() {
        return Err(PlistError::Xml("unclosed container".to_string()));
    }
    tree.root.ok_or(PlistError::Empty)
}

fn finish_leaf(tree: &mut TreeBuilder, kind: Leaf, text: &str) -> Result<(), PlistError> {
    let invalid = |kind: &'static str| PlistError::InvalidValue {
        kind,
        value: text.to_string(),
    };
    let value = match kind {
        Leaf::Key => return tree.set_key(text.to_string()),
        Leaf::String => PlistValue::String(text.to_string()),
        Leaf::Integer => PlistValue::Integer(text.trim().parse().map_err(|_| invalid("integer"))?),
        Leaf::Real => PlistValue::Real(text.trim().parse().map_err(|_| invalid("real"))?),
        Leaf::Date => PlistValue::Date(parse_date(text.trim()).ok_or_else(|| invalid("date"))?),
        Leaf::Data => {
            let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            PlistValue::Data(BASE64.decode(compact).map_err(|_| invalid("data"))?)
        }
        Leaf::True => PlistValue::Boolean(true),
        Leaf::False => PlistValue::Boolean(false),
    };
    tree.push_value(value)
}

/// Parse `YYYY-MM-DDTHH:MM:SSZ` into seconds since the Apple epoch
fn parse_date(s: &str) -> Option<f64> {
    let s = s.strip_suffix('Z')?;
    let (date, time) = s.split_once('T')?;
    let mut d = date.splitn(3, '-').map(str::parse::<i64>);
    let (year, month, day) = (d.next()?.ok()?, d.next()?.ok()?, d.next()?.ok()?);
    let mut t = time.splitn(3, ':').map(str::parse::<i64>);
    let (hour, minute, second) = (t.next()?.ok()?, t.next()?.ok()?, t.next()?.ok()?);
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) || hour > 23 || minute > 59 {
        return None;
    }

    // Days from civil, proleptic Gregorian
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    let days = era * 146_097 + doe - 719_468;

    let unix = days * 86_400 + hour * 3_600 + minute * 60 + second;
    #[allow(clippy::cast_precision_loss)]
    Some((unix - APPLE_EPOCH_OFFSET) as f64)
}

fn format_date(apple_secs: f64) -> String {
    #[allow(clippy::cast_possible_truncation)]
    let unix = apple_secs.floor() as i64 + APPLE_EPOCH_OFFSET;
    let days = unix.div_euclid(86_400);
    let secs = unix.rem_euclid(86_400);

    // Civil from days
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);

    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}Z",
        secs / 3_600,
        secs % 3_600 / 60,
        secs % 60
    )
}

/// Encode a value as an XML property list document
#[must_use]
pub fn encode(value: &PlistValue) -> Vec<u8> {
    let mut out = String::from(HEADER);
    write_value(&mut out, value, 0);
    out.push_str("</plist>\n");
    out.into_bytes()
}

fn write_value(out: &mut String, value: &PlistValue, depth: usize) {
    let indent = "\t".repeat(depth);
    match value {
        PlistValue::Boolean(true) => {
            let _ = writeln!(out, "{indent}<true/>");
        }
        PlistValue::Boolean(false) => {
            let _ = writeln!(out, "{indent}<false/>");
        }
        PlistValue::Integer(i) => {
            let _ = writeln!(out, "{indent}<integer>{i}</integer>");
        }
        PlistValue::Real(f) => {
            let _ = writeln!(out, "{indent}<real>{f:?}</real>");
        }
        PlistValue::String(s) => {
            let _ = writeln!(out, "{indent}<string>{}</string>", quick_xml::escape::escape(s.as_str()));
        }
        PlistValue::Data(d) => {
            let _ = writeln!(out, "{indent}<data>{}</data>", BASE64.encode(d));
        }
        PlistValue::Date(secs) => {
            let _ = writeln!(out, "{indent}<date>{}</date>", format_date(*secs));
        }
        PlistValue::Array(items) => {
            let _ = writeln!(out, "{indent}<array>");
            for item in items {
                write_value(out, item, depth + 1);
            }
            let _ = writeln!(out, "{indent}</array>");
        }
        PlistValue::Dictionary(map) => {
            let _ = writeln!(out, "{indent}<dict>");
            for (key, item) in map {
                let _ = writeln!(
                    out,
                    "{indent}\t<key>{}</key>",
                    quick_xml::escape::escape(key.as_str())
                );
                write_value(out, item, depth + 1);
            }
            let _ = writeln!(out, "{indent}</dict>");
        }
    }
}
