//! Binary property list (`bplist00`) reader

use std::cell::Cell;
use std::collections::BTreeMap;

use super::{PlistError, PlistValue};

/// Magic prefix of binary plists
pub const MAGIC: &[u8] = b"bplist00";

const TRAILER_LEN: usize = 32;
const MAX_DEPTH: usize = 64;
const MIN_VISITS: usize = 1024;
const MAX_VISITS: usize = 65_536;

struct Trailer {
    offset_size: usize,
    ref_size: usize,
    num_objects: usize,
    root: usize,
    offset_table: usize,
}

impl Trailer {
    fn parse(data: &[u8]) -> Result<Self, PlistError> {
        if data.len() < MAGIC.len() + TRAILER_LEN {
            return Err(PlistError::BufferTooSmall {
                needed: MAGIC.len() + TRAILER_LEN,
                have: data.len(),
            });
        }
        let t = &data[data.len() - TRAILER_LEN..];
        let word = |range: std::ops::Range<usize>| -> Result<usize, PlistError> {
            let v = be_uint(&t[range]);
            usize::try_from(v).map_err(|_| PlistError::InvalidTrailer)
        };
        let trailer = Self {
            offset_size: usize::from(t[6]),
            ref_size: usize::from(t[7]),
            num_objects: word(8..16)?,
            root: word(16..24)?,
            offset_table: word(24..32)?,
        };

        let table_len = trailer
            .num_objects
            .checked_mul(trailer.offset_size)
            .ok_or(PlistError::InvalidTrailer)?;
        if !(1..=8).contains(&trailer.offset_size)
            || !(1..=8).contains(&trailer.ref_size)
            || trailer.root >= trailer.num_objects
            || trailer.offset_table.saturating_add(table_len) > data.len() - TRAILER_LEN
        {
            return Err(PlistError::InvalidTrailer);
        }
        Ok(trailer)
    }
}

fn be_uint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
}

/// Decode binary plist data
///
/// # Errors
///
/// Returns `PlistError` if the magic, trailer, offsets or object encodings are invalid.
pub fn decode(data: &[u8]) -> Result<PlistValue, PlistError> {
    if data.len() < MAGIC.len() {
        return Err(PlistError::BufferTooSmall {
            needed: MAGIC.len(),
            have: data.len(),
        });
    }
    if &data[..MAGIC.len()] != MAGIC {
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&data[..8]);
        return Err(PlistError::InvalidMagic(magic));
    }

    let trailer = Trailer::parse(data)?;
    let offsets = (0..trailer.num_objects)
        .map(|i| {
            let start = trailer.offset_table + i * trailer.offset_size;
            be_uint(&data[start..start + trailer.offset_size])
        })
        .collect();

    // Shared references make the decoded tree larger than the object table
    let reader = ObjectReader {
        data,
        offsets,
        ref_size: trailer.ref_size,
        objects_end: data.len() - TRAILER_LEN,
        visits_left: Cell::new(
            trailer
                .num_objects
                .saturating_mul(8)
                .clamp(MIN_VISITS, MAX_VISITS),
        ),
    };
    let mut path = Vec::new();
    reader.read(trailer.root, &mut path)
}

struct ObjectReader<'a> {
    data: &'a [u8],
    offsets: Vec<u64>,
    ref_size: usize,
    objects_end: usize,
    visits_left: Cell<usize>,
}

impl ObjectReader<'_> {
    fn slice(&self, start: usize, len: usize) -> Result<&[u8], PlistError> {
        let end = start.checked_add(len).ok_or(PlistError::InvalidOffset(start as u64))?;
        if end > self.objects_end {
            return Err(PlistError::BufferTooSmall {
                needed: end,
                have: self.objects_end,
            });
        }
        Ok(&self.data[start..end])
    }

    /// Read the length nibble, following an extended integer when it is 0xF
    fn length(&self, marker: u8, pos: usize) -> Result<(usize, usize), PlistError> {
        let nibble = marker & 0x0F;
        if nibble != 0x0F {
            return Ok((usize::from(nibble), pos + 1));
        }
        let int_marker = self.slice(pos + 1, 1)?[0];
        if int_marker & 0xF0 != 0x10 {
            return Err(PlistError::InvalidObjectMarker(int_marker));
        }
        let width = 1usize << (int_marker & 0x0F);
        let value = be_uint(self.slice(pos + 2, width)?);
        let len = usize::try_from(value).map_err(|_| PlistError::InvalidOffset(value))?;
        Ok((len, pos + 2 + width))
    }

    fn refs(&self, start: usize, count: usize) -> Result<Vec<usize>, PlistError> {
        let bytes = self.slice(start, count.saturating_mul(self.ref_size))?;
        bytes
            .chunks(self.ref_size)
            .map(|chunk| {
                let r = be_uint(chunk);
                usize::try_from(r).map_err(|_| PlistError::InvalidOffset(r))
            })
            .collect()
    }

    fn read(&self, index: usize, path: &mut Vec<usize>) -> Result<PlistValue, PlistError> {
        if path.contains(&index) || path.len() >= MAX_DEPTH {
            return Err(PlistError::CircularReference);
        }
        let Some(left) = self.visits_left.get().checked_sub(1) else {
            return Err(PlistError::TooManyObjects);
        };
        self.visits_left.set(left);
        let offset = *self
            .offsets
            .get(index)
            .ok_or(PlistError::InvalidOffset(index as u64))?;
        let pos = usize::try_from(offset).map_err(|_| PlistError::InvalidOffset(offset))?;
        let marker = self.slice(pos, 1)?[0];

        path.push(index);
        let value = self.read_object(marker, pos, path);
        path.pop();
        value
    }

    fn read_object(
        &self,
        marker: u8,
        pos: usize,
        path: &mut Vec<usize>,
    ) -> Result<PlistValue, PlistError> {
        match marker >> 4 {
            0x0 => match marker {
                0x08 => Ok(PlistValue::Boolean(false)),
                0x09 => Ok(PlistValue::Boolean(true)),
                _ => Err(PlistError::InvalidObjectMarker(marker)),
            },
            0x1 => {
                let width = 1usize << (marker & 0x0F);
                let bytes = self.slice(pos + 1, width)?;
                // 16-byte integers carry the value in their low 8 bytes
                let low = &bytes[width.saturating_sub(8)..];
                #[allow(clippy::cast_possible_wrap)]
                let value = be_uint(low) as i64;
                Ok(PlistValue::Integer(value))
            }
            0x2 => match marker & 0x0F {
                2 => {
                    let b = self.slice(pos + 1, 4)?;
                    Ok(PlistValue::Real(f64::from(f32::from_be_bytes([b[0], b[1], b[2], b[3]]))))
                }
                3 => Ok(PlistValue::Real(self.read_f64(pos + 1)?)),
                _ => Err(PlistError::InvalidObjectMarker(marker)),
            },
            0x3 if marker == 0x33 => Ok(PlistValue::Date(self.read_f64(pos + 1)?)),
            0x4 => {
                let (len, start) = self.length(marker, pos)?;
                Ok(PlistValue::Data(self.slice(start, len)?.to_vec()))
            }
            0x5 => {
                let (len, start) = self.length(marker, pos)?;
                let s = std::str::from_utf8(self.slice(start, len)?)
                    .map_err(|_| PlistError::InvalidUtf8)?;
                Ok(PlistValue::String(s.to_string()))
            }
            0x6 => {
                let (len, start) = self.length(marker, pos)?;
                let units: Vec<u16> = self
                    .slice(start, len.saturating_mul(2))?
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                let s = String::from_utf16(&units).map_err(|_| PlistError::InvalidUtf8)?;
                Ok(PlistValue::String(s))
            }
            0x8 => {
                let width = usize::from(marker & 0x0F) + 1;
                #[allow(clippy::cast_possible_wrap)]
                let uid = be_uint(self.slice(pos + 1, width.min(8))?) as i64;
                Ok(PlistValue::Integer(uid))
            }
            0xA => {
                let (count, start) = self.length(marker, pos)?;
                let items = self
                    .refs(start, count)?
                    .into_iter()
                    .map(|r| self.read(r, path))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(PlistValue::Array(items))
            }
            0xD => {
                let (count, start) = self.length(marker, pos)?;
                let key_refs = self.refs(start, count)?;
                let value_refs = self.refs(start.saturating_add(count.saturating_mul(self.ref_size)), count)?;
                let mut map = BTreeMap::new();
                for (k, v) in key_refs.into_iter().zip(value_refs) {
                    let PlistValue::String(key) = self.read(k, path)? else {
                        return Err(PlistError::InvalidValue {
                            kind: "dictionary key",
                            value: format!("object {k}"),
                        });
                    };
                    map.insert(key, self.read(v, path)?);
                }
                Ok(PlistValue::Dictionary(map))
            }
            _ => Err(PlistError::InvalidObjectMarker(marker)),
        }
    }

    fn read_f64(&self, pos: usize) -> Result<f64, PlistError> {
        let b = self.slice(pos, 8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(f64::from_be_bytes(arr))
    }
}
