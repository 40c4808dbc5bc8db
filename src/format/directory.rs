//! Generic tag directory shared by the IFF and TIFF parsers.
//!
//! Both container walkers reduce their on-disk structure to the same shape:
//! an ordered list of entries keyed by a numeric id. TIFF uses the tag
//! number, IFF packs the chunk FourCC big-endian into a `u32`.
//!
//! ```text
//! Directory
//!   ├── Entry { id: 256, type: SHORT, count: 1, value: Shorts([640]) }
//!   ├── Entry { id: 273, type: LONG,  count: 4, value: Longs([...]) }
//!   └── Entry { id: 34665, ..., nested: Some(Directory { ... }) }
//! ```
//!
//! Each id appears at most once; [`Directory::insert`] rejects duplicates
//! and the caller decides which structural error to raise.

use serde::Serialize;

// =============================================================================
// Value
// =============================================================================

/// A decoded tag or chunk value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values")]
pub enum Value {
    Bytes(Vec<u8>),
    Ascii(String),
    Shorts(Vec<u16>),
    Longs(Vec<u32>),
    Long8s(Vec<u64>),
    Rationals(Vec<(u32, u32)>),
    SBytes(Vec<i8>),
    SShorts(Vec<i16>),
    SLongs(Vec<i32>),
    SLong8s(Vec<i64>),
    SRationals(Vec<(i32, i32)>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
    Undefined(Vec<u8>),
}

impl Value {
    /// Number of elements held.
    pub fn len(&self) -> usize {
        match self {
            Value::Bytes(v) | Value::Undefined(v) => v.len(),
            Value::Ascii(s) => s.len(),
            Value::Shorts(v) => v.len(),
            Value::Longs(v) => v.len(),
            Value::Long8s(v) => v.len(),
            Value::Rationals(v) => v.len(),
            Value::SBytes(v) => v.len(),
            Value::SShorts(v) => v.len(),
            Value::SLongs(v) => v.len(),
            Value::SLong8s(v) => v.len(),
            Value::SRationals(v) => v.len(),
            Value::Floats(v) => v.len(),
            Value::Doubles(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unsigned integer view of the value.
    ///
    /// Only unsigned integer variants convert; everything else is `None`.
    pub fn as_u64_vec(&self) -> Option<Vec<u64>> {
        match self {
            Value::Bytes(v) | Value::Undefined(v) => Some(v.iter().map(|&x| x as u64).collect()),
            Value::Shorts(v) => Some(v.iter().map(|&x| x as u64).collect()),
            Value::Longs(v) => Some(v.iter().map(|&x| x as u64).collect()),
            Value::Long8s(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// First element as an unsigned integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Bytes(v) | Value::Undefined(v) => v.first().map(|&x| x as u64),
            Value::Shorts(v) => v.first().map(|&x| x as u64),
            Value::Longs(v) => v.first().map(|&x| x as u64),
            Value::Long8s(v) => v.first().copied(),
            _ => None,
        }
    }

    /// Floating point view, accepting integers, rationals and floats.
    pub fn as_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            Value::Rationals(v) => Some(
                v.iter()
                    .map(|&(n, d)| if d == 0 { 0.0 } else { n as f64 / d as f64 })
                    .collect(),
            ),
            Value::SRationals(v) => Some(
                v.iter()
                    .map(|&(n, d)| if d == 0 { 0.0 } else { n as f64 / d as f64 })
                    .collect(),
            ),
            Value::Floats(v) => Some(v.iter().map(|&x| x as f64).collect()),
            Value::Doubles(v) => Some(v.clone()),
            other => other
                .as_u64_vec()
                .map(|v| v.into_iter().map(|x| x as f64).collect()),
        }
    }

    /// Raw byte view of byte-like values.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) | Value::Undefined(v) => Some(v),
            Value::Ascii(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Ascii(s) => Some(s),
            _ => None,
        }
    }
}

// =============================================================================
// Entry / Directory
// =============================================================================

/// One tag (TIFF) or chunk (IFF).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    /// Tag number, or FourCC packed big-endian
    pub id: u32,
    /// Raw TIFF field type (0 for IFF chunks)
    pub field_type: u16,
    /// Element count as stored in the container
    pub count: u64,
    pub value: Value,
    /// Sub-directory for SubIFD, EXIF and GPS pointers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nested: Option<Directory>,
}

impl Entry {
    pub fn new(id: u32, field_type: u16, count: u64, value: Value) -> Self {
        Self {
            id,
            field_type,
            count,
            value,
            nested: None,
        }
    }
}

/// Ordered id -> entry mapping with at most one entry per id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Directory {
    entries: Vec<Entry>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, keeping insertion order.
    ///
    /// # Errors
    /// Returns the rejected entry if its id is already present.
    pub fn insert(&mut self, entry: Entry) -> Result<(), Entry> {
        if self.contains(entry.id) {
            return Err(entry);
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    pub fn value(&self, id: u32) -> Option<&Value> {
        self.get(id).map(|e| &e.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// FourCC helpers
// =============================================================================

/// Pack a four-character code big-endian into a directory id.
#[inline]
pub const fn fourcc(code: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*code)
}

/// Render a packed FourCC for messages, replacing non-printable bytes.
pub fn fourcc_to_string(id: u32) -> String {
    id.to_be_bytes()
        .iter()
        .map(|&b| {
            if (0x20..0x7F).contains(&b) {
                b as char
            } else {
                '?'
            }
        })
        .collect()
}
