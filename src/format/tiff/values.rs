//! TIFF tag value reading.
//!
//! Values are stored either inline in the IFD entry (when they fit in the
//! 4 or 8 byte value field) or at an offset in the file. [`ValueReader`]
//! hides the difference and decodes every field type into a
//! [`Value`](crate::format::Value).
//!
//! Array values (StripOffsets, TileByteCounts, ColorMap) are fetched with a
//! single range read.

use std::collections::HashSet;

use bytes::Bytes;
use tracing::debug;

use crate::error::TiffError;
use crate::format::directory::{Directory, Entry, Value};
use crate::io::RangeReader;

use super::parser::{ByteOrder, Ifd, IfdEntry, TiffHeader};
use super::tags::{FieldType, TiffTag};

/// Nesting depth accepted for SubIFD/EXIF/GPS directories
const MAX_NESTING: usize = 4;

// =============================================================================
// ValueReader
// =============================================================================

/// Reads tag values from a TIFF file.
///
/// Combines a [`RangeReader`] with the header so values are decoded in the
/// file's byte order and offset width.
pub struct ValueReader<'a, R: RangeReader + ?Sized> {
    reader: &'a R,
    header: &'a TiffHeader,
}

impl<'a, R: RangeReader + ?Sized> ValueReader<'a, R> {
    /// Create a new ValueReader.
    pub fn new(reader: &'a R, header: &'a TiffHeader) -> Self {
        Self { reader, header }
    }

    /// Get the byte order from the header.
    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// Read raw bytes for an IFD entry's value.
    ///
    /// For inline values, returns the bytes from the entry.
    /// For offset values, fetches the bytes from the file.
    pub fn read_bytes(&self, entry: &IfdEntry) -> Result<Bytes, TiffError> {
        let size = entry
            .value_byte_size()
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if entry.is_inline {
            Ok(Bytes::copy_from_slice(
                &entry.value_offset_bytes[..size as usize],
            ))
        } else {
            let offset = entry.value_offset(self.header.byte_order);
            let available = self.reader.size().saturating_sub(offset);
            if size > available {
                return Err(TiffError::InvalidTagValue {
                    tag: tag_name(entry.tag_id),
                    message: format!(
                        "{} bytes at offset {} exceed file size {}",
                        size,
                        offset,
                        self.reader.size()
                    ),
                });
            }
            Ok(self.reader.read_exact_at(offset, size as usize)?)
        }
    }

    /// Read a single unsigned integer (SHORT, LONG, LONG8 or IFD types).
    pub fn read_u64(&self, entry: &IfdEntry) -> Result<u64, TiffError> {
        if let Some(value) = entry.inline_u64(self.header.byte_order) {
            return Ok(value);
        }
        self.read_u64_array(entry)?
            .first()
            .copied()
            .ok_or_else(|| TiffError::InvalidTagValue {
                tag: tag_name(entry.tag_id),
                message: "empty value".to_string(),
            })
    }

    /// Read an unsigned integer array, widening every element to u64.
    pub fn read_u64_array(&self, entry: &IfdEntry) -> Result<Vec<u64>, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;
        if entry.count == 0 {
            return Ok(Vec::new());
        }

        match field_type {
            FieldType::Byte
            | FieldType::Undefined
            | FieldType::Short
            | FieldType::Long
            | FieldType::Ifd
            | FieldType::Long8
            | FieldType::Ifd8 => {}
            other => {
                return Err(TiffError::InvalidTagValue {
                    tag: tag_name(entry.tag_id),
                    message: format!("expected an unsigned integer type, got {:?}", other),
                })
            }
        }

        let bytes = self.read_bytes(entry)?;
        Ok(parse_u64_array(
            &bytes,
            entry.count as usize,
            field_type,
            self.header.byte_order,
        ))
    }

    /// Read a string value (ASCII type), stripping the NUL terminator.
    pub fn read_string(&self, entry: &IfdEntry) -> Result<String, TiffError> {
        let bytes = self.read_bytes(entry)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// Decode an entry of any known field type into a [`Value`].
    pub fn read_value(&self, entry: &IfdEntry) -> Result<Value, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;
        let bo = self.header.byte_order;
        let count = entry.count as usize;

        let bytes = self.read_bytes(entry)?;
        let size = field_type.size_in_bytes();
        let chunks = bytes.chunks_exact(size).take(count);

        let value = match field_type {
            FieldType::Byte => Value::Bytes(bytes.to_vec()),
            FieldType::Undefined => Value::Undefined(bytes.to_vec()),
            FieldType::SByte => Value::SBytes(bytes.iter().map(|&b| b as i8).collect()),
            FieldType::Short => Value::Shorts(chunks.map(|c| bo.read_u16(c)).collect()),
            FieldType::SShort => Value::SShorts(chunks.map(|c| bo.read_u16(c) as i16).collect()),
            FieldType::Long | FieldType::Ifd => {
                Value::Longs(chunks.map(|c| bo.read_u32(c)).collect())
            }
            FieldType::SLong => Value::SLongs(chunks.map(|c| bo.read_u32(c) as i32).collect()),
            FieldType::Long8 | FieldType::Ifd8 => {
                Value::Long8s(chunks.map(|c| bo.read_u64(c)).collect())
            }
            FieldType::SLong8 => Value::SLong8s(chunks.map(|c| bo.read_u64(c) as i64).collect()),
            FieldType::Rational => Value::Rationals(
                chunks
                    .map(|c| (bo.read_u32(&c[0..4]), bo.read_u32(&c[4..8])))
                    .collect(),
            ),
            FieldType::SRational => Value::SRationals(
                chunks
                    .map(|c| (bo.read_u32(&c[0..4]) as i32, bo.read_u32(&c[4..8]) as i32))
                    .collect(),
            ),
            FieldType::Float => Value::Floats(chunks.map(|c| bo.read_f32(c)).collect()),
            FieldType::Double => Value::Doubles(chunks.map(|c| bo.read_f64(c)).collect()),
            FieldType::Ascii => {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                Value::Ascii(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
        };

        Ok(value)
    }

    /// Convert a parsed IFD into a [`Directory`], following SubIFD, EXIF
    /// and GPS pointers into nested directories.
    ///
    /// Entries with unknown field types are skipped.
    pub fn read_directory(&self, ifd: &Ifd) -> Result<Directory, TiffError> {
        let mut visited = HashSet::new();
        visited.insert(ifd.offset);
        self.read_directory_nested(ifd, &mut visited, 0)
    }

    fn read_directory_nested(
        &self,
        ifd: &Ifd,
        visited: &mut HashSet<u64>,
        depth: usize,
    ) -> Result<Directory, TiffError> {
        let mut directory = Directory::new();

        for raw in &ifd.entries {
            if raw.field_type.is_none() {
                debug!(
                    tag = raw.tag_id,
                    field_type = raw.field_type_raw,
                    "Skipping entry with unknown field type"
                );
                continue;
            }

            let value = self.read_value(raw)?;
            let mut entry = Entry::new(raw.tag_id as u32, raw.field_type_raw, raw.count, value);

            let is_pointer = TiffTag::from_u16(raw.tag_id)
                .map(TiffTag::is_sub_directory)
                .unwrap_or(false);
            if is_pointer && depth < MAX_NESTING {
                entry.nested = self.read_sub_directories(&entry.value, visited, depth)?;
            }

            if let Err(rejected) = directory.insert(entry) {
                return Err(TiffError::DuplicateTag {
                    tag: rejected.id as u16,
                    ifd_offset: ifd.offset,
                });
            }
        }

        Ok(directory)
    }

    /// Parse the directories a pointer tag refers to.
    ///
    /// A single pointer yields that directory. Several SubIFD pointers yield
    /// a directory whose entries are numbered 0.. and each hold one nested
    /// directory.
    fn read_sub_directories(
        &self,
        value: &Value,
        visited: &mut HashSet<u64>,
        depth: usize,
    ) -> Result<Option<Directory>, TiffError> {
        let offsets = value.as_u64_vec().unwrap_or_default();
        let mut children = Vec::with_capacity(offsets.len());

        for offset in offsets {
            if offset == 0 || !visited.insert(offset) {
                continue;
            }
            let ifd = Ifd::read(self.reader, self.header, offset)?;
            children.push(self.read_directory_nested(&ifd, visited, depth + 1)?);
        }

        match children.len() {
            0 => Ok(None),
            1 => Ok(children.pop()),
            _ => {
                let mut holder = Directory::new();
                for (index, child) in children.into_iter().enumerate() {
                    let mut entry =
                        Entry::new(index as u32, FieldType::Ifd as u16, 1, Value::Longs(vec![]));
                    entry.nested = Some(child);
                    // Indices are unique, insertion cannot fail
                    let _ = holder.insert(entry);
                }
                Ok(Some(holder))
            }
        }
    }
}

/// Static name for a tag number, used in error messages.
pub(crate) fn tag_name(tag_id: u16) -> &'static str {
    match TiffTag::from_u16(tag_id) {
        Some(TiffTag::StripOffsets) => "StripOffsets",
        Some(TiffTag::StripByteCounts) => "StripByteCounts",
        Some(TiffTag::TileOffsets) => "TileOffsets",
        Some(TiffTag::TileByteCounts) => "TileByteCounts",
        Some(TiffTag::ColorMap) => "ColorMap",
        Some(TiffTag::JpegTables) => "JPEGTables",
        Some(TiffTag::BitsPerSample) => "BitsPerSample",
        Some(TiffTag::SubIfds) => "SubIFDs",
        Some(_) => "known tag",
        None => "unknown",
    }
}

// =============================================================================
// Convenience functions for reading from bytes directly
// =============================================================================

/// Parse an array of unsigned integers from raw bytes, widening to u64.
///
/// Elements that do not fit in `bytes` are dropped.
pub fn parse_u64_array(
    bytes: &[u8],
    count: usize,
    field_type: FieldType,
    byte_order: ByteOrder,
) -> Vec<u64> {
    let size = field_type.size_in_bytes();
    bytes
        .chunks_exact(size)
        .take(count)
        .map(|c| match field_type {
            FieldType::Byte | FieldType::Undefined => c[0] as u64,
            FieldType::Short => byte_order.read_u16(c) as u64,
            FieldType::Long | FieldType::Ifd => byte_order.read_u32(c) as u64,
            _ => byte_order.read_u64(c),
        })
        .collect()
}

/// Parse an array of u32 values from SHORT or LONG raw bytes.
pub fn parse_u32_array(
    bytes: &[u8],
    count: usize,
    field_type: FieldType,
    byte_order: ByteOrder,
) -> Vec<u32> {
    match field_type {
        FieldType::Short | FieldType::Long => parse_u64_array(bytes, count, field_type, byte_order)
            .into_iter()
            .map(|v| v as u32)
            .collect(),
        _ => Vec::new(),
    }
}

// =============================================================================
// Tests
// =============================================================================
