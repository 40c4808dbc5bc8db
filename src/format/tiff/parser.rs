//! TIFF header and IFD parsing.
//!
//! Turns the first bytes of a TIFF or BigTIFF file into a [`TiffHeader`] and
//! walks the chain of Image File Directories it points at. Tag values stay
//! raw here; [`ValueReader`](super::ValueReader) interprets them.
//!
//! ```text
//! classic  "II"|"MM"  42  first IFD u32                      8 bytes
//! BigTIFF  "II"|"MM"  43  offset size 8  pad u16  first IFD u64  16 bytes
//!
//! IFD      count   u16 | u64
//!          entries 12  | 20 bytes: tag u16, type u16, count u32|u64, value 4|8
//!          next    u32 | u64, 0 ends the chain
//! ```

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::TiffError;
use crate::io::{
    read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le, RangeReader,
};

use super::tags::{FieldType, TiffTag};

// =============================================================================
// Constants
// =============================================================================

/// "II"
const MARK_INTEL: [u8; 2] = *b"II";

/// "MM"
const MARK_MOTOROLA: [u8; 2] = *b"MM";

const MAGIC_CLASSIC: u16 = 42;
const MAGIC_BIGTIFF: u16 = 43;

/// Bytes in a classic header
pub const TIFF_HEADER_SIZE: usize = 8;

/// Bytes in a BigTIFF header
pub const BIGTIFF_HEADER_SIZE: usize = 16;

/// Maximum number of IFDs followed along the chain
pub const MAX_IFDS: usize = 100;

// =============================================================================
// ByteOrder
// =============================================================================

/// Endianness declared by the first two header bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// "II"
    LittleEndian,
    /// "MM"
    BigEndian,
}

impl ByteOrder {
    fn from_mark(mark: [u8; 2]) -> Option<Self> {
        match mark {
            MARK_INTEL => Some(ByteOrder::LittleEndian),
            MARK_MOTOROLA => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }

    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => read_u16_le(bytes),
            ByteOrder::BigEndian => read_u16_be(bytes),
        }
    }

    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => read_u32_le(bytes),
            ByteOrder::BigEndian => read_u32_be(bytes),
        }
    }

    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        match self {
            ByteOrder::LittleEndian => read_u64_le(bytes),
            ByteOrder::BigEndian => read_u64_be(bytes),
        }
    }

    #[inline]
    pub fn read_f32(self, bytes: &[u8]) -> f32 {
        f32::from_bits(self.read_u32(bytes))
    }

    #[inline]
    pub fn read_f64(self, bytes: &[u8]) -> f64 {
        f64::from_bits(self.read_u64(bytes))
    }

    /// Whether values in this order match the host layout.
    #[inline]
    pub fn is_native(self) -> bool {
        match self {
            ByteOrder::LittleEndian => cfg!(target_endian = "little"),
            ByteOrder::BigEndian => cfg!(target_endian = "big"),
        }
    }
}

// =============================================================================
// TiffHeader
// =============================================================================

/// Byte order, offset width and first IFD location of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    pub byte_order: ByteOrder,

    /// 64-bit offsets and counts
    pub is_bigtiff: bool,

    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse the 8 (classic) or 16 (BigTIFF) header bytes.
    ///
    /// # Errors
    /// - `FileTooSmall` when `bytes` is shorter than the header it announces
    /// - `InvalidMagic` for a mark other than II or MM
    /// - `InvalidVersion` for a magic number other than 42 or 43
    /// - `InvalidBigTiffOffsetSize` for a BigTIFF offset size other than 8
    /// - `InvalidIfdOffset` when the first IFD starts past `file_size`
    pub fn parse(bytes: &[u8], file_size: u64) -> Result<Self, TiffError> {
        let too_small = |required: usize| TiffError::FileTooSmall {
            required: required as u64,
            actual: bytes.len() as u64,
        };
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(too_small(TIFF_HEADER_SIZE));
        }

        let mark = [bytes[0], bytes[1]];
        let byte_order = ByteOrder::from_mark(mark)
            .ok_or_else(|| TiffError::InvalidMagic(u16::from_le_bytes(mark)))?;

        let (is_bigtiff, first_ifd_offset) = match byte_order.read_u16(&bytes[2..4]) {
            MAGIC_CLASSIC => (false, byte_order.read_u32(&bytes[4..8]) as u64),
            MAGIC_BIGTIFF => {
                if bytes.len() < BIGTIFF_HEADER_SIZE {
                    return Err(too_small(BIGTIFF_HEADER_SIZE));
                }
                let offset_size = byte_order.read_u16(&bytes[4..6]);
                if offset_size != 8 {
                    return Err(TiffError::InvalidBigTiffOffsetSize(offset_size));
                }
                // bytes 6..8 are padding and not checked
                (true, byte_order.read_u64(&bytes[8..16]))
            }
            other => return Err(TiffError::InvalidVersion(other)),
        };

        if first_ifd_offset >= file_size {
            return Err(TiffError::InvalidIfdOffset(first_ifd_offset));
        }

        Ok(TiffHeader {
            byte_order,
            is_bigtiff,
            first_ifd_offset,
        })
    }

    /// Read and parse the header from the start of a byte source.
    pub fn read<R: RangeReader + ?Sized>(reader: &R) -> Result<Self, TiffError> {
        let bytes = reader.read_at_most(0, BIGTIFF_HEADER_SIZE)?;
        Self::parse(&bytes, reader.size())
    }

    /// Bytes per IFD entry: 12, or 20 in BigTIFF.
    #[inline]
    pub const fn ifd_entry_size(&self) -> usize {
        4 + 2 * self.value_offset_size()
    }

    /// Width of the entry count that opens an IFD.
    #[inline]
    pub const fn ifd_count_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            2
        }
    }

    /// Width of the link to the next IFD.
    #[inline]
    pub const fn ifd_next_offset_size(&self) -> usize {
        self.value_offset_size()
    }

    /// Width of an entry's value/offset field, and so the inline limit.
    #[inline]
    pub const fn value_offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }
}

// =============================================================================
// IfdEntry
// =============================================================================

/// One raw IFD entry, value not yet interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdEntry {
    /// Tag number
    pub tag_id: u16,
    /// Decoded field type, `None` when the type number is unknown
    pub field_type: Option<FieldType>,
    /// Field type exactly as stored
    pub field_type_raw: u16,
    /// Number of values
    pub count: u64,
    /// The 4 (8) value/offset bytes of the entry
    pub value_offset_bytes: Vec<u8>,
    /// Whether `value_offset_bytes` holds the value itself
    pub is_inline: bool,
}

impl IfdEntry {
    /// Total value size in bytes, `None` for unknown types or overflow.
    #[inline]
    pub fn value_byte_size(&self) -> Option<u64> {
        let field_type = self.field_type?;
        (field_type.size_in_bytes() as u64).checked_mul(self.count)
    }

    /// Interpret the value/offset field as an offset.
    #[inline]
    pub fn value_offset(&self, byte_order: ByteOrder) -> u64 {
        if self.value_offset_bytes.len() >= 8 {
            byte_order.read_u64(&self.value_offset_bytes)
        } else {
            byte_order.read_u32(&self.value_offset_bytes) as u64
        }
    }

    /// Single inline SHORT or LONG value.
    pub fn inline_u32(&self, byte_order: ByteOrder) -> Option<u32> {
        if !self.is_inline || self.count != 1 {
            return None;
        }
        match self.field_type? {
            FieldType::Short => Some(byte_order.read_u16(&self.value_offset_bytes) as u32),
            FieldType::Long | FieldType::Ifd => Some(byte_order.read_u32(&self.value_offset_bytes)),
            _ => None,
        }
    }

    /// Single inline SHORT, LONG or LONG8 value.
    pub fn inline_u64(&self, byte_order: ByteOrder) -> Option<u64> {
        if !self.is_inline || self.count != 1 {
            return None;
        }
        match self.field_type? {
            FieldType::Long8 | FieldType::Ifd8 => Some(byte_order.read_u64(&self.value_offset_bytes)),
            _ => self.inline_u32(byte_order).map(u64::from),
        }
    }
}

// =============================================================================
// Ifd
// =============================================================================

/// A parsed Image File Directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ifd {
    /// File offset of the entry count field
    pub offset: u64,
    /// Entries in file order
    pub entries: Vec<IfdEntry>,
    /// Tag number -> index into `entries`
    pub entries_by_tag: HashMap<u16, usize>,
    /// Offset of the next IFD, 0 at the end of the chain
    pub next_ifd_offset: u64,
}

impl Ifd {
    /// Find an entry by raw tag number.
    pub fn get_entry(&self, tag_id: u16) -> Option<&IfdEntry> {
        self.entries_by_tag
            .get(&tag_id)
            .and_then(|&index| self.entries.get(index))
    }

    /// Find an entry by known tag.
    pub fn get_entry_by_tag(&self, tag: TiffTag) -> Option<&IfdEntry> {
        self.get_entry(tag.as_u16())
    }

    /// Byte size of an IFD with `entry_count` entries, including the count
    /// and next-offset fields.
    pub fn calculate_size(entry_count: u64, header: &TiffHeader) -> Option<usize> {
        let entries = (entry_count as usize).checked_mul(header.ifd_entry_size())?;
        entries
            .checked_add(header.ifd_count_size())?
            .checked_add(header.ifd_next_offset_size())
    }

    /// Parse an IFD from bytes starting at its entry count field.
    ///
    /// # Errors
    /// - `FileTooSmall` if `bytes` does not hold every entry
    /// - `DuplicateTag` if a tag number repeats
    pub fn parse(bytes: &[u8], offset: u64, header: &TiffHeader) -> Result<Self, TiffError> {
        let byte_order = header.byte_order;
        let count_size = header.ifd_count_size();
        if bytes.len() < count_size {
            return Err(TiffError::FileTooSmall {
                required: count_size as u64,
                actual: bytes.len() as u64,
            });
        }

        let entry_count = if header.is_bigtiff {
            byte_order.read_u64(bytes)
        } else {
            byte_order.read_u16(bytes) as u64
        };

        let required = Self::calculate_size(entry_count, header)
            .ok_or(TiffError::InvalidIfdOffset(offset))?;
        if bytes.len() < required {
            return Err(TiffError::FileTooSmall {
                required: required as u64,
                actual: bytes.len() as u64,
            });
        }

        let entry_size = header.ifd_entry_size();
        let value_size = header.value_offset_size();
        let mut entries_by_tag = HashMap::with_capacity(entry_count as usize);
        let mut entries = Vec::with_capacity(entry_count as usize);

        for i in 0..entry_count as usize {
            let start = count_size + i * entry_size;
            let raw = &bytes[start..start + entry_size];

            let tag_id = byte_order.read_u16(&raw[0..2]);
            if entries_by_tag.insert(tag_id, i).is_some() {
                return Err(TiffError::DuplicateTag {
                    tag: tag_id,
                    ifd_offset: offset,
                });
            }

            let field_type_raw = byte_order.read_u16(&raw[2..4]);
            let field_type = FieldType::from_u16(field_type_raw);
            let (count, value_start) = if header.is_bigtiff {
                (byte_order.read_u64(&raw[4..12]), 12)
            } else {
                (byte_order.read_u32(&raw[4..8]) as u64, 8)
            };
            let is_inline = field_type
                .map(|ft| ft.fits_inline(count, header.is_bigtiff))
                .unwrap_or(false);

            entries.push(IfdEntry {
                tag_id,
                field_type,
                field_type_raw,
                count,
                value_offset_bytes: raw[value_start..value_start + value_size].to_vec(),
                is_inline,
            });
        }

        let next_start = count_size + entry_count as usize * entry_size;
        let next_ifd_offset = if header.is_bigtiff {
            byte_order.read_u64(&bytes[next_start..])
        } else {
            byte_order.read_u32(&bytes[next_start..]) as u64
        };

        Ok(Ifd {
            offset,
            entries,
            entries_by_tag,
            next_ifd_offset,
        })
    }

    /// Read and parse the IFD at `offset`.
    pub fn read<R: RangeReader + ?Sized>(
        reader: &R,
        header: &TiffHeader,
        offset: u64,
    ) -> Result<Self, TiffError> {
        if offset >= reader.size() {
            return Err(TiffError::InvalidIfdOffset(offset));
        }

        // Entry count first, then the whole directory in one read
        let count_bytes = reader.read_exact_at(offset, header.ifd_count_size())?;
        let entry_count = if header.is_bigtiff {
            header.byte_order.read_u64(&count_bytes)
        } else {
            header.byte_order.read_u16(&count_bytes) as u64
        };
        let size =
            Self::calculate_size(entry_count, header).ok_or(TiffError::InvalidIfdOffset(offset))?;
        let bytes = reader.read_exact_at(offset, size)?;

        Self::parse(&bytes, offset, header)
    }
}

/// Follow the IFD chain from the header's first IFD.
///
/// Stops after [`MAX_IFDS`] directories.
///
/// # Errors
/// - `IfdLoop` if a next-IFD offset points at an IFD already visited
/// - any error from [`Ifd::read`]
pub fn parse_all_ifds<R: RangeReader + ?Sized>(
    reader: &R,
    header: &TiffHeader,
) -> Result<Vec<Ifd>, TiffError> {
    let mut ifds = Vec::new();
    let mut visited = HashSet::new();
    let mut offset = header.first_ifd_offset;

    while offset != 0 && ifds.len() < MAX_IFDS {
        if !visited.insert(offset) {
            return Err(TiffError::IfdLoop(offset));
        }
        let ifd = Ifd::read(reader, header, offset)?;
        debug!(
            offset,
            entries = ifd.entries.len(),
            next = ifd.next_ifd_offset,
            "Parsed IFD"
        );
        offset = ifd.next_ifd_offset;
        ifds.push(ifd);
    }

    Ok(ifds)
}

// =============================================================================
// Tests
// =============================================================================
