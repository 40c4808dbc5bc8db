//! PCHG, SHAM and CTBL chunk parsing.
//!
//! ## PCHG
//! ```text
//! Header (20 bytes):
//!   compression u16   0 none, 1 Huffman
//!   flags u16         1 = SmallLineChanges, 2 = BigLineChanges, 4 = alpha
//!   start_line i16    may be negative
//!   line_count u16
//!   changed_lines u16
//!   min_reg u16, max_reg u16, max_changes u16
//!   total_changes u32
//! Line mask: 4 * ceil(line_count / 32) bytes, MSB first, one bit per line
//! Per marked line:
//!   small: count16 u8, count32 u8, then u16 0xRRGB words
//!          (register = top nibble, +16 for the count32 group)
//!   big:   count u16, then { register u16, alpha u8, r u8, b u8, g u8 }
//! ```
//!
//! ## SHAM
//! `version u16`, then one palette of 16 `0x0RGB` words per line.
//!
//! ## CTBL
//! One palette of 16 or 32 `0x0RGB` words per line.

use tracing::{debug, warn};

use crate::error::{IffError, Warning};
use crate::io::{read_i16_be, read_u16_be, read_u32_be};
use crate::palette::{MultiPalette, MultiPaletteKind, PaletteChange, Rgba};

/// PCHG header length
const PCHG_HEADER_LENGTH: usize = 20;

const PCHG_COMP_NONE: u16 = 0;
const PCHG_COMP_HUFFMAN: u16 = 1;

const PCHGF_12BIT: u16 = 1;
const PCHGF_32BIT: u16 = 2;
const PCHGF_USE_ALPHA: u16 = 4;

/// Registers in one SHAM palette
const SHAM_COLORS: usize = 16;

/// Parsed PCHG header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PchgHeader {
    compression: u16,
    flags: u16,
    start_line: i16,
    line_count: u16,
    changed_lines: u16,
    total_changes: u32,
}

impl PchgHeader {
    fn parse(data: &[u8]) -> Result<Self, IffError> {
        if data.len() < PCHG_HEADER_LENGTH {
            return Err(IffError::InvalidChunkLength {
                chunk: "PCHG",
                length: data.len() as u32,
                expected: PCHG_HEADER_LENGTH as u32,
            });
        }
        Ok(Self {
            compression: read_u16_be(&data[0..]),
            flags: read_u16_be(&data[2..]),
            start_line: read_i16_be(&data[4..]),
            line_count: read_u16_be(&data[6..]),
            changed_lines: read_u16_be(&data[8..]),
            total_changes: read_u32_be(&data[16..]),
        })
    }
}

/// Sequential reader over the change structures.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], IffError> {
        let end = self.pos + len;
        let bytes = self.data.get(self.pos..end).ok_or_else(|| IffError::InvalidChunk {
            chunk: "PCHG",
            message: format!(
                "insufficient data in line changes: need {} bytes at {}, have {}",
                len,
                self.pos,
                self.data.len()
            ),
        })?;
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, IffError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, IffError> {
        Ok(read_u16_be(self.take(2)?))
    }
}

/// Parse a PCHG payload.
///
/// # Errors
/// - `Unsupported` for Huffman compression and BigLineChanges with alpha
/// - `InvalidChunk` for a missing 12/32 bit flag or truncated change data
///
/// A disagreement with the header's `total_changes` is returned as a warning.
pub fn parse_pchg(data: &[u8]) -> Result<(MultiPalette, Option<Warning>), IffError> {
    let header = PchgHeader::parse(data)?;

    match header.compression {
        PCHG_COMP_NONE => {}
        PCHG_COMP_HUFFMAN => {
            return Err(IffError::Unsupported {
                chunk: "PCHG",
                feature: "Huffman compression".to_string(),
            })
        }
        other => {
            return Err(IffError::Unsupported {
                chunk: "PCHG",
                feature: format!("compression {}", other),
            })
        }
    }

    let small = if header.flags & PCHGF_12BIT != 0 {
        true
    } else if header.flags & PCHGF_32BIT != 0 {
        if header.flags & PCHGF_USE_ALPHA != 0 {
            return Err(IffError::Unsupported {
                chunk: "PCHG",
                feature: "BigLineChanges with alpha".to_string(),
            });
        }
        false
    } else {
        return Err(IffError::InvalidChunk {
            chunk: "PCHG",
            message: "missing 12/32 bit flag".to_string(),
        });
    };

    let body = &data[PCHG_HEADER_LENGTH..];
    let mask_len = 4 * (header.line_count as usize).div_ceil(32);
    if body.len() < mask_len {
        return Err(IffError::InvalidChunk {
            chunk: "PCHG",
            message: format!("insufficient data in line mask: {} of {} bytes", body.len(), mask_len),
        });
    }
    let (mask, changes) = body.split_at(mask_len);
    let mut cursor = Cursor {
        data: changes,
        pos: 0,
    };

    let end_line = (header.start_line as i32 + header.line_count as i32).max(0) as usize;
    let mut lines = vec![Vec::new(); end_line];
    let mut initial = Vec::new();
    let mut remaining = header.changed_lines;
    let mut found = 0u32;

    for i in 0..header.line_count as usize {
        if remaining == 0 {
            break;
        }
        if mask[i / 8] & (0x80 >> (i % 8)) == 0 {
            continue;
        }

        let line_changes = if small {
            read_small_changes(&mut cursor)?
        } else {
            read_big_changes(&mut cursor)?
        };
        found += line_changes.len() as u32;

        let line = header.start_line as i32 + i as i32;
        if line < 0 {
            initial.extend(line_changes);
        } else {
            lines[line as usize] = line_changes;
        }
        remaining -= 1;
    }

    debug!(
        start_line = header.start_line,
        line_count = header.line_count,
        changes = found,
        "Parsed PCHG"
    );

    let warning = (found != header.total_changes).then(|| {
        let warning = Warning::ChangeCountMismatch {
            expected: header.total_changes,
            actual: found,
        };
        warn!("{}", warning);
        warning
    });

    Ok((
        MultiPalette::new(MultiPaletteKind::Pchg, initial, lines),
        warning,
    ))
}

fn read_small_changes(cursor: &mut Cursor<'_>) -> Result<Vec<PaletteChange>, IffError> {
    let count16 = cursor.u8()? as usize;
    let count32 = cursor.u8()? as usize;

    (0..count16 + count32)
        .map(|i| {
            let word = cursor.u16()?;
            let bank = if i >= count16 { 16 } else { 0 };
            Ok(PaletteChange {
                register: (word >> 12) + bank,
                color: Rgba::from_12bit(word & 0x0FFF),
            })
        })
        .collect()
}

fn read_big_changes(cursor: &mut Cursor<'_>) -> Result<Vec<PaletteChange>, IffError> {
    let count = cursor.u16()? as usize;

    (0..count)
        .map(|_| {
            let register = cursor.u16()?;
            // alpha, red, blue, green
            let bytes = cursor.take(4)?;
            Ok(PaletteChange {
                register,
                color: Rgba::rgb(bytes[1], bytes[3], bytes[2]),
            })
        })
        .collect()
}

/// Full 16-register palettes, one per line.
fn full_palettes(words: &[u8], colors: usize, kind: MultiPaletteKind) -> MultiPalette {
    let lines = words
        .chunks_exact(colors * 2)
        .map(|palette| {
            palette
                .chunks_exact(2)
                .enumerate()
                .map(|(register, word)| PaletteChange {
                    register: register as u16,
                    color: Rgba::from_12bit(read_u16_be(word)),
                })
                .collect()
        })
        .collect();
    MultiPalette::new(kind, Vec::new(), lines)
}

/// Parse a SHAM payload.
pub fn parse_sham(data: &[u8]) -> Result<MultiPalette, IffError> {
    if data.len() < 2 {
        return Err(IffError::InvalidChunkLength {
            chunk: "SHAM",
            length: data.len() as u32,
            expected: 2,
        });
    }
    let version = read_u16_be(data);
    if version != 0 {
        debug!(version, "SHAM version is not 0");
    }
    Ok(full_palettes(&data[2..], SHAM_COLORS, MultiPaletteKind::Sham))
}

/// Parse a CTBL payload.
///
/// Lines hold 32 registers when the chunk is exactly `height * 64` bytes,
/// otherwise 16.
pub fn parse_ctbl(data: &[u8], height: Option<u16>) -> MultiPalette {
    let colors = match height {
        Some(h) if h > 0 && data.len() == h as usize * 64 => 32,
        _ => 16,
    };
    full_palettes(data, colors, MultiPaletteKind::Ctbl)
}
