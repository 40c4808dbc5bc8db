//! TIFF LZW (compression 5).
//!
//! # Key Concepts
//!
//! - **Codes**: 256 literal codes, CLEAR (256), EOI (257), then string codes
//!   from 258 up. Codes start 9 bits wide and grow to at most 12.
//!
//! - **Standard variant**: codes packed MSB first; the width grows one code
//!   early, when the table length exceeds `2^width - 2`.
//!
//! - **Legacy variant**: written by pre-6.0 TIFF encoders. Codes packed LSB
//!   first; the width grows when the table length exceeds `2^width - 1`,
//!   and the table may overrun 4096 entries before a CLEAR arrives.
//!
//! ```text
//! code      table after reading it          output
//! CLEAR     reset to 258 entries, 9 bits
//! 'A'       (nothing to add yet)            A
//! 'B'       258 = A + B                     B
//! 258       259 = B + A                     AB
//! 260       260 = AB + A  (KwKwK case)      ABA
//! EOI
//! ```

use std::collections::HashMap;

use super::output_buffer;
use crate::error::CodecError;
use crate::io::{BitOrder, BitReader, BitWriter};

const CLEAR: u16 = 256;
const EOI: u16 = 257;
const FIRST_CODE: u16 = 258;
const MIN_BITS: u32 = 9;
const MAX_BITS: u32 = 12;

/// Entries a standard table may hold
const TABLE_CAPACITY: usize = 4096;

/// Extra room legacy streams are granted before overflowing
const LEGACY_EXTRA_CAPACITY: usize = 1024;

/// The two LZW flavours found in TIFF files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LzwVariant {
    /// TIFF 6.0 LZW
    Standard,
    /// Pre-6.0 "old-style" LZW
    Legacy,
}

impl LzwVariant {
    /// Guess the variant from the first bytes of a unit.
    ///
    /// Every stream starts with a CLEAR code. Packed MSB first its 9 bits
    /// give `0x80` as the first byte; packed LSB first the first byte is 0
    /// and bit 0 of the second byte is set.
    pub fn sniff(data: &[u8]) -> Self {
        match data {
            [0, second, ..] if second & 1 == 1 => LzwVariant::Legacy,
            _ => LzwVariant::Standard,
        }
    }

    fn bit_order(self) -> BitOrder {
        match self {
            LzwVariant::Standard => BitOrder::MsbFirst,
            LzwVariant::Legacy => BitOrder::LsbFirst,
        }
    }

    fn capacity(self) -> usize {
        match self {
            LzwVariant::Standard => TABLE_CAPACITY,
            LzwVariant::Legacy => TABLE_CAPACITY + LEGACY_EXTRA_CAPACITY,
        }
    }

    /// Largest table length still read at `bits` width.
    fn max_code(self, bits: u32) -> usize {
        let mask = (1usize << bits) - 1;
        match self {
            LzwVariant::Standard => mask - 1,
            LzwVariant::Legacy => mask,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LzwVariant::Standard => "standard",
            LzwVariant::Legacy => "legacy",
        }
    }

    /// Inverse of [`LzwVariant::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "standard" => Some(LzwVariant::Standard),
            "legacy" => Some(LzwVariant::Legacy),
            _ => None,
        }
    }
}

// =============================================================================
// String table
// =============================================================================

/// LZW string table stored as prefix links.
///
/// Each string is its prefix code plus one suffix byte, so adding an entry
/// never copies. `first` and `length` let strings be written back to front
/// straight into the output.
struct StringTable {
    prefix: Vec<u16>,
    suffix: Vec<u8>,
    first: Vec<u8>,
    length: Vec<u16>,
    capacity: usize,
}

impl StringTable {
    fn new(capacity: usize) -> Self {
        let mut table = Self {
            prefix: Vec::with_capacity(capacity),
            suffix: Vec::with_capacity(capacity),
            first: Vec::with_capacity(capacity),
            length: Vec::with_capacity(capacity),
            capacity,
        };
        for byte in 0..=255u8 {
            table.prefix.push(0);
            table.suffix.push(byte);
            table.first.push(byte);
            table.length.push(1);
        }
        // CLEAR and EOI occupy their slots but are never emitted
        for _ in 0..2 {
            table.prefix.push(0);
            table.suffix.push(0);
            table.first.push(0);
            table.length.push(0);
        }
        table
    }

    #[inline]
    fn len(&self) -> usize {
        self.prefix.len()
    }

    fn reset(&mut self) {
        let base = FIRST_CODE as usize;
        self.prefix.truncate(base);
        self.suffix.truncate(base);
        self.first.truncate(base);
        self.length.truncate(base);
    }

    fn add(&mut self, prefix: u16, suffix: u8) -> Result<(), CodecError> {
        if self.len() >= self.capacity {
            return Err(CodecError::LzwTableOverflow {
                capacity: self.capacity,
            });
        }
        let p = prefix as usize;
        self.prefix.push(prefix);
        self.suffix.push(suffix);
        self.first.push(self.first[p]);
        self.length.push(self.length[p].saturating_add(1));
        Ok(())
    }

    /// Append the string for `code` to `out`.
    fn write(&self, code: u16, out: &mut Vec<u8>) {
        let len = self.length[code as usize] as usize;
        let start = out.len();
        out.resize(start + len, 0);

        let mut current = code as usize;
        for slot in out[start..].iter_mut().rev() {
            *slot = self.suffix[current];
            current = self.prefix[current] as usize;
        }
    }
}

// =============================================================================
// Decoder
// =============================================================================

/// Decode one LZW unit.
///
/// Decoding stops at EOI, at the end of the data, or once `expected_len`
/// bytes are produced (the output is truncated to `expected_len`). A short
/// result is returned as is; the caller checks the length.
///
/// # Errors
/// - `LzwCode` for a code beyond the next free table slot
/// - `LzwTableOverflow` if the table outgrows the variant's capacity
pub fn decode(
    input: &[u8],
    expected_len: usize,
    variant: LzwVariant,
) -> Result<Vec<u8>, CodecError> {
    let mut reader = BitReader::with_order(input, variant.bit_order());
    let mut table = StringTable::new(variant.capacity());
    let mut output = output_buffer(expected_len);
    let mut bits = MIN_BITS;
    let mut previous: Option<u16> = None;

    while output.len() < expected_len {
        let Some(code) = reader.read_bits(bits) else {
            break;
        };
        let code = code as u16;

        if code == CLEAR {
            table.reset();
            bits = MIN_BITS;
            previous = None;
            continue;
        }
        if code == EOI {
            break;
        }

        let table_len = table.len();
        match previous {
            None => {
                // First code after CLEAR (or a stream missing its CLEAR)
                if code as usize >= table_len {
                    return Err(CodecError::LzwCode { code, table_len });
                }
                table.write(code, &mut output);
            }
            Some(prev) => {
                if (code as usize) < table_len {
                    table.write(code, &mut output);
                    table.add(prev, table.first[code as usize])?;
                } else if code as usize == table_len {
                    table.add(prev, table.first[prev as usize])?;
                    table.write(code, &mut output);
                } else {
                    return Err(CodecError::LzwCode { code, table_len });
                }
            }
        }
        previous = Some(code);

        if table.len() > variant.max_code(bits) && bits < MAX_BITS {
            bits += 1;
        }
    }

    output.truncate(expected_len);
    Ok(output)
}

// =============================================================================
// Encoder
// =============================================================================

/// Encode bytes as standard-variant TIFF LZW.
///
/// The stream starts with CLEAR, emits CLEAR again whenever the 12-bit
/// table is full, and ends with EOI padded with zero bits.
pub fn encode(input: &[u8]) -> Vec<u8> {
    encode_variant(input, LzwVariant::Standard)
}

fn encode_variant(input: &[u8], variant: LzwVariant) -> Vec<u8> {
    let mut writer = BitWriter::with_order(variant.bit_order());
    let mut trie: HashMap<(u16, u8), u16> = HashMap::new();
    let mut next = FIRST_CODE as usize;
    let mut bits = MIN_BITS;

    writer.write(CLEAR as u32, bits);

    let mut current: Option<u16> = None;
    for &byte in input {
        let Some(prefix) = current else {
            current = Some(byte as u16);
            continue;
        };
        if let Some(&code) = trie.get(&(prefix, byte)) {
            current = Some(code);
            continue;
        }

        writer.write(prefix as u32, bits);
        if next >= TABLE_CAPACITY - 2 {
            writer.write(CLEAR as u32, bits);
            trie.clear();
            next = FIRST_CODE as usize;
            bits = MIN_BITS;
        } else {
            trie.insert((prefix, byte), next as u16);
            next += 1;
            // The decoder's table trails `next` by one entry
            if next > variant.max_code(bits) + 1 && bits < MAX_BITS {
                bits += 1;
            }
        }
        current = Some(byte as u16);
    }

    if let Some(code) = current {
        writer.write(code as u32, bits);
        // The decoder's table catches up to `next` after reading this code
        if next > variant.max_code(bits) && bits < MAX_BITS {
            bits += 1;
        }
    }
    writer.write(EOI as u32, bits);

    writer.finish()
}
