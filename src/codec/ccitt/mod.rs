//! CCITT fax coding (TIFF compression 2, 3 and 4).
//!
//! # Key Concepts
//!
//! - **Runs**: a row is a sequence of alternating white and black runs,
//!   starting white. Runs of 64 or more are a make-up code followed by a
//!   terminating code.
//!
//! - **Changing elements**: the positions where the colour flips. 2D rows
//!   are coded relative to the changing elements of the row above (the
//!   reference row).
//!
//! - **Framing**: Modified Huffman rows start on byte boundaries. Group 3
//!   rows may be preceded by EOL codes and, in 2D mode, a tag bit choosing
//!   1D or 2D coding. Group 4 rows are all 2D with no EOLs; the first
//!   reference row is all white.
//!
//! ```text
//! reference  ░░░░░░██████░░░░░░
//!                  b1    b2
//! coding     ░░░░░░░░████████░░
//!            a0      a1      a2
//! ```
//!
//! Output rows are packed MSB first with 1 = black.

mod decode;
mod encode;
mod states;

pub use decode::decode;
pub use encode::encode;

/// Which CCITT scheme a unit is coded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaxScheme {
    /// TIFF compression 2
    ModifiedHuffman,
    /// TIFF compression 3 (T.4)
    Group3,
    /// TIFF compression 4 (T.6)
    Group4,
}

impl FaxScheme {
    pub fn name(self) -> &'static str {
        match self {
            FaxScheme::ModifiedHuffman => "CCITT MH",
            FaxScheme::Group3 => "CCITT G3",
            FaxScheme::Group4 => "CCITT G4",
        }
    }
}

/// Bits of the T4Options / T6Options tags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaxOptions {
    /// T4Options bit 0: rows may be 2D coded
    pub two_dimensional: bool,
    /// Bit 1: uncompressed mode allowed
    pub uncompressed: bool,
    /// T4Options bit 2: EOLs padded to end on a byte boundary
    pub fill_bits: bool,
}

impl FaxOptions {
    /// Parse a T4Options value.
    pub fn from_t4(value: u32) -> Self {
        Self {
            two_dimensional: value & 1 != 0,
            uncompressed: value & 2 != 0,
            fill_bits: value & 4 != 0,
        }
    }

    /// Parse a T6Options value.
    pub fn from_t6(value: u32) -> Self {
        Self {
            two_dimensional: true,
            uncompressed: value & 2 != 0,
            fill_bits: false,
        }
    }
}
