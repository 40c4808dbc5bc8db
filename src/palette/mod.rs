//! Palettes and palette resolution.
//!
//! # Key Concepts
//!
//! - **Palette**: ordered RGBA entries addressed by pixel index. A CMAP with
//!   `n` entries serves images of up to `log2(n)` bitplanes.
//!
//! - **EHB (Extra Half-Brite)**: a 32-entry palette doubled to 64, where
//!   entry `i + 32` is entry `i` at half intensity.
//!
//! - **HAM (Hold And Modify)**: not a lookup at all. See [`ham`].
//!
//! - **Multi-palette**: PCHG/SHAM/CTBL register changes per scanline. See
//!   [`multi`].

pub mod ham;
pub mod multi;

pub use ham::HamMode;
pub use multi::{
    MultiPalette, MultiPaletteKind, PaletteChange, PaletteResolver, DEFAULT_PALETTE_CACHE_CAPACITY,
};

use crate::error::IffError;

/// Entries of an EHB base palette
pub const EHB_BASE_COLORS: usize = 32;

// =============================================================================
// Rgba
// =============================================================================

/// One palette entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }

    /// Expand an Amiga `0x0RGB` word, replicating each nibble.
    pub const fn from_12bit(word: u16) -> Self {
        Self::rgb(
            ((word >> 8) & 0x0F) as u8 * 17,
            ((word >> 4) & 0x0F) as u8 * 17,
            (word & 0x0F) as u8 * 17,
        )
    }

    /// Half intensity, alpha unchanged.
    pub const fn half(self) -> Self {
        Self {
            r: self.r / 2,
            g: self.g / 2,
            b: self.b / 2,
            a: self.a,
        }
    }
}

// =============================================================================
// Palette
// =============================================================================

/// An indexed color table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Palette {
    entries: Vec<Rgba>,
}

impl Palette {
    pub fn new(entries: Vec<Rgba>) -> Self {
        Self { entries }
    }

    /// Build from packed RGB triplets; a trailing partial triplet is ignored.
    pub fn from_rgb_triplets(data: &[u8]) -> Self {
        let entries = data
            .chunks_exact(3)
            .map(|c| Rgba::rgb(c[0], c[1], c[2]))
            .collect();
        Self { entries }
    }

    /// Linear gray ramp for `bits`-deep indices.
    pub fn grayscale(bits: u8) -> Self {
        let count = 1usize << bits.min(8);
        let max = (count - 1).max(1);
        let entries = (0..count)
            .map(|i| {
                let v = (i * 255 / max) as u8;
                Rgba::rgb(v, v, v)
            })
            .collect();
        Self { entries }
    }

    /// `[white, black]`, for 1-bit WhiteIsZero and fax images.
    pub fn white_is_zero() -> Self {
        Self::new(vec![Rgba::rgb(0xFF, 0xFF, 0xFF), Rgba::rgb(0, 0, 0)])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Rgba] {
        &self.entries
    }

    /// Entry at `index`, `None` past the end.
    #[inline]
    pub fn get(&self, index: usize) -> Option<Rgba> {
        self.entries.get(index).copied()
    }

    /// Entry at `index`, or opaque black past the end.
    #[inline]
    pub fn color(&self, index: usize) -> Rgba {
        self.get(index).unwrap_or(Rgba::rgb(0, 0, 0))
    }

    /// First of `indices` with no entry in the palette.
    pub fn first_out_of_range(&self, indices: &[u8]) -> Option<usize> {
        indices
            .iter()
            .map(|&i| i as usize)
            .find(|&i| i >= self.entries.len())
    }

    /// Overwrite one register. Returns `false` if `index` is out of range.
    pub(crate) fn set(&mut self, index: usize, color: Rgba) -> bool {
        match self.entries.get_mut(index) {
            Some(slot) => {
                *slot = color;
                true
            }
            None => false,
        }
    }

    /// Apply Extra Half-Brite.
    ///
    /// A 32-entry palette grows to 64. A 64-entry palette has its upper half
    /// regenerated, since files often carry garbage there.
    ///
    /// # Errors
    /// Any other size is an invalid CMAP.
    pub fn expand_ehb(&self) -> Result<Palette, IffError> {
        if self.len() != EHB_BASE_COLORS && self.len() != 2 * EHB_BASE_COLORS {
            return Err(IffError::InvalidChunk {
                chunk: "CMAP",
                message: format!("unknown number of colors for EHB: {}", self.len()),
            });
        }

        let mut entries = self.entries[..EHB_BASE_COLORS].to_vec();
        entries.extend(self.entries[..EHB_BASE_COLORS].iter().map(|c| c.half()));
        Ok(Palette::new(entries))
    }

    /// Copy with `index` fully transparent (BMHD masking 2).
    pub fn with_transparent(&self, index: usize) -> Palette {
        let mut palette = self.clone();
        if let Some(entry) = palette.entries.get_mut(index) {
            entry.a = 0;
        }
        palette
    }

    /// Whether any entry is not fully opaque.
    pub fn has_alpha(&self) -> bool {
        self.entries.iter().any(|c| c.a != 0xFF)
    }

    /// Entries flattened to RGB triplets.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.entries.iter().flat_map(|c| [c.r, c.g, c.b]).collect()
    }
}
