//! Color normalization to a fixed output representation.
//!
//! Decoded TIFF samples are converted in place, one row at a time:
//!
//! ```text
//! photometric        output
//! WhiteIsZero        gray (inverted), or [white, black] palette at 1 bit
//! BlackIsZero        gray
//! RGB                RGB
//! Palette            indices + palette (see colormap_to_palette)
//! Separated (CMYK)   CMYK, untouched
//! YCbCr              RGB (see ycbcr)
//! CIELab/ICC/ITU     RGB (see lab)
//! ```

pub mod lab;
pub mod ycbcr;

pub use lab::{Illuminant, LabConverter, LabEncoding};
pub use ycbcr::{subsampled_unit_len, upsample_unit, YCbCrConverter};

use tracing::warn;

use crate::error::Warning;
use crate::palette::{Palette, Rgba};

/// Invert every bit of a packed row (WhiteIsZero).
///
/// Works on packed sub-byte samples and on multi-byte samples in either
/// byte order, since the inverse of every sample is the inverse of its bits.
pub fn invert(row: &mut [u8]) {
    for byte in row.iter_mut() {
        *byte = !*byte;
    }
}

/// Build a palette from a TIFF ColorMap.
///
/// The map holds all reds, then all greens, then all blues, as 16-bit
/// values. They are scaled to 8 bits by dropping the low byte. Some writers
/// store 8-bit values instead; if scaling would zero the whole map, the low
/// bytes are used and a warning is returned.
pub fn colormap_to_palette(map: &[u16], bits: u16) -> (Palette, Option<Warning>) {
    let count = (1usize << bits.min(16)).min(map.len() / 3);
    let (reds, rest) = map.split_at(count);
    let (greens, blues) = rest.split_at(count);

    let all_low = map[..3 * count].iter().all(|&v| v >> 8 == 0);
    let any_set = map[..3 * count].iter().any(|&v| v != 0);
    let eight_bit = all_low && any_set;

    let scale = |v: u16| -> u8 {
        if eight_bit {
            (v & 0xFF) as u8
        } else {
            (v >> 8) as u8
        }
    };

    let entries = (0..count)
        .map(|i| Rgba::rgb(scale(reds[i]), scale(greens[i]), scale(blues[i])))
        .collect();

    let warning = eight_bit.then(|| {
        warn!("{}", Warning::EightBitColorMap);
        Warning::EightBitColorMap
    });
    (Palette::new(entries), warning)
}
