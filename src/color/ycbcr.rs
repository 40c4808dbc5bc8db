//! YCbCr to RGB conversion and chroma upsampling.
//!
//! # Conversion
//!
//! With luma coefficients (Lr, Lg, Lb):
//!
//! ```text
//! R = Y + Cr * (2 - 2 * Lr)
//! B = Y + Cb * (2 - 2 * Lb)
//! G = (Y - Lr * R - Lb * B) / Lg
//! ```
//!
//! 8-bit data with the default coefficients and no ReferenceBlackWhite goes
//! through precomputed 16.16 fixed point tables. Everything else (custom
//! coefficients, headroom/footroom, 16-bit samples) uses the coefficients
//! directly.
//!
//! # Subsampling
//!
//! Uncompressed subsampled data is stored in blocks of `h x v` pixels:
//!
//! ```text
//! h = 2, v = 2:   Y00 Y01 Y10 Y11 Cb Cr | Y00 Y01 Y10 Y11 Cb Cr | ...
//! ```
//!
//! [`upsample_unit`] expands a unit of such blocks to chunky YCbCr, using
//! the block's chroma for every pixel in it.

use crate::format::tiff::DEFAULT_YCBCR_COEFFICIENTS;

const FRACTION_BITS: u32 = 16;
const ONE_HALF: i32 = 1 << (FRACTION_BITS - 1);

/// ReferenceBlackWhite value equivalent to its absence (8-bit)
const DEFAULT_REFERENCE_8: [f64; 6] = [0.0, 255.0, 128.0, 255.0, 128.0, 255.0];

// =============================================================================
// Converter
// =============================================================================

/// Fixed point contributions of Cr and Cb, indexed by the raw sample.
#[derive(Debug, Clone)]
struct LookupTables {
    cr_r: [i32; 256],
    cb_b: [i32; 256],
    cr_g: [i32; 256],
    cb_g: [i32; 256],
}

impl LookupTables {
    fn new(coefficients: [f64; 3]) -> Self {
        let [lr, lg, lb] = coefficients;
        let fixed = |v: f64| (v * (1 << FRACTION_BITS) as f64).round() as i32;

        let mut tables = LookupTables {
            cr_r: [0; 256],
            cb_b: [0; 256],
            cr_g: [0; 256],
            cb_g: [0; 256],
        };
        for i in 0..256 {
            let c = i as f64 - 128.0;
            tables.cr_r[i] = fixed((2.0 - 2.0 * lr) * c);
            tables.cb_b[i] = fixed((2.0 - 2.0 * lb) * c);
            tables.cr_g[i] = fixed(-lr * (2.0 - 2.0 * lr) / lg * c);
            tables.cb_g[i] = fixed(-lb * (2.0 - 2.0 * lb) / lg * c);
        }
        tables
    }

    #[inline]
    fn convert(&self, y: u8, cb: u8, cr: u8) -> [u8; 3] {
        let y = (y as i32) << FRACTION_BITS;
        let clamp = |v: i32| ((v + ONE_HALF) >> FRACTION_BITS).clamp(0, 255) as u8;
        [
            clamp(y + self.cr_r[cr as usize]),
            clamp(y + self.cr_g[cr as usize] + self.cb_g[cb as usize]),
            clamp(y + self.cb_b[cb as usize]),
        ]
    }
}

#[derive(Debug, Clone)]
enum ConversionPath {
    Lookup(Box<LookupTables>),
    Coefficients {
        coefficients: [f64; 3],
        reference: [f64; 6],
        max: f64,
        chroma_range: f64,
    },
}

/// YCbCr to RGB for one image.
#[derive(Debug, Clone)]
pub struct YCbCrConverter {
    path: ConversionPath,
}

impl YCbCrConverter {
    /// Configure for the image's coefficients, ReferenceBlackWhite and depth.
    ///
    /// The 8-bit default ReferenceBlackWhite is treated as absent.
    pub fn new(coefficients: [f64; 3], reference: Option<[f64; 6]>, bits: u16) -> Self {
        let reference = reference.filter(|r| !(bits == 8 && *r == DEFAULT_REFERENCE_8));

        if bits == 8 && reference.is_none() && coefficients == DEFAULT_YCBCR_COEFFICIENTS {
            return Self {
                path: ConversionPath::Lookup(Box::new(LookupTables::new(coefficients))),
            };
        }

        let bits = bits.clamp(1, 32);
        let max = ((1u64 << bits) - 1) as f64;
        let mid = (1u64 << (bits - 1)) as f64;
        Self {
            path: ConversionPath::Coefficients {
                coefficients,
                reference: reference.unwrap_or([0.0, max, mid, max, mid, max]),
                max,
                chroma_range: mid - 1.0,
            },
        }
    }

    /// Whether the fixed point tables are in use.
    #[cfg(test)]
    fn uses_lookup(&self) -> bool {
        matches!(self.path, ConversionPath::Lookup(_))
    }

    /// Convert one pixel given as raw sample values.
    pub fn convert(&self, y: u32, cb: u32, cr: u32) -> [u32; 3] {
        match &self.path {
            ConversionPath::Lookup(tables) => {
                tables.convert(y as u8, cb as u8, cr as u8).map(u32::from)
            }
            ConversionPath::Coefficients {
                coefficients,
                reference,
                max,
                chroma_range,
            } => {
                let scale = |v: u32, black: f64, white: f64, range: f64| {
                    let span = if white != black { white - black } else { 1.0 };
                    (v as f64 - black) * range / span
                };
                let y = scale(y, reference[0], reference[1], *max);
                let cb = scale(cb, reference[2], reference[3], *chroma_range);
                let cr = scale(cr, reference[4], reference[5], *chroma_range);

                let [lr, lg, lb] = *coefficients;
                let r = y + cr * (2.0 - 2.0 * lr);
                let b = y + cb * (2.0 - 2.0 * lb);
                let g = (y - lr * r - lb * b) / lg;

                let clamp = |v: f64| v.round().clamp(0.0, *max) as u32;
                [clamp(r), clamp(g), clamp(b)]
            }
        }
    }

    /// Convert 8-bit chunky pixels in place; samples past the third are kept.
    pub fn convert_row_u8(&self, row: &mut [u8], samples_per_pixel: usize) {
        for pixel in row.chunks_exact_mut(samples_per_pixel.max(3)) {
            let rgb = self.convert(pixel[0] as u32, pixel[1] as u32, pixel[2] as u32);
            for (slot, value) in pixel.iter_mut().zip(rgb) {
                *slot = value as u8;
            }
        }
    }

    /// Convert 16-bit chunky pixels in place.
    pub fn convert_row_u16(&self, row: &mut [u16], samples_per_pixel: usize) {
        for pixel in row.chunks_exact_mut(samples_per_pixel.max(3)) {
            let rgb = self.convert(pixel[0] as u32, pixel[1] as u32, pixel[2] as u32);
            for (slot, value) in pixel.iter_mut().zip(rgb) {
                *slot = value as u16;
            }
        }
    }
}

// =============================================================================
// Subsampling
// =============================================================================

/// Decoded byte length of a `width x height` unit of `h x v` blocks, or
/// `None` on overflow.
pub fn subsampled_unit_len(width: usize, height: usize, h: usize, v: usize) -> Option<usize> {
    width
        .div_ceil(h)
        .checked_mul(height.div_ceil(v))?
        .checked_mul(h * v + 2)
}

/// Expand a unit of subsampled blocks to chunky 3-sample YCbCr.
///
/// Missing trailing blocks decode as zero.
pub fn upsample_unit(data: &[u8], width: usize, height: usize, h: usize, v: usize) -> Vec<u8> {
    let mut out = vec![0u8; width * height * 3];
    let block_len = h * v + 2;
    let blocks_across = width.div_ceil(h);

    for (index, block) in data.chunks_exact(block_len).enumerate() {
        let bx = (index % blocks_across) * h;
        let by = (index / blocks_across) * v;
        if by >= height {
            break;
        }
        let (cb, cr) = (block[h * v], block[h * v + 1]);

        for dy in 0..v {
            for dx in 0..h {
                let (x, y) = (bx + dx, by + dy);
                if x >= width || y >= height {
                    continue;
                }
                let at = (y * width + x) * 3;
                out[at] = block[dy * h + dx];
                out[at + 1] = cb;
                out[at + 2] = cr;
            }
        }
    }

    out
}
