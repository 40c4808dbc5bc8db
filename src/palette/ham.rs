//! Hold-And-Modify rows.
//!
//! Every pixel is a 2-bit opcode in its top bits plus a payload:
//!
//! ```text
//! HAM6  | op:2 | value:4 |      HAM8  | op:2 | value:6 |
//!
//! op 0  HOLD          payload is a palette index
//! op 1  MODIFY BLUE   payload replaces blue
//! op 2  MODIFY RED    payload replaces red
//! op 3  MODIFY GREEN  payload replaces green
//! ```
//!
//! A modified channel is the payload scaled to 8 bits by bit replication.
//! The running color starts as palette entry 0 on every row.

use super::{Palette, Rgba};

/// Hold-And-Modify variant, selected by the plane count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HamMode {
    /// 6 planes, 16 base colors, 4-bit modify
    Ham6,
    /// 8 planes, 64 base colors, 6-bit modify
    Ham8,
}

impl HamMode {
    /// Mode for a plane count, `None` for counts that cannot be HAM.
    pub fn from_planes(planes: u8) -> Option<Self> {
        match planes {
            5 | 6 => Some(HamMode::Ham6),
            7 | 8 => Some(HamMode::Ham8),
            _ => None,
        }
    }

    #[inline]
    fn value_bits(self) -> u32 {
        match self {
            HamMode::Ham6 => 4,
            HamMode::Ham8 => 6,
        }
    }

    /// Scale a payload to 8 bits.
    #[inline]
    fn expand(self, value: u8) -> u8 {
        match self {
            HamMode::Ham6 => value * 17,
            HamMode::Ham8 => (value << 2) | (value >> 4),
        }
    }

    /// Resolve one row of HAM pixels to RGB triplets.
    ///
    /// `out` receives `3 * pixels.len()` bytes.
    pub fn resolve_row(self, pixels: &[u8], palette: &Palette, out: &mut [u8]) -> Option<usize> {
        let bits = self.value_bits();
        let mask = (1u8 << bits) - 1;
        let mut current = palette.color(0);
        let mut out_of_range = None;

        for (pixel, rgb) in pixels.iter().zip(out.chunks_exact_mut(3)) {
            let value = pixel & mask;
            current = match (pixel >> bits) & 0x03 {
                0 => palette.get(value as usize).unwrap_or_else(|| {
                    out_of_range.get_or_insert(value as usize);
                    Rgba::rgb(0, 0, 0)
                }),
                1 => Rgba {
                    b: self.expand(value),
                    ..current
                },
                2 => Rgba {
                    r: self.expand(value),
                    ..current
                },
                _ => Rgba {
                    g: self.expand(value),
                    ..current
                },
            };
            rgb.copy_from_slice(&[current.r, current.g, current.b]);
        }
        out_of_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette_with(index: usize, color: Rgba) -> Palette {
        let mut entries = vec![Rgba::rgb(0, 0, 0); 16];
        entries[index] = color;
        Palette::new(entries)
    }

    #[test]
    fn test_ham6_sequence() {
        let palette = palette_with(3, Rgba::rgb(10, 20, 30));
        // HOLD 3, MODIFY BLUE 0xF, MODIFY RED 0x5
        let pixels = [0b00_0011, 0b01_1111, 0b10_0101];
        let mut out = [0u8; 9];
        HamMode::Ham6.resolve_row(&pixels, &palette, &mut out);
        assert_eq!(out, [10, 20, 30, 10, 20, 255, 85, 20, 255]);
    }

    #[test]
    fn test_ham6_starts_from_entry_zero() {
        let palette = palette_with(0, Rgba::rgb(1, 2, 3));
        // MODIFY GREEN 0x1 as the first pixel
        let mut out = [0u8; 3];
        HamMode::Ham6.resolve_row(&[0b11_0001], &palette, &mut out);
        assert_eq!(out, [1, 17, 3]);
    }

    #[test]
    fn test_ham8_modify() {
        let palette = palette_with(0, Rgba::rgb(0, 0, 0));
        // MODIFY RED 0x3F, MODIFY BLUE 0x01
        let mut out = [0u8; 6];
        HamMode::Ham8.resolve_row(&[0b10_111111, 0b01_000001], &palette, &mut out);
        assert_eq!(out, [255, 0, 0, 255, 0, 4]);
    }

    #[test]
    fn test_base_color_past_palette() {
        let palette = Palette::new(vec![Rgba::rgb(9, 9, 9); 4]);
        // HOLD 2, HOLD 7 (missing), MODIFY RED 0x1
        let mut out = [0u8; 9];
        let pixels = [0b00_0010, 0b00_0111, 0b10_0001];
        let missing = HamMode::Ham6.resolve_row(&pixels, &palette, &mut out);
        assert_eq!(missing, Some(7));
        assert_eq!(out, [9, 9, 9, 0, 0, 0, 17, 0, 0]);

        let missing = HamMode::Ham6.resolve_row(&[0b00_0011], &palette, &mut out[..3]);
        assert_eq!(missing, None);
    }

    #[test]
    fn test_mode_from_planes() {
        assert_eq!(HamMode::from_planes(6), Some(HamMode::Ham6));
        assert_eq!(HamMode::from_planes(8), Some(HamMode::Ham8));
        assert_eq!(HamMode::from_planes(4), None);
    }
}
