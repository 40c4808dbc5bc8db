//! Planar to chunky pixel conversion for interleaved bitmaps.
//!
//! # Key Concepts
//!
//! - **Bitplane**: one row of 1-bit pixels, MSB = leftmost, padded to a
//!   16-bit word: `2 * ceil(width / 16)` bytes.
//!
//! - **Rotation**: eight plane bytes covering the same eight pixels form an
//!   8x8 bit matrix. Rotating it clockwise turns "byte per plane" into
//!   "byte per pixel", plane `i` landing in bit `i` of every pixel.
//!
//! ```text
//! plane 0  1 0 0 0 0 0 0 1        pixel 0  0b0000_0011
//! plane 1  1 1 0 0 0 0 0 0   CW   pixel 1  0b0000_0010
//! ...                       ---->  ...
//! plane 7  0 0 0 0 0 0 0 0        pixel 7  0b0000_0001
//! ```
//!
//! The rotation spreads each nibble through a 16-entry table instead of
//! moving single bits.

/// Spread the four bits of a nibble to bit `shift` of four bytes.
const fn spread(shift: u32) -> [u32; 16] {
    let mut table = [0u32; 16];
    let mut nibble = 0;
    while nibble < 16 {
        let mut value = 0u32;
        let mut bit = 0;
        while bit < 4 {
            if nibble & (1 << bit) != 0 {
                value |= 1 << (bit * 8);
            }
            bit += 1;
        }
        table[nibble] = value << shift;
        nibble += 1;
    }
    table
}

const RTABLE: [[u32; 16]; 8] = [
    spread(0),
    spread(1),
    spread(2),
    spread(3),
    spread(4),
    spread(5),
    spread(6),
    spread(7),
];

/// Bytes in one plane row of `width` pixels.
#[inline]
pub fn plane_row_bytes(width: usize) -> usize {
    2 * width.div_ceil(16)
}

/// Rotate one 8x8 tile from plane bytes to pixel bytes.
///
/// `planes[i]` holds bit `i` of eight pixels, leftmost pixel in the MSB.
pub fn rotate_cw(planes: &[u8; 8]) -> [u8; 8] {
    let mut lo = 0u32;
    let mut hi = 0u32;
    for (i, &byte) in planes.iter().enumerate() {
        lo |= RTABLE[i][(byte & 0x0F) as usize];
        hi |= RTABLE[i][(byte >> 4) as usize];
    }

    let hi = hi.to_be_bytes();
    let lo = lo.to_be_bytes();
    [hi[0], hi[1], hi[2], hi[3], lo[0], lo[1], lo[2], lo[3]]
}

/// Rotate one 8x8 tile from pixel bytes back to plane bytes.
///
/// Exact inverse of [`rotate_cw`].
pub fn rotate_ccw(pixels: &[u8; 8]) -> [u8; 8] {
    let mut lo = 0u32;
    let mut hi = 0u32;
    for (p, &byte) in pixels.iter().enumerate() {
        lo |= RTABLE[7 - p][(byte & 0x0F) as usize];
        hi |= RTABLE[7 - p][(byte >> 4) as usize];
    }

    let lo = lo.to_le_bytes();
    let hi = hi.to_le_bytes();
    [lo[0], lo[1], lo[2], lo[3], hi[0], hi[1], hi[2], hi[3]]
}

// =============================================================================
// Rows
// =============================================================================

/// Unpack up to eight consecutive planes into one channel of `out`.
///
/// Pixel `x` is written to `out[x * out_step + out_offset]`.
fn unpack_planes(
    planes: &[u8],
    first_plane: usize,
    plane_count: usize,
    width: usize,
    out: &mut [u8],
    out_step: usize,
    out_offset: usize,
) {
    let stride = plane_row_bytes(width);
    for group in 0..width.div_ceil(8) {
        let mut tile = [0u8; 8];
        for (i, slot) in tile.iter_mut().enumerate().take(plane_count) {
            *slot = planes
                .get((first_plane + i) * stride + group)
                .copied()
                .unwrap_or(0);
        }

        let pixels = rotate_cw(&tile);
        let x0 = group * 8;
        for (dx, &pixel) in pixels.iter().enumerate().take(width - x0) {
            if let Some(slot) = out.get_mut((x0 + dx) * out_step + out_offset) {
                *slot = pixel;
            }
        }
    }
}

/// Unpack `plane_count` (at most 8) plane rows into one index byte per pixel.
///
/// `planes` holds the plane rows back to back, each
/// [`plane_row_bytes`]`(width)` long.
pub fn unpack_row(planes: &[u8], plane_count: usize, width: usize, out: &mut [u8]) {
    unpack_planes(planes, 0, plane_count.min(8), width, out, 1, 0);
}

/// Unpack 24 or 32 planes into interleaved RGB(A) bytes.
///
/// Planes 0-7 are red, 8-15 green, 16-23 blue, 24-31 alpha.
pub fn unpack_true_color(planes: &[u8], plane_count: usize, width: usize, out: &mut [u8]) {
    let channels = plane_count / 8;
    for channel in 0..channels {
        unpack_planes(planes, channel * 8, 8, width, out, channels, channel);
    }
}

/// Extract one plane as one 0/1 byte per pixel (mask planes).
pub fn unpack_mask(plane: &[u8], width: usize, out: &mut [u8]) {
    for (x, slot) in out.iter_mut().enumerate().take(width) {
        *slot = plane.get(x / 8).map_or(0, |b| (b >> (7 - x % 8)) & 1);
    }
}

/// Pack index bytes into `plane_count` (at most 8) plane rows.
///
/// `out` must hold `plane_count * plane_row_bytes(width)` bytes.
pub fn pack_row(pixels: &[u8], plane_count: usize, width: usize, out: &mut [u8]) {
    pack_planes(pixels, 1, 0, 0, plane_count.min(8), width, out);
}

/// Pack interleaved RGB(A) bytes into 24 or 32 plane rows.
pub fn pack_true_color(pixels: &[u8], channels: usize, width: usize, out: &mut [u8]) {
    for channel in 0..channels {
        pack_planes(pixels, channels, channel, channel * 8, 8, width, out);
    }
}

fn pack_planes(
    pixels: &[u8],
    step: usize,
    offset: usize,
    first_plane: usize,
    plane_count: usize,
    width: usize,
    out: &mut [u8],
) {
    let stride = plane_row_bytes(width);
    for group in 0..stride {
        let mut tile = [0u8; 8];
        for (dx, slot) in tile.iter_mut().enumerate() {
            let x = group * 8 + dx;
            if x < width {
                *slot = pixels.get(x * step + offset).copied().unwrap_or(0);
            }
        }

        let planes = rotate_ccw(&tile);
        for (i, &byte) in planes.iter().enumerate().take(plane_count) {
            if let Some(slot) = out.get_mut((first_plane + i) * stride + group) {
                *slot = byte;
            }
        }
    }
}
