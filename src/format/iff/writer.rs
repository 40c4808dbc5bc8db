//! ILBM encoder.
//!
//! Writes indexed or true-color pixels as `FORM ILBM`:
//!
//! ```text
//! FORM <len> ILBM
//!   BMHD  20 bytes
//!   CMAP  3 * colors bytes (indexed only)
//!   BODY  per row, per plane: plane row (ByteRun1 packed if requested)
//! ```
//!
//! Every plane row is packed on its own, so a decoder reading the BODY as
//! one continuous ByteRun1 stream sees the same bytes.

use bytes::Bytes;
use tracing::debug;

use crate::bitplane::{pack_row, pack_true_color, plane_row_bytes};
use crate::codec::packbits;
use crate::error::DecodeError;
use crate::palette::Palette;

use super::chunk::{BMHD, BODY, CMAP, FORM, TYPE_ILBM};
use super::headers::{BitmapHeader, Masking, COMPRESSION_BYTE_RUN, COMPRESSION_NONE};

/// Most colors an indexed ILBM can address
const MAX_INDEXED_COLORS: usize = 256;

/// Pixels to encode.
#[derive(Debug, Clone, Copy)]
pub enum IlbmPixels<'a> {
    /// One palette index per pixel
    Indexed {
        pixels: &'a [u8],
        palette: &'a Palette,
    },
    /// Interleaved RGB (3 channels) or RGBA (4 channels)
    TrueColor { pixels: &'a [u8], channels: usize },
}

/// ILBM writer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IlbmWriter {
    /// Pack BODY rows with ByteRun1
    pub compress: bool,
}

impl Default for IlbmWriter {
    fn default() -> Self {
        Self { compress: true }
    }
}

impl IlbmWriter {
    pub fn new(compress: bool) -> Self {
        Self { compress }
    }

    /// Encode an image as a complete IFF file.
    ///
    /// # Errors
    /// `InvalidParameter` for empty or oversized images, pixel buffers of
    /// the wrong length, palettes over 256 entries and channel counts other
    /// than 3 or 4.
    pub fn encode(
        &self,
        width: usize,
        height: usize,
        pixels: IlbmPixels<'_>,
    ) -> Result<Bytes, DecodeError> {
        if width == 0 || height == 0 || width > u16::MAX as usize || height > u16::MAX as usize {
            return Err(DecodeError::InvalidParameter(format!(
                "ILBM size {}x{} out of range",
                width, height
            )));
        }

        let (planes, bytes_per_pixel, palette) = match pixels {
            IlbmPixels::Indexed { palette, .. } => {
                if palette.is_empty() || palette.len() > MAX_INDEXED_COLORS {
                    return Err(DecodeError::InvalidParameter(format!(
                        "palette with {} entries cannot be written",
                        palette.len()
                    )));
                }
                (plane_count(palette.len()), 1, Some(palette))
            }
            IlbmPixels::TrueColor { channels, .. } => {
                if channels != 3 && channels != 4 {
                    return Err(DecodeError::InvalidParameter(format!(
                        "{} channels cannot be written, expected 3 or 4",
                        channels
                    )));
                }
                (channels * 8, channels, None)
            }
        };

        let data = match pixels {
            IlbmPixels::Indexed { pixels, .. } | IlbmPixels::TrueColor { pixels, .. } => pixels,
        };
        if data.len() != width * height * bytes_per_pixel {
            return Err(DecodeError::InvalidParameter(format!(
                "pixel buffer holds {} bytes, {}x{} needs {}",
                data.len(),
                width,
                height,
                width * height * bytes_per_pixel
            )));
        }

        let compression = if self.compress {
            COMPRESSION_BYTE_RUN
        } else {
            COMPRESSION_NONE
        };
        let header = BitmapHeader::new(
            width as u16,
            height as u16,
            planes as u8,
            Masking::None,
            compression,
        );

        let body = self.encode_body(width, planes, bytes_per_pixel, data);

        let mut out = Vec::with_capacity(body.len() + 64);
        out.extend_from_slice(&FORM.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&TYPE_ILBM.to_be_bytes());
        write_chunk(&mut out, BMHD, &header.to_bytes());
        if let Some(palette) = palette {
            write_chunk(&mut out, CMAP, &palette.to_rgb_bytes());
        }
        write_chunk(&mut out, BODY, &body);

        let form_length = (out.len() - 8) as u32;
        out[4..8].copy_from_slice(&form_length.to_be_bytes());

        debug!(
            width,
            height,
            planes,
            compressed = self.compress,
            bytes = out.len(),
            "Encoded ILBM"
        );

        Ok(Bytes::from(out))
    }

    fn encode_body(&self, width: usize, planes: usize, bytes_per_pixel: usize, data: &[u8]) -> Vec<u8> {
        let row_bytes = plane_row_bytes(width);
        let mut row_planes = vec![0u8; row_bytes * planes];
        let mut body = Vec::new();

        for row in data.chunks_exact(width * bytes_per_pixel) {
            row_planes.fill(0);
            if bytes_per_pixel == 1 {
                pack_row(row, planes, width, &mut row_planes);
            } else {
                pack_true_color(row, bytes_per_pixel, width, &mut row_planes);
            }

            for plane in row_planes.chunks_exact(row_bytes) {
                if self.compress {
                    body.extend_from_slice(&packbits::encode(plane));
                } else {
                    body.extend_from_slice(plane);
                }
            }
        }
        body
    }
}

/// Planes needed to index `colors` entries.
fn plane_count(colors: usize) -> usize {
    let mut planes = 1;
    while (1 << planes) < colors {
        planes += 1;
    }
    planes
}

fn write_chunk(out: &mut Vec<u8>, id: u32, payload: &[u8]) {
    out.extend_from_slice(&id.to_be_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        out.push(0);
    }
}
