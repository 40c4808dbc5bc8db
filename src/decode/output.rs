//! In-memory decode result and its conversion to `image` buffers.

use image::{
    DynamicImage, GrayAlphaImage, GrayImage, ImageBuffer, Luma, LumaA, Rgb, RgbImage, Rgba,
    RgbaImage,
};

use crate::error::{DecodeError, Warning};
use crate::palette::Palette;

use super::{ColorModel, OutputInfo, PixelLayout, RowSink, SampleType};

// =============================================================================
// DecodedImage
// =============================================================================

/// A fully decoded image.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,

    /// Rows back to back, `row_bytes()` each
    pub data: Vec<u8>,

    /// Set for [`ColorModel::Indexed`]
    pub palette: Option<Palette>,

    /// Soft errors from parsing and decoding
    pub warnings: Vec<Warning>,
}

impl DecodedImage {
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.layout.bytes_per_pixel()
    }

    /// Bytes of row `y`; empty past the last row.
    pub fn row(&self, y: u32) -> &[u8] {
        let len = self.row_bytes();
        let start = y as usize * len;
        self.data.get(start..start + len).unwrap_or(&[])
    }

    /// Samples of the pixel at (`x`, `y`); empty outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let size = self.layout.bytes_per_pixel();
        let start = x as usize * size;
        self.row(y).get(start..start + size).unwrap_or(&[])
    }

    /// Convert to an `image` buffer for encoding.
    ///
    /// Indexed pixels are resolved through the palette. Channels past gray
    /// plus alpha or RGB plus alpha are dropped.
    ///
    /// # Errors
    /// `Unsupported` for CMYK and for floating point or 32/64-bit samples.
    pub fn to_dynamic_image(&self) -> Result<DynamicImage, DecodeError> {
        let (w, h) = (self.width, self.height);
        let channels = self.layout.channels;

        let image = match (self.layout.color, self.layout.sample_type) {
            (ColorModel::Indexed, SampleType::U8) => {
                let palette = self.palette.clone().unwrap_or_default();
                let indices = pick_channels(&self.data, channels, 1);
                if palette.has_alpha() {
                    let rgba = indices
                        .iter()
                        .flat_map(|&i| {
                            let c = palette.color(i as usize);
                            [c.r, c.g, c.b, c.a]
                        })
                        .collect();
                    RgbaImage::from_raw(w, h, rgba).map(DynamicImage::ImageRgba8)
                } else {
                    let rgb = indices
                        .iter()
                        .flat_map(|&i| {
                            let c = palette.color(i as usize);
                            [c.r, c.g, c.b]
                        })
                        .collect();
                    RgbImage::from_raw(w, h, rgb).map(DynamicImage::ImageRgb8)
                }
            }
            (ColorModel::Gray, SampleType::U8) if channels >= 2 => {
                GrayAlphaImage::from_raw(w, h, pick_channels(&self.data, channels, 2))
                    .map(DynamicImage::ImageLumaA8)
            }
            (ColorModel::Gray, SampleType::U8) => {
                GrayImage::from_raw(w, h, pick_channels(&self.data, channels, 1))
                    .map(DynamicImage::ImageLuma8)
            }
            (ColorModel::Gray, SampleType::U16) if channels >= 2 => {
                ImageBuffer::<LumaA<u16>, _>::from_raw(w, h, pick_u16(&self.data, channels, 2))
                    .map(DynamicImage::ImageLumaA16)
            }
            (ColorModel::Gray, SampleType::U16) => {
                ImageBuffer::<Luma<u16>, _>::from_raw(w, h, pick_u16(&self.data, channels, 1))
                    .map(DynamicImage::ImageLuma16)
            }
            (ColorModel::Rgb, SampleType::U8) if channels >= 4 => {
                RgbaImage::from_raw(w, h, pick_channels(&self.data, channels, 4))
                    .map(DynamicImage::ImageRgba8)
            }
            (ColorModel::Rgb, SampleType::U8) => {
                RgbImage::from_raw(w, h, pick_channels(&self.data, channels, 3))
                    .map(DynamicImage::ImageRgb8)
            }
            (ColorModel::Rgb, SampleType::U16) if channels >= 4 => {
                ImageBuffer::<Rgba<u16>, _>::from_raw(w, h, pick_u16(&self.data, channels, 4))
                    .map(DynamicImage::ImageRgba16)
            }
            (ColorModel::Rgb, SampleType::U16) => {
                ImageBuffer::<Rgb<u16>, _>::from_raw(w, h, pick_u16(&self.data, channels, 3))
                    .map(DynamicImage::ImageRgb16)
            }
            (color, sample_type) => {
                return Err(DecodeError::unsupported(
                    "output conversion",
                    format!("{:?} with {:?} samples", color, sample_type),
                ))
            }
        };

        image.ok_or_else(|| {
            DecodeError::InvalidParameter(format!(
                "{} bytes do not fill a {}x{} image",
                self.data.len(),
                w,
                h
            ))
        })
    }
}

/// Keep the first `keep` of every `channels` bytes.
fn pick_channels(data: &[u8], channels: usize, keep: usize) -> Vec<u8> {
    if channels == keep {
        return data.to_vec();
    }
    data.chunks_exact(channels)
        .flat_map(|pixel| pixel[..keep].iter().copied())
        .collect()
}

/// Keep the first `keep` of every `channels` host-order u16 samples.
fn pick_u16(data: &[u8], channels: usize, keep: usize) -> Vec<u16> {
    data.chunks_exact(channels * 2)
        .flat_map(|pixel| {
            pixel[..keep * 2]
                .chunks_exact(2)
                .map(|s| u16::from_ne_bytes([s[0], s[1]]))
        })
        .collect()
}

// =============================================================================
// Collector
// =============================================================================

/// [`RowSink`] that stores every row in one buffer.
#[derive(Debug, Default)]
pub(crate) struct ImageCollector {
    info: Option<OutputInfo>,
    data: Vec<u8>,
    rows: u32,
}

impl RowSink for ImageCollector {
    fn begin(&mut self, info: &OutputInfo) -> Result<(), DecodeError> {
        self.data = vec![0; info.row_bytes() * info.height as usize];
        self.info = Some(info.clone());
        self.rows = 0;
        Ok(())
    }

    fn put_row(&mut self, y: u32, row: &[u8]) -> Result<(), DecodeError> {
        let info = self
            .info
            .as_ref()
            .ok_or_else(|| DecodeError::InvalidParameter("row before begin".to_string()))?;
        let len = info.row_bytes();
        if y >= info.height || row.len() != len {
            return Err(DecodeError::InvalidParameter(format!(
                "row {} with {} bytes does not fit {}x{} output ({} bytes per row)",
                y,
                row.len(),
                info.width,
                info.height,
                len
            )));
        }

        let start = y as usize * len;
        self.data[start..start + len].copy_from_slice(row);
        self.rows += 1;
        Ok(())
    }
}

impl ImageCollector {
    pub(crate) fn finish(self, warnings: Vec<Warning>) -> Result<DecodedImage, DecodeError> {
        let info = self
            .info
            .ok_or_else(|| DecodeError::InvalidParameter("decoder produced no output".to_string()))?;
        if self.rows != info.height {
            return Err(DecodeError::InvalidParameter(format!(
                "decoder produced {} of {} rows",
                self.rows, info.height
            )));
        }

        Ok(DecodedImage {
            width: info.width,
            height: info.height,
            layout: info.layout,
            data: self.data,
            palette: info.palette,
            warnings,
        })
    }
}
