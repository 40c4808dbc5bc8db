//! Decode pipeline: compressed units in, normalized pixel rows out.
//!
//! The decoders pull compressed bytes from a [`RangeReader`], run them
//! through the codec, predictor, bitplane and palette/color stages, and hand
//! every finished row to a caller-supplied [`RowSink`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       decode_to_image()                      │
//! │  detect_format ──► TiffFile / IffFile ──► decode_tiff /      │
//! │                                           decode_iff         │
//! │                                              │               │
//! │  unit bytes ─► codec ─► predictor ─► samples/planes          │
//! │            ─► palette / color ─► crop + subsample ─► sink    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Output rows
//!
//! Rows are `width * channels` samples. Samples of 8 bits or fewer take one
//! byte each; wider samples are stored in host byte order. The row layout is
//! announced once through [`RowSink::begin`] before the first row.

mod iff_body;
mod output;
mod strip_tile;

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::codec::LzwVariant;
use crate::error::DecodeError;
use crate::format::detect::{detect_format, ContainerFormat};
use crate::format::iff::IffFile;
use crate::format::tiff::TiffFile;
use crate::io::RangeReader;
use crate::palette::{Palette, DEFAULT_PALETTE_CACHE_CAPACITY};

pub use iff_body::decode_iff;
pub use output::DecodedImage;
pub use strip_tile::decode_tiff;

use output::ImageCollector;

// =============================================================================
// Region
// =============================================================================

/// A rectangle of source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl FromStr for Region {
    type Err = String;

    /// Parse `x,y,width,height`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid region '{}': {}", s, e))?;

        match parts.as_slice() {
            &[x, y, width, height] if width > 0 && height > 0 => {
                Ok(Region::new(x, y, width, height))
            }
            &[_, _, _, _] => Err(format!("region '{}' must have a non-zero size", s)),
            _ => Err(format!(
                "invalid region '{}': expected x,y,width,height",
                s
            )),
        }
    }
}

// =============================================================================
// Decode Parameters
// =============================================================================

/// Default upper bound on the decoded size of one strip, tile or row buffer.
pub const DEFAULT_MAX_UNIT_BYTES: usize = 1 << 30;

/// Caller-controlled decode settings.
#[derive(Debug, Clone)]
pub struct DecodeParams {
    /// Source rectangle to decode; the whole image when `None`
    pub region: Option<Region>,

    /// Keep every n-th column of the region
    pub x_subsampling: u32,

    /// Keep every n-th row of the region
    pub y_subsampling: u32,

    /// Force an LZW bit order instead of sniffing each unit
    pub lzw_variant: Option<LzwVariant>,

    /// Row palettes kept for random access into multi-palette images
    pub palette_cache_capacity: usize,

    /// Largest decoded strip, tile or region row the decoder will allocate
    pub max_unit_bytes: usize,

    /// Set from any thread to stop decoding between rows
    pub abort: Arc<AtomicBool>,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            region: None,
            x_subsampling: 1,
            y_subsampling: 1,
            lzw_variant: None,
            palette_cache_capacity: DEFAULT_PALETTE_CACHE_CAPACITY,
            max_unit_bytes: DEFAULT_MAX_UNIT_BYTES,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl DecodeParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn with_subsampling(mut self, x: u32, y: u32) -> Self {
        self.x_subsampling = x;
        self.y_subsampling = y;
        self
    }

    pub fn with_lzw_variant(mut self, variant: LzwVariant) -> Self {
        self.lzw_variant = Some(variant);
        self
    }

    pub fn with_palette_cache_capacity(mut self, capacity: usize) -> Self {
        self.palette_cache_capacity = capacity;
        self
    }

    pub fn with_max_unit_bytes(mut self, limit: usize) -> Self {
        self.max_unit_bytes = limit;
        self
    }

    /// `Unsupported` when a buffer of `len` bytes would exceed `max_unit_bytes`.
    pub fn check_unit_len(&self, what: &'static str, len: usize) -> Result<(), DecodeError> {
        if len > self.max_unit_bytes {
            return Err(DecodeError::unsupported(
                what,
                format!("{} bytes exceeds the {} byte limit", len, self.max_unit_bytes),
            ));
        }
        Ok(())
    }

    /// Share an abort flag with the caller.
    pub fn with_abort(mut self, abort: Arc<AtomicBool>) -> Self {
        self.abort = abort;
        self
    }

    /// `Err(Aborted)` once the abort flag is set.
    pub fn check_abort(&self) -> Result<(), DecodeError> {
        if self.abort.load(Ordering::Relaxed) {
            return Err(DecodeError::Aborted);
        }
        Ok(())
    }

    /// Resolve the region and subsampling against an image size.
    ///
    /// # Errors
    /// `InvalidParameter` for zero subsampling or a region that is empty or
    /// reaches outside the image.
    pub fn window(&self, width: u32, height: u32) -> Result<Window, DecodeError> {
        if self.x_subsampling == 0 || self.y_subsampling == 0 {
            return Err(DecodeError::InvalidParameter(format!(
                "subsampling {}x{} must be at least 1",
                self.x_subsampling, self.y_subsampling
            )));
        }

        let region = self.region.unwrap_or(Region::new(0, 0, width, height));
        let fits = region.width > 0
            && region.height > 0
            && region.x.checked_add(region.width).is_some_and(|r| r <= width)
            && region.y.checked_add(region.height).is_some_and(|b| b <= height);
        if !fits {
            return Err(DecodeError::InvalidParameter(format!(
                "region {},{} {}x{} outside image {}x{}",
                region.x, region.y, region.width, region.height, width, height
            )));
        }

        Ok(Window {
            region,
            x_step: self.x_subsampling,
            y_step: self.y_subsampling,
        })
    }
}

/// A validated region plus subsampling steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub region: Region,
    pub x_step: u32,
    pub y_step: u32,
}

impl Window {
    /// Output width in pixels.
    pub fn width(&self) -> u32 {
        self.region.width.div_ceil(self.x_step)
    }

    /// Output height in rows.
    pub fn height(&self) -> u32 {
        self.region.height.div_ceil(self.y_step)
    }

    /// Output row for source row `y`, if that row is kept.
    pub fn output_row(&self, y: u32) -> Option<u32> {
        let offset = y.checked_sub(self.region.y)?;
        if offset >= self.region.height || offset % self.y_step != 0 {
            return None;
        }
        Some(offset / self.y_step)
    }

    /// Whether any kept row lies in `y..y + rows`.
    pub fn keeps_any_row(&self, y: u32, rows: u32) -> bool {
        let top = self.region.y as u64;
        let start = (y as u64).max(top);
        let end = (y as u64 + rows as u64).min(top + self.region.height as u64);
        if start >= end {
            return false;
        }
        let step = self.y_step as u64;
        let first_kept = top + (start - top).div_ceil(step) * step;
        first_kept < end
    }

    /// Whether the source columns `x..x + width` overlap the region.
    pub fn overlaps_columns(&self, x: u32, width: u32) -> bool {
        x < self.region.x + self.region.width && x.saturating_add(width) > self.region.x
    }

    /// Source columns that end up in the output, left to right.
    pub fn columns(&self) -> impl Iterator<Item = u32> + '_ {
        (self.region.x..self.region.x + self.region.width).step_by(self.x_step as usize)
    }
}

// =============================================================================
// Pixel Layout
// =============================================================================

/// Color model of the output samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColorModel {
    /// Palette indices, see [`OutputInfo::palette`]
    Indexed,
    Gray,
    Rgb,
    /// Ink values passed through unconverted
    Cmyk,
}

impl ColorModel {
    /// Channels before any extra (alpha) samples.
    pub fn base_channels(self) -> usize {
        match self {
            ColorModel::Indexed | ColorModel::Gray => 1,
            ColorModel::Rgb => 3,
            ColorModel::Cmyk => 4,
        }
    }
}

/// Storage type of one output sample.
///
/// Signed integers are carried as the unsigned type of the same width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SampleType {
    U8,
    U16,
    U32,
    U64,
    F16,
    F32,
    F64,
}

impl SampleType {
    pub fn bytes(self) -> usize {
        match self {
            SampleType::U8 => 1,
            SampleType::U16 | SampleType::F16 => 2,
            SampleType::U32 | SampleType::F32 => 4,
            SampleType::U64 | SampleType::F64 => 8,
        }
    }
}

/// Shape of one output pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelLayout {
    pub color: ColorModel,
    pub channels: usize,
    pub sample_type: SampleType,
}

impl PixelLayout {
    pub fn new(color: ColorModel, channels: usize, sample_type: SampleType) -> Self {
        Self {
            color,
            channels,
            sample_type,
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.channels * self.sample_type.bytes()
    }

    /// Whether a channel beyond the color channels is present.
    pub fn has_alpha(&self) -> bool {
        self.channels > self.color.base_channels()
    }
}

/// What a sink receives before the first row.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputInfo {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub palette: Option<Palette>,
}

impl OutputInfo {
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.layout.bytes_per_pixel()
    }
}

// =============================================================================
// RowSink
// =============================================================================

/// Receiver of decoded rows.
///
/// Rows arrive in increasing `y` order, numbered in output coordinates.
pub trait RowSink {
    /// Called once with the output shape before any row.
    fn begin(&mut self, info: &OutputInfo) -> Result<(), DecodeError> {
        let _ = info;
        Ok(())
    }

    fn put_row(&mut self, y: u32, row: &[u8]) -> Result<(), DecodeError>;
}

// =============================================================================
// Entry Point
// =============================================================================

/// Detect the container, decode image `image_index` and collect the rows.
///
/// IFF files hold a single image, so only index 0 is valid for them.
pub fn decode_to_image<R: RangeReader + ?Sized>(
    reader: &R,
    image_index: usize,
    params: &DecodeParams,
) -> Result<DecodedImage, DecodeError> {
    let format = detect_format(reader)?;
    debug!(source = reader.identifier(), format = %format.name(), image_index, "Decoding image");

    let mut collector = ImageCollector::default();
    let warnings = match format {
        ContainerFormat::Iff(_) => {
            if image_index != 0 {
                return Err(DecodeError::InvalidParameter(format!(
                    "image index {} out of range (IFF holds 1 image)",
                    image_index
                )));
            }
            let file = IffFile::open(reader)?;
            let mut warnings = file.warnings.clone();
            warnings.extend(decode_iff(reader, &file.form, params, &mut collector)?);
            warnings
        }
        ContainerFormat::Tiff | ContainerFormat::BigTiff => {
            let file = TiffFile::open(reader)?;
            let image = file.image(image_index)?;
            decode_tiff(reader, &image, params, &mut collector)?
        }
    };

    collector.finish(warnings)
}

// =============================================================================
// Tests
// =============================================================================
