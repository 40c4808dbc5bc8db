//! Decode-ready description of one TIFF image.
//!
//! [`TiffImage::from_directory`] resolves every tag the decoder needs,
//! filling in the documented defaults for optional tags, and rejects
//! structurally unusable directories. [`TiffImage::strip_tile_descriptors`]
//! then derives the list of compressed units.
//!
//! # Unit Layout
//!
//! ```text
//! Strips (PlanarConfiguration 1)      Tiles (PlanarConfiguration 1)
//! +------------------------+          +------+------+------+
//! | strip 0 (rps rows)     |          |  0   |  1   |  2   |
//! +------------------------+          +------+------+------+
//! | strip 1                |          |  3   |  4   |  5   |
//! +------------------------+          +------+------+------+
//! | strip 2 (may be short) |          edge tiles are padded to full size
//! +------------------------+
//! ```
//!
//! With PlanarConfiguration 2 the whole grid repeats once per sample plane.

use tracing::warn;

use crate::error::{DecodeError, TiffError, Warning};
use crate::format::directory::{Directory, Value};

use super::parser::ByteOrder;
use super::tags::{Compression, Photometric, Predictor, SampleFormat, TiffTag};

// =============================================================================
// Descriptors
// =============================================================================

/// How the image data is split into units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitLayout {
    Strips { rows_per_strip: u32 },
    Tiles { tile_width: u32, tile_height: u32 },
}

/// One compressed strip or tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripTileDescriptor {
    /// Position in the offsets array
    pub index: usize,
    /// Byte offset of the compressed data
    pub offset: u64,
    /// Compressed length, `None` when unknown
    pub byte_count: Option<u64>,
    /// Left edge in image pixels
    pub x: u32,
    /// Top edge in image pixels
    pub y: u32,
    /// Encoded width (full tile width for edge tiles)
    pub width: u32,
    /// Encoded height (short for the last strip)
    pub height: u32,
    /// Samples stored per pixel in this unit
    pub bands: usize,
    /// Sample plane for PlanarConfiguration 2, otherwise 0
    pub plane: usize,
}

// =============================================================================
// TiffImage
// =============================================================================

/// Resolved decoding parameters of one IFD.
#[derive(Debug, Clone)]
pub struct TiffImage {
    pub width: u32,
    pub height: u32,
    pub byte_order: ByteOrder,
    /// Bits of every sample (uniform across samples)
    pub bits_per_sample: u16,
    pub samples_per_pixel: u16,
    pub compression: Compression,
    pub photometric: Photometric,
    /// 1 = chunky, 2 = planar
    pub planar_configuration: u16,
    /// 1 = MSB first, 2 = LSB first
    pub fill_order: u16,
    pub predictor: Predictor,
    pub sample_format: SampleFormat,
    pub extra_samples: Vec<u16>,
    pub layout: UnitLayout,
    pub offsets: Vec<u64>,
    pub byte_counts: Option<Vec<u64>>,
    /// Raw 16-bit ColorMap, red then green then blue
    pub color_map: Option<Vec<u16>>,
    pub jpeg_tables: Option<Vec<u8>>,
    pub t4_options: u32,
    pub t6_options: u32,
    pub ink_set: u16,
    pub ycbcr_coefficients: [f64; 3],
    /// Horizontal, vertical
    pub ycbcr_subsampling: [u16; 2],
    pub ycbcr_positioning: u16,
    pub reference_black_white: Option<[f64; 6]>,
    /// Soft problems found while resolving tags
    pub warnings: Vec<Warning>,
}

/// Default luma coefficients (ITU-R BT.601)
pub const DEFAULT_YCBCR_COEFFICIENTS: [f64; 3] = [0.299, 0.587, 0.114];

impl TiffImage {
    /// Resolve tags from a directory, applying defaults.
    ///
    /// # Errors
    /// - `TiffError::MissingTag` for ImageWidth, ImageLength, offsets,
    ///   byte counts (except a single uncompressed strip) and ColorMap on
    ///   palette images
    /// - `TiffError::InvalidTagValue` for zero dimensions or short arrays
    /// - `DecodeError::Unsupported` for unknown compression, photometric,
    ///   predictor or sample format values
    pub fn from_directory(dir: &Directory, byte_order: ByteOrder) -> Result<Self, DecodeError> {
        let mut warnings = Vec::new();

        let width = require_u32(dir, TiffTag::ImageWidth, "ImageWidth")?;
        let height = require_u32(dir, TiffTag::ImageLength, "ImageLength")?;
        if width == 0 || height == 0 {
            return Err(TiffError::InvalidTagValue {
                tag: "ImageWidth/ImageLength",
                message: format!("image dimensions {}x{} must be non-zero", width, height),
            }
            .into());
        }

        let samples_per_pixel = get_u64(dir, TiffTag::SamplesPerPixel).unwrap_or(1) as u16;
        if samples_per_pixel == 0 {
            return Err(invalid("SamplesPerPixel", "must be at least 1"));
        }
        let bits_per_sample = resolve_bits_per_sample(dir, samples_per_pixel)?;

        let compression_raw = get_u64(dir, TiffTag::Compression).unwrap_or(1) as u16;
        let compression = Compression::from_u16(compression_raw)
            .filter(|c| c.is_supported())
            .ok_or_else(|| DecodeError::unsupported("compression", compression_raw))?;

        let photometric = match get_u64(dir, TiffTag::PhotometricInterpretation) {
            Some(raw) => Photometric::from_u16(raw as u16)
                .ok_or_else(|| DecodeError::unsupported("photometric interpretation", raw))?,
            None => {
                let assumed = if samples_per_pixel >= 3 {
                    Photometric::Rgb
                } else {
                    Photometric::BlackIsZero
                };
                let warning = Warning::MissingPhotometric(assumed.name());
                warn!("{}", warning);
                warnings.push(warning);
                assumed
            }
        };

        let planar_configuration = get_u64(dir, TiffTag::PlanarConfiguration).unwrap_or(1) as u16;
        if planar_configuration != 1 && planar_configuration != 2 {
            return Err(DecodeError::unsupported(
                "planar configuration",
                planar_configuration,
            ));
        }

        let fill_order = get_u64(dir, TiffTag::FillOrder).unwrap_or(1) as u16;
        if fill_order != 1 && fill_order != 2 {
            return Err(invalid("FillOrder", format!("unknown value {}", fill_order)));
        }

        let predictor_raw = get_u64(dir, TiffTag::Predictor).unwrap_or(1) as u16;
        let predictor = Predictor::from_u16(predictor_raw)
            .ok_or_else(|| DecodeError::unsupported("predictor", predictor_raw))?;

        let sample_format_raw = dir
            .value(TiffTag::SampleFormat.id())
            .and_then(Value::as_u64_vec)
            .and_then(|v| v.first().copied())
            .unwrap_or(1) as u16;
        let sample_format = SampleFormat::from_u16(sample_format_raw)
            .ok_or_else(|| DecodeError::unsupported("sample format", sample_format_raw))?;

        let layout = resolve_layout(dir, height)?;

        let mut image = TiffImage {
            width,
            height,
            byte_order,
            bits_per_sample,
            samples_per_pixel,
            compression,
            photometric,
            planar_configuration,
            fill_order,
            predictor,
            sample_format,
            extra_samples: get_u64_vec(dir, TiffTag::ExtraSamples)
                .unwrap_or_default()
                .into_iter()
                .map(|v| v as u16)
                .collect(),
            layout,
            offsets: Vec::new(),
            byte_counts: None,
            color_map: None,
            jpeg_tables: dir
                .value(TiffTag::JpegTables.id())
                .and_then(Value::as_bytes)
                .map(<[u8]>::to_vec),
            t4_options: get_u64(dir, TiffTag::T4Options).unwrap_or(0) as u32,
            t6_options: get_u64(dir, TiffTag::T6Options).unwrap_or(0) as u32,
            ink_set: get_u64(dir, TiffTag::InkSet).unwrap_or(1) as u16,
            ycbcr_coefficients: DEFAULT_YCBCR_COEFFICIENTS,
            ycbcr_subsampling: [2, 2],
            ycbcr_positioning: get_u64(dir, TiffTag::YCbCrPositioning).unwrap_or(1) as u16,
            reference_black_white: None,
            warnings,
        };

        image.resolve_units(dir)?;
        image.resolve_color_tags(dir)?;

        Ok(image)
    }

    /// Offsets and byte counts, checked against the unit grid.
    fn resolve_units(&mut self, dir: &Directory) -> Result<(), DecodeError> {
        let expected = self.unit_count();
        let (offsets_tag, counts_tag, offsets_name, counts_name) = match self.layout {
            UnitLayout::Strips { .. } => (
                TiffTag::StripOffsets,
                TiffTag::StripByteCounts,
                "StripOffsets",
                "StripByteCounts",
            ),
            UnitLayout::Tiles { .. } => (
                TiffTag::TileOffsets,
                TiffTag::TileByteCounts,
                "TileOffsets",
                "TileByteCounts",
            ),
        };

        let offsets =
            get_u64_vec(dir, offsets_tag).ok_or(TiffError::MissingTag(offsets_name))?;
        if offsets.len() < expected {
            return Err(invalid(
                offsets_name,
                format!("expected {} entries, found {}", expected, offsets.len()),
            ));
        }

        let byte_counts = match get_u64_vec(dir, counts_tag) {
            Some(counts) if counts.len() >= expected => Some(counts),
            Some(counts) => {
                return Err(invalid(
                    counts_name,
                    format!("expected {} entries, found {}", expected, counts.len()),
                ))
            }
            None if expected == 1
                && self.compression == Compression::None
                && matches!(self.layout, UnitLayout::Strips { .. }) =>
            {
                let derived = self.unit_len()?;
                Some(vec![derived as u64])
            }
            None => return Err(TiffError::MissingTag(counts_name).into()),
        };

        self.offsets = offsets;
        self.byte_counts = byte_counts;
        Ok(())
    }

    /// ColorMap, YCbCr and Lab related tags.
    fn resolve_color_tags(&mut self, dir: &Directory) -> Result<(), DecodeError> {
        if self.photometric == Photometric::Palette {
            let map = get_u64_vec(dir, TiffTag::ColorMap).ok_or(TiffError::MissingTag("ColorMap"))?;
            let entries = 1usize << self.bits_per_sample.min(16);
            if map.len() < 3 * entries {
                return Err(invalid(
                    "ColorMap",
                    format!(
                        "expected {} values for {} bits, found {}",
                        3 * entries,
                        self.bits_per_sample,
                        map.len()
                    ),
                ));
            }
            self.color_map = Some(map.into_iter().map(|v| v as u16).collect());
        }

        if let Some(coefficients) = dir
            .value(TiffTag::YCbCrCoefficients.id())
            .and_then(Value::as_f64_vec)
        {
            if coefficients.len() >= 3 && coefficients[1] != 0.0 {
                self.ycbcr_coefficients = [coefficients[0], coefficients[1], coefficients[2]];
            }
        }

        if let Some(sub) = get_u64_vec(dir, TiffTag::YCbCrSubSampling) {
            if sub.len() >= 2 {
                let (h, v) = (sub[0] as u16, sub[1] as u16);
                let valid = [1, 2, 4];
                if !valid.contains(&h) || !valid.contains(&v) || v > h {
                    return Err(invalid(
                        "YCbCrSubSampling",
                        format!("unsupported factors {}x{}", h, v),
                    ));
                }
                self.ycbcr_subsampling = [h, v];
            }
        }

        if let Some(rbw) = dir
            .value(TiffTag::ReferenceBlackWhite.id())
            .and_then(Value::as_f64_vec)
        {
            if rbw.len() >= 6 {
                self.reference_black_white = Some([rbw[0], rbw[1], rbw[2], rbw[3], rbw[4], rbw[5]]);
            }
        }

        if self.has_subsampled_chroma() && self.ycbcr_positioning == 2 {
            let warning = Warning::YCbCrPositioning(self.ycbcr_positioning);
            warn!("{}", warning);
            self.warnings.push(warning);
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Geometry
    // -------------------------------------------------------------------------

    /// Number of sample planes stored separately.
    #[inline]
    pub fn planes(&self) -> usize {
        if self.planar_configuration == 2 {
            self.samples_per_pixel as usize
        } else {
            1
        }
    }

    /// Samples stored per pixel inside one unit.
    #[inline]
    pub fn samples_per_unit(&self) -> usize {
        if self.planar_configuration == 2 {
            1
        } else {
            self.samples_per_pixel as usize
        }
    }

    /// (units across, units down) for one plane.
    pub fn unit_grid(&self) -> (u32, u32) {
        match self.layout {
            UnitLayout::Strips { rows_per_strip } => (1, self.height.div_ceil(rows_per_strip)),
            UnitLayout::Tiles {
                tile_width,
                tile_height,
            } => (
                self.width.div_ceil(tile_width),
                self.height.div_ceil(tile_height),
            ),
        }
    }

    /// Total number of units over all planes.
    ///
    /// Saturates; offset arrays can never be that long, so an absurd grid
    /// fails the entry count check instead of wrapping.
    pub fn unit_count(&self) -> usize {
        let (across, down) = self.unit_grid();
        (across as usize)
            .saturating_mul(down as usize)
            .saturating_mul(self.planes())
    }

    /// (width, rows) of a full unit; edge units may be shorter.
    pub fn unit_size(&self) -> (u32, u32) {
        match self.layout {
            UnitLayout::Strips { rows_per_strip } => (self.width, rows_per_strip),
            UnitLayout::Tiles {
                tile_width,
                tile_height,
            } => (tile_width, tile_height),
        }
    }

    /// Byte length of one decoded row of a unit `unit_width` pixels wide,
    /// or `None` when it does not fit in `usize`.
    pub fn unit_row_bytes(&self, unit_width: u32) -> Option<usize> {
        let bits = (unit_width as usize)
            .checked_mul(self.samples_per_unit())?
            .checked_mul(self.bits_per_sample as usize)?;
        Some(bits.div_ceil(8))
    }

    /// Decoded byte length of a full unit.
    ///
    /// # Errors
    /// `InvalidTagValue` when ImageWidth, TileWidth, RowsPerStrip,
    /// SamplesPerPixel and BitsPerSample multiply past `usize`.
    pub fn unit_len(&self) -> Result<usize, DecodeError> {
        let (width, rows) = self.unit_size();
        self.unit_row_bytes(width)
            .and_then(|row| row.checked_mul(rows as usize))
            .ok_or_else(|| {
                invalid(
                    "BitsPerSample",
                    format!(
                        "{} x {} units of {} x {}-bit samples overflow",
                        width,
                        rows,
                        self.samples_per_unit(),
                        self.bits_per_sample
                    ),
                )
            })
    }

    /// Whether the image carries subsampled YCbCr that the decoder must
    /// upsample itself (JPEG does its own).
    pub fn has_subsampled_chroma(&self) -> bool {
        self.photometric == Photometric::YCbCr
            && self.compression != Compression::Jpeg
            && self.ycbcr_subsampling != [1, 1]
    }

    /// Derive the unit descriptors.
    pub fn strip_tile_descriptors(&self) -> Vec<StripTileDescriptor> {
        let (across, down) = self.unit_grid();
        let per_plane = across as usize * down as usize;
        let bands = self.samples_per_unit();
        let mut descriptors = Vec::with_capacity(self.unit_count());

        for index in 0..self.unit_count() {
            let plane = index / per_plane;
            let within = index % per_plane;
            let column = (within % across as usize) as u32;
            let row = (within / across as usize) as u32;

            let (x, y, width, height) = match self.layout {
                UnitLayout::Strips { rows_per_strip } => {
                    let y = row * rows_per_strip;
                    (0, y, self.width, rows_per_strip.min(self.height - y))
                }
                UnitLayout::Tiles {
                    tile_width,
                    tile_height,
                } => (column * tile_width, row * tile_height, tile_width, tile_height),
            };

            descriptors.push(StripTileDescriptor {
                index,
                offset: self.offsets.get(index).copied().unwrap_or(0),
                byte_count: self
                    .byte_counts
                    .as_ref()
                    .and_then(|c| c.get(index).copied()),
                x,
                y,
                width,
                height,
                bands,
                plane,
            });
        }

        descriptors
    }
}

// =============================================================================
// Tag helpers
// =============================================================================

fn get_u64(dir: &Directory, tag: TiffTag) -> Option<u64> {
    dir.value(tag.id()).and_then(Value::as_u64)
}

fn get_u64_vec(dir: &Directory, tag: TiffTag) -> Option<Vec<u64>> {
    dir.value(tag.id()).and_then(Value::as_u64_vec)
}

fn require_u32(dir: &Directory, tag: TiffTag, name: &'static str) -> Result<u32, DecodeError> {
    let value = get_u64(dir, tag).ok_or(TiffError::MissingTag(name))?;
    u32::try_from(value).map_err(|_| invalid(name, format!("{} does not fit in 32 bits", value)))
}

fn invalid(tag: &'static str, message: impl Into<String>) -> DecodeError {
    TiffError::InvalidTagValue {
        tag,
        message: message.into(),
    }
    .into()
}

/// BitsPerSample may hold one value for all samples or one per sample.
fn resolve_bits_per_sample(dir: &Directory, samples: u16) -> Result<u16, DecodeError> {
    let values = get_u64_vec(dir, TiffTag::BitsPerSample).unwrap_or_else(|| vec![1]);
    let first = values.first().copied().unwrap_or(1);
    if values.iter().take(samples as usize).any(|&b| b != first) {
        return Err(DecodeError::unsupported(
            "bit depth",
            format!("mixed sample depths {:?}", values),
        ));
    }
    match first {
        1 | 2 | 4 | 8 | 16 | 24 | 32 | 64 => Ok(first as u16),
        other => Err(DecodeError::unsupported("bit depth", other)),
    }
}

fn resolve_layout(dir: &Directory, height: u32) -> Result<UnitLayout, DecodeError> {
    let tile_width = get_u64(dir, TiffTag::TileWidth);
    let tile_height = get_u64(dir, TiffTag::TileLength);

    match (tile_width, tile_height) {
        (Some(tw), Some(th)) => {
            if tw == 0 || th == 0 || tw > u32::MAX as u64 || th > u32::MAX as u64 {
                return Err(invalid(
                    "TileWidth/TileLength",
                    format!("invalid tile dimensions {}x{}", tw, th),
                ));
            }
            Ok(UnitLayout::Tiles {
                tile_width: tw as u32,
                tile_height: th as u32,
            })
        }
        (Some(_), None) => Err(TiffError::MissingTag("TileLength").into()),
        (None, Some(_)) => Err(TiffError::MissingTag("TileWidth").into()),
        (None, None) => {
            let rows = get_u64(dir, TiffTag::RowsPerStrip).unwrap_or(height as u64);
            if rows == 0 {
                return Err(invalid("RowsPerStrip", "must be non-zero"));
            }
            Ok(UnitLayout::Strips {
                rows_per_strip: rows.min(height as u64) as u32,
            })
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::format::directory::Entry;

    fn dir_with(entries: &[(TiffTag, Value)]) -> Directory {
        let mut dir = Directory::new();
        for (tag, value) in entries {
            let count = value.len() as u64;
            dir.insert(Entry::new(tag.id(), 3, count, value.clone()))
                .unwrap();
        }
        dir
    }

    fn gray_strips(width: u16, height: u16, rows: u16, strips: usize) -> Vec<(TiffTag, Value)> {
        vec![
            (TiffTag::ImageWidth, Value::Shorts(vec![width])),
            (TiffTag::ImageLength, Value::Shorts(vec![height])),
            (TiffTag::BitsPerSample, Value::Shorts(vec![8])),
            (TiffTag::PhotometricInterpretation, Value::Shorts(vec![1])),
            (TiffTag::RowsPerStrip, Value::Shorts(vec![rows])),
            (TiffTag::StripOffsets, Value::Longs(vec![100; strips])),
            (TiffTag::StripByteCounts, Value::Longs(vec![10; strips])),
        ]
    }

    // -------------------------------------------------------------------------
    // Defaults
    // -------------------------------------------------------------------------

    #[test]
    fn test_defaults_applied() {
        let dir = dir_with(&[
            (TiffTag::ImageWidth, Value::Shorts(vec![16])),
            (TiffTag::ImageLength, Value::Shorts(vec![4])),
            (TiffTag::StripOffsets, Value::Longs(vec![8])),
        ]);
        let image = TiffImage::from_directory(&dir, ByteOrder::LittleEndian).unwrap();

        assert_eq!(image.compression, Compression::None);
        assert_eq!(image.bits_per_sample, 1);
        assert_eq!(image.samples_per_pixel, 1);
        assert_eq!(image.planar_configuration, 1);
        assert_eq!(image.fill_order, 1);
        assert_eq!(image.predictor, Predictor::None);
        assert_eq!(image.sample_format, SampleFormat::Uint);
        assert_eq!(image.ycbcr_subsampling, [2, 2]);
        assert_eq!(image.layout, UnitLayout::Strips { rows_per_strip: 4 });
        // Single uncompressed strip: 16 bits per row, 4 rows
        assert_eq!(image.byte_counts, Some(vec![8]));
        assert_eq!(image.photometric, Photometric::BlackIsZero);
        assert_eq!(
            image.warnings,
            vec![Warning::MissingPhotometric("BlackIsZero")]
        );
    }

    #[test]
    fn test_missing_photometric_rgb() {
        let mut entries = gray_strips(4, 4, 4, 1);
        entries.retain(|(t, _)| *t != TiffTag::PhotometricInterpretation);
        entries.push((TiffTag::SamplesPerPixel, Value::Shorts(vec![3])));
        let image = TiffImage::from_directory(&dir_with(&entries), ByteOrder::BigEndian).unwrap();
        assert_eq!(image.photometric, Photometric::Rgb);
    }

    // -------------------------------------------------------------------------
    // Required tags
    // -------------------------------------------------------------------------

    #[test]
    fn test_missing_required_tags() {
        let dir = dir_with(&[(TiffTag::ImageWidth, Value::Shorts(vec![16]))]);
        let err = TiffImage::from_directory(&dir, ByteOrder::LittleEndian).unwrap_err();
        assert!(matches!(err, DecodeError::Tiff(TiffError::MissingTag("ImageLength"))));

        let mut entries = gray_strips(8, 8, 4, 2);
        entries.retain(|(t, _)| *t != TiffTag::StripByteCounts);
        let err = TiffImage::from_directory(&dir_with(&entries), ByteOrder::LittleEndian)
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Tiff(TiffError::MissingTag("StripByteCounts"))
        ));
    }

    #[test]
    fn test_palette_requires_color_map() {
        let mut entries = gray_strips(8, 8, 8, 1);
        entries.retain(|(t, _)| *t != TiffTag::PhotometricInterpretation);
        entries.push((TiffTag::PhotometricInterpretation, Value::Shorts(vec![3])));
        let err = TiffImage::from_directory(&dir_with(&entries), ByteOrder::LittleEndian)
            .unwrap_err();
        assert!(matches!(err, DecodeError::Tiff(TiffError::MissingTag("ColorMap"))));

        entries.push((TiffTag::ColorMap, Value::Shorts(vec![0; 3 * 256])));
        let image =
            TiffImage::from_directory(&dir_with(&entries), ByteOrder::LittleEndian).unwrap();
        assert_eq!(image.color_map.as_ref().map(Vec::len), Some(768));
    }

    #[test]
    fn test_short_offsets_array() {
        let entries = gray_strips(8, 10, 4, 2);
        let err = TiffImage::from_directory(&dir_with(&entries), ByteOrder::LittleEndian)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Structural);
    }

    #[test]
    fn test_unsupported_values() {
        let mut entries = gray_strips(8, 8, 8, 1);
        entries.push((TiffTag::Compression, Value::Shorts(vec![6])));
        let err = TiffImage::from_directory(&dir_with(&entries), ByteOrder::LittleEndian)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Unsupported);

        let mut entries = gray_strips(8, 8, 8, 1);
        entries.push((TiffTag::Predictor, Value::Shorts(vec![9])));
        let err = TiffImage::from_directory(&dir_with(&entries), ByteOrder::LittleEndian)
            .unwrap_err();
        assert!(matches!(err, DecodeError::Unsupported { feature: "predictor", .. }));
    }

    // -------------------------------------------------------------------------
    // Descriptors
    // -------------------------------------------------------------------------

    #[test]
    fn test_strip_descriptors() {
        let image =
            TiffImage::from_directory(&dir_with(&gray_strips(8, 10, 4, 3)), ByteOrder::LittleEndian)
                .unwrap();
        let units = image.strip_tile_descriptors();
        assert_eq!(units.len(), 3);
        assert_eq!((units[2].y, units[2].height), (8, 2));
        assert_eq!(units[1].byte_count, Some(10));
        assert_eq!(image.unit_row_bytes(8), Some(8));
    }

    #[test]
    fn test_derived_byte_count_overflow() {
        let dir = dir_with(&[
            (TiffTag::ImageWidth, Value::Longs(vec![u32::MAX])),
            (TiffTag::ImageLength, Value::Longs(vec![u32::MAX])),
            (TiffTag::BitsPerSample, Value::Shorts(vec![64; 4])),
            (TiffTag::SamplesPerPixel, Value::Shorts(vec![4])),
            (TiffTag::PhotometricInterpretation, Value::Shorts(vec![5])),
            (TiffTag::StripOffsets, Value::Longs(vec![8])),
        ]);

        assert!(matches!(
            TiffImage::from_directory(&dir, ByteOrder::LittleEndian),
            Err(DecodeError::Tiff(TiffError::InvalidTagValue { .. }))
        ));
    }

    #[test]
    fn test_planar_tile_descriptors() {
        let dir = dir_with(&[
            (TiffTag::ImageWidth, Value::Shorts(vec![20])),
            (TiffTag::ImageLength, Value::Shorts(vec![10])),
            (TiffTag::BitsPerSample, Value::Shorts(vec![8, 8, 8])),
            (TiffTag::SamplesPerPixel, Value::Shorts(vec![3])),
            (TiffTag::PhotometricInterpretation, Value::Shorts(vec![2])),
            (TiffTag::PlanarConfiguration, Value::Shorts(vec![2])),
            (TiffTag::TileWidth, Value::Shorts(vec![16])),
            (TiffTag::TileLength, Value::Shorts(vec![16])),
            (TiffTag::TileOffsets, Value::Longs((0..6).collect())),
            (TiffTag::TileByteCounts, Value::Longs(vec![256; 6])),
        ]);
        let image = TiffImage::from_directory(&dir, ByteOrder::LittleEndian).unwrap();
        assert_eq!(image.unit_grid(), (2, 1));
        assert_eq!(image.unit_count(), 6);

        let units = image.strip_tile_descriptors();
        assert_eq!(units[3].plane, 1);
        assert_eq!((units[3].x, units[3].y), (16, 0));
        assert_eq!(units[3].bands, 1);
        assert_eq!(units[5].offset, 5);
        assert_eq!(image.unit_row_bytes(16), Some(16));
    }

    #[test]
    fn test_ycbcr_tags() {
        let mut entries = gray_strips(8, 8, 8, 1);
        entries.retain(|(t, _)| *t != TiffTag::PhotometricInterpretation);
        entries.extend([
            (TiffTag::PhotometricInterpretation, Value::Shorts(vec![6])),
            (TiffTag::SamplesPerPixel, Value::Shorts(vec![3])),
            (TiffTag::YCbCrSubSampling, Value::Shorts(vec![2, 1])),
            (TiffTag::YCbCrPositioning, Value::Shorts(vec![2])),
            (
                TiffTag::ReferenceBlackWhite,
                Value::Rationals(vec![(0, 1), (255, 1), (128, 1), (255, 1), (128, 1), (255, 1)]),
            ),
        ]);
        let image =
            TiffImage::from_directory(&dir_with(&entries), ByteOrder::LittleEndian).unwrap();
        assert_eq!(image.ycbcr_subsampling, [2, 1]);
        assert!(image.has_subsampled_chroma());
        assert_eq!(
            image.reference_black_white,
            Some([0.0, 255.0, 128.0, 255.0, 128.0, 255.0])
        );
        assert_eq!(image.warnings, vec![Warning::YCbCrPositioning(2)]);
    }
}
