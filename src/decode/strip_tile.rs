//! TIFF strip and tile decoding.
//!
//! Units are decoded one band at a time, where a band is one row of the
//! unit grid. Every unit of the band that overlaps the region is decoded
//! for every plane; the band's rows are then assembled into region-wide
//! chunky rows, subsampled, color converted and handed to the sink.
//!
//! ```text
//! unit bytes ─► FillOrder ─► codec ─► YCbCr upsample | predictor ─► invert
//!            ─► sample extraction (planes interleaved, sub-byte expanded)
//!            ─► column subsampling ─► YCbCr / Lab ─► sink
//! ```

use bytes::Bytes;
use tracing::{debug, warn};

use crate::codec::{jpeg, CompressionCodec, FaxOptions};
use crate::color::{
    colormap_to_palette, invert, subsampled_unit_len, upsample_unit, LabConverter, LabEncoding,
    YCbCrConverter,
};
use crate::error::{DecodeError, TiffError, Warning};
use crate::format::tiff::{
    validate_image, Compression, Photometric, Predictor, SampleFormat, StripTileDescriptor,
    TiffImage, UnitLayout,
};
use crate::io::{reverse_fill_order, RangeReader};
use crate::palette::Palette;
use crate::predictor::PredictorFilter;

use super::{ColorModel, DecodeParams, OutputInfo, PixelLayout, RowSink, SampleType, Window};

// =============================================================================
// Entry Point
// =============================================================================

/// Decode one TIFF image into `sink`.
///
/// Returns the soft warnings raised while decoding, including those
/// recorded when the image was resolved.
///
/// # Errors
/// - `Unsupported` for sample layouts and color models the decoder rejects
/// - `Codec` with the unit index and offset when a unit fails to decode
/// - `InvalidParameter` for a region outside the image
/// - `Aborted` when the abort flag is raised
pub fn decode_tiff<R: RangeReader + ?Sized>(
    reader: &R,
    image: &TiffImage,
    params: &DecodeParams,
    sink: &mut dyn RowSink,
) -> Result<Vec<Warning>, DecodeError> {
    let mut warnings = validate_image(image).into_result()?;
    let window = params.window(image.width, image.height)?;
    let plan = TiffPlan::new(image, params, &mut warnings)?;

    debug!(
        source = reader.identifier(),
        width = image.width,
        height = image.height,
        compression = image.compression.name(),
        photometric = image.photometric.name(),
        units = image.unit_count(),
        "Decoding TIFF image"
    );

    let info = OutputInfo {
        width: window.width(),
        height: window.height(),
        layout: plan.layout,
        palette: plan.palette.clone(),
    };
    sink.begin(&info)?;

    let descriptors = image.strip_tile_descriptors();
    let (across, down) = image.unit_grid();
    let (across, down) = (across as usize, down as usize);
    let per_plane = across * down;

    let region_row_len = (window.region.width as usize)
        .checked_mul(plan.layout.bytes_per_pixel())
        .unwrap_or(usize::MAX);
    params.check_unit_len("region row size", region_row_len)?;
    let mut assembled = vec![0u8; region_row_len];

    for band in 0..down {
        let Some(first) = descriptors.get(band * across) else {
            break;
        };
        let band_y = first.y;
        let band_rows = first.height.min(image.height - band_y);
        if !window.keeps_any_row(band_y, band_rows) {
            continue;
        }
        params.check_abort()?;

        let mut units = Vec::new();
        for plane in 0..image.planes() {
            for column in 0..across {
                let Some(descriptor) = descriptors.get(plane * per_plane + band * across + column)
                else {
                    continue;
                };
                if !window.overlaps_columns(descriptor.x, descriptor.width) {
                    continue;
                }
                params.check_abort()?;
                let data = plan.decode_unit(reader, descriptor, &mut warnings)?;
                units.push((descriptor, data));
            }
        }

        for y in band_y..band_y + band_rows {
            let Some(out_y) = window.output_row(y) else {
                continue;
            };
            params.check_abort()?;

            assembled.fill(0);
            for (descriptor, data) in &units {
                plan.place_row(descriptor, data, y - descriptor.y, &window, &mut assembled);
            }
            let row = plan.finish_row(&assembled, &window);
            sink.put_row(out_y, &row)?;
        }
    }

    Ok(warnings)
}

// =============================================================================
// Decode Plan
// =============================================================================

/// Color conversion applied to finished rows.
enum ColorStep {
    None,
    YCbCr(YCbCrConverter),
    Lab(LabConverter),
}

/// Everything resolved once per image before units are decoded.
struct TiffPlan<'a> {
    image: &'a TiffImage,
    codec: CompressionCodec,
    predictor: Option<PredictorFilter>,
    /// (horizontal, vertical) chroma subsampling to undo per unit
    subsampling: Option<(usize, usize)>,
    /// Bytes per row of decoded (and upsampled) unit data; every unit of
    /// an image has the same width
    row_len: usize,
    invert: bool,
    /// Scale 1/2/4-bit samples to the full 8-bit range
    scale_sub_byte: bool,
    color: ColorStep,
    layout: PixelLayout,
    palette: Option<Palette>,
}

impl<'a> TiffPlan<'a> {
    fn new(
        image: &'a TiffImage,
        params: &DecodeParams,
        warnings: &mut Vec<Warning>,
    ) -> Result<Self, DecodeError> {
        let sample_type = sample_type(image)?;
        let (unit_width, _) = image.unit_size();

        let codec = match image.compression {
            Compression::None => CompressionCodec::None,
            Compression::CcittRle => CompressionCodec::CcittModifiedHuffman {
                columns: unit_width,
            },
            Compression::CcittT4 => CompressionCodec::CcittG3 {
                columns: unit_width,
                options: FaxOptions::from_t4(image.t4_options),
            },
            Compression::CcittT6 => CompressionCodec::CcittG4 {
                columns: unit_width,
                options: FaxOptions::from_t6(image.t6_options),
            },
            Compression::Lzw => CompressionCodec::Lzw(params.lzw_variant),
            Compression::Jpeg => CompressionCodec::Jpeg {
                tables: image.jpeg_tables.clone().map(Bytes::from),
            },
            Compression::Deflate | Compression::AdobeDeflate => CompressionCodec::Deflate,
            Compression::PackBits => CompressionCodec::PackBits,
            other @ (Compression::OldJpeg | Compression::Jpeg2000) => {
                return Err(DecodeError::unsupported("compression", other.name()))
            }
        };

        let subsampling = image.has_subsampled_chroma().then(|| {
            let [h, v] = image.ycbcr_subsampling;
            (h as usize, v as usize)
        });
        let row_len = unit_buffers(image, subsampling, params)?;

        let predictor = match image.predictor {
            Predictor::None => None,
            _ if subsampling.is_some() => {
                return Err(DecodeError::unsupported(
                    "predictor",
                    "differencing on subsampled YCbCr",
                ))
            }
            _ if matches!(codec, CompressionCodec::Jpeg { .. }) => None,
            predictor => Some(PredictorFilter::new(
                predictor,
                unit_width as usize,
                image.samples_per_unit(),
                image.bits_per_sample,
                image.byte_order,
            )?),
        };

        let color = resolve_color(image, sample_type, codec.is_bilevel_only(), warnings)?;
        let layout = PixelLayout::new(color.model, image.samples_per_pixel as usize, sample_type);

        Ok(Self {
            image,
            codec,
            predictor,
            subsampling,
            row_len,
            invert: color.invert,
            scale_sub_byte: color.scale_sub_byte,
            color: color.step,
            layout,
            palette: color.palette,
        })
    }

    /// Decoded byte length the codec must produce for a unit.
    fn expected_len(&self, descriptor: &StripTileDescriptor) -> Result<usize, DecodeError> {
        let (width, height) = (descriptor.width as usize, descriptor.height as usize);
        match self.subsampling {
            Some((h, v)) => subsampled_unit_len(width, height, h, v),
            None => self.row_len.checked_mul(height),
        }
        .ok_or_else(|| {
            TiffError::InvalidTagValue {
                tag: "StripByteCounts",
                message: format!("unit {} size overflows", descriptor.index),
            }
            .into()
        })
    }

    /// Read and fully decode one unit.
    fn decode_unit<R: RangeReader + ?Sized>(
        &self,
        reader: &R,
        descriptor: &StripTileDescriptor,
        warnings: &mut Vec<Warning>,
    ) -> Result<Vec<u8>, DecodeError> {
        let expected = self.expected_len(descriptor)?;
        let length = match descriptor.byte_count {
            Some(count) => count,
            None => reader.size().saturating_sub(descriptor.offset),
        };

        let mut data = if descriptor.offset == 0 || length == 0 {
            debug!(unit = descriptor.index, "Empty unit decoded as zeros");
            vec![0u8; expected]
        } else {
            let raw = reader.read_at_most(descriptor.offset, length as usize)?;
            let raw = if self.image.fill_order == 2 {
                let mut reversed = raw.to_vec();
                reverse_fill_order(&mut reversed);
                Bytes::from(reversed)
            } else {
                raw
            };

            if let CompressionCodec::Jpeg { tables: None } = self.codec {
                if jpeg::is_abbreviated_stream(&raw) {
                    let warning = Warning::MissingJpegTables {
                        unit: descriptor.index,
                    };
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }

            self.codec
                .decode(&raw, expected)
                .map_err(|source| DecodeError::Codec {
                    unit: descriptor.index,
                    offset: descriptor.offset,
                    source,
                })?
        };
        data.truncate(expected);

        if let Some((h, v)) = self.subsampling {
            data = upsample_unit(
                &data,
                descriptor.width as usize,
                descriptor.height as usize,
                h,
                v,
            );
        } else if let Some(predictor) = &self.predictor {
            for row in data.chunks_exact_mut(self.row_len) {
                predictor.apply_inverse(row);
            }
        }

        if self.invert {
            invert(&mut data);
        }
        Ok(data)
    }

    /// Copy the samples of one unit row that fall inside the region.
    fn place_row(
        &self,
        descriptor: &StripTileDescriptor,
        data: &[u8],
        unit_row: u32,
        window: &Window,
        row: &mut [u8],
    ) {
        let row_len = self.row_len;
        let start = unit_row as usize * row_len;
        let Some(source) = data.get(start..start + row_len) else {
            return;
        };

        let region = window.region;
        let x0 = descriptor.x.max(region.x);
        let x1 = descriptor
            .x
            .saturating_add(descriptor.width)
            .min(region.x + region.width);
        let channels = self.layout.channels;
        let sample_bytes = self.layout.sample_type.bytes();
        let bands = if self.subsampling.is_some() {
            3
        } else {
            descriptor.bands
        };

        for x in x0..x1 {
            let local = (x - descriptor.x) as usize;
            let pixel = (x - region.x) as usize * channels;
            for band in 0..bands {
                let dest = (pixel + descriptor.plane + band) * sample_bytes;
                if let Some(out) = row.get_mut(dest..dest + sample_bytes) {
                    self.copy_sample(source, local * bands + band, out);
                }
            }
        }
    }

    /// Extract sample `index` of a packed unit row into `out`.
    fn copy_sample(&self, source: &[u8], index: usize, out: &mut [u8]) {
        let bits = if self.subsampling.is_some() {
            8
        } else {
            self.image.bits_per_sample as usize
        };

        match bits {
            1 | 2 | 4 => {
                let bit = index * bits;
                let mask = (1u8 << bits) - 1;
                let shift = 8 - bits - bit % 8;
                let value = source.get(bit / 8).map_or(0, |b| (b >> shift) & mask);
                out[0] = if self.scale_sub_byte {
                    (value as u32 * 255 / mask as u32) as u8
                } else {
                    value
                };
            }
            8 => out[0] = source.get(index).copied().unwrap_or(0),
            _ => {
                let width = out.len();
                if let Some(sample) = source.get(index * width..(index + 1) * width) {
                    out.copy_from_slice(sample);
                    if !self.image.byte_order.is_native() {
                        out.reverse();
                    }
                }
            }
        }
    }

    /// Subsample the assembled region row and convert its colors.
    fn finish_row(&self, assembled: &[u8], window: &Window) -> Vec<u8> {
        let pixel_bytes = self.layout.bytes_per_pixel();
        let mut row = if window.x_step == 1 {
            assembled.to_vec()
        } else {
            let mut row = Vec::with_capacity(window.width() as usize * pixel_bytes);
            for x in window.columns() {
                let at = (x - window.region.x) as usize * pixel_bytes;
                row.extend_from_slice(&assembled[at..at + pixel_bytes]);
            }
            row
        };

        let channels = self.layout.channels;
        let wide = self.layout.sample_type == SampleType::U16;
        match &self.color {
            ColorStep::None => {}
            ColorStep::YCbCr(converter) if wide => {
                with_u16_samples(&mut row, |s| converter.convert_row_u16(s, channels))
            }
            ColorStep::YCbCr(converter) => converter.convert_row_u8(&mut row, channels),
            ColorStep::Lab(converter) if wide => {
                with_u16_samples(&mut row, |s| converter.convert_row_u16(s, channels))
            }
            ColorStep::Lab(converter) => converter.convert_row_u8(&mut row, channels),
        }
        row
    }
}

// =============================================================================
// Sample and color resolution
// =============================================================================

/// Check that a full unit, before and after chroma upsampling, fits in
/// `max_unit_bytes` and return the decoded row length.
///
/// Edge units are never larger than a full one, so per-unit sizes derived
/// later cannot overflow once this passes.
fn unit_buffers(
    image: &TiffImage,
    subsampling: Option<(usize, usize)>,
    params: &DecodeParams,
) -> Result<usize, DecodeError> {
    let (width, rows) = image.unit_size();
    let overflow = || -> DecodeError {
        TiffError::InvalidTagValue {
            tag: "YCbCrSubSampling",
            message: format!("{} x {} subsampled units overflow", width, rows),
        }
        .into()
    };

    let Some((h, v)) = subsampling else {
        params.check_unit_len("unit size", image.unit_len()?)?;
        return image.unit_row_bytes(width).ok_or_else(overflow);
    };

    let (width, rows) = (width as usize, rows as usize);
    let row_len = width.checked_mul(3).ok_or_else(overflow)?;
    let coded = subsampled_unit_len(width, rows, h, v).ok_or_else(overflow)?;
    let upsampled = row_len.checked_mul(rows).ok_or_else(overflow)?;
    params.check_unit_len("unit size", coded.max(upsampled))?;
    Ok(row_len)
}

fn sample_type(image: &TiffImage) -> Result<SampleType, DecodeError> {
    let bits = image.bits_per_sample;
    match (image.sample_format, bits) {
        (SampleFormat::Float, 16) => Ok(SampleType::F16),
        (SampleFormat::Float, 32) => Ok(SampleType::F32),
        (SampleFormat::Float, 64) => Ok(SampleType::F64),
        (SampleFormat::Float, _) => Err(DecodeError::unsupported(
            "sample format",
            format!("{}-bit floating point", bits),
        )),
        (_, 1 | 2 | 4 | 8) => Ok(SampleType::U8),
        (_, 16) => Ok(SampleType::U16),
        (_, 32) => Ok(SampleType::U32),
        (_, 64) => Ok(SampleType::U64),
        _ => Err(DecodeError::unsupported(
            "bit depth",
            format!("{} bits per sample", bits),
        )),
    }
}

struct ColorResolution {
    model: ColorModel,
    step: ColorStep,
    palette: Option<Palette>,
    invert: bool,
    scale_sub_byte: bool,
}

impl ColorResolution {
    fn plain(model: ColorModel) -> Self {
        Self {
            model,
            step: ColorStep::None,
            palette: None,
            invert: false,
            scale_sub_byte: true,
        }
    }

    fn indexed(palette: Palette, invert: bool) -> Self {
        Self {
            model: ColorModel::Indexed,
            step: ColorStep::None,
            palette: Some(palette),
            invert,
            scale_sub_byte: false,
        }
    }
}

fn resolve_color(
    image: &TiffImage,
    sample_type: SampleType,
    bilevel_codec: bool,
    warnings: &mut Vec<Warning>,
) -> Result<ColorResolution, DecodeError> {
    let bits = image.bits_per_sample;
    let samples = image.samples_per_pixel;
    let integer = matches!(sample_type, SampleType::U8 | SampleType::U16);

    let resolution = match image.photometric {
        // The fax codecs emit 1 for black, which is already WhiteIsZero
        Photometric::WhiteIsZero if bits == 1 && samples == 1 => {
            ColorResolution::indexed(Palette::white_is_zero(), false)
        }
        Photometric::BlackIsZero if bilevel_codec => {
            ColorResolution::indexed(Palette::grayscale(1), true)
        }
        Photometric::WhiteIsZero | Photometric::BlackIsZero => {
            let inverted = image.photometric == Photometric::WhiteIsZero;
            if inverted && image.sample_format == SampleFormat::Float {
                return Err(DecodeError::unsupported(
                    "photometric interpretation",
                    "WhiteIsZero with floating point samples",
                ));
            }
            if bits < 8 && samples == 1 {
                ColorResolution::indexed(Palette::grayscale(bits as u8), inverted)
            } else {
                ColorResolution {
                    invert: inverted,
                    ..ColorResolution::plain(ColorModel::Gray)
                }
            }
        }
        Photometric::Palette => {
            let map = image.color_map.as_deref().ok_or_else(|| {
                DecodeError::unsupported("photometric interpretation", "Palette without ColorMap")
            })?;
            let (palette, warning) = colormap_to_palette(map, bits);
            warnings.extend(warning);
            ColorResolution::indexed(palette, false)
        }
        Photometric::Rgb => ColorResolution::plain(ColorModel::Rgb),
        Photometric::Separated if samples >= 4 => ColorResolution::plain(ColorModel::Cmyk),
        Photometric::YCbCr if image.compression == Compression::Jpeg => {
            ColorResolution::plain(ColorModel::Rgb)
        }
        Photometric::YCbCr if integer => ColorResolution {
            step: ColorStep::YCbCr(YCbCrConverter::new(
                image.ycbcr_coefficients,
                image.reference_black_white,
                bits,
            )),
            ..ColorResolution::plain(ColorModel::Rgb)
        },
        photometric => match LabEncoding::from_photometric(photometric) {
            Some(encoding) if integer => ColorResolution {
                step: ColorStep::Lab(LabConverter::new(encoding, bits)),
                ..ColorResolution::plain(ColorModel::Rgb)
            },
            _ => {
                return Err(DecodeError::unsupported(
                    "photometric interpretation",
                    format!(
                        "{} with {} samples of {} bits",
                        photometric.name(),
                        samples,
                        bits
                    ),
                ))
            }
        },
    };

    Ok(resolution)
}

/// Run `convert` over a row of host-order 16-bit samples.
fn with_u16_samples(row: &mut [u8], convert: impl FnOnce(&mut [u16])) {
    let mut samples: Vec<u16> = row
        .chunks_exact(2)
        .map(|s| u16::from_ne_bytes([s[0], s[1]]))
        .collect();
    convert(&mut samples);
    for (slot, value) in row.chunks_exact_mut(2).zip(samples) {
        slot.copy_from_slice(&value.to_ne_bytes());
    }
}

// =============================================================================
// Tests
// =============================================================================
