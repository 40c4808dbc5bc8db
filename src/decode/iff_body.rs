//! IFF BODY decoding.
//!
//! # Forms
//!
//! ```text
//! form    BODY row                              output
//! ILBM    planes x plane row (2*ceil(w/16))    indices, RGB(A) for HAM,
//!                                               multi-palette, 24/32 planes
//!                                               and masked images
//! PBM     one byte per pixel, padded to even    indices
//! RGB8    RGB8 runs, 4 bytes per pixel          RGBA, genlock = transparent
//! DEEP    DPEL elements per pixel               RGB(A)
//! ```
//!
//! HAM and multi-palette rows are resolved at full width, so the region and
//! subsampling are applied after the palette stage.

use tracing::{debug, warn};

use crate::bitplane::{plane_row_bytes, unpack_mask, unpack_row, unpack_true_color};
use crate::codec::{packbits, rgb8, CompressionCodec};
use crate::error::{CodecError, DecodeError, IffError, Warning};
use crate::format::iff::{
    ChunkHeader, DeepElement, DeepForm, Form, FormType, IlbmForm, Masking, COMPRESSION_BYTE_RUN,
    COMPRESSION_NONE, COMPRESSION_RGB8_RLE,
};
use crate::io::RangeReader;
use crate::palette::{HamMode, Palette, PaletteResolver, Rgba};

use super::{ColorModel, DecodeParams, OutputInfo, PixelLayout, RowSink, SampleType, Window};

/// Alpha of opaque pixels in 8-bit output
const OPAQUE: u8 = 0xFF;

// =============================================================================
// Entry Point
// =============================================================================

/// Decode the BODY of an IFF form into `sink`.
///
/// # Errors
/// - `Iff` when a required chunk is missing
/// - `Unsupported` for plane counts, compressions and DPEL layouts the
///   decoder does not handle
/// - `Codec` (unit 0, BODY offset) when the BODY is corrupt or short
/// - `InvalidParameter` for a region outside the image
/// - `Aborted` when the abort flag is raised
pub fn decode_iff<R: RangeReader + ?Sized>(
    reader: &R,
    form: &Form,
    params: &DecodeParams,
    sink: &mut dyn RowSink,
) -> Result<Vec<Warning>, DecodeError> {
    form.validate()?;
    let body = form.body().ok_or(IffError::MissingChunk("BODY"))?;

    debug!(
        source = reader.identifier(),
        form = %form.form_type().name(),
        body_offset = body.offset,
        body_length = body.length,
        "Decoding IFF body"
    );

    match form {
        Form::Ilbm(ilbm) => match ilbm.form_type {
            FormType::Pbm => decode_pbm(reader, ilbm, body, params, sink),
            FormType::Rgb8 => decode_rgb8(reader, ilbm, body, params, sink),
            _ => decode_ilbm(reader, ilbm, body, params, sink),
        },
        Form::Deep(deep) => decode_deep(reader, deep, body, params, sink),
    }
}

// =============================================================================
// Body helpers
// =============================================================================

fn read_body<R: RangeReader + ?Sized>(
    reader: &R,
    body: ChunkHeader,
) -> Result<bytes::Bytes, DecodeError> {
    Ok(reader.read_exact_at(body.offset, body.length as usize)?)
}

/// Decompress a whole BODY to `total` bytes.
fn unpack_body(
    data: &[u8],
    compression: u8,
    total: usize,
    body: ChunkHeader,
) -> Result<Vec<u8>, DecodeError> {
    let decoded = match compression {
        COMPRESSION_NONE => CompressionCodec::None.decode(data, total),
        COMPRESSION_BYTE_RUN => CompressionCodec::PackBits.decode(data, total),
        other => return Err(DecodeError::unsupported("IFF compression", other)),
    };
    decoded.map_err(|source| body_error(body, source))
}

fn body_error(body: ChunkHeader, source: CodecError) -> DecodeError {
    DecodeError::Codec {
        unit: 0,
        offset: body.offset,
        source,
    }
}

/// Crop and subsample a full-width row of `channels`-byte pixels.
fn crop_row(full: &[u8], channels: usize, window: &Window) -> Vec<u8> {
    let mut row = Vec::with_capacity(window.width() as usize * channels);
    for x in window.columns() {
        let at = x as usize * channels;
        row.extend_from_slice(&full[at..at + channels]);
    }
    row
}

fn begin(
    sink: &mut dyn RowSink,
    window: &Window,
    color: ColorModel,
    channels: usize,
    palette: Option<Palette>,
) -> Result<(), DecodeError> {
    sink.begin(&OutputInfo {
        width: window.width(),
        height: window.height(),
        layout: PixelLayout::new(color, channels, SampleType::U8),
        palette,
    })
}

// =============================================================================
// ILBM
// =============================================================================

/// How ILBM plane values become output pixels.
enum IlbmColor {
    /// Palette indices
    Indexed(Palette),
    /// Indices resolved through the palette, alpha from the mask plane
    IndexedMasked(Palette),
    /// 24 or 32 planes of direct color
    TrueColor { channels: usize },
    /// Hold-And-Modify against a base palette
    Ham(HamMode, Palette),
    /// Indices resolved through a per-row palette
    MultiPalette(Palette),
}

impl IlbmColor {
    fn resolve(form: &IlbmForm, planes: u8) -> Result<Self, DecodeError> {
        if matches!(planes, 24 | 32) {
            return Ok(IlbmColor::TrueColor {
                channels: planes as usize / 8,
            });
        }
        if planes == 0 || planes > 8 {
            return Err(DecodeError::unsupported("ILBM planes", planes));
        }

        let base = form
            .palette
            .clone()
            .unwrap_or_else(|| Palette::grayscale(planes));

        if let Some(mode) = form.ham_mode() {
            return Ok(IlbmColor::Ham(mode, base));
        }
        if form.multi_palette.is_some() {
            return Ok(IlbmColor::MultiPalette(base));
        }

        let palette = if form.is_ehb() && planes == 6 {
            base.expand_ehb()?
        } else {
            base
        };
        let palette = match form.transparent_index() {
            Some(index) => palette.with_transparent(index),
            None => palette,
        };

        if has_mask(form) {
            Ok(IlbmColor::IndexedMasked(palette))
        } else {
            Ok(IlbmColor::Indexed(palette))
        }
    }

    /// Output color model and channels, before any mask alpha.
    fn base_layout(&self) -> (ColorModel, usize) {
        match self {
            IlbmColor::Indexed(_) => (ColorModel::Indexed, 1),
            IlbmColor::IndexedMasked(_) => (ColorModel::Rgb, 3),
            IlbmColor::TrueColor { channels } => (ColorModel::Rgb, *channels),
            IlbmColor::Ham(..) | IlbmColor::MultiPalette(_) => (ColorModel::Rgb, 3),
        }
    }
}

fn has_mask(form: &IlbmForm) -> bool {
    form.header
        .as_ref()
        .is_some_and(|h| h.masking == Masking::HasMask)
}

fn decode_ilbm<R: RangeReader + ?Sized>(
    reader: &R,
    form: &IlbmForm,
    body: ChunkHeader,
    params: &DecodeParams,
    sink: &mut dyn RowSink,
) -> Result<Vec<Warning>, DecodeError> {
    let header = form.header.as_ref().ok_or(IffError::MissingChunk("BMHD"))?;
    let (width, height) = (header.width as usize, header.height as usize);
    let planes = header.planes as usize;
    let stride = plane_row_bytes(width);
    let row_len = stride * header.stored_planes();

    let color = IlbmColor::resolve(form, header.planes)?;
    let (model, base_channels) = color.base_layout();
    let masked = has_mask(form) && base_channels == 3;
    let channels = base_channels + usize::from(masked);

    let window = params.window(header.width as u32, header.height as u32)?;
    let palette = match &color {
        IlbmColor::Indexed(palette) => Some(palette.clone()),
        _ => None,
    };
    begin(sink, &window, model, channels, palette)?;

    let data = read_body(reader, body)?;
    let body_bytes = unpack_body(&data, header.compression, row_len * height, body)?;

    let mut resolver = match (&color, form.multi_palette.as_ref()) {
        (IlbmColor::Ham(_, base) | IlbmColor::MultiPalette(base), Some(multi)) => Some(
            PaletteResolver::new(base, multi, form.is_laced(), params.palette_cache_capacity),
        ),
        _ => None,
    };

    let mut indices = vec![0u8; width];
    let mut pixels = vec![0u8; width * base_channels];
    let mut mask = vec![1u8; width];
    let mut full = vec![0u8; width * channels];
    let mut out_of_range = None;

    for y in 0..height {
        let Some(out_y) = window.output_row(y as u32) else {
            continue;
        };
        params.check_abort()?;
        let source = &body_bytes[y * row_len..(y + 1) * row_len];

        let missing = match &color {
            IlbmColor::TrueColor { .. } => {
                unpack_true_color(source, planes, width, &mut pixels);
                None
            }
            IlbmColor::Indexed(palette) => {
                unpack_row(source, planes, width, &mut pixels);
                palette
                    .first_out_of_range(&pixels)
                    .map(|index| (index, palette.len()))
            }
            IlbmColor::IndexedMasked(palette) => {
                unpack_row(source, planes, width, &mut indices);
                lookup(&indices, palette, &mut pixels).map(|index| (index, palette.len()))
            }
            IlbmColor::Ham(mode, base) => {
                unpack_row(source, planes, width, &mut indices);
                let palette = match resolver.as_mut() {
                    Some(resolver) => resolver.palette_for_row(y as u32),
                    None => base,
                };
                mode
                    .resolve_row(&indices, palette, &mut pixels)
                    .map(|index| (index, palette.len()))
            }
            IlbmColor::MultiPalette(base) => {
                unpack_row(source, planes, width, &mut indices);
                let palette = match resolver.as_mut() {
                    Some(resolver) => resolver.palette_for_row(y as u32),
                    None => base,
                };
                lookup(&indices, palette, &mut pixels).map(|index| (index, palette.len()))
            }
        };
        if out_of_range.is_none() {
            out_of_range = missing;
        }

        if masked {
            unpack_mask(&source[planes * stride..], width, &mut mask);
        }

        if channels == base_channels {
            full.copy_from_slice(&pixels);
        } else {
            for ((out, rgb), &m) in full
                .chunks_exact_mut(channels)
                .zip(pixels.chunks_exact(base_channels))
                .zip(&mask)
            {
                out[..base_channels].copy_from_slice(rgb);
                out[base_channels] = if m == 0 { 0 } else { OPAQUE };
            }
        }

        sink.put_row(out_y, &crop_row(&full, channels, &window))?;
    }

    let mut warnings = resolver.map(|mut r| r.take_warnings()).unwrap_or_default();
    if let Some((index, palette_len)) = out_of_range {
        warnings.push(index_warning(index, palette_len));
    }
    Ok(warnings)
}

/// Logged once per image; the pixels are drawn black.
fn index_warning(index: usize, palette_len: usize) -> Warning {
    let warning = Warning::PixelIndexOutOfRange { index, palette_len };
    warn!("{}", warning);
    warning
}

/// Resolve indices to RGB triplets, returning the first index past the
/// end of the palette.
fn lookup(indices: &[u8], palette: &Palette, out: &mut [u8]) -> Option<usize> {
    let mut out_of_range = None;
    for (&index, rgb) in indices.iter().zip(out.chunks_exact_mut(3)) {
        let color = palette.get(index as usize).unwrap_or_else(|| {
            out_of_range.get_or_insert(index as usize);
            Rgba::rgb(0, 0, 0)
        });
        rgb.copy_from_slice(&[color.r, color.g, color.b]);
    }
    out_of_range
}

// =============================================================================
// PBM
// =============================================================================

fn decode_pbm<R: RangeReader + ?Sized>(
    reader: &R,
    form: &IlbmForm,
    body: ChunkHeader,
    params: &DecodeParams,
    sink: &mut dyn RowSink,
) -> Result<Vec<Warning>, DecodeError> {
    let header = form.header.as_ref().ok_or(IffError::MissingChunk("BMHD"))?;
    if header.planes == 0 || header.planes > 8 {
        return Err(DecodeError::unsupported("PBM planes", header.planes));
    }
    let (width, height) = (header.width as usize, header.height as usize);
    let row_len = width + width % 2;

    let palette = form
        .palette
        .clone()
        .unwrap_or_else(|| Palette::grayscale(header.planes));
    let palette = match form.transparent_index() {
        Some(index) => palette.with_transparent(index),
        None => palette,
    };

    let window = params.window(header.width as u32, header.height as u32)?;
    let palette_len = palette.len();
    begin(sink, &window, ColorModel::Indexed, 1, Some(palette.clone()))?;

    let data = read_body(reader, body)?;
    let pixels = unpack_body(&data, header.compression, row_len * height, body)?;
    let mut out_of_range = None;

    for y in 0..height {
        let Some(out_y) = window.output_row(y as u32) else {
            continue;
        };
        params.check_abort()?;
        let row = &pixels[y * row_len..y * row_len + width];
        if out_of_range.is_none() {
            out_of_range = palette.first_out_of_range(row);
        }
        sink.put_row(out_y, &crop_row(row, 1, &window))?;
    }

    Ok(out_of_range
        .map(|index| index_warning(index, palette_len))
        .into_iter()
        .collect())
}

// =============================================================================
// RGB8
// =============================================================================

fn decode_rgb8<R: RangeReader + ?Sized>(
    reader: &R,
    form: &IlbmForm,
    body: ChunkHeader,
    params: &DecodeParams,
    sink: &mut dyn RowSink,
) -> Result<Vec<Warning>, DecodeError> {
    let header = form.header.as_ref().ok_or(IffError::MissingChunk("BMHD"))?;
    if header.compression != COMPRESSION_RGB8_RLE {
        return Err(DecodeError::unsupported(
            "IFF compression",
            format!("{} in RGB8", header.compression),
        ));
    }
    let (width, height) = (header.width as usize, header.height as usize);
    let row_len = width * rgb8::RGB8_PIXEL_BYTES;

    let window = params.window(header.width as u32, header.height as u32)?;
    begin(sink, &window, ColorModel::Rgb, 4, None)?;

    let data = read_body(reader, body)?;
    let mut pixels =
        rgb8::decode(&data, row_len * height).map_err(|source| body_error(body, source))?;

    // Genlocked pixels show the video background
    for pixel in pixels.chunks_exact_mut(4) {
        pixel[3] = if pixel[3] == 0 { OPAQUE } else { 0 };
    }

    for y in 0..height {
        let Some(out_y) = window.output_row(y as u32) else {
            continue;
        };
        params.check_abort()?;
        let row = &pixels[y * row_len..(y + 1) * row_len];
        sink.put_row(out_y, &crop_row(row, 4, &window))?;
    }

    Ok(Vec::new())
}

// =============================================================================
// DEEP / TVPP
// =============================================================================

fn decode_deep<R: RangeReader + ?Sized>(
    reader: &R,
    form: &DeepForm,
    body: ChunkHeader,
    params: &DecodeParams,
    sink: &mut dyn RowSink,
) -> Result<Vec<Warning>, DecodeError> {
    let global = form.global.as_ref().ok_or(IffError::MissingChunk("DGBL"))?;
    let pixel = form.pixel.as_ref().ok_or(IffError::MissingChunk("DPEL"))?;
    let (width, height) = form.dimensions().ok_or(IffError::MissingChunk("DGBL"))?;

    if let Some(element) = pixel.elements.iter().find(|e| e.bit_depth != 8) {
        return Err(DecodeError::unsupported(
            "DPEL bit depth",
            format!("{} bits for element type {}", element.bit_depth, element.kind),
        ));
    }

    let position = |kind: u16| pixel.elements.iter().position(|e| e.kind == kind);
    let (Some(r), Some(g), Some(b)) = (
        position(DeepElement::RED),
        position(DeepElement::GREEN),
        position(DeepElement::BLUE),
    ) else {
        return Err(DecodeError::unsupported(
            "DPEL elements",
            "pixels without red, green and blue",
        ));
    };
    let alpha = position(DeepElement::ALPHA);
    let sources: Vec<usize> = [Some(r), Some(g), Some(b), alpha].into_iter().flatten().collect();
    let channels = sources.len();

    let bytes_per_pixel = pixel.elements.len();
    let (width, height) = (width as usize, height as usize);
    let row_len = width * bytes_per_pixel;
    let total = row_len * height;

    let window = params.window(width as u32, height as u32)?;
    begin(sink, &window, ColorModel::Rgb, channels, None)?;

    let data = read_body(reader, body)?;
    let pixels = match global.compression {
        0 => CompressionCodec::None.decode(&data, total),
        1 => packbits::decode_units(&data, bytes_per_pixel, total),
        other => {
            return Err(IffError::Unsupported {
                chunk: "DGBL",
                feature: format!("compression {}", other),
            }
            .into())
        }
    }
    .map_err(|source| body_error(body, source))?;

    let mut full = vec![0u8; width * channels];
    for y in 0..height {
        let Some(out_y) = window.output_row(y as u32) else {
            continue;
        };
        params.check_abort()?;

        let row = &pixels[y * row_len..(y + 1) * row_len];
        for (out, stored) in full
            .chunks_exact_mut(channels)
            .zip(row.chunks_exact(bytes_per_pixel))
        {
            for (slot, &source) in out.iter_mut().zip(&sources) {
                *slot = stored[source];
            }
        }
        sink.put_row(out_y, &crop_row(&full, channels, &window))?;
    }

    Ok(Vec::new())
}

// =============================================================================
// Tests
// =============================================================================
