//! Container inspection reports.
//!
//! [`inspect`] opens a source without decoding pixel data and summarizes
//! what the parsers found. The report serializes to JSON for the `inspect`
//! subcommand.

use serde::Serialize;
use tracing::debug;

use crate::error::DecodeError;
use crate::format::detect::{detect_format, ContainerFormat};
use crate::format::directory::Directory;
use crate::format::iff::{
    BitmapHeader, ChunkInfo, DeepGlobal, DeepLocation, DeepPixel, Form, IffFile,
};
use crate::format::tiff::{TiffFile, TiffImage, UnitLayout};
use crate::io::RangeReader;

// =============================================================================
// Report Types
// =============================================================================

/// Everything `inspect` prints for one file.
#[derive(Debug, Serialize)]
pub struct InspectReport {
    /// Source identifier (usually the path)
    pub source: String,

    /// Detected container (e.g., "IFF ILBM", "TIFF", "BigTIFF")
    pub format: String,

    /// IFF details, for IFF sources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iff: Option<IffReport>,

    /// One entry per IFD, for TIFF sources
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageReport>,

    /// Soft errors raised while parsing
    pub warnings: Vec<String>,
}

/// FORM contents of an IFF file.
#[derive(Debug, Serialize)]
pub struct IffReport {
    pub form_type: String,
    pub form_length: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitmap_header: Option<BitmapHeader>,

    /// Raw CAMG flags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_mode: Option<u32>,

    pub ham: bool,
    pub extra_halfbrite: bool,
    pub interlaced: bool,

    /// CMAP entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub palette_colors: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_palette: Option<MultiPaletteReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deep_global: Option<DeepGlobal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deep_location: Option<DeepLocation>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deep_pixel: Option<DeepPixel>,

    /// Every chunk walked, in file order
    pub chunks: Vec<ChunkInfo>,

    /// Text and unknown chunks
    pub directory: Directory,
}

/// Summary of PCHG, SHAM or CTBL data.
#[derive(Debug, Serialize)]
pub struct MultiPaletteReport {
    /// Source chunk ("PCHG", "SHAM" or "CTBL")
    pub kind: &'static str,
    pub lines: usize,
    pub changes: usize,
}

/// One TIFF image directory.
#[derive(Debug, Serialize)]
pub struct ImageReport {
    pub index: usize,

    /// Resolved decoding parameters, absent if the directory cannot be decoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ImageSummary>,

    /// Why the directory cannot be decoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Every tag, decoded
    pub directory: Directory,
}

/// The decode-relevant view of a TIFF image.
#[derive(Debug, Serialize)]
pub struct ImageSummary {
    pub width: u32,
    pub height: u32,
    pub bits_per_sample: u16,
    pub samples_per_pixel: u16,
    pub compression: String,
    pub photometric: String,
    pub planar_configuration: u16,
    pub predictor: String,
    pub sample_format: String,

    /// "strips" or "tiles"
    pub layout: &'static str,

    /// Strip height or tile size
    pub unit_width: u32,
    pub unit_height: u32,

    /// Number of strips or tiles, per plane
    pub units: usize,
}

impl ImageSummary {
    fn from_image(image: &TiffImage) -> Self {
        let (layout, unit_width, unit_height) = match image.layout {
            UnitLayout::Strips { rows_per_strip } => ("strips", image.width, rows_per_strip),
            UnitLayout::Tiles {
                tile_width,
                tile_height,
            } => ("tiles", tile_width, tile_height),
        };

        Self {
            width: image.width,
            height: image.height,
            bits_per_sample: image.bits_per_sample,
            samples_per_pixel: image.samples_per_pixel,
            compression: format!("{:?}", image.compression),
            photometric: format!("{:?}", image.photometric),
            planar_configuration: image.planar_configuration,
            predictor: format!("{:?}", image.predictor),
            sample_format: format!("{:?}", image.sample_format),
            layout,
            unit_width,
            unit_height,
            units: image.unit_count(),
        }
    }
}

// =============================================================================
// Inspection
// =============================================================================

/// Parse a source's container structure without decoding pixels.
///
/// # Errors
/// - `Format` when the source is neither IFF nor TIFF
/// - `Iff` / `Tiff` for structural errors in the container
pub fn inspect<R: RangeReader + ?Sized>(reader: &R) -> Result<InspectReport, DecodeError> {
    let format = detect_format(reader)?;
    debug!(source = reader.identifier(), format = %format.name(), "Inspecting");

    let mut report = InspectReport {
        source: reader.identifier().to_string(),
        format: format.name(),
        iff: None,
        images: Vec::new(),
        warnings: Vec::new(),
    };

    match format {
        ContainerFormat::Iff(_) => {
            let file = IffFile::open(reader)?;
            report.warnings = file.warnings.iter().map(ToString::to_string).collect();
            report.iff = Some(iff_report(file));
        }
        ContainerFormat::Tiff | ContainerFormat::BigTiff => {
            let file = TiffFile::open(reader)?;
            for index in 0..file.image_count() {
                let (summary, error) = match file.image(index) {
                    Ok(image) => {
                        report
                            .warnings
                            .extend(image.warnings.iter().map(|w| format!("image {}: {}", index, w)));
                        (Some(ImageSummary::from_image(&image)), None)
                    }
                    Err(e) => (None, Some(e.to_string())),
                };
                report.images.push(ImageReport {
                    index,
                    summary,
                    error,
                    directory: file.directories[index].clone(),
                });
            }
        }
    }

    Ok(report)
}

fn iff_report(file: IffFile) -> IffReport {
    let mut report = IffReport {
        form_type: file.form_type().name(),
        form_length: file.form_length,
        bitmap_header: None,
        view_mode: None,
        ham: false,
        extra_halfbrite: false,
        interlaced: false,
        palette_colors: None,
        multi_palette: None,
        deep_global: None,
        deep_location: None,
        deep_pixel: None,
        chunks: file.chunks,
        directory: file.directory,
    };

    match file.form {
        Form::Ilbm(form) => {
            report.ham = form.is_ham();
            report.extra_halfbrite = form.is_ehb();
            report.interlaced = form.is_laced();
            report.view_mode = form.view_mode.map(|mode| mode.0);
            report.palette_colors = form.palette.as_ref().map(|p| p.len());
            report.multi_palette = form.multi_palette.as_ref().map(|multi| MultiPaletteReport {
                kind: multi.kind().name(),
                lines: multi.line_count(),
                changes: multi.total_changes(),
            });
            report.bitmap_header = form.header;
        }
        Form::Deep(form) => {
            report.deep_global = form.global;
            report.deep_location = form.location;
            report.deep_pixel = form.pixel;
        }
    }

    report
}

// =============================================================================
// Tests
// =============================================================================
