//! Decoder capability checks for resolved TIFF images.
//!
//! [`TiffImage::from_directory`](super::TiffImage::from_directory) only checks
//! that the tags are structurally usable. This module checks that the
//! combination of compression, photometric interpretation, predictor and
//! sample layout is one the decode pipeline implements, so unsupported
//! files fail before any unit is read.
//!
//! # Supported Combinations
//!
//! - **CCITT** (2, 3, 4): 1 bit, 1 sample
//! - **JPEG** (7): 8 bits
//! - **Horizontal predictor**: 1, 2, 4, 8, 16, 32 or 64 bits
//! - **Floating point predictor**: 16, 24, 32 or 64 bits
//! - **Palette**: 1 sample of at most 8 bits
//! - **Subsampled YCbCr**: chunky, 3 samples of 8 bits
//! - **Lab**: 8 or 16 bits, at least 3 samples

use crate::error::{DecodeError, Warning};

use super::image::TiffImage;
use super::tags::{Compression, Photometric, Predictor};

// =============================================================================
// Validation Result
// =============================================================================

/// Outcome of validating an image against the decoder's capabilities.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the image can be decoded
    pub is_valid: bool,

    /// Unsupported features found (empty if valid)
    pub errors: Vec<DecodeError>,

    /// Soft problems carried over from tag resolution
    pub warnings: Vec<Warning>,
}

impl ValidationResult {
    /// Create a successful validation result.
    pub fn ok() -> Self {
        ValidationResult {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error to the result.
    pub fn add_error(&mut self, error: DecodeError) {
        self.is_valid = false;
        self.errors.push(error);
    }

    /// Add a warning to the result.
    pub fn add_warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    /// Convert to the first error if invalid, otherwise the warnings.
    pub fn into_result(self) -> Result<Vec<Warning>, DecodeError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(self.warnings),
        }
    }
}

// =============================================================================
// Image Validation
// =============================================================================

/// Check every feature combination of `image` against what the decoder
/// implements.
pub fn validate_image(image: &TiffImage) -> ValidationResult {
    let mut result = ValidationResult::ok();
    for warning in &image.warnings {
        result.add_warning(warning.clone());
    }

    let bits = image.bits_per_sample;
    let samples = image.samples_per_pixel;

    match image.compression {
        Compression::CcittRle | Compression::CcittT4 | Compression::CcittT6 => {
            if bits != 1 || samples != 1 {
                result.add_error(DecodeError::unsupported(
                    "bit depth",
                    format!(
                        "{} requires 1 bit and 1 sample, got {} bits x {}",
                        image.compression.name(),
                        bits,
                        samples
                    ),
                ));
            }
        }
        Compression::Jpeg if bits != 8 => {
            result.add_error(DecodeError::unsupported(
                "bit depth",
                format!("JPEG with {} bits per sample", bits),
            ));
        }
        _ => {}
    }

    match image.predictor {
        Predictor::Horizontal if bits == 24 => {
            result.add_error(DecodeError::unsupported(
                "predictor",
                "horizontal differencing on 24-bit samples",
            ));
        }
        Predictor::FloatingPoint if !matches!(bits, 16 | 24 | 32 | 64) => {
            result.add_error(DecodeError::unsupported(
                "predictor",
                format!("floating point differencing on {}-bit samples", bits),
            ));
        }
        _ => {}
    }

    match image.photometric {
        Photometric::Palette if samples != 1 || bits > 8 => {
            result.add_error(DecodeError::unsupported(
                "photometric interpretation",
                format!("Palette with {} samples of {} bits", samples, bits),
            ));
        }
        Photometric::YCbCr if image.has_subsampled_chroma() => {
            if bits != 8 || samples != 3 || image.planar_configuration != 1 {
                result.add_error(DecodeError::unsupported(
                    "photometric interpretation",
                    format!(
                        "subsampled YCbCr with {} samples of {} bits, planar configuration {}",
                        samples, bits, image.planar_configuration
                    ),
                ));
            }
        }
        Photometric::YCbCr | Photometric::Rgb if samples < 3 => {
            result.add_error(DecodeError::unsupported(
                "photometric interpretation",
                format!("{} with {} samples", image.photometric.name(), samples),
            ));
        }
        p if p.is_lab() && (samples < 3 || !matches!(bits, 8 | 16)) => {
            result.add_error(DecodeError::unsupported(
                "photometric interpretation",
                format!("{} with {} samples of {} bits", p.name(), samples, bits),
            ));
        }
        Photometric::TransparencyMask => {
            result.add_error(DecodeError::unsupported(
                "photometric interpretation",
                "TransparencyMask",
            ));
        }
        _ => {}
    }

    result
}

// =============================================================================
// Tests
// =============================================================================
