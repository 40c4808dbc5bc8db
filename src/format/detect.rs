//! Container detection from magic bytes.
//!
//! - **IFF**: `FORM`, a length, then one of the supported form types
//! - **TIFF**: `II` or `MM`, then version 42 (classic) or 43 (BigTIFF)
//!
//! Anything else is an unsupported format.

use crate::error::FormatError;
use crate::io::{read_u32_be, RangeReader};

use super::iff::chunk::FORM;
use super::iff::FormType;
use super::tiff::{ByteOrder, TIFF_HEADER_SIZE};

/// Bytes needed to tell the containers apart
const MIN_HEADER_BYTES: usize = 12;

// =============================================================================
// ContainerFormat
// =============================================================================

/// Detected container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// IFF FORM of a supported type
    Iff(FormType),

    /// Classic TIFF
    Tiff,

    /// BigTIFF with 64-bit offsets
    BigTiff,
}

impl ContainerFormat {
    /// Get a human-readable name for the format.
    pub fn name(&self) -> String {
        match self {
            ContainerFormat::Iff(form_type) => format!("IFF {}", form_type.name().trim_end()),
            ContainerFormat::Tiff => "TIFF".to_string(),
            ContainerFormat::BigTiff => "BigTIFF".to_string(),
        }
    }

    pub fn is_tiff(&self) -> bool {
        matches!(self, ContainerFormat::Tiff | ContainerFormat::BigTiff)
    }
}

// =============================================================================
// Format Detection
// =============================================================================

/// Classify a byte source by its first bytes.
///
/// # Errors
/// `UnsupportedFormat` when the source is too small or neither an IFF FORM
/// nor a TIFF header.
pub fn detect_format<R: RangeReader + ?Sized>(reader: &R) -> Result<ContainerFormat, FormatError> {
    let header = reader.read_at_most(0, MIN_HEADER_BYTES)?;

    if let Some(format) = classify(&header) {
        return Ok(format);
    }

    Err(FormatError::UnsupportedFormat {
        reason: if header.len() < TIFF_HEADER_SIZE {
            format!("{} bytes is too small for an image", header.len())
        } else {
            format!(
                "unrecognized magic {:02X} {:02X} {:02X} {:02X}",
                header[0], header[1], header[2], header[3]
            )
        },
    })
}

/// Classify a header prefix; `None` if it is neither IFF nor TIFF.
pub fn classify(bytes: &[u8]) -> Option<ContainerFormat> {
    if let Some(form_type) = iff_form_type(bytes) {
        return Some(ContainerFormat::Iff(form_type));
    }
    match tiff_version(bytes)? {
        42 => Some(ContainerFormat::Tiff),
        _ => Some(ContainerFormat::BigTiff),
    }
}

/// Check if bytes represent a supported IFF FORM header.
pub fn is_iff_header(bytes: &[u8]) -> bool {
    iff_form_type(bytes).is_some()
}

/// Check if bytes represent a valid TIFF header.
///
/// This is a quick check that can be used before attempting full parsing.
pub fn is_tiff_header(bytes: &[u8]) -> bool {
    tiff_version(bytes).is_some()
}

fn iff_form_type(bytes: &[u8]) -> Option<FormType> {
    if bytes.len() < MIN_HEADER_BYTES || read_u32_be(bytes) != FORM {
        return None;
    }
    FormType::from_id(read_u32_be(&bytes[8..]))
}

fn tiff_version(bytes: &[u8]) -> Option<u16> {
    if bytes.len() < TIFF_HEADER_SIZE {
        return None;
    }

    let byte_order = match &bytes[0..2] {
        b"II" => ByteOrder::LittleEndian,
        b"MM" => ByteOrder::BigEndian,
        _ => return None,
    };

    match byte_order.read_u16(&bytes[2..4]) {
        version @ (42 | 43) => Some(version),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
