//! JPEG (TIFF compression 7), decoded through the `image` crate.
//!
//! # Abbreviated Streams
//!
//! TIFF writers usually store the quantization (DQT) and Huffman (DHT)
//! tables once in the `JPEGTables` tag and leave them out of every strip or
//! tile. Such an abbreviated unit starts with SOI followed directly by the
//! frame and scan headers. Before decoding, the tables are spliced in:
//!
//! ```text
//! JPEGTables   FFD8 [DQT DHT ...] FFD9
//! unit         FFD8 [SOF SOS scan data] FFD9
//! merged       FFD8 [DQT DHT ...] [SOF SOS scan data] FFD9
//! ```

use std::io::Cursor;

use bytes::{Bytes, BytesMut};
use image::ImageReader;

use crate::error::CodecError;

/// Start Of Image marker
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// End Of Image marker
pub const EOI: [u8; 2] = [0xFF, 0xD9];

/// Define Huffman Table marker
pub const DHT: [u8; 2] = [0xFF, 0xC4];

/// Define Quantization Table marker
pub const DQT: [u8; 2] = [0xFF, 0xDB];

/// Start Of Scan marker
pub const SOS: [u8; 2] = [0xFF, 0xDA];

// =============================================================================
// Stream Analysis
// =============================================================================

/// Whether a unit reaches its scan without defining any DQT or DHT table.
pub fn is_abbreviated_stream(data: &[u8]) -> bool {
    if data.len() < 4 || data[0..2] != SOI {
        return false;
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }

        let marker = [data[pos], data[pos + 1]];
        if marker == DQT || marker == DHT {
            return false;
        }
        if marker == SOS {
            return true;
        }

        // Skip the segment: marker, 2-byte length, payload
        let standalone = matches!(marker[1], 0x00 | 0x01 | 0xD0..=0xD9 | 0xFF);
        if !standalone && pos + 3 < data.len() {
            let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
            pos += 2 + length;
        } else {
            pos += 2;
        }
    }

    false
}

/// Splice `tables` into an abbreviated unit.
///
/// The trailing EOI of the tables and the leading SOI of the unit are
/// dropped so the result holds exactly one of each.
pub fn merge_tables(tables: &[u8], unit: &[u8]) -> Bytes {
    if tables.is_empty() {
        return Bytes::copy_from_slice(unit);
    }
    if unit.is_empty() {
        return Bytes::new();
    }

    let tables = tables.strip_suffix(&EOI[..]).unwrap_or(tables);
    let unit = unit.strip_prefix(&SOI[..]).unwrap_or(unit);

    let mut merged = BytesMut::with_capacity(tables.len() + unit.len());
    merged.extend_from_slice(tables);
    merged.extend_from_slice(unit);
    merged.freeze()
}

/// Prepare a unit for decoding, merging tables when it needs them.
pub fn prepare_unit(tables: Option<&[u8]>, unit: &[u8]) -> Bytes {
    match tables {
        Some(tables) if is_abbreviated_stream(unit) => merge_tables(tables, unit),
        _ => Bytes::copy_from_slice(unit),
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode one JPEG unit into chunky 8-bit samples.
///
/// Single-component images come out as gray, everything else as RGB (the
/// JPEG decoder undoes its own YCbCr transform). A short result is returned
/// as is; the caller checks the length.
pub fn decode(
    unit: &[u8],
    tables: Option<&[u8]>,
    expected_len: usize,
) -> Result<Vec<u8>, CodecError> {
    let data = prepare_unit(tables, unit);
    let reader = ImageReader::with_format(Cursor::new(&data[..]), image::ImageFormat::Jpeg);
    let img = reader
        .decode()
        .map_err(|e| CodecError::Jpeg(e.to_string()))?;

    let mut samples = if img.color().channel_count() == 1 {
        img.into_luma8().into_raw()
    } else {
        img.into_rgb8().into_raw()
    };
    samples.truncate(expected_len);
    Ok(samples)
}
