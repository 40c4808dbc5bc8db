//! Test utilities for integration tests.
//!
//! This module provides builders for synthetic IFF and TIFF files and a
//! range reader that records every request.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use flate2::write::ZlibEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, Luma};

use iff_tiff_raster::error::IoError;
use iff_tiff_raster::format::iff::BitmapHeader;
use iff_tiff_raster::io::RangeReader;

// =============================================================================
// Range Reader with Request Tracking
// =============================================================================

/// A range reader that tracks all read requests.
///
/// Used to verify that partial decodes skip strips and tiles outside the
/// requested region.
pub struct TrackingReader {
    data: Bytes,
    identifier: String,
    request_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<(u64, usize)>>>,
}

impl TrackingReader {
    pub fn new(data: Vec<u8>, identifier: impl Into<String>) -> Self {
        Self {
            data: Bytes::from(data),
            identifier: identifier.into(),
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(u64, usize)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn reset_tracking(&self) {
        self.request_count.store(0, Ordering::SeqCst);
        self.requests.lock().unwrap().clear();
    }
}

impl RangeReader for TrackingReader {
    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push((offset, len));

        let start = offset as usize;
        let end = start + len;
        if end > self.data.len() {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.data.len() as u64,
            });
        }
        Ok(self.data.slice(start..end))
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

// =============================================================================
// TIFF File Builder
// =============================================================================

pub const BYTE: u16 = 1;
pub const ASCII: u16 = 2;
pub const SHORT: u16 = 3;
pub const LONG: u16 = 4;
pub const RATIONAL: u16 = 5;
pub const UNDEFINED: u16 = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrderType {
    LittleEndian,
    BigEndian,
}

/// Builder for creating test TIFF files.
pub struct TiffBuilder {
    byte_order: ByteOrderType,
    is_bigtiff: bool,
    ifds: Vec<IfdBuilder>,
}

impl TiffBuilder {
    pub fn new() -> Self {
        Self {
            byte_order: ByteOrderType::LittleEndian,
            is_bigtiff: false,
            ifds: Vec::new(),
        }
    }

    pub fn with_byte_order(mut self, order: ByteOrderType) -> Self {
        self.byte_order = order;
        self
    }

    pub fn with_bigtiff(mut self, is_bigtiff: bool) -> Self {
        self.is_bigtiff = is_bigtiff;
        self
    }

    pub fn add_ifd(mut self, ifd: IfdBuilder) -> Self {
        self.ifds.push(ifd);
        self
    }

    /// Build the TIFF file data.
    ///
    /// Layout per IFD: unit data, out-of-line tag values, then the IFD.
    pub fn build(self) -> Vec<u8> {
        let mut data = Vec::new();
        match self.byte_order {
            ByteOrderType::LittleEndian => data.extend_from_slice(b"II"),
            ByteOrderType::BigEndian => data.extend_from_slice(b"MM"),
        }

        let inline_size = if self.is_bigtiff { 8 } else { 4 };
        if self.is_bigtiff {
            self.put(&mut data, 43, 2);
            self.put(&mut data, 8, 2); // Offset size
            self.put(&mut data, 0, 2); // Reserved
        } else {
            self.put(&mut data, 42, 2);
        }

        // Position of the pointer to the next IFD
        let mut link = data.len();
        self.put(&mut data, 0, inline_size);

        for ifd in &self.ifds {
            // Unit data
            let mut offsets = Vec::new();
            for unit in &ifd.units {
                offsets.push(data.len() as u64);
                data.extend_from_slice(unit);
                pad_even(&mut data);
            }
            let counts: Vec<u64> = ifd.units.iter().map(|u| u.len() as u64).collect();

            let mut entries = ifd.entries.clone();
            if !ifd.units.is_empty() {
                let (offsets_tag, counts_tag) = if ifd.tiled { (324, 325) } else { (273, 279) };
                entries.push((offsets_tag, LONG, offsets));
                entries.push((counts_tag, LONG, counts));
            }
            entries.sort_by_key(|(tag, _, _)| *tag);

            // Out-of-line values
            let mut fields = Vec::new();
            for (tag, field_type, values) in &entries {
                let bytes = self.encode_values(*field_type, values);
                let count = if *field_type == RATIONAL {
                    values.len() as u64 / 2
                } else if *field_type == ASCII || *field_type == UNDEFINED || *field_type == BYTE {
                    bytes.len() as u64
                } else {
                    values.len() as u64
                };
                if bytes.len() > inline_size {
                    let offset = data.len() as u64;
                    data.extend_from_slice(&bytes);
                    pad_even(&mut data);
                    fields.push((*tag, *field_type, count, None, offset));
                } else {
                    fields.push((*tag, *field_type, count, Some(bytes), 0));
                }
            }

            // The IFD itself
            pad_even(&mut data);
            let ifd_offset = data.len() as u64;
            self.patch(&mut data, link, ifd_offset, inline_size);

            self.put(&mut data, fields.len() as u64, if self.is_bigtiff { 8 } else { 2 });
            for (tag, field_type, count, inline, offset) in fields {
                self.put(&mut data, tag as u64, 2);
                self.put(&mut data, field_type as u64, 2);
                self.put(&mut data, count, inline_size);
                match inline {
                    Some(mut bytes) => {
                        bytes.resize(inline_size, 0);
                        data.extend_from_slice(&bytes);
                    }
                    None => self.put(&mut data, offset, inline_size),
                }
            }
            link = data.len();
            self.put(&mut data, 0, inline_size);
        }

        data
    }

    fn encode_values(&self, field_type: u16, values: &[u64]) -> Vec<u8> {
        let size = match field_type {
            SHORT => 2,
            LONG | RATIONAL => 4,
            _ => 1,
        };
        let mut out = Vec::new();
        for &value in values {
            self.put(&mut out, value, size);
        }
        out
    }

    fn put(&self, data: &mut Vec<u8>, value: u64, size: usize) {
        let bytes = match self.byte_order {
            ByteOrderType::LittleEndian => value.to_le_bytes()[..size].to_vec(),
            ByteOrderType::BigEndian => value.to_be_bytes()[8 - size..].to_vec(),
        };
        data.extend_from_slice(&bytes);
    }

    fn patch(&self, data: &mut [u8], at: usize, value: u64, size: usize) {
        let mut bytes = Vec::new();
        self.put(&mut bytes, value, size);
        data[at..at + size].copy_from_slice(&bytes);
    }
}

fn pad_even(data: &mut Vec<u8>) {
    if data.len() % 2 == 1 {
        data.push(0);
    }
}

/// Builder for one image directory.
#[derive(Clone)]
pub struct IfdBuilder {
    entries: Vec<(u16, u16, Vec<u64>)>,
    units: Vec<Vec<u8>>,
    tiled: bool,
}

impl IfdBuilder {
    /// Directory with ImageWidth and ImageLength.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            entries: Vec::new(),
            units: Vec::new(),
            tiled: false,
        }
        .long(256, &[width])
        .long(257, &[height])
    }

    /// 8-bit gray strip image: BitsPerSample 8, BlackIsZero.
    pub fn gray8(width: u32, height: u32) -> Self {
        Self::new(width, height)
            .short(258, &[8])
            .short(262, &[1])
            .short(277, &[1])
    }

    pub fn short(mut self, tag: u16, values: &[u16]) -> Self {
        self.entries
            .push((tag, SHORT, values.iter().map(|&v| v as u64).collect()));
        self
    }

    pub fn long(mut self, tag: u16, values: &[u32]) -> Self {
        self.entries
            .push((tag, LONG, values.iter().map(|&v| v as u64).collect()));
        self
    }

    pub fn ascii(mut self, tag: u16, text: &str) -> Self {
        let mut bytes: Vec<u64> = text.bytes().map(u64::from).collect();
        bytes.push(0);
        self.entries.push((tag, ASCII, bytes));
        self
    }

    pub fn undefined(mut self, tag: u16, bytes: &[u8]) -> Self {
        self.entries
            .push((tag, UNDEFINED, bytes.iter().map(|&b| b as u64).collect()));
        self
    }

    /// Strip data, with RowsPerStrip.
    pub fn strips(mut self, rows_per_strip: u32, strips: Vec<Vec<u8>>) -> Self {
        self = self.long(278, &[rows_per_strip]);
        self.units = strips;
        self.tiled = false;
        self
    }

    /// Tile data, with TileWidth and TileLength.
    pub fn tiles(mut self, tile_width: u32, tile_height: u32, tiles: Vec<Vec<u8>>) -> Self {
        self = self.long(322, &[tile_width]).long(323, &[tile_height]);
        self.units = tiles;
        self.tiled = true;
        self
    }
}

// =============================================================================
// IFF File Builder
// =============================================================================

/// Builder for `FORM` files; chunks are written in the order added.
pub struct IffBuilder {
    form_type: [u8; 4],
    chunks: Vec<([u8; 4], Vec<u8>)>,
}

impl IffBuilder {
    pub fn new(form_type: &[u8; 4]) -> Self {
        Self {
            form_type: *form_type,
            chunks: Vec::new(),
        }
    }

    pub fn chunk(mut self, id: &[u8; 4], payload: Vec<u8>) -> Self {
        self.chunks.push((*id, payload));
        self
    }

    pub fn bmhd(self, header: &BitmapHeader) -> Self {
        self.chunk(b"BMHD", header.to_bytes().to_vec())
    }

    /// CMAP from RGB triplets.
    pub fn cmap(self, rgb: &[u8]) -> Self {
        self.chunk(b"CMAP", rgb.to_vec())
    }

    pub fn camg(self, flags: u32) -> Self {
        self.chunk(b"CAMG", flags.to_be_bytes().to_vec())
    }

    pub fn body(self, payload: Vec<u8>) -> Self {
        self.chunk(b"BODY", payload)
    }

    pub fn build(self) -> Vec<u8> {
        let mut content = self.form_type.to_vec();
        for (id, payload) in &self.chunks {
            content.extend_from_slice(id);
            content.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            content.extend_from_slice(payload);
            if payload.len() % 2 == 1 {
                content.push(0);
            }
        }

        let mut data = b"FORM".to_vec();
        data.extend_from_slice(&(content.len() as u32).to_be_bytes());
        data.extend_from_slice(&content);
        data
    }
}

// =============================================================================
// Payload Helpers
// =============================================================================

/// Gradient test pattern, one byte per pixel.
pub fn gradient(width: u32, height: u32) -> Vec<u8> {
    (0..height)
        .flat_map(|y| (0..width).map(move |x| ((x * 7 + y * 13) % 256) as u8))
        .collect()
}

/// Zlib-compress a buffer.
pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Baseline gray JPEG of a smooth pattern.
pub fn create_test_jpeg(width: u32, height: u32, quality: u8) -> Vec<u8> {
    let img = GrayImage::from_fn(width, height, |x, y| Luma([(x * 4 + y * 2) as u8]));

    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode_image(&img).unwrap();
    buf
}

/// Split a complete JPEG into a tables blob and an abbreviated stream.
///
/// Tables are SOI + every DQT/DHT segment + EOI; the stream keeps SOI,
/// the frame header and the scan.
pub fn split_jpeg_tables(jpeg: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut tables = vec![0xFF, 0xD8];
    let mut stream = vec![0xFF, 0xD8];
    let mut pos = 2;

    while pos + 4 <= jpeg.len() {
        let marker = jpeg[pos + 1];
        if marker == 0xDA {
            stream.extend_from_slice(&jpeg[pos..]);
            break;
        }
        let length = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        let segment = &jpeg[pos..pos + 2 + length];
        if marker == 0xDB || marker == 0xC4 {
            tables.extend_from_slice(segment);
        } else {
            stream.extend_from_slice(segment);
        }
        pos += 2 + length;
    }

    tables.extend_from_slice(&[0xFF, 0xD9]);
    (tables, stream)
}

/// Pack 1-bit rows MSB first.
pub fn pack_bits(rows: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for row in rows {
        for chunk in row.chunks(8) {
            let byte = chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, &bit)| acc | ((bit & 1) << (7 - i)));
            out.push(byte);
        }
    }
    out
}
