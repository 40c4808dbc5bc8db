//! TIFF container parsing.
//!
//! This module handles parsing of TIFF and BigTIFF files into generic
//! directories and resolves them into decode-ready image descriptions.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian, MM = big-endian)
//!   in the header. All multi-byte values must be read respecting this order.
//!
//! - **Classic TIFF vs BigTIFF**: Classic TIFF uses 32-bit offsets (max 4GB files),
//!   while BigTIFF uses 64-bit offsets. The parser handles both transparently.
//!
//! - **IFD (Image File Directory)**: Contains tags and pointers to image data.
//!   Multi-page files chain several IFDs; SubIFD, EXIF and GPS tags point at
//!   nested ones.
//!
//! - **Inline vs offset values**: Small values are stored inline in the IFD entry,
//!   larger values are stored at an offset pointed to by the entry.
//!
//! - **Units**: Image data is split into strips or tiles, each compressed
//!   independently. See [`StripTileDescriptor`].

mod file;
mod image;
mod parser;
mod tags;
mod validation;
mod values;

pub use file::TiffFile;
pub use image::{StripTileDescriptor, TiffImage, UnitLayout, DEFAULT_YCBCR_COEFFICIENTS};
pub use parser::{
    parse_all_ifds, ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, MAX_IFDS,
    TIFF_HEADER_SIZE,
};
pub use tags::{Compression, FieldType, Photometric, Predictor, SampleFormat, TiffTag};
pub use validation::{validate_image, ValidationResult};
pub use values::{parse_u32_array, parse_u64_array, ValueReader};
