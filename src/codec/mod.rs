//! Compression codecs.
//!
//! Every TIFF strip or tile, and every IFF BODY, is one independently
//! compressed unit. [`CompressionCodec::decode`] turns one unit into raw
//! sample bytes; each call starts from fresh codec state.
//!
//! # Supported Codecs
//!
//! ```text
//! TIFF code   codec
//! 1           None
//! 2           CCITT Modified Huffman
//! 3           CCITT Group 3 (T.4)
//! 4           CCITT Group 4 (T.6)
//! 5           LZW (standard or legacy bit order)
//! 7           JPEG (delegated to the image crate)
//! 8, 32946    Deflate (delegated to flate2)
//! 32773       PackBits (IFF ByteRun1)
//! ```

pub mod ccitt;
pub mod deflate;
pub mod jpeg;
pub mod lzw;
pub mod packbits;
pub mod rgb8;

use bytes::Bytes;

use crate::error::CodecError;

pub use ccitt::{FaxOptions, FaxScheme};
pub use lzw::LzwVariant;

/// Most bytes a codec reserves up front; output past this grows on demand,
/// so a hostile `expected_len` cannot force a huge allocation before any
/// input has been read.
pub(crate) const MAX_PREALLOCATION: usize = 1 << 24;

/// Output buffer for a unit expected to decode to `expected_len` bytes.
pub(crate) fn output_buffer(expected_len: usize) -> Vec<u8> {
    Vec::with_capacity(expected_len.min(MAX_PREALLOCATION))
}

/// A configured decompressor for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionCodec {
    /// Raw bytes
    None,

    /// PackBits / ByteRun1
    PackBits,

    /// LZW; `None` sniffs the variant from each unit
    Lzw(Option<LzwVariant>),

    /// CCITT 1D rows, byte aligned
    CcittModifiedHuffman { columns: u32 },

    /// CCITT T.4 with optional 2D rows
    CcittG3 { columns: u32, options: FaxOptions },

    /// CCITT T.6
    CcittG4 { columns: u32, options: FaxOptions },

    /// Zlib stream
    Deflate,

    /// JPEG, with the shared JPEGTables if the image has them
    Jpeg { tables: Option<Bytes> },
}

impl CompressionCodec {
    /// Decode one unit into exactly `expected_len` bytes.
    ///
    /// # Errors
    /// - Codec-specific corruption errors
    /// - `UnexpectedEof` if the unit decodes to fewer than `expected_len` bytes
    pub fn decode(&self, compressed: &[u8], expected_len: usize) -> Result<Vec<u8>, CodecError> {
        let decoded = match self {
            CompressionCodec::None => {
                compressed[..compressed.len().min(expected_len)].to_vec()
            }
            CompressionCodec::PackBits => packbits::decode(compressed, expected_len)?,
            CompressionCodec::Lzw(variant) => {
                let variant = variant.unwrap_or_else(|| LzwVariant::sniff(compressed));
                lzw::decode(compressed, expected_len, variant)?
            }
            CompressionCodec::CcittModifiedHuffman { columns } => ccitt::decode(
                compressed,
                *columns,
                expected_len,
                FaxScheme::ModifiedHuffman,
                FaxOptions::default(),
            )?,
            CompressionCodec::CcittG3 { columns, options } => {
                ccitt::decode(compressed, *columns, expected_len, FaxScheme::Group3, *options)?
            }
            CompressionCodec::CcittG4 { columns, options } => {
                ccitt::decode(compressed, *columns, expected_len, FaxScheme::Group4, *options)?
            }
            CompressionCodec::Deflate => deflate::decode(compressed, expected_len)?,
            CompressionCodec::Jpeg { tables } => {
                jpeg::decode(compressed, tables.as_deref(), expected_len)?
            }
        };

        if decoded.len() < expected_len {
            return Err(CodecError::UnexpectedEof {
                codec: self.name(),
                decoded: decoded.len(),
                expected: expected_len,
            });
        }
        Ok(decoded)
    }

    /// Short name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            CompressionCodec::None => "None",
            CompressionCodec::PackBits => "PackBits",
            CompressionCodec::Lzw(_) => "LZW",
            CompressionCodec::CcittModifiedHuffman { .. } => FaxScheme::ModifiedHuffman.name(),
            CompressionCodec::CcittG3 { .. } => FaxScheme::Group3.name(),
            CompressionCodec::CcittG4 { .. } => FaxScheme::Group4.name(),
            CompressionCodec::Deflate => "Deflate",
            CompressionCodec::Jpeg { .. } => "JPEG",
        }
    }

    /// Whether the codec can only produce 1-bit, single-sample rows.
    pub fn is_bilevel_only(&self) -> bool {
        matches!(
            self,
            CompressionCodec::CcittModifiedHuffman { .. }
                | CompressionCodec::CcittG3 { .. }
                | CompressionCodec::CcittG4 { .. }
        )
    }
}
