//! IFF chunk identifiers and payload dispatch.
//!
//! # Chunk layout
//!
//! ```text
//! ┌────────┬──────────────┬───────────────────────┬─────┐
//! │ FourCC │ length (BE)  │ payload (length bytes)│ pad │
//! │ 4 bytes│ 4 bytes      │                       │ 0/1 │
//! └────────┴──────────────┴───────────────────────┴─────┘
//! ```
//!
//! The pad byte keeps chunks word aligned and is never counted in `length`.

use bytes::Bytes;
use tracing::debug;

use crate::error::{IffError, Warning};
use crate::format::directory::{fourcc, fourcc_to_string};
use crate::palette::{MultiPalette, Palette};

use super::headers::{BitmapHeader, DeepGlobal, DeepLocation, DeepPixel, ViewMode};
use super::multipalette::{parse_ctbl, parse_pchg, parse_sham};

/// Size of a chunk header
pub const CHUNK_HEADER_SIZE: u64 = 8;

/// Longest generic payload kept for inspection
pub const GENERIC_PREVIEW_LIMIT: usize = 256;

// =============================================================================
// FourCC constants
// =============================================================================

pub const FORM: u32 = fourcc(b"FORM");

pub const TYPE_ILBM: u32 = fourcc(b"ILBM");
pub const TYPE_PBM: u32 = fourcc(b"PBM ");
pub const TYPE_RGB8: u32 = fourcc(b"RGB8");
pub const TYPE_DEEP: u32 = fourcc(b"DEEP");
pub const TYPE_TVPP: u32 = fourcc(b"TVPP");

pub const BMHD: u32 = fourcc(b"BMHD");
pub const CMAP: u32 = fourcc(b"CMAP");
pub const CAMG: u32 = fourcc(b"CAMG");
pub const PCHG: u32 = fourcc(b"PCHG");
pub const SHAM: u32 = fourcc(b"SHAM");
pub const CTBL: u32 = fourcc(b"CTBL");
pub const DGBL: u32 = fourcc(b"DGBL");
pub const DLOC: u32 = fourcc(b"DLOC");
pub const DPEL: u32 = fourcc(b"DPEL");
pub const BODY: u32 = fourcc(b"BODY");
pub const DBOD: u32 = fourcc(b"DBOD");

pub const GRAB: u32 = fourcc(b"GRAB");
pub const DEST: u32 = fourcc(b"DEST");
pub const SPRT: u32 = fourcc(b"SPRT");
pub const CRNG: u32 = fourcc(b"CRNG");
pub const CCRT: u32 = fourcc(b"CCRT");
pub const DRNG: u32 = fourcc(b"DRNG");

pub const ANNO: u32 = fourcc(b"ANNO");
pub const AUTH: u32 = fourcc(b"AUTH");
pub const COPYRIGHT: u32 = fourcc(b"(c) ");
pub const COPY: u32 = fourcc(b"COPY");
pub const NAME: u32 = fourcc(b"NAME");
pub const TEXT: u32 = fourcc(b"TEXT");
pub const UTF8: u32 = fourcc(b"UTF8");
pub const JUNK: u32 = fourcc(b"JUNK");

/// Chunks that hold human-readable text.
pub fn is_text_chunk(id: u32) -> bool {
    matches!(id, ANNO | AUTH | COPYRIGHT | COPY | NAME | TEXT | UTF8)
}

// =============================================================================
// Chunk
// =============================================================================

/// Location of a chunk inside the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: u32,
    /// Payload length, excluding the pad byte
    pub length: u32,
    /// Absolute offset of the first payload byte
    pub offset: u64,
}

impl ChunkHeader {
    /// Offset of the next chunk header.
    pub fn next_offset(&self) -> u64 {
        self.offset + self.length as u64 + (self.length as u64 & 1)
    }

    pub fn name(&self) -> String {
        fourcc_to_string(self.id)
    }
}

/// A parsed chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    BitmapHeader(BitmapHeader),
    ViewMode(ViewMode),
    ColorMap(Palette),
    MultiPalette(MultiPalette),
    DeepGlobal(DeepGlobal),
    DeepLocation(DeepLocation),
    DeepPixel(DeepPixel),
    /// Image data; only its position is recorded
    Body(ChunkHeader),
    /// Recognized but not used for decoding
    Ignored(u32),
    /// Text, JUNK and unknown chunks
    Generic {
        id: u32,
        length: u32,
        preview: Bytes,
    },
}

impl Chunk {
    /// Parse a chunk payload.
    ///
    /// `height` is the BMHD height when already known; CTBL needs it to
    /// tell 16 from 32 registers per line.
    pub fn parse(
        header: ChunkHeader,
        payload: Bytes,
        height: Option<u16>,
    ) -> Result<(Chunk, Option<Warning>), IffError> {
        let chunk = match header.id {
            BMHD => Chunk::BitmapHeader(BitmapHeader::parse(&payload)?),
            CAMG => Chunk::ViewMode(ViewMode::parse(&payload)?),
            CMAP => Chunk::ColorMap(Palette::from_rgb_triplets(&payload)),
            PCHG => {
                let (multi, warning) = parse_pchg(&payload)?;
                return Ok((Chunk::MultiPalette(multi), warning));
            }
            SHAM => Chunk::MultiPalette(parse_sham(&payload)?),
            CTBL => Chunk::MultiPalette(parse_ctbl(&payload, height)),
            DGBL => Chunk::DeepGlobal(DeepGlobal::parse(&payload)?),
            DLOC => Chunk::DeepLocation(DeepLocation::parse(&payload)?),
            DPEL => Chunk::DeepPixel(DeepPixel::parse(&payload)?),
            BODY | DBOD => Chunk::Body(header),
            GRAB | DEST | SPRT | CRNG | CCRT | DRNG => Chunk::Ignored(header.id),
            id => {
                if !is_text_chunk(id) {
                    debug!(chunk = %header.name(), length = header.length, "Skipping chunk");
                }
                let keep = payload.len().min(GENERIC_PREVIEW_LIMIT);
                Chunk::Generic {
                    id,
                    length: header.length,
                    preview: payload.slice(..keep),
                }
            }
        };
        Ok((chunk, None))
    }

    /// Name used in error messages.
    pub fn name(&self) -> String {
        match self {
            Chunk::BitmapHeader(_) => "BMHD".to_string(),
            Chunk::ViewMode(_) => "CAMG".to_string(),
            Chunk::ColorMap(_) => "CMAP".to_string(),
            Chunk::MultiPalette(multi) => multi.kind().name().to_string(),
            Chunk::DeepGlobal(_) => "DGBL".to_string(),
            Chunk::DeepLocation(_) => "DLOC".to_string(),
            Chunk::DeepPixel(_) => "DPEL".to_string(),
            Chunk::Body(header) => header.name(),
            Chunk::Ignored(id) | Chunk::Generic { id, .. } => fourcc_to_string(*id),
        }
    }
}
