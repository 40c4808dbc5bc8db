//! Fixed-layout IFF header chunks.
//!
//! ## BMHD (20 bytes)
//! ```text
//! Bytes 0-3:   width u16, height u16
//! Bytes 4-7:   x i16, y i16
//! Byte  8:     bitplanes
//! Byte  9:     masking (0 none, 1 mask plane, 2 transparent color, 3 lasso)
//! Byte  10:    compression (0 none, 1 ByteRun1, 4 RGB8 run length)
//! Byte  11:    pad
//! Bytes 12-13: transparent color u16
//! Bytes 14-15: x aspect u8, y aspect u8
//! Bytes 16-19: page width i16, page height i16
//! ```
//!
//! ## CAMG (4 bytes)
//! Amiga view mode flags; only HAM, EHB and LACE matter here.
//!
//! ## DGBL / DLOC / DPEL
//! Global, location and pixel layout of DEEP and TVPP forms.

use serde::Serialize;

use crate::error::IffError;
use crate::io::{read_i16_be, read_u16_be, read_u32_be};

/// BMHD chunk length
pub const BMHD_LENGTH: u32 = 20;

/// BMHD compression: none
pub const COMPRESSION_NONE: u8 = 0;
/// BMHD compression: ByteRun1 (PackBits)
pub const COMPRESSION_BYTE_RUN: u8 = 1;
/// BMHD compression: RGB8 run length (only in RGB8 forms)
pub const COMPRESSION_RGB8_RLE: u8 = 4;

// =============================================================================
// BMHD
// =============================================================================

/// How transparency is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Masking {
    None,
    /// One extra plane after the image planes
    HasMask,
    /// `transparent_color` is see-through
    TransparentColor,
    /// Drawing-program lasso, decoded as opaque
    Lasso,
}

impl Masking {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Masking::None),
            1 => Some(Masking::HasMask),
            2 => Some(Masking::TransparentColor),
            3 => Some(Masking::Lasso),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Masking::None => 0,
            Masking::HasMask => 1,
            Masking::TransparentColor => 2,
            Masking::Lasso => 3,
        }
    }
}

/// Bitmap header of ILBM, PBM and RGB8 forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BitmapHeader {
    pub width: u16,
    pub height: u16,
    pub x: i16,
    pub y: i16,
    pub planes: u8,
    pub masking: Masking,
    pub compression: u8,
    pub transparent_color: u16,
    pub x_aspect: u8,
    pub y_aspect: u8,
    pub page_width: i16,
    pub page_height: i16,
}

impl BitmapHeader {
    /// Header for a new image, with square pixels and a page of the image size.
    pub fn new(width: u16, height: u16, planes: u8, masking: Masking, compression: u8) -> Self {
        Self {
            width,
            height,
            x: 0,
            y: 0,
            planes,
            masking,
            compression,
            transparent_color: 0,
            x_aspect: 1,
            y_aspect: 1,
            page_width: width.min(i16::MAX as u16) as i16,
            page_height: height.min(i16::MAX as u16) as i16,
        }
    }

    /// Parse a BMHD payload.
    ///
    /// # Errors
    /// - `InvalidChunkLength` unless the payload is exactly 20 bytes
    /// - `Unsupported` for an unknown masking type
    pub fn parse(data: &[u8]) -> Result<Self, IffError> {
        if data.len() != BMHD_LENGTH as usize {
            return Err(IffError::InvalidChunkLength {
                chunk: "BMHD",
                length: data.len() as u32,
                expected: BMHD_LENGTH,
            });
        }

        let masking = Masking::from_u8(data[9]).ok_or_else(|| IffError::Unsupported {
            chunk: "BMHD",
            feature: format!("masking type {}", data[9]),
        })?;

        Ok(Self {
            width: read_u16_be(&data[0..]),
            height: read_u16_be(&data[2..]),
            x: read_i16_be(&data[4..]),
            y: read_i16_be(&data[6..]),
            planes: data[8],
            masking,
            compression: data[10],
            transparent_color: read_u16_be(&data[12..]),
            x_aspect: data[14],
            y_aspect: data[15],
            page_width: read_i16_be(&data[16..]),
            page_height: read_i16_be(&data[18..]),
        })
    }

    /// Serialize to the 20-byte payload.
    pub fn to_bytes(&self) -> [u8; 20] {
        let mut out = [0u8; 20];
        out[0..2].copy_from_slice(&self.width.to_be_bytes());
        out[2..4].copy_from_slice(&self.height.to_be_bytes());
        out[4..6].copy_from_slice(&self.x.to_be_bytes());
        out[6..8].copy_from_slice(&self.y.to_be_bytes());
        out[8] = self.planes;
        out[9] = self.masking.as_u8();
        out[10] = self.compression;
        out[12..14].copy_from_slice(&self.transparent_color.to_be_bytes());
        out[14] = self.x_aspect;
        out[15] = self.y_aspect;
        out[16..18].copy_from_slice(&self.page_width.to_be_bytes());
        out[18..20].copy_from_slice(&self.page_height.to_be_bytes());
        out
    }

    /// Planes stored per row, including the mask plane.
    pub fn stored_planes(&self) -> usize {
        self.planes as usize + usize::from(self.masking == Masking::HasMask)
    }
}

// =============================================================================
// CAMG
// =============================================================================

/// Amiga display mode (CAMG).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewMode(pub u32);

impl ViewMode {
    pub const LACE: u32 = 0x0004;
    pub const EXTRA_HALFBRITE: u32 = 0x0080;
    pub const HAM: u32 = 0x0800;

    pub fn parse(data: &[u8]) -> Result<Self, IffError> {
        if data.len() != 4 {
            return Err(IffError::InvalidChunkLength {
                chunk: "CAMG",
                length: data.len() as u32,
                expected: 4,
            });
        }
        Ok(ViewMode(read_u32_be(data)))
    }

    pub fn is_ham(self) -> bool {
        self.0 & Self::HAM != 0
    }

    pub fn is_ehb(self) -> bool {
        self.0 & Self::EXTRA_HALFBRITE != 0
    }

    pub fn is_laced(self) -> bool {
        self.0 & Self::LACE != 0
    }
}

// =============================================================================
// DEEP / TVPP
// =============================================================================

/// DGBL: display size, compression and aspect of a DEEP form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeepGlobal {
    pub display_width: u16,
    pub display_height: u16,
    /// 0 none, 1 run length (ByteRun1)
    pub compression: u16,
    pub x_aspect: u8,
    pub y_aspect: u8,
}

impl DeepGlobal {
    pub fn parse(data: &[u8]) -> Result<Self, IffError> {
        if data.len() != 8 {
            return Err(IffError::InvalidChunkLength {
                chunk: "DGBL",
                length: data.len() as u32,
                expected: 8,
            });
        }
        Ok(Self {
            display_width: read_u16_be(&data[0..]),
            display_height: read_u16_be(&data[2..]),
            compression: read_u16_be(&data[4..]),
            x_aspect: data[6],
            y_aspect: data[7],
        })
    }
}

/// DLOC: size and position of the DEEP body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeepLocation {
    pub width: u16,
    pub height: u16,
    pub x: i16,
    pub y: i16,
}

impl DeepLocation {
    pub fn parse(data: &[u8]) -> Result<Self, IffError> {
        if data.len() != 8 {
            return Err(IffError::InvalidChunkLength {
                chunk: "DLOC",
                length: data.len() as u32,
                expected: 8,
            });
        }
        Ok(Self {
            width: read_u16_be(&data[0..]),
            height: read_u16_be(&data[2..]),
            x: read_i16_be(&data[4..]),
            y: read_i16_be(&data[6..]),
        })
    }
}

/// Component of a DEEP pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeepElement {
    /// 1 red, 2 green, 3 blue, 4 alpha; other types are carried but ignored
    pub kind: u16,
    pub bit_depth: u16,
}

impl DeepElement {
    pub const RED: u16 = 1;
    pub const GREEN: u16 = 2;
    pub const BLUE: u16 = 3;
    pub const ALPHA: u16 = 4;
}

/// DPEL: the components of each chunky pixel, in storage order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeepPixel {
    pub elements: Vec<DeepElement>,
}

impl DeepPixel {
    pub fn parse(data: &[u8]) -> Result<Self, IffError> {
        if data.len() < 4 {
            return Err(IffError::InvalidChunkLength {
                chunk: "DPEL",
                length: data.len() as u32,
                expected: 4,
            });
        }
        let count = read_u32_be(data) as usize;
        let body = &data[4..];
        if body.len() < count * 4 {
            return Err(IffError::InvalidChunk {
                chunk: "DPEL",
                message: format!("{} elements declared, room for {}", count, body.len() / 4),
            });
        }

        let elements = body
            .chunks_exact(4)
            .take(count)
            .map(|e| DeepElement {
                kind: read_u16_be(&e[0..]),
                bit_depth: read_u16_be(&e[2..]),
            })
            .collect();
        Ok(Self { elements })
    }

    pub fn bits_per_pixel(&self) -> u32 {
        self.elements.iter().map(|e| e.bit_depth as u32).sum()
    }
}
