//! Amiga IFF image containers.
//!
//! # Supported forms
//!
//! - **ILBM**: interleaved bitplanes, optionally HAM, EHB or multi-palette
//! - **PBM**: chunky 8-bit indices
//! - **RGB8**: Impulse 24-bit RGB with a genlock bit per pixel
//! - **DEEP / TVPP**: chunky pixels described by DPEL
//!
//! # Key Concepts
//!
//! ```text
//! FORM ─┬─ BMHD / DGBL DLOC DPEL   header chunks, reduced into a Form
//!       ├─ CMAP CAMG               palette and view mode
//!       ├─ PCHG | SHAM | CTBL      per-scanline palette changes
//!       ├─ ANNO AUTH NAME ...      recorded in a Directory
//!       └─ BODY / DBOD             located, decoded later
//! ```

pub mod chunk;
pub mod file;
pub mod form;
pub mod headers;
pub mod multipalette;
pub mod writer;

pub use chunk::{Chunk, ChunkHeader};
pub use file::{ChunkInfo, IffFile};
pub use form::{DeepForm, Form, FormType, IlbmForm};
pub use headers::{
    BitmapHeader, DeepElement, DeepGlobal, DeepLocation, DeepPixel, Masking, ViewMode,
    COMPRESSION_BYTE_RUN, COMPRESSION_NONE, COMPRESSION_RGB8_RLE,
};
pub use multipalette::{parse_ctbl, parse_pchg, parse_sham};
pub use writer::{IlbmPixels, IlbmWriter};
