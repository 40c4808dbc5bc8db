//! Container parsers for IFF and TIFF images.
//!
//! Both parsers reduce their on-disk structure to a [`directory::Directory`]
//! plus a decode-ready description:
//!
//! - **IFF**: [`iff::IffFile`] walks the FORM chunks into an [`iff::Form`]
//! - **TIFF**: [`tiff::TiffFile`] walks the IFD chain; [`tiff::TiffImage`]
//!   resolves one directory with defaults
//!
//! # Format Detection
//!
//! Use [`detect::detect_format`] to tell the containers apart before opening.

pub mod detect;
pub mod directory;
pub mod iff;
pub mod tiff;

pub use detect::{classify, detect_format, is_iff_header, is_tiff_header, ContainerFormat};
pub use directory::{fourcc, fourcc_to_string, Directory, Entry, Value};
