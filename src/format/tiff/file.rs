//! A parsed TIFF file: header plus one directory per IFD in the chain.

use tracing::debug;

use crate::error::{DecodeError, TiffError};
use crate::format::directory::Directory;
use crate::io::RangeReader;

use super::image::TiffImage;
use super::parser::{parse_all_ifds, TiffHeader};
use super::values::ValueReader;

// =============================================================================
// TiffFile
// =============================================================================

/// Every top-level image directory of a TIFF or BigTIFF file.
///
/// Values are fully decoded when the file is opened, so later access does
/// not touch the byte source.
#[derive(Debug, Clone)]
pub struct TiffFile {
    /// The TIFF header
    pub header: TiffHeader,

    /// One directory per IFD, in chain order
    pub directories: Vec<Directory>,
}

impl TiffFile {
    /// Parse the header, walk the IFD chain and decode all tag values.
    pub fn open<R: RangeReader + ?Sized>(reader: &R) -> Result<Self, TiffError> {
        let header = TiffHeader::read(reader)?;
        let ifds = parse_all_ifds(reader, &header)?;

        let values = ValueReader::new(reader, &header);
        let directories = ifds
            .iter()
            .map(|ifd| values.read_directory(ifd))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            source = reader.identifier(),
            bigtiff = header.is_bigtiff,
            images = directories.len(),
            "Opened TIFF"
        );

        Ok(TiffFile {
            header,
            directories,
        })
    }

    /// Number of images in the IFD chain.
    pub fn image_count(&self) -> usize {
        self.directories.len()
    }

    /// Resolve the image at `index` in the chain.
    pub fn image(&self, index: usize) -> Result<TiffImage, DecodeError> {
        let directory = self.directories.get(index).ok_or_else(|| {
            DecodeError::InvalidParameter(format!(
                "image index {} out of range ({} images)",
                index,
                self.directories.len()
            ))
        })?;
        TiffImage::from_directory(directory, self.header.byte_order)
    }
}
