//! A parsed IFF file: the FORM plus a directory of the chunks seen.

use serde::Serialize;
use tracing::debug;

use crate::error::{IffError, Warning};
use crate::format::directory::{fourcc_to_string, Directory, Entry, Value};
use crate::io::{read_u32_be, RangeReader};

use super::chunk::{is_text_chunk, Chunk, ChunkHeader, BODY, CHUNK_HEADER_SIZE, DBOD, FORM};
use super::form::{Form, FormType};

/// FORM header: "FORM", length, form type
const FORM_HEADER_SIZE: u64 = 12;

/// Summary of one chunk for inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkInfo {
    pub id: String,
    pub offset: u64,
    pub length: u32,
}

// =============================================================================
// IffFile
// =============================================================================

/// An opened IFF image.
///
/// Chunks are walked in order until the BODY (or DBOD) chunk, whose payload
/// is only located, not read.
#[derive(Debug, Clone)]
pub struct IffFile {
    /// Declared FORM length
    pub form_length: u32,

    /// Reduced image chunks
    pub form: Form,

    /// Text, JUNK and unknown chunks, keyed by FourCC
    pub directory: Directory,

    /// Every chunk header walked, in file order
    pub chunks: Vec<ChunkInfo>,

    /// Soft errors raised while parsing chunks
    pub warnings: Vec<Warning>,
}

impl IffFile {
    /// Parse the FORM header and walk its chunks.
    ///
    /// # Errors
    /// - `NotAForm` / `UnsupportedFormType` for foreign data
    /// - `ChunkOverrun` when a chunk extends past the FORM or the source
    /// - any reducer or chunk payload error
    pub fn open<R: RangeReader + ?Sized>(reader: &R) -> Result<Self, IffError> {
        let size = reader.size();
        if size < FORM_HEADER_SIZE {
            return Err(IffError::NotAForm(format!("{} bytes", size)));
        }

        let header = reader.read_exact_at(0, FORM_HEADER_SIZE as usize)?;
        let id = read_u32_be(&header[0..]);
        if id != FORM {
            return Err(IffError::NotAForm(fourcc_to_string(id)));
        }
        let form_length = read_u32_be(&header[4..]);
        let type_id = read_u32_be(&header[8..]);
        let form_type = FormType::from_id(type_id)
            .ok_or_else(|| IffError::UnsupportedFormType(fourcc_to_string(type_id)))?;

        // The form type counts towards the FORM length
        let form_end = 8 + form_length as u64;
        let limit = form_end.min(size);

        let mut form = Form::new(form_type);
        let mut directory = Directory::new();
        let mut chunks = Vec::new();
        let mut warnings = Vec::new();
        let mut offset = FORM_HEADER_SIZE;

        while offset + CHUNK_HEADER_SIZE <= limit {
            let raw = reader.read_exact_at(offset, CHUNK_HEADER_SIZE as usize)?;
            let chunk = ChunkHeader {
                id: read_u32_be(&raw[0..]),
                length: read_u32_be(&raw[4..]),
                offset: offset + CHUNK_HEADER_SIZE,
            };

            let end = chunk.offset + chunk.length as u64;
            if end > limit {
                return Err(IffError::ChunkOverrun {
                    chunk: chunk.name(),
                    offset,
                    length: chunk.length as u64,
                    available: limit.saturating_sub(chunk.offset),
                });
            }

            debug!(
                chunk = %chunk.name(),
                offset,
                length = chunk.length,
                "IFF chunk"
            );
            chunks.push(ChunkInfo {
                id: chunk.name(),
                offset,
                length: chunk.length,
            });

            if chunk.id == BODY || chunk.id == DBOD {
                form = form.with(Chunk::Body(chunk))?;
                break;
            }

            let payload = reader.read_exact_at(chunk.offset, chunk.length as usize)?;
            let (parsed, warning) = Chunk::parse(chunk, payload, form.height())?;
            warnings.extend(warning);

            match parsed {
                Chunk::Generic {
                    id,
                    length,
                    preview,
                } => record_generic(&mut directory, id, length, &preview),
                parsed => form = form.with(parsed)?,
            }

            offset = chunk.next_offset();
        }

        form.validate()?;

        debug!(
            source = reader.identifier(),
            form = %form_type.name(),
            chunks = chunks.len(),
            "Opened IFF"
        );

        Ok(IffFile {
            form_length,
            form,
            directory,
            chunks,
            warnings,
        })
    }

    pub fn form_type(&self) -> FormType {
        self.form.form_type()
    }
}

/// Keep the first occurrence of a generic chunk.
fn record_generic(directory: &mut Directory, id: u32, length: u32, preview: &[u8]) {
    let value = if is_text_chunk(id) {
        let text = String::from_utf8_lossy(preview);
        Value::Ascii(text.trim_end_matches('\0').to_string())
    } else {
        Value::Undefined(preview.to_vec())
    };

    if directory
        .insert(Entry::new(id, 0, length as u64, value))
        .is_err()
    {
        debug!(chunk = %fourcc_to_string(id), "Repeated chunk not recorded");
    }
}
