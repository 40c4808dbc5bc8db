use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Coarse classification of every fatal error the decoder can produce.
///
/// Front ends use this to decide presentation: structural errors mean the
/// container itself is broken, codec corruption is confined to one unit,
/// unsupported features carry the offending value, and cancellation is the
/// caller's own abort flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or truncated container, duplicate singleton, missing required tag
    Structural,
    /// Corrupt compressed data inside one strip, tile or body
    CodecCorruption,
    /// Valid data using a feature this decoder does not implement
    Unsupported,
    /// The caller requested cancellation
    Cancelled,
}

/// I/O errors that can occur when reading from a byte source
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// The backing file could not be read
    #[error("Failed to read {path}: {message}")]
    File { path: String, message: String },
}

/// Errors related to container format detection
#[derive(Debug, Clone, Error)]
pub enum FormatError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Neither an IFF FORM nor a TIFF header
    #[error("Unsupported format: {reason}")]
    UnsupportedFormat { reason: String },
}

/// Errors that can occur when parsing TIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file or to invalid location)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// The next-IFD chain points back at an IFD already parsed
    #[error("IFD chain loops back to offset {0}")]
    IfdLoop(u64),

    /// Required tag is missing from IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// The same tag appears twice in one IFD
    #[error("Duplicate tag {tag} in IFD at offset {ifd_offset}")]
    DuplicateTag { tag: u16, ifd_offset: u64 },

    /// Unknown field type in IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),
}

/// Errors that can occur when parsing IFF files
#[derive(Debug, Clone, Error)]
pub enum IffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// The file does not start with a FORM chunk
    #[error("Not an IFF FORM: found chunk '{0}'")]
    NotAForm(String),

    /// FORM type other than ILBM, PBM, RGB8, DEEP or TVPP
    #[error("Unsupported IFF form type: '{0}'")]
    UnsupportedFormType(String),

    /// A singleton chunk appears twice
    #[error("Multiple {0} chunks not allowed")]
    DuplicateChunk(&'static str),

    /// A chunk required by the form type is absent
    #[error("Missing required {0} chunk")]
    MissingChunk(&'static str),

    /// Fixed-size chunk with the wrong length
    #[error("Unknown {chunk} chunk length: {length} (expected {expected})")]
    InvalidChunkLength {
        chunk: &'static str,
        length: u32,
        expected: u32,
    },

    /// Declared chunk length runs past the enclosing FORM or the file
    #[error("Chunk '{chunk}' at offset {offset} with length {length} exceeds container ({available} bytes available)")]
    ChunkOverrun {
        chunk: String,
        offset: u64,
        length: u64,
        available: u64,
    },

    /// Chunk content is inconsistent
    #[error("Invalid {chunk} chunk: {message}")]
    InvalidChunk {
        chunk: &'static str,
        message: String,
    },

    /// Chunk uses a variant this decoder does not implement
    #[error("Unsupported {chunk} feature: {feature}")]
    Unsupported {
        chunk: &'static str,
        feature: String,
    },
}

/// Errors raised while decompressing a single strip, tile or body
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// LZW code referencing beyond the current table
    #[error("Corrupted LZW: code {code} (table size: {table_len})")]
    LzwCode { code: u16, table_len: usize },

    /// LZW string table grew past its capacity
    #[error("Corrupted LZW table: more than {capacity} entries")]
    LzwTableOverflow { capacity: usize },

    /// Bit pattern that matches no entry of a CCITT code table
    #[error("Unknown code in CCITT {table} table at bit offset {bit_offset}")]
    UnknownCode {
        table: &'static str,
        bit_offset: usize,
    },

    /// CCITT row whose runs do not add up to the image width
    #[error("Sum of run-lengths does not equal scan line width: {actual} != {expected} (row {row})")]
    RunLengthMismatch { row: u32, expected: u32, actual: u32 },

    /// Compressed data ended before the unit was complete
    #[error("Unexpected end of {codec} stream: produced {decoded} of {expected} bytes")]
    UnexpectedEof {
        codec: &'static str,
        decoded: usize,
        expected: usize,
    },

    /// Error reported by the zlib inflater
    #[error("Deflate error: {0}")]
    Deflate(String),

    /// Error reported by the JPEG decoder
    #[error("JPEG error: {0}")]
    Jpeg(String),

    /// Codec option the decoder does not implement
    #[error("Unsupported {codec} option: {option}")]
    Unsupported {
        codec: &'static str,
        option: String,
    },
}

/// Top-level error returned by decode operations
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Container detection failed
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// TIFF structure error
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// IFF structure error
    #[error("IFF error: {0}")]
    Iff(#[from] IffError),

    /// Codec failure, tagged with the unit and its byte offset
    #[error("Codec error in unit {unit} at offset {offset}: {source}")]
    Codec {
        unit: usize,
        offset: u64,
        #[source]
        source: CodecError,
    },

    /// Compression, photometric interpretation, predictor or sample layout not implemented
    #[error("Unsupported {feature}: {value}")]
    Unsupported { feature: &'static str, value: String },

    /// Region or subsampling request that cannot be satisfied
    #[error("Invalid decode parameter: {0}")]
    InvalidParameter(String),

    /// The abort flag was raised between rows or units
    #[error("Decoding aborted")]
    Aborted,
}

impl TiffError {
    /// Category of this error.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Structural
    }
}

impl IffError {
    /// Category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            IffError::UnsupportedFormType(_) | IffError::Unsupported { .. } => {
                ErrorCategory::Unsupported
            }
            _ => ErrorCategory::Structural,
        }
    }
}

impl CodecError {
    /// Category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CodecError::Unsupported { .. } => ErrorCategory::Unsupported,
            _ => ErrorCategory::CodecCorruption,
        }
    }
}

impl DecodeError {
    /// Category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            DecodeError::Io(_) => ErrorCategory::Structural,
            DecodeError::Format(FormatError::Io(_)) => ErrorCategory::Structural,
            DecodeError::Format(FormatError::UnsupportedFormat { .. }) => {
                ErrorCategory::Unsupported
            }
            DecodeError::Tiff(e) => e.category(),
            DecodeError::Iff(e) => e.category(),
            DecodeError::Codec { source, .. } => source.category(),
            DecodeError::Unsupported { .. } => ErrorCategory::Unsupported,
            DecodeError::InvalidParameter(_) => ErrorCategory::Structural,
            DecodeError::Aborted => ErrorCategory::Cancelled,
        }
    }

    /// Shorthand for an unsupported-feature error.
    pub fn unsupported(feature: &'static str, value: impl ToString) -> Self {
        DecodeError::Unsupported {
            feature,
            value: value.to_string(),
        }
    }
}

// =============================================================================
// Warnings
// =============================================================================

/// Soft, non-fatal conditions found while decoding.
///
/// Warnings are logged through `tracing` when raised and collected in the
/// decode result so callers can surface them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Warning {
    /// A palette change targets a register past the end of the palette
    #[error("Palette register {register} out of range (palette has {palette_len} entries) at row {row}")]
    PaletteIndexOutOfRange {
        register: u16,
        palette_len: usize,
        row: i32,
    },

    /// A pixel refers to a color past the end of the palette
    #[error("Pixel index {index} past the end of a {palette_len} entry palette, drawn as black")]
    PixelIndexOutOfRange {
        index: usize,
        palette_len: usize,
    },

    /// 16-bit ColorMap whose values only use the low byte
    #[error("8 bit ColorMap detected")]
    EightBitColorMap,

    /// Abbreviated JPEG stream without a JPEGTables tag
    #[error("Missing JPEGTables for abbreviated JPEG stream in unit {unit}")]
    MissingJpegTables { unit: usize },

    /// PCHG header total disagrees with the decoded changes
    #[error("PCHG change count mismatch: header says {expected}, found {actual}")]
    ChangeCountMismatch { expected: u32, actual: u32 },

    /// Palette requested for a row the multi-palette does not cover
    #[error("Palette row {row} outside multi-palette range (0..{rows})")]
    PaletteRowOutOfRange { row: u32, rows: u32 },

    /// Co-sited chroma decoded as centered
    #[error("YCbCrPositioning {0} (co-sited) decoded as centered")]
    YCbCrPositioning(u16),

    /// PhotometricInterpretation absent, a default was assumed
    #[error("Missing PhotometricInterpretation, assuming {0}")]
    MissingPhotometric(&'static str),
}
