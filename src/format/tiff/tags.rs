//! Numeric vocabulary of TIFF directories: field types, the tags the
//! decoder reads, and the enumerated values of compression, photometric,
//! predictor and sample format. BigTIFF's 64-bit field types are included.

// =============================================================================
// TIFF Field Types
// =============================================================================

/// Encoding of an IFD entry's values.
///
/// The per-value size decides whether an entry's values sit inside the
/// entry or behind an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FieldType {
    /// Unsigned 8-bit integer
    Byte = 1,
    /// 8-bit ASCII character, NUL terminated
    Ascii = 2,
    /// Unsigned 16-bit integer
    Short = 3,
    /// Unsigned 32-bit integer
    Long = 4,
    /// Two LONGs: numerator, denominator
    Rational = 5,
    /// Signed 8-bit integer
    SByte = 6,
    /// Opaque byte data
    Undefined = 7,
    /// Signed 16-bit integer
    SShort = 8,
    /// Signed 32-bit integer
    SLong = 9,
    /// Two SLONGs
    SRational = 10,
    /// IEEE single precision
    Float = 11,
    /// IEEE double precision
    Double = 12,
    /// 32-bit IFD offset
    Ifd = 13,
    /// Unsigned 64-bit integer (BigTIFF)
    Long8 = 16,
    /// Signed 64-bit integer (BigTIFF)
    SLong8 = 17,
    /// 64-bit IFD offset (BigTIFF)
    Ifd8 = 18,
}

impl FieldType {
    /// Bytes per value.
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float | FieldType::Ifd => 4,
            FieldType::Rational
            | FieldType::SRational
            | FieldType::Double
            | FieldType::Long8
            | FieldType::SLong8
            | FieldType::Ifd8 => 8,
        }
    }

    /// `None` for type numbers outside the TIFF 6.0 and BigTIFF sets.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FieldType::Byte),
            2 => Some(FieldType::Ascii),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Long),
            5 => Some(FieldType::Rational),
            6 => Some(FieldType::SByte),
            7 => Some(FieldType::Undefined),
            8 => Some(FieldType::SShort),
            9 => Some(FieldType::SLong),
            10 => Some(FieldType::SRational),
            11 => Some(FieldType::Float),
            12 => Some(FieldType::Double),
            13 => Some(FieldType::Ifd),
            16 => Some(FieldType::Long8),
            17 => Some(FieldType::SLong8),
            18 => Some(FieldType::Ifd8),
            _ => None,
        }
    }

    /// Value bytes a classic entry holds in place
    pub const INLINE_LIMIT_CLASSIC: usize = 4;

    /// Value bytes a BigTIFF entry holds in place
    pub const INLINE_LIMIT_BIGTIFF: usize = 8;

    /// Whether `count` values are stored inside the entry itself.
    #[inline]
    pub fn fits_inline(self, count: u64, is_bigtiff: bool) -> bool {
        let limit = if is_bigtiff {
            Self::INLINE_LIMIT_BIGTIFF
        } else {
            Self::INLINE_LIMIT_CLASSIC
        };
        (self.size_in_bytes() as u64)
            .checked_mul(count)
            .is_some_and(|total| total <= limit as u64)
    }
}

// =============================================================================
// TIFF Tags
// =============================================================================

/// TIFF tag IDs the decoder interprets.
///
/// Tags not listed here are still kept in the [`Directory`](crate::format::Directory)
/// by number; they simply have no name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TiffTag {
    // -------------------------------------------------------------------------
    // Basic Image Structure
    // -------------------------------------------------------------------------
    NewSubfileType = 254,
    ImageWidth = 256,
    ImageLength = 257,
    BitsPerSample = 258,
    Compression = 259,
    PhotometricInterpretation = 262,
    /// Bit order within bytes (1 = MSB first, 2 = LSB first)
    FillOrder = 266,
    ImageDescription = 270,
    SamplesPerPixel = 277,
    /// Chunky (1) or planar (2)
    PlanarConfiguration = 284,
    Software = 305,

    // -------------------------------------------------------------------------
    // Strip Organization
    // -------------------------------------------------------------------------
    StripOffsets = 273,
    RowsPerStrip = 278,
    StripByteCounts = 279,

    // -------------------------------------------------------------------------
    // Tile Organization
    // -------------------------------------------------------------------------
    TileWidth = 322,
    TileLength = 323,
    TileOffsets = 324,
    TileByteCounts = 325,

    // -------------------------------------------------------------------------
    // Compression Parameters
    // -------------------------------------------------------------------------
    /// Group 3 options (bit 0: 2D coding, bit 1: uncompressed mode, bit 2: fill bits)
    T4Options = 292,
    /// Group 4 options (bit 1: uncompressed mode)
    T6Options = 293,
    /// Differencing predictor applied before compression
    Predictor = 317,
    /// JPEG quantization and Huffman tables for abbreviated streams
    JpegTables = 347,

    // -------------------------------------------------------------------------
    // Color
    // -------------------------------------------------------------------------
    ColorMap = 320,
    InkSet = 332,
    ExtraSamples = 338,
    SampleFormat = 339,
    YCbCrCoefficients = 529,
    YCbCrSubSampling = 530,
    YCbCrPositioning = 531,
    ReferenceBlackWhite = 532,

    // -------------------------------------------------------------------------
    // Resolution
    // -------------------------------------------------------------------------
    XResolution = 282,
    YResolution = 283,
    ResolutionUnit = 296,

    // -------------------------------------------------------------------------
    // Sub-directories
    // -------------------------------------------------------------------------
    SubIfds = 330,
    ExifIfd = 34665,
    GpsIfd = 34853,
}

impl TiffTag {
    /// `None` for tags without a name here; those are still kept by number.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            254 => Some(TiffTag::NewSubfileType),
            256 => Some(TiffTag::ImageWidth),
            257 => Some(TiffTag::ImageLength),
            258 => Some(TiffTag::BitsPerSample),
            259 => Some(TiffTag::Compression),
            262 => Some(TiffTag::PhotometricInterpretation),
            266 => Some(TiffTag::FillOrder),
            270 => Some(TiffTag::ImageDescription),
            273 => Some(TiffTag::StripOffsets),
            277 => Some(TiffTag::SamplesPerPixel),
            278 => Some(TiffTag::RowsPerStrip),
            279 => Some(TiffTag::StripByteCounts),
            282 => Some(TiffTag::XResolution),
            283 => Some(TiffTag::YResolution),
            284 => Some(TiffTag::PlanarConfiguration),
            292 => Some(TiffTag::T4Options),
            293 => Some(TiffTag::T6Options),
            296 => Some(TiffTag::ResolutionUnit),
            305 => Some(TiffTag::Software),
            317 => Some(TiffTag::Predictor),
            320 => Some(TiffTag::ColorMap),
            322 => Some(TiffTag::TileWidth),
            323 => Some(TiffTag::TileLength),
            324 => Some(TiffTag::TileOffsets),
            325 => Some(TiffTag::TileByteCounts),
            330 => Some(TiffTag::SubIfds),
            332 => Some(TiffTag::InkSet),
            338 => Some(TiffTag::ExtraSamples),
            339 => Some(TiffTag::SampleFormat),
            347 => Some(TiffTag::JpegTables),
            529 => Some(TiffTag::YCbCrCoefficients),
            530 => Some(TiffTag::YCbCrSubSampling),
            531 => Some(TiffTag::YCbCrPositioning),
            532 => Some(TiffTag::ReferenceBlackWhite),
            34665 => Some(TiffTag::ExifIfd),
            34853 => Some(TiffTag::GpsIfd),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Tag id as used by [`Directory`](crate::format::Directory).
    #[inline]
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Whether the tag's value is an offset to another IFD.
    #[inline]
    pub const fn is_sub_directory(self) -> bool {
        matches!(self, TiffTag::SubIfds | TiffTag::ExifIfd | TiffTag::GpsIfd)
    }
}

// =============================================================================
// Compression Values
// =============================================================================

/// Compression tag values (tag 259).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Compression {
    /// No compression
    None = 1,
    /// CCITT modified Huffman run length encoding
    CcittRle = 2,
    /// CCITT Group 3 fax (T.4)
    CcittT4 = 3,
    /// CCITT Group 4 fax (T.6)
    CcittT6 = 4,
    Lzw = 5,
    /// "Old-style" JPEG (not supported)
    OldJpeg = 6,
    Jpeg = 7,
    Deflate = 8,
    PackBits = 32773,
    AdobeDeflate = 32946,
    /// JPEG 2000 (not supported)
    Jpeg2000 = 33003,
}

impl Compression {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Compression::None),
            2 => Some(Compression::CcittRle),
            3 => Some(Compression::CcittT4),
            4 => Some(Compression::CcittT6),
            5 => Some(Compression::Lzw),
            6 => Some(Compression::OldJpeg),
            7 => Some(Compression::Jpeg),
            8 => Some(Compression::Deflate),
            32773 => Some(Compression::PackBits),
            32946 => Some(Compression::AdobeDeflate),
            33003 => Some(Compression::Jpeg2000),
            _ => None,
        }
    }

    /// Whether [`CompressionCodec`](crate::codec::CompressionCodec) decodes it.
    #[inline]
    pub const fn is_supported(self) -> bool {
        !matches!(self, Compression::OldJpeg | Compression::Jpeg2000)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Compression::None => "None",
            Compression::CcittRle => "CCITT RLE",
            Compression::CcittT4 => "CCITT T.4",
            Compression::CcittT6 => "CCITT T.6",
            Compression::Lzw => "LZW",
            Compression::OldJpeg => "Old JPEG",
            Compression::Jpeg => "JPEG",
            Compression::Deflate => "Deflate",
            Compression::PackBits => "PackBits",
            Compression::AdobeDeflate => "Adobe Deflate",
            Compression::Jpeg2000 => "JPEG 2000",
        }
    }
}

// =============================================================================
// Photometric Interpretation
// =============================================================================

/// How sample values map to colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Photometric {
    WhiteIsZero = 0,
    BlackIsZero = 1,
    Rgb = 2,
    Palette = 3,
    TransparencyMask = 4,
    /// Usually CMYK, see InkSet
    Separated = 5,
    YCbCr = 6,
    CieLab = 8,
    IccLab = 9,
    ItuLab = 10,
}

impl Photometric {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Photometric::WhiteIsZero),
            1 => Some(Photometric::BlackIsZero),
            2 => Some(Photometric::Rgb),
            3 => Some(Photometric::Palette),
            4 => Some(Photometric::TransparencyMask),
            5 => Some(Photometric::Separated),
            6 => Some(Photometric::YCbCr),
            8 => Some(Photometric::CieLab),
            9 => Some(Photometric::IccLab),
            10 => Some(Photometric::ItuLab),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Photometric::WhiteIsZero => "WhiteIsZero",
            Photometric::BlackIsZero => "BlackIsZero",
            Photometric::Rgb => "RGB",
            Photometric::Palette => "Palette",
            Photometric::TransparencyMask => "TransparencyMask",
            Photometric::Separated => "Separated",
            Photometric::YCbCr => "YCbCr",
            Photometric::CieLab => "CIELab",
            Photometric::IccLab => "ICCLab",
            Photometric::ItuLab => "ITULab",
        }
    }

    /// Whether this is one of the three Lab encodings.
    #[inline]
    pub const fn is_lab(self) -> bool {
        matches!(
            self,
            Photometric::CieLab | Photometric::IccLab | Photometric::ItuLab
        )
    }
}

// =============================================================================
// Predictor / SampleFormat
// =============================================================================

/// Differencing predictor (tag 317).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Predictor {
    None = 1,
    Horizontal = 2,
    FloatingPoint = 3,
}

impl Predictor {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Predictor::None),
            2 => Some(Predictor::Horizontal),
            3 => Some(Predictor::FloatingPoint),
            _ => None,
        }
    }
}

/// Sample interpretation (tag 339).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum SampleFormat {
    Uint = 1,
    Int = 2,
    Float = 3,
    Void = 4,
}

impl SampleFormat {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(SampleFormat::Uint),
            2 => Some(SampleFormat::Int),
            3 => Some(SampleFormat::Float),
            4 => Some(SampleFormat::Void),
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // FieldType Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_field_type_sizes() {
        assert_eq!(FieldType::Byte.size_in_bytes(), 1);
        assert_eq!(FieldType::SShort.size_in_bytes(), 2);
        assert_eq!(FieldType::Float.size_in_bytes(), 4);
        assert_eq!(FieldType::Ifd.size_in_bytes(), 4);
        assert_eq!(FieldType::Rational.size_in_bytes(), 8);
        assert_eq!(FieldType::Double.size_in_bytes(), 8);
        assert_eq!(FieldType::Ifd8.size_in_bytes(), 8);
    }

    #[test]
    fn test_field_type_from_u16() {
        for raw in (1..=13).chain(16..=18) {
            let ft = FieldType::from_u16(raw).unwrap();
            assert_eq!(ft as u16, raw);
        }
        assert_eq!(FieldType::from_u16(0), None);
        assert_eq!(FieldType::from_u16(14), None);
        assert_eq!(FieldType::from_u16(99), None);
    }

    #[test]
    fn test_fits_inline() {
        assert!(FieldType::Short.fits_inline(2, false));
        assert!(!FieldType::Short.fits_inline(3, false));
        assert!(!FieldType::Rational.fits_inline(1, false));
        assert!(FieldType::Rational.fits_inline(1, true));
        assert!(FieldType::Long.fits_inline(2, true));
        assert!(!FieldType::Long8.fits_inline(u64::MAX, true));
    }

    // -------------------------------------------------------------------------
    // TiffTag Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_tiff_tag_from_u16() {
        assert_eq!(TiffTag::from_u16(266), Some(TiffTag::FillOrder));
        assert_eq!(TiffTag::from_u16(292), Some(TiffTag::T4Options));
        assert_eq!(TiffTag::from_u16(317), Some(TiffTag::Predictor));
        assert_eq!(TiffTag::from_u16(34665), Some(TiffTag::ExifIfd));
        assert_eq!(TiffTag::from_u16(9999), None);
        assert_eq!(TiffTag::ColorMap.as_u16(), 320);
        assert!(TiffTag::SubIfds.is_sub_directory());
        assert!(!TiffTag::StripOffsets.is_sub_directory());
    }

    // -------------------------------------------------------------------------
    // Enumerated Value Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_compression() {
        assert_eq!(Compression::from_u16(32773), Some(Compression::PackBits));
        assert_eq!(Compression::from_u16(4), Some(Compression::CcittT6));
        assert!(Compression::Lzw.is_supported());
        assert!(Compression::CcittT4.is_supported());
        assert!(!Compression::OldJpeg.is_supported());
        assert_eq!(Compression::AdobeDeflate.name(), "Adobe Deflate");
    }

    #[test]
    fn test_photometric() {
        assert_eq!(Photometric::from_u16(6), Some(Photometric::YCbCr));
        assert_eq!(Photometric::from_u16(7), None);
        assert!(Photometric::IccLab.is_lab());
        assert!(!Photometric::Rgb.is_lab());
    }

    #[test]
    fn test_predictor_and_sample_format() {
        assert_eq!(Predictor::from_u16(3), Some(Predictor::FloatingPoint));
        assert_eq!(Predictor::from_u16(4), None);
        assert_eq!(SampleFormat::from_u16(3), Some(SampleFormat::Float));
    }
}
