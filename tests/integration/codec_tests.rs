//! Codec integration tests.
//!
//! Tests verify each decompressor through the public `CompressionCodec`
//! entry point, plus the predictor and bitplane helpers, against known
//! byte vectors.

use iff_tiff_raster::bitplane::{pack_row, plane_row_bytes, rotate_ccw, rotate_cw, unpack_row};
use iff_tiff_raster::codec::{jpeg, lzw, packbits};
use iff_tiff_raster::format::tiff::{ByteOrder, Predictor};
use iff_tiff_raster::{CodecError, CompressionCodec, FaxOptions, LzwVariant, PredictorFilter};

use super::test_utils::{create_test_jpeg, split_jpeg_tables, zlib};

// =============================================================================
// PackBits
// =============================================================================

#[test]
fn test_packbits_reference_vector() {
    let packed = [
        0xFE, 0xAA, 0x02, 0x80, 0x00, 0x2A, 0xFD, 0xAA, 0x03, 0x80, 0x00, 0x2A, 0x22, 0xF7, 0xAA,
    ];
    let expected = [
        0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0xAA, 0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0x22, 0xAA,
        0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
    ];

    let decoded = CompressionCodec::PackBits
        .decode(&packed, expected.len())
        .unwrap();
    assert_eq!(decoded, expected);
}

#[test]
fn test_packbits_encoder_output_decodes() {
    let mut data = vec![0u8; 300];
    data.extend((0..200u32).map(|i| (i * 7) as u8));
    data.extend(std::iter::repeat_n(9u8, 3));

    let packed = packbits::encode(&data);
    assert!(packed.len() < data.len());
    assert_eq!(packbits::decode(&packed, data.len()).unwrap(), data);
}

#[test]
fn test_packbits_short_input() {
    let result = CompressionCodec::PackBits.decode(&[0x03, 1, 2], 4);
    assert!(matches!(result, Err(CodecError::UnexpectedEof { .. })));
}

// =============================================================================
// LZW
// =============================================================================

#[test]
fn test_lzw_encoder_output_decodes() {
    let data: Vec<u8> = (0..4000u32).map(|i| ((i / 3) % 17) as u8).collect();
    let packed = lzw::encode(&data);

    assert_eq!(LzwVariant::sniff(&packed), LzwVariant::Standard);
    let decoded = CompressionCodec::Lzw(None)
        .decode(&packed, data.len())
        .unwrap();
    assert_eq!(decoded, data);
}

#[test]
fn test_lzw_legacy_stream() {
    // CLEAR, 'A', EOI as 9-bit codes packed LSB first
    let packed = [0x00, 0x83, 0x04, 0x04];

    assert_eq!(LzwVariant::sniff(&packed), LzwVariant::Legacy);
    assert_eq!(
        CompressionCodec::Lzw(None).decode(&packed, 1).unwrap(),
        vec![b'A']
    );
    assert_eq!(
        CompressionCodec::Lzw(Some(LzwVariant::Legacy))
            .decode(&packed, 1)
            .unwrap(),
        vec![b'A']
    );
}

// =============================================================================
// Deflate and JPEG
// =============================================================================

#[test]
fn test_deflate_unit() {
    let data: Vec<u8> = (0..1024u32).map(|i| (i % 97) as u8).collect();
    let decoded = CompressionCodec::Deflate
        .decode(&zlib(&data), data.len())
        .unwrap();
    assert_eq!(decoded, data);
}

#[test]
fn test_deflate_garbage() {
    assert!(CompressionCodec::Deflate.decode(&[1, 2, 3, 4], 16).is_err());
}

#[test]
fn test_jpeg_tables_merge() {
    let full = create_test_jpeg(16, 16, 90);
    let (tables, abbreviated) = split_jpeg_tables(&full);

    assert!(!jpeg::is_abbreviated_stream(&full));
    assert!(jpeg::is_abbreviated_stream(&abbreviated));

    let merged = jpeg::merge_tables(&tables, &abbreviated);
    assert_eq!(&merged[..2], &[0xFF, 0xD8]);
    assert!(!jpeg::is_abbreviated_stream(&merged));

    let expected = image::load_from_memory(&full).unwrap().to_luma8().into_raw();
    let codec = CompressionCodec::Jpeg {
        tables: Some(tables.into()),
    };
    assert_eq!(codec.decode(&abbreviated, 256).unwrap(), expected);
}

// =============================================================================
// CCITT
// =============================================================================

#[test]
fn test_ccitt_modified_huffman_rows() {
    // white 4 (1011) black 4 (011), pad; white 8 (10011), pad
    let coded = [0b1011_0110, 0b1001_1000];
    let codec = CompressionCodec::CcittModifiedHuffman { columns: 8 };
    assert_eq!(codec.decode(&coded, 2).unwrap(), vec![0x0F, 0x00]);
}

#[test]
fn test_ccitt_group4_vertical_rows() {
    // Two V0 codes against an all-white reference: two white rows
    let codec = CompressionCodec::CcittG4 {
        columns: 8,
        options: FaxOptions::from_t6(0),
    };
    assert_eq!(codec.decode(&[0b1100_0000], 2).unwrap(), vec![0, 0]);
}

#[test]
fn test_ccitt_uncompressed_mode_rejected() {
    let codec = CompressionCodec::CcittG3 {
        columns: 8,
        options: FaxOptions::from_t4(2),
    };
    assert!(matches!(
        codec.decode(&[0], 1),
        Err(CodecError::Unsupported { .. })
    ));
}

// =============================================================================
// Predictors
// =============================================================================

#[test]
fn test_horizontal_predictor_16bit() {
    let filter =
        PredictorFilter::new(Predictor::Horizontal, 3, 1, 16, ByteOrder::BigEndian).unwrap();

    let samples = [100u16, 300, 250];
    let mut row: Vec<u8> = samples.iter().flat_map(|s| s.to_be_bytes()).collect();
    let original = row.clone();

    filter.apply_forward(&mut row);
    let deltas: Vec<u16> = row
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    assert_eq!(deltas, vec![100, 200, 250u16.wrapping_sub(300)]);

    filter.apply_inverse(&mut row);
    assert_eq!(row, original);
}

#[test]
fn test_floating_point_predictor_restores_row() {
    let filter =
        PredictorFilter::new(Predictor::FloatingPoint, 4, 1, 32, ByteOrder::LittleEndian)
            .unwrap();

    let mut row: Vec<u8> = [1.5f32, -2.25, 1000.0, 0.125]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    let original = row.clone();

    filter.apply_forward(&mut row);
    assert_ne!(row, original);
    filter.apply_inverse(&mut row);
    assert_eq!(row, original);
}

#[test]
fn test_predictor_rejects_odd_depth() {
    assert!(PredictorFilter::new(Predictor::Horizontal, 4, 1, 12, ByteOrder::BigEndian).is_err());
}

// =============================================================================
// Bitplanes
// =============================================================================

#[test]
fn test_rotation_inverse() {
    let planes = [0x81, 0xC0, 0x3C, 0x00, 0xFF, 0x55, 0xAA, 0x01];
    assert_eq!(rotate_ccw(&rotate_cw(&planes)), planes);
}

#[test]
fn test_plane_rows_round_trip() {
    let width = 37;
    let pixels: Vec<u8> = (0..width).map(|x| (x * 13 % 64) as u8).collect();

    let mut planes = vec![0u8; plane_row_bytes(width) * 6];
    pack_row(&pixels, 6, width, &mut planes);
    assert_eq!(planes.len(), 6 * 6);

    let mut out = vec![0u8; width];
    unpack_row(&planes, 6, width, &mut out);
    assert_eq!(out, pixels);
}
