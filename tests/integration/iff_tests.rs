//! IFF decoding integration tests.
//!
//! Tests verify:
//! - ILBM files written by `IlbmWriter` decode back to the same pixels
//! - HAM, EHB and SHAM images resolve to the expected colors
//! - PBM, RGB8 and DEEP bodies decode
//! - Missing chunks and the abort flag surface as errors

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use iff_tiff_raster::bitplane::{pack_row, plane_row_bytes};
use iff_tiff_raster::codec::packbits;
use iff_tiff_raster::format::fourcc;
use iff_tiff_raster::format::iff::{BitmapHeader, Masking, COMPRESSION_BYTE_RUN, COMPRESSION_NONE};
use iff_tiff_raster::{
    decode_to_image, inspect, ColorModel, DecodeError, DecodeParams, DecodedImage, IffError,
    IlbmPixels, IlbmWriter, MemoryReader, Palette, PixelLayout, Region, Rgba, SampleType, Value,
};

use super::test_utils::IffBuilder;

fn decode(data: impl Into<bytes::Bytes>) -> Result<DecodedImage, DecodeError> {
    let reader = MemoryReader::new(data, "test.iff");
    decode_to_image(&reader, 0, &DecodeParams::new())
}

/// Uncompressed ILBM body from rows of indices.
fn planar_body(rows: &[Vec<u8>], planes: usize) -> Vec<u8> {
    let mut body = Vec::new();
    for row in rows {
        let mut out = vec![0u8; plane_row_bytes(row.len()) * planes];
        pack_row(row, planes, row.len(), &mut out);
        body.extend_from_slice(&out);
    }
    body
}

fn test_palette() -> Palette {
    Palette::from_rgb_triplets(&[
        0, 0, 0, //
        255, 255, 255, //
        200, 30, 30, //
        30, 200, 30, //
        30, 30, 200,
    ])
}

// =============================================================================
// ILBM Writer Round Trips
// =============================================================================

#[test]
fn test_indexed_ilbm_round_trip() {
    let palette = test_palette();
    let (width, height) = (21usize, 3usize);
    let pixels: Vec<u8> = (0..width * height).map(|i| (i % 5) as u8).collect();

    for compress in [true, false] {
        let bytes = IlbmWriter::new(compress)
            .encode(
                width,
                height,
                IlbmPixels::Indexed {
                    pixels: &pixels,
                    palette: &palette,
                },
            )
            .unwrap();

        let image = decode(bytes).unwrap();
        assert_eq!((image.width, image.height), (21, 3));
        assert_eq!(image.layout.color, ColorModel::Indexed);
        assert_eq!(image.data, pixels, "compress = {}", compress);
        assert_eq!(image.palette.as_ref(), Some(&palette));
    }
}

#[test]
fn test_true_color_ilbm_round_trip() {
    let pixels: Vec<u8> = (0..6 * 4).map(|i| (i * 10) as u8).collect();
    let bytes = IlbmWriter::default()
        .encode(
            6,
            1,
            IlbmPixels::TrueColor {
                pixels: &pixels,
                channels: 4,
            },
        )
        .unwrap();

    let image = decode(bytes).unwrap();
    assert_eq!(
        image.layout,
        PixelLayout::new(ColorModel::Rgb, 4, SampleType::U8)
    );
    assert_eq!(image.data, pixels);
}

#[test]
fn test_region_of_written_ilbm() {
    let palette = Palette::grayscale(8);
    let (width, height) = (40usize, 10usize);
    let pixels: Vec<u8> = (0..width * height).map(|i| (i % 251) as u8).collect();
    let bytes = IlbmWriter::default()
        .encode(
            width,
            height,
            IlbmPixels::Indexed {
                pixels: &pixels,
                palette: &palette,
            },
        )
        .unwrap();

    let reader = MemoryReader::new(bytes, "region.iff");
    let params = DecodeParams::new()
        .with_region(Region::new(30, 2, 10, 6))
        .with_subsampling(5, 3);
    let image = decode_to_image(&reader, 0, &params).unwrap();

    assert_eq!((image.width, image.height), (2, 2));
    let expected: Vec<u8> = [2usize, 5]
        .iter()
        .flat_map(|&y| [30usize, 35].map(|x| pixels[y * width + x]))
        .collect();
    assert_eq!(image.data, expected);
}

// =============================================================================
// Amiga Display Modes
// =============================================================================

#[test]
fn test_ham6_file() {
    let mut cmap = vec![0u8; 16 * 3];
    cmap[3..6].copy_from_slice(&[0x10, 0x20, 0x30]);

    // Base color 1, then modify green to 0xA, then modify blue to 0x5
    let rows = vec![vec![0x01, 0x3A, 0x15]];
    let data = IffBuilder::new(b"ILBM")
        .bmhd(&BitmapHeader::new(3, 1, 6, Masking::None, COMPRESSION_NONE))
        .camg(0x800)
        .cmap(&cmap)
        .body(planar_body(&rows, 6))
        .build();

    let image = decode(data).unwrap();
    assert_eq!(image.layout.color, ColorModel::Rgb);
    assert_eq!(
        image.data,
        vec![0x10, 0x20, 0x30, 0x10, 0xAA, 0x30, 0x10, 0xAA, 0x55]
    );
}

#[test]
fn test_ehb_file() {
    let mut cmap = vec![0u8; 32 * 3];
    cmap[6..9].copy_from_slice(&[100, 200, 50]);

    let rows = vec![vec![2, 34]];
    let data = IffBuilder::new(b"ILBM")
        .bmhd(&BitmapHeader::new(2, 1, 6, Masking::None, COMPRESSION_NONE))
        .camg(0x80)
        .cmap(&cmap)
        .body(planar_body(&rows, 6))
        .build();

    let image = decode(data).unwrap();
    let palette = image.palette.unwrap();
    assert_eq!(palette.len(), 64);
    assert_eq!(palette.color(34), Rgba::rgb(50, 100, 25));
    assert_eq!(image.data, vec![2, 34]);
}

#[test]
fn test_sham_changes_palette_per_row() {
    let mut sham = vec![0u8, 0]; // version
    for color in [0x0F00u16, 0x00F0] {
        let mut line = vec![0u8; 32];
        line[2..4].copy_from_slice(&color.to_be_bytes());
        sham.extend_from_slice(&line);
    }

    let rows = vec![vec![1, 0], vec![1, 0]];
    let data = IffBuilder::new(b"ILBM")
        .bmhd(&BitmapHeader::new(2, 2, 1, Masking::None, COMPRESSION_NONE))
        .cmap(&[0, 0, 0, 255, 255, 255])
        .chunk(b"SHAM", sham)
        .body(planar_body(&rows, 1))
        .build();

    let image = decode(data).unwrap();
    assert_eq!(image.layout.color, ColorModel::Rgb);
    assert_eq!(image.pixel(0, 0), &[255, 0, 0]);
    assert_eq!(image.pixel(0, 1), &[0, 255, 0]);
    assert_eq!(image.pixel(1, 1), &[0, 0, 0]);
}

#[test]
fn test_transparent_color_masking() {
    let mut header = BitmapHeader::new(2, 1, 1, Masking::TransparentColor, COMPRESSION_NONE);
    header.transparent_color = 0;

    let data = IffBuilder::new(b"ILBM")
        .bmhd(&header)
        .cmap(&[10, 20, 30, 40, 50, 60])
        .body(planar_body(&[vec![0, 1]], 1))
        .build();

    let image = decode(data).unwrap();
    let rgba = image.to_dynamic_image().unwrap().to_rgba8().into_raw();
    assert_eq!(rgba, vec![10, 20, 30, 0, 40, 50, 60, 255]);
}

// =============================================================================
// Other Forms
// =============================================================================

#[test]
fn test_pbm_byte_run() {
    // Rows of 3 pixels are stored padded to 4 bytes
    let stored = [7u8, 7, 7, 0, 1, 2, 3, 0];
    let data = IffBuilder::new(b"PBM ")
        .bmhd(&BitmapHeader::new(3, 2, 8, Masking::None, COMPRESSION_BYTE_RUN))
        .body(packbits::encode(&stored))
        .build();

    let image = decode(data).unwrap();
    assert_eq!(image.data, vec![7, 7, 7, 1, 2, 3]);
}

#[test]
fn test_rgb8_runs() {
    let data = IffBuilder::new(b"RGB8")
        .bmhd(&BitmapHeader::new(2, 2, 25, Masking::None, 4))
        .body(vec![255, 0, 0, 0x03, 0, 0, 255, 0x81])
        .build();

    let image = decode(data).unwrap();
    assert_eq!(image.layout.channels, 4);
    assert_eq!(image.pixel(1, 1), &[0, 0, 255, 0]);
    assert_eq!(image.pixel(0, 1), &[255, 0, 0, 255]);
}

#[test]
fn test_deep_rgba_body() {
    let mut dgbl = Vec::new();
    dgbl.extend_from_slice(&2u16.to_be_bytes());
    dgbl.extend_from_slice(&1u16.to_be_bytes());
    dgbl.extend_from_slice(&0u16.to_be_bytes()); // no compression
    dgbl.extend_from_slice(&[1, 1]);

    let mut dpel = 4u32.to_be_bytes().to_vec();
    for kind in [1u16, 2, 3, 4] {
        dpel.extend_from_slice(&kind.to_be_bytes());
        dpel.extend_from_slice(&8u16.to_be_bytes());
    }

    let data = IffBuilder::new(b"DEEP")
        .chunk(b"DGBL", dgbl)
        .chunk(b"DPEL", dpel)
        .chunk(b"DBOD", vec![1, 2, 3, 4, 5, 6, 7, 8])
        .build();

    let image = decode(data).unwrap();
    assert_eq!(
        image.layout,
        PixelLayout::new(ColorModel::Rgb, 4, SampleType::U8)
    );
    assert_eq!(image.data, vec![1, 2, 3, 4, 5, 6, 7, 8]);
}

// =============================================================================
// Errors and Inspection
// =============================================================================

#[test]
fn test_missing_body() {
    let data = IffBuilder::new(b"ILBM")
        .bmhd(&BitmapHeader::new(2, 2, 1, Masking::None, COMPRESSION_NONE))
        .build();

    assert!(matches!(
        decode(data),
        Err(DecodeError::Iff(IffError::MissingChunk("BODY")))
    ));
}

#[test]
fn test_abort_flag() {
    let palette = Palette::grayscale(1);
    let bytes = IlbmWriter::default()
        .encode(
            4,
            4,
            IlbmPixels::Indexed {
                pixels: &[0; 16],
                palette: &palette,
            },
        )
        .unwrap();

    let reader = MemoryReader::new(bytes, "abort.iff");
    let params = DecodeParams::new().with_abort(Arc::new(AtomicBool::new(true)));
    assert!(matches!(
        decode_to_image(&reader, 0, &params),
        Err(DecodeError::Aborted)
    ));
}

#[test]
fn test_inspect_records_text_chunks() {
    let data = IffBuilder::new(b"ILBM")
        .bmhd(&BitmapHeader::new(1, 1, 1, Masking::None, COMPRESSION_NONE))
        .chunk(b"ANNO", b"made by hand".to_vec())
        .chunk(b"XYZW", vec![1, 2, 3])
        .body(vec![0x80, 0])
        .build();

    let report = inspect(&MemoryReader::new(data, "anno.iff")).unwrap();
    let iff = report.iff.unwrap();

    let anno = iff.directory.get(fourcc(b"ANNO")).unwrap();
    assert_eq!(anno.value, Value::Ascii("made by hand".to_string()));
    assert!(iff.directory.contains(fourcc(b"XYZW")));
    assert_eq!(iff.chunks.len(), 4);
}
