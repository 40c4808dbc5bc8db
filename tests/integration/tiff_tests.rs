//! TIFF decoding integration tests.
//!
//! Tests verify:
//! - Strip and tile images decode in both byte orders and as BigTIFF
//! - Every codec path reaches the row sink (LZW, PackBits, Deflate, CCITT, JPEG)
//! - Partial decodes only read the units that overlap the region
//! - Structural and codec errors carry the failing tag or unit

use iff_tiff_raster::codec::{lzw, packbits};
use iff_tiff_raster::decode::{decode_tiff, decode_to_image, OutputInfo, RowSink};
use iff_tiff_raster::format::tiff::{Predictor, TiffFile};
use iff_tiff_raster::{
    ByteOrder, ColorModel, DecodeError, DecodeParams, MemoryReader, PixelLayout, PredictorFilter,
    Region, Rgba, SampleType, TiffError, Value, Warning,
};

use super::test_utils::{
    create_test_jpeg, gradient, pack_bits, split_jpeg_tables, zlib, ByteOrderType, IfdBuilder,
    TiffBuilder, TrackingReader,
};

/// Collects rows in a sparse vector for tests that drive `decode_tiff` directly.
#[derive(Default)]
struct RowCollector {
    info: Option<OutputInfo>,
    rows: Vec<(u32, Vec<u8>)>,
}

impl RowSink for RowCollector {
    fn begin(&mut self, info: &OutputInfo) -> Result<(), DecodeError> {
        self.info = Some(info.clone());
        Ok(())
    }

    fn put_row(&mut self, y: u32, row: &[u8]) -> Result<(), DecodeError> {
        self.rows.push((y, row.to_vec()));
        Ok(())
    }
}

fn decode(data: Vec<u8>) -> iff_tiff_raster::DecodedImage {
    let reader = MemoryReader::new(data, "test.tif");
    decode_to_image(&reader, 0, &DecodeParams::new()).unwrap()
}

fn strips_of(pixels: &[u8], row_bytes: usize, rows_per_strip: usize) -> Vec<Vec<u8>> {
    pixels
        .chunks(row_bytes * rows_per_strip)
        .map(<[u8]>::to_vec)
        .collect()
}

// =============================================================================
// Byte Order and Container Variants
// =============================================================================

#[test]
fn test_gray_strips_both_byte_orders() {
    let pixels = gradient(6, 5);

    for order in [ByteOrderType::LittleEndian, ByteOrderType::BigEndian] {
        let data = TiffBuilder::new()
            .with_byte_order(order)
            .add_ifd(
                IfdBuilder::gray8(6, 5)
                    .short(259, &[1])
                    .strips(2, strips_of(&pixels, 6, 2)),
            )
            .build();

        let image = decode(data);
        assert_eq!((image.width, image.height), (6, 5));
        assert_eq!(
            image.layout,
            PixelLayout::new(ColorModel::Gray, 1, SampleType::U8)
        );
        assert_eq!(image.data, pixels, "byte order {:?}", order);
    }
}

#[test]
fn test_bigtiff_strips() {
    let pixels = gradient(4, 4);
    let data = TiffBuilder::new()
        .with_bigtiff(true)
        .add_ifd(
            IfdBuilder::gray8(4, 4)
                .short(259, &[1])
                .strips(4, vec![pixels.clone()]),
        )
        .build();

    assert_eq!(&data[0..4], b"II\x2B\x00");
    assert_eq!(decode(data).data, pixels);
}

#[test]
fn test_second_image_in_chain() {
    let first = vec![0u8; 4];
    let second = vec![9u8, 8, 7, 6, 5, 4];
    let data = TiffBuilder::new()
        .add_ifd(IfdBuilder::gray8(2, 2).strips(2, vec![first]))
        .add_ifd(IfdBuilder::gray8(3, 2).strips(2, vec![second.clone()]))
        .build();
    let reader = MemoryReader::new(data, "multi.tif");

    let image = decode_to_image(&reader, 1, &DecodeParams::new()).unwrap();
    assert_eq!((image.width, image.height), (3, 2));
    assert_eq!(image.data, second);

    let result = decode_to_image(&reader, 2, &DecodeParams::new());
    assert!(matches!(result, Err(DecodeError::InvalidParameter(_))));
}

// =============================================================================
// Codecs
// =============================================================================

#[test]
fn test_lzw_with_horizontal_predictor() {
    let (width, height) = (9u32, 3u32);
    let pixels = gradient(width, height);

    let filter = PredictorFilter::new(
        Predictor::Horizontal,
        width as usize,
        1,
        8,
        ByteOrder::LittleEndian,
    )
    .unwrap();
    let mut differenced = pixels.clone();
    for row in differenced.chunks_mut(width as usize) {
        filter.apply_forward(row);
    }

    let data = TiffBuilder::new()
        .add_ifd(
            IfdBuilder::gray8(width, height)
                .short(259, &[5])
                .short(317, &[2])
                .strips(height, vec![lzw::encode(&differenced)]),
        )
        .build();

    assert_eq!(decode(data).data, pixels);
}

#[test]
fn test_packbits_rgb() {
    let pixels: Vec<u8> = [[200u8, 10, 10], [200, 10, 10], [200, 10, 10], [0, 50, 250]]
        .repeat(2)
        .concat();

    let data = TiffBuilder::new()
        .add_ifd(
            IfdBuilder::new(4, 2)
                .short(258, &[8, 8, 8])
                .short(259, &[32773])
                .short(262, &[2])
                .short(277, &[3])
                .strips(2, vec![packbits::encode(&pixels)]),
        )
        .build();

    let image = decode(data);
    assert_eq!(image.layout.color, ColorModel::Rgb);
    assert_eq!(image.pixel(3, 1), &[0, 50, 250]);
    assert_eq!(image.data, pixels);
}

#[test]
fn test_deflate_16bit_big_endian() {
    let values: [u16; 6] = [0, 1, 256, 4000, 65535, 12345];
    let stored: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();

    let data = TiffBuilder::new()
        .with_byte_order(ByteOrderType::BigEndian)
        .add_ifd(
            IfdBuilder::new(3, 2)
                .short(258, &[16])
                .short(259, &[8])
                .short(262, &[1])
                .strips(2, vec![zlib(&stored)]),
        )
        .build();

    let image = decode(data);
    assert_eq!(image.layout.sample_type, SampleType::U16);
    let expected: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    assert_eq!(image.data, expected);
}

#[test]
fn test_ccitt_modified_huffman_white_is_zero() {
    // Row 0: white 4 ("1011"), black 4 ("011"). Row 1: white 8 ("10011").
    let strip = vec![0b1011_0110, 0b1001_1000];

    let data = TiffBuilder::new()
        .add_ifd(
            IfdBuilder::new(8, 2)
                .short(258, &[1])
                .short(259, &[2])
                .short(262, &[0])
                .strips(2, vec![strip]),
        )
        .build();

    let image = decode(data);
    assert_eq!(image.layout.color, ColorModel::Indexed);
    assert_eq!(image.row(0), &[0, 0, 0, 0, 1, 1, 1, 1]);
    assert_eq!(image.row(1), &[0; 8]);

    let palette = image.palette.unwrap();
    assert_eq!(palette.color(0), Rgba::rgb(255, 255, 255));
    assert_eq!(palette.color(1), Rgba::rgb(0, 0, 0));
}

#[test]
fn test_uncompressed_bilevel_black_is_zero() {
    let rows: [&[u8]; 2] = [
        &[1, 0, 1, 0, 1, 0, 1, 0, 1, 1],
        &[0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
    ];
    let data = TiffBuilder::new()
        .add_ifd(
            IfdBuilder::new(10, 2)
                .short(258, &[1])
                .short(262, &[1])
                .ascii(270, "bilevel")
                .strips(2, vec![pack_bits(&rows)]),
        )
        .build();

    let reader = MemoryReader::new(data.clone(), "bilevel.tif");
    let file = TiffFile::open(&reader).unwrap();
    let description = file.directories[0].get(270).unwrap();
    assert_eq!(description.value, Value::Ascii("bilevel".to_string()));

    let image = decode(data);
    assert_eq!(image.layout.color, ColorModel::Indexed);
    assert_eq!(image.row(0), rows[0]);
    assert_eq!(image.row(1), rows[1]);
    assert_eq!(image.palette.unwrap().color(1), Rgba::rgb(255, 255, 255));
}

#[test]
fn test_jpeg_tile_with_shared_tables() {
    let jpeg = create_test_jpeg(16, 16, 90);
    let (tables, stream) = split_jpeg_tables(&jpeg);
    let expected = image::load_from_memory(&jpeg).unwrap().to_luma8().into_raw();

    let data = TiffBuilder::new()
        .add_ifd(
            IfdBuilder::gray8(16, 16)
                .short(259, &[7])
                .undefined(347, &tables)
                .tiles(16, 16, vec![stream]),
        )
        .build();

    let image = decode(data);
    assert!(image.warnings.is_empty(), "{:?}", image.warnings);
    assert_eq!(image.data, expected);
}

#[test]
fn test_jpeg_abbreviated_without_tables_warns() {
    let jpeg = create_test_jpeg(8, 8, 90);
    let (_, stream) = split_jpeg_tables(&jpeg);

    let data = TiffBuilder::new()
        .add_ifd(
            IfdBuilder::gray8(8, 8)
                .short(259, &[7])
                .strips(8, vec![stream]),
        )
        .build();

    let reader = MemoryReader::new(data, "no-tables.tif");
    let file = TiffFile::open(&reader).unwrap();
    let image = file.image(0).unwrap();
    let mut sink = RowCollector::default();

    // The stream cannot decode without tables, but the warning is raised first
    let result = decode_tiff(&reader, &image, &DecodeParams::new(), &mut sink);
    match result {
        Ok(warnings) => assert!(warnings.contains(&Warning::MissingJpegTables { unit: 0 })),
        Err(e) => assert!(matches!(e, DecodeError::Codec { unit: 0, .. })),
    }
}

// =============================================================================
// Color
// =============================================================================

#[test]
fn test_palette_image_scales_colormap() {
    // 4-bit indices 0, 1, 15, 2
    let strip = vec![0x01, 0xF2];
    let mut map = vec![0u16; 48];
    map[1] = 0xFFFF; // red[1]
    map[16 + 2] = 0x8080; // green[2]
    map[32 + 15] = 0xFFFF; // blue[15]

    let data = TiffBuilder::new()
        .add_ifd(
            IfdBuilder::new(4, 1)
                .short(258, &[4])
                .short(262, &[3])
                .short(320, &map)
                .strips(1, vec![strip]),
        )
        .build();

    let image = decode(data);
    assert_eq!(image.layout.color, ColorModel::Indexed);
    assert_eq!(image.data, vec![0, 1, 15, 2]);

    let palette = image.palette.unwrap();
    assert_eq!(palette.len(), 16);
    assert_eq!(palette.color(1), Rgba::rgb(255, 0, 0));
    assert_eq!(palette.color(2), Rgba::rgb(0, 128, 0));
    assert_eq!(palette.color(15), Rgba::rgb(0, 0, 255));
}

#[test]
fn test_to_dynamic_image_for_png() {
    let pixels = gradient(5, 3);
    let data = TiffBuilder::new()
        .add_ifd(IfdBuilder::gray8(5, 3).strips(3, vec![pixels.clone()]))
        .build();

    let dynamic = decode(data).to_dynamic_image().unwrap();
    assert_eq!(dynamic.to_luma8().into_raw(), pixels);
}

// =============================================================================
// Partial Decoding
// =============================================================================

#[test]
fn test_region_reads_only_overlapping_tiles() {
    let pixels = gradient(32, 32);
    let tiles: Vec<Vec<u8>> = (0..2)
        .flat_map(|ty| (0..2).map(move |tx| (ty, tx)))
        .map(|(ty, tx)| {
            (0..16)
                .flat_map(|y| {
                    let start = (ty * 16 + y) * 32 + tx * 16;
                    pixels[start..start + 16].to_vec()
                })
                .collect()
        })
        .collect();

    let data = TiffBuilder::new()
        .add_ifd(IfdBuilder::gray8(32, 32).tiles(16, 16, tiles))
        .build();
    let reader = TrackingReader::new(data, "tiled.tif");
    let file = TiffFile::open(&reader).unwrap();
    let image = file.image(0).unwrap();
    reader.reset_tracking();

    let params = DecodeParams::new().with_region(Region::new(20, 4, 8, 8));
    let mut sink = RowCollector::default();
    decode_tiff(&reader, &image, &params, &mut sink).unwrap();

    assert_eq!(reader.request_count(), 1, "{:?}", reader.requests());
    let info = sink.info.unwrap();
    assert_eq!((info.width, info.height), (8, 8));
    assert_eq!(sink.rows.len(), 8);
    for (y, row) in &sink.rows {
        let start = (4 + *y as usize) * 32 + 20;
        assert_eq!(row, &pixels[start..start + 8]);
    }
}

#[test]
fn test_subsampled_strips() {
    let pixels = gradient(7, 5);
    let data = TiffBuilder::new()
        .add_ifd(IfdBuilder::gray8(7, 5).strips(1, strips_of(&pixels, 7, 1)))
        .build();
    let reader = MemoryReader::new(data, "sub.tif");

    let params = DecodeParams::new().with_subsampling(3, 2);
    let image = decode_to_image(&reader, 0, &params).unwrap();
    assert_eq!((image.width, image.height), (3, 3));

    let expected: Vec<u8> = [0usize, 2, 4]
        .iter()
        .flat_map(|&y| [0usize, 3, 6].map(|x| pixels[y * 7 + x]))
        .collect();
    assert_eq!(image.data, expected);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_missing_strip_offsets() {
    let data = TiffBuilder::new()
        .add_ifd(IfdBuilder::gray8(4, 4).short(259, &[5]))
        .build();
    let reader = MemoryReader::new(data, "no-offsets.tif");

    let result = decode_to_image(&reader, 0, &DecodeParams::new());
    assert!(
        matches!(result, Err(DecodeError::Tiff(TiffError::MissingTag(_)))),
        "{:?}",
        result
    );
}

#[test]
fn test_corrupt_strip_reports_unit() {
    let good = packbits::encode(&[1, 2, 3, 4]);
    // Literal run of 6 bytes with only one present
    let corrupt = vec![0x05, 1];

    let data = TiffBuilder::new()
        .add_ifd(
            IfdBuilder::gray8(4, 2)
                .short(259, &[32773])
                .strips(1, vec![good, corrupt]),
        )
        .build();
    let reader = MemoryReader::new(data, "corrupt.tif");

    let result = decode_to_image(&reader, 0, &DecodeParams::new());
    assert!(
        matches!(result, Err(DecodeError::Codec { unit: 1, .. })),
        "{:?}",
        result
    );
}
