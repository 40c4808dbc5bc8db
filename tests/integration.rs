//! Integration tests for the IFF/TIFF raster decoder.
//!
//! These tests verify end-to-end functionality including:
//! - TIFF parsing edge cases (endianness, BigTIFF, multiple images)
//! - Strip and tile decoding for every supported compression
//! - ILBM, PBM, RGB8 and DEEP decoding, HAM/EHB/SHAM palettes
//! - ILBM writer output decoding back to the source pixels
//! - Region decoding reading only the units it needs
//! - Codec, predictor and bitplane vectors

mod integration {
    pub mod test_utils;

    pub mod codec_tests;
    pub mod iff_tests;
    pub mod tiff_tests;
}
