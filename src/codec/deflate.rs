//! Zlib/Deflate (TIFF compression 8 and 32946), inflated by `flate2`.

use std::io::Read;

use flate2::read::ZlibDecoder;

use super::output_buffer;
use crate::error::CodecError;

/// Inflate one zlib unit, stopping after `expected_len` bytes.
///
/// Trailing data after the zlib stream is ignored. A short result is
/// returned as is; the caller checks the length.
pub fn decode(input: &[u8], expected_len: usize) -> Result<Vec<u8>, CodecError> {
    let mut output = output_buffer(expected_len);
    ZlibDecoder::new(input)
        .take(expected_len as u64)
        .read_to_end(&mut output)
        .map_err(|e| CodecError::Deflate(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_inflate() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 13) as u8).collect();
        assert_eq!(decode(&zlib(&data), data.len()).unwrap(), data);
    }

    #[test]
    fn test_inflate_stops_at_expected_len() {
        let data = vec![7u8; 100];
        assert_eq!(decode(&zlib(&data), 10).unwrap(), vec![7u8; 10]);
    }

    #[test]
    fn test_corrupt_stream() {
        let err = decode(&[0x78, 0x9C, 0xFF, 0xFF, 0xFF], 10).unwrap_err();
        assert!(matches!(err, CodecError::Deflate(_)));
    }
}
