//! PackBits (TIFF 32773) and ByteRun1 (IFF) run-length coding.
//!
//! ```text
//! header n (signed byte)   meaning
//! 0..=127                  copy the next n + 1 bytes literally
//! -127..=-1                repeat the next byte 1 - n times
//! -128                     no-op
//! ```

use super::output_buffer;
use crate::error::CodecError;

/// Longest literal or replicate run one header can describe
const MAX_RUN: usize = 128;

/// Decode a PackBits stream until `expected_len` bytes are produced.
///
/// A run that overshoots `expected_len` is truncated; trailing input is
/// ignored.
///
/// # Errors
/// `UnexpectedEof` if the input ends first.
pub fn decode(input: &[u8], expected_len: usize) -> Result<Vec<u8>, CodecError> {
    decode_units(input, 1, expected_len)
}

/// Decode PackBits where every run element is `unit` bytes wide.
///
/// DEEP bodies repeat whole pixels rather than single bytes.
pub fn decode_units(input: &[u8], unit: usize, expected_len: usize) -> Result<Vec<u8>, CodecError> {
    let unit = unit.max(1);
    let mut output = output_buffer(expected_len);
    let mut pos = 0;

    let eof = |decoded: usize| CodecError::UnexpectedEof {
        codec: "PackBits",
        decoded,
        expected: expected_len,
    };

    while output.len() < expected_len {
        let header = *input.get(pos).ok_or_else(|| eof(output.len()))? as i8;
        pos += 1;
        let remaining = expected_len - output.len();

        match header {
            -128 => continue,
            0..=127 => {
                let count = (header as usize + 1) * unit;
                let literal = input
                    .get(pos..pos + count)
                    .ok_or_else(|| eof(output.len()))?;
                output.extend_from_slice(&literal[..count.min(remaining)]);
                pos += count;
            }
            -127..=-1 => {
                let count = (1 - header as isize) as usize;
                let element = input
                    .get(pos..pos + unit)
                    .ok_or_else(|| eof(output.len()))?;
                pos += unit;
                if unit == 1 {
                    output.resize(output.len() + count.min(remaining), element[0]);
                } else {
                    let run = element.iter().copied().cycle().take((count * unit).min(remaining));
                    output.extend(run);
                }
            }
        }
    }

    Ok(output)
}

/// Encode bytes as PackBits.
///
/// Runs of three or more equal bytes become replicate runs; everything else
/// is emitted as literal runs of up to 128 bytes.
pub fn encode(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len() + input.len() / MAX_RUN + 1);
    let mut literal_start = 0;
    let mut pos = 0;

    while pos < input.len() {
        let byte = input[pos];
        let mut run = 1;
        while pos + run < input.len() && input[pos + run] == byte && run < MAX_RUN {
            run += 1;
        }

        if run >= 3 {
            flush_literal(&mut output, &input[literal_start..pos]);
            output.push((1 - run as isize) as i8 as u8);
            output.push(byte);
            pos += run;
            literal_start = pos;
        } else {
            pos += run;
        }
    }
    flush_literal(&mut output, &input[literal_start..]);

    output
}

fn flush_literal(output: &mut Vec<u8>, literal: &[u8]) {
    for chunk in literal.chunks(MAX_RUN) {
        output.push((chunk.len() - 1) as u8);
        output.extend_from_slice(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_literal_and_runs() {
        // Apple's TN1023 sample
        let packed = [
            0xFE, 0xAA, 0x02, 0x80, 0x00, 0x2A, 0xFD, 0xAA, 0x03, 0x80, 0x00, 0x2A, 0x22, 0xF7,
            0xAA,
        ];
        let expected = [
            0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0xAA, 0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0x22,
            0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
        ];
        assert_eq!(decode(&packed, expected.len()).unwrap(), expected);
    }

    #[test]
    fn test_decode_noop_header() {
        let packed = [0x80, 0x00, 0x41, 0x80, 0xFF, 0x42];
        assert_eq!(decode(&packed, 3).unwrap(), vec![0x41, 0x42, 0x42]);
    }

    #[test]
    fn test_decode_stops_at_expected_len() {
        // Replicate run of 10, only 4 wanted; trailing garbage ignored
        let packed = [0xF7, 0x11, 0x05];
        assert_eq!(decode(&packed, 4).unwrap(), vec![0x11; 4]);
    }

    #[test]
    fn test_decode_truncated() {
        let packed = [0x04, 0x01, 0x02];
        assert_eq!(
            decode(&packed, 5),
            Err(CodecError::UnexpectedEof {
                codec: "PackBits",
                decoded: 0,
                expected: 5
            })
        );

        let packed = [0x00, 0x01];
        assert!(matches!(
            decode(&packed, 2),
            Err(CodecError::UnexpectedEof { decoded: 1, .. })
        ));
    }

    #[test]
    fn test_decode_huge_expected_len() {
        // The output buffer is reserved lazily, so an absurd length only
        // fails once the input runs out
        assert_eq!(
            decode(&[0x00, 7], usize::MAX),
            Err(CodecError::UnexpectedEof {
                codec: "PackBits",
                decoded: 1,
                expected: usize::MAX
            })
        );
    }

    #[test]
    fn test_decode_pixel_units() {
        // Two literal RGBA pixels, then one pixel repeated three times
        let packed = [0x01, 1, 2, 3, 4, 5, 6, 7, 8, 0xFE, 9, 9, 9, 0];
        let decoded = decode_units(&packed, 4, 20).unwrap();
        assert_eq!(&decoded[..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&decoded[8..], &[9, 9, 9, 0, 9, 9, 9, 0, 9, 9, 9, 0]);
    }

    #[test]
    fn test_encode_shapes() {
        assert_eq!(encode(&[7, 7, 7, 7]), vec![0xFD, 7]);
        assert_eq!(encode(&[1, 2, 2, 3]), vec![3, 1, 2, 2, 3]);
        assert_eq!(encode(&[]), Vec::<u8>::new());

        let long_run = vec![9u8; 300];
        let packed = encode(&long_run);
        assert_eq!(packed, vec![0x81, 9, 0x81, 9, 0xD5, 9]);
    }

    #[test]
    fn test_encode_decodes_back() {
        let data: Vec<u8> = (0..1000u32)
            .map(|i| if i % 50 < 20 { 0 } else { (i * 7 % 251) as u8 })
            .collect();
        let packed = encode(&data);
        assert!(packed.len() < data.len() + data.len() / 100 + 2);
        assert_eq!(decode(&packed, data.len()).unwrap(), data);
    }
}
