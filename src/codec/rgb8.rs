//! Impulse RGB8 run-length coding (IFF RGB8 compression 4).
//!
//! ```text
//! ┌─────┬─────┬─────┬─────────────────────┐
//! │  R  │  G  │  B  │ G │ count (7 bits)  │   repeat RGB+G count times
//! └─────┴─────┴─────┴─────────────────────┘
//! G = genlock bit. A count of 0 means the next byte holds the count.
//! ```
//!
//! Output is four bytes per pixel: R, G, B and the genlock flag in bit 7.

use super::output_buffer;
use crate::error::CodecError;

/// Bytes per decoded pixel
pub const RGB8_PIXEL_BYTES: usize = 4;

const GENLOCK: u8 = 0x80;
const COUNT_MASK: u8 = 0x7F;

/// Decode runs until `expected_len` bytes are produced.
///
/// # Errors
/// `UnexpectedEof` if the input ends first.
pub fn decode(input: &[u8], expected_len: usize) -> Result<Vec<u8>, CodecError> {
    let mut output = output_buffer(expected_len);
    let mut pos = 0;

    let eof = |decoded: usize| CodecError::UnexpectedEof {
        codec: "RGB8 RLE",
        decoded,
        expected: expected_len,
    };

    while output.len() < expected_len {
        let run = input.get(pos..pos + 4).ok_or_else(|| eof(output.len()))?;
        pos += 4;

        let pixel = [run[0], run[1], run[2], run[3] & GENLOCK];
        let mut count = (run[3] & COUNT_MASK) as usize;
        if count == 0 {
            count = *input.get(pos).ok_or_else(|| eof(output.len()))? as usize;
            pos += 1;
        }

        let remaining = (expected_len - output.len()).div_ceil(RGB8_PIXEL_BYTES);
        for _ in 0..count.min(remaining) {
            output.extend_from_slice(&pixel);
        }
    }

    output.truncate(expected_len);
    Ok(output)
}
