//! Row encoder for the three CCITT schemes.
//!
//! Rows are reduced to their changing elements first; 1D rows are then
//! written as alternating white and black runs, 2D rows as pass,
//! horizontal and vertical modes against the row above.

use super::states::{
    Code, BLACK_MAKEUP, BLACK_TERMINATING, EOFB, EOFB_BITS, EOL, EOL_BITS, EXTENDED_MAKEUP,
    MAKEUP_THRESHOLD, MODE_CODES, MODE_HORIZONTAL, MODE_PASS, MODE_VERTICAL_ZERO, WHITE_MAKEUP,
    WHITE_TERMINATING,
};
use super::{FaxOptions, FaxScheme};
use crate::error::CodecError;
use crate::io::BitWriter;

/// Longest run a single make-up code covers.
const MAX_MAKEUP: u32 = 2560;

/// Make-up codes up to this length have a colour-specific code.
const COLOUR_MAKEUP_LIMIT: u32 = 1728;

/// Encode packed rows (MSB first, 1 = black) of `columns` pixels.
///
/// Bits past `columns` in the last byte of a row are ignored, as is a
/// trailing partial row.
///
/// - Modified Huffman: 1D rows, each padded to a byte boundary
/// - Group 3: an EOL before every row. With `two_dimensional` the first
///   row is 1D and the rest 2D, told apart by the tag bit after the EOL.
///   With `fill_bits` every EOL ends on a byte boundary.
/// - Group 4: 2D rows against an all-white first reference row, closed by
///   EOFB
///
/// # Errors
/// `Unsupported` when uncompressed mode is requested.
pub fn encode(
    data: &[u8],
    columns: u32,
    scheme: FaxScheme,
    options: FaxOptions,
) -> Result<Vec<u8>, CodecError> {
    if options.uncompressed {
        return Err(CodecError::Unsupported {
            codec: scheme.name(),
            option: "uncompressed mode".to_string(),
        });
    }
    if columns == 0 {
        return Ok(Vec::new());
    }

    let row_bytes = (columns as usize).div_ceil(8);
    let mut fax = FaxEncoder::new(columns);

    for (index, row) in data.chunks_exact(row_bytes).enumerate() {
        fax.load_row(row);
        match scheme {
            FaxScheme::ModifiedHuffman => {
                fax.encode_1d();
                fax.writer.align();
            }
            FaxScheme::Group3 => {
                fax.write_eol(options.fill_bits);
                if !options.two_dimensional {
                    fax.encode_1d();
                } else if index == 0 {
                    fax.writer.write(1, 1);
                    fax.encode_1d();
                } else {
                    fax.writer.write(0, 1);
                    fax.encode_2d();
                }
            }
            FaxScheme::Group4 => fax.encode_2d(),
        }
        fax.finish_row();
    }

    if scheme == FaxScheme::Group4 {
        fax.writer.write(EOFB, EOFB_BITS);
    }
    Ok(fax.writer.finish())
}

/// Encoder state for one unit.
///
/// `reference` and `current` hold the true changing elements of the row
/// above and the row being coded, without the trailing `columns` entries
/// the decoder keeps.
struct FaxEncoder {
    writer: BitWriter,
    columns: u32,
    reference: Vec<u32>,
    current: Vec<u32>,
}

impl FaxEncoder {
    fn new(columns: u32) -> Self {
        Self {
            writer: BitWriter::new(),
            columns,
            reference: Vec::new(),
            current: Vec::new(),
        }
    }

    /// Collect the positions where the colour flips, starting white.
    fn load_row(&mut self, row: &[u8]) {
        self.current.clear();
        let mut black = false;
        for x in 0..self.columns {
            let bit = (row[(x / 8) as usize] >> (7 - x % 8)) & 1 == 1;
            if bit != black {
                self.current.push(x);
                black = bit;
            }
        }
    }

    fn finish_row(&mut self) {
        std::mem::swap(&mut self.reference, &mut self.current);
    }

    /// EOL, padded first so it ends on a byte boundary when `fill` is set.
    fn write_eol(&mut self, fill: bool) {
        if fill {
            let pad = (12 - self.writer.bit_position() % 8) % 8;
            if pad > 0 {
                self.writer.write(0, pad as u32);
            }
        }
        self.writer.write(EOL, EOL_BITS);
    }

    // -------------------------------------------------------------------------
    // 1D rows
    // -------------------------------------------------------------------------

    fn encode_1d(&mut self) {
        let changes = std::mem::take(&mut self.current);
        let mut a0 = 0;
        let mut black = false;
        for &change in &changes {
            self.write_run(change - a0, black);
            a0 = change;
            black = !black;
        }
        self.write_run(self.columns - a0, black);
        self.current = changes;
    }

    // -------------------------------------------------------------------------
    // 2D rows
    // -------------------------------------------------------------------------

    fn encode_2d(&mut self) {
        let columns = self.columns;
        let mut a0 = 0u32;
        let mut started = false;
        let mut black = false;

        while a0 < columns {
            let a1 = next_change(&self.current, a0, !started, columns);
            let (b1, b2) = self.reference_changes(a0, started, black);

            if b2 < a1 {
                self.write_mode(MODE_PASS);
                a0 = b2;
            } else if a1.abs_diff(b1) <= 3 {
                let offset = a1 as i64 - b1 as i64;
                self.write_mode(MODE_VERTICAL_ZERO + vertical_index(offset));
                a0 = a1;
                black = !black;
            } else {
                let a2 = next_change(&self.current, a1, false, columns);
                self.write_mode(MODE_HORIZONTAL);
                self.write_run(a1 - a0, black);
                self.write_run(a2 - a1, !black);
                a0 = a2;
            }
            started = true;
        }
    }

    /// b1 and b2 as the decoder finds them: the first reference change of
    /// the colour opposite a0's right of a0, and the change after it.
    fn reference_changes(&self, a0: u32, started: bool, black: bool) -> (u32, u32) {
        let mut index = if started {
            self.reference.partition_point(|&c| c <= a0)
        } else {
            self.reference.partition_point(|&c| c < a0)
        };
        // Changes to black sit at even indices
        if index % 2 != usize::from(black) {
            index += 1;
        }
        let at = |i: usize| self.reference.get(i).copied().unwrap_or(self.columns);
        (at(index), at(index + 1))
    }

    // -------------------------------------------------------------------------
    // Codes
    // -------------------------------------------------------------------------

    fn write_mode(&mut self, mode: u16) {
        self.write_code(MODE_CODES[mode as usize]);
    }

    /// Make-up codes for the multiples of 64, then one terminating code.
    fn write_run(&mut self, mut run: u32, black: bool) {
        let (terminating, makeup) = if black {
            (&BLACK_TERMINATING, &BLACK_MAKEUP)
        } else {
            (&WHITE_TERMINATING, &WHITE_MAKEUP)
        };
        let threshold = MAKEUP_THRESHOLD as u32;

        while run > MAX_MAKEUP {
            self.write_code(EXTENDED_MAKEUP[EXTENDED_MAKEUP.len() - 1]);
            run -= MAX_MAKEUP;
        }
        if run >= threshold {
            let length = run / threshold * threshold;
            let code = if length <= COLOUR_MAKEUP_LIMIT {
                makeup[(length / threshold - 1) as usize]
            } else {
                EXTENDED_MAKEUP[((length - COLOUR_MAKEUP_LIMIT) / threshold - 1) as usize]
            };
            self.write_code(code);
            run -= length;
        }
        self.write_code(terminating[run as usize]);
    }

    fn write_code(&mut self, code: Code) {
        self.writer.write(code.bits as u32, code.len as u32);
    }
}

/// First entry of `changes` right of `from` (or at it when `inclusive`),
/// `columns` when there is none.
fn next_change(changes: &[u32], from: u32, inclusive: bool, columns: u32) -> u32 {
    let index = if inclusive {
        changes.partition_point(|&c| c < from)
    } else {
        changes.partition_point(|&c| c <= from)
    };
    changes.get(index).copied().unwrap_or(columns)
}

/// Offset from V0 in the mode table: +1..+3, then -1..-3.
fn vertical_index(offset: i64) -> u16 {
    match offset {
        1..=3 => offset as u16,
        -3..=-1 => 3 + (-offset) as u16,
        _ => 0,
    }
}
