//! Row decoder shared by the three CCITT schemes.

use tracing::debug;

use super::states::{
    Node, BLACK_TREE, EMPTY, EOFB, EOFB_BITS, EOL, EOL_BITS, LEAF, LEAF_VALUE, MAKEUP_THRESHOLD,
    MODE_HORIZONTAL, MODE_PASS, MODE_TREE, MODE_VERTICAL_ZERO, WHITE_TREE,
};
use super::{FaxOptions, FaxScheme};
use crate::codec::output_buffer;
use crate::error::CodecError;
use crate::io::BitReader;

/// Decode one CCITT unit of `columns`-wide rows.
///
/// Rows are decoded until `expected_len / ceil(columns / 8)` rows are
/// produced or the coded data ends at a row boundary. Running out of data
/// inside a row, or a row whose runs do not add up to `columns`, is an
/// error.
pub fn decode(
    input: &[u8],
    columns: u32,
    expected_len: usize,
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
    let rows = expected_len / row_bytes;
    let mut fax = FaxDecoder::new(input, columns, scheme, options, expected_len);
    let mut output = output_buffer(rows * row_bytes);

    for row in 0..rows as u32 {
        let Some(coding) = fax.start_row()? else {
            debug!(
                scheme = scheme.name(),
                row,
                rows,
                consumed = fax.reader.byte_position(),
                "CCITT data ended before the last row"
            );
            break;
        };
        fax.decode_row(coding, row)?;
        fax.render_row(&mut output, row_bytes);
        fax.finish_row();
    }

    Ok(output)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowCoding {
    OneDimensional,
    TwoDimensional,
}

/// Decoder state for one unit.
///
/// `reference` and `current` hold the changing elements of the row above
/// and the row being decoded. Even indices are changes to black, odd
/// indices changes back to white. The buffers swap after every row.
struct FaxDecoder<'a> {
    reader: BitReader<'a>,
    columns: u32,
    scheme: FaxScheme,
    options: FaxOptions,
    reference: Vec<u32>,
    current: Vec<u32>,
    produced: usize,
    expected: usize,
}

impl<'a> FaxDecoder<'a> {
    fn new(
        input: &'a [u8],
        columns: u32,
        scheme: FaxScheme,
        options: FaxOptions,
        expected: usize,
    ) -> Self {
        Self {
            reader: BitReader::new(input),
            columns,
            scheme,
            options,
            // An all-white row: no changes before the right edge
            reference: vec![columns; 3],
            current: Vec::new(),
            produced: 0,
            expected,
        }
    }

    // -------------------------------------------------------------------------
    // Row framing
    // -------------------------------------------------------------------------

    /// Consume the framing before a row and report how it is coded, or
    /// `None` if the unit has no more rows.
    fn start_row(&mut self) -> Result<Option<RowCoding>, CodecError> {
        match self.scheme {
            FaxScheme::ModifiedHuffman => {
                self.reader.align();
                if self.only_padding_left() {
                    return Ok(None);
                }
                Ok(Some(RowCoding::OneDimensional))
            }
            FaxScheme::Group3 => {
                let eols = self.skip_eols();
                if self.only_padding_left() {
                    return Ok(None);
                }
                if !self.options.two_dimensional {
                    // Six EOLs in a row end the page
                    return Ok((eols < 2).then_some(RowCoding::OneDimensional));
                }

                let coding = match self.reader.read_bit() {
                    Some(1) => RowCoding::OneDimensional,
                    Some(_) => RowCoding::TwoDimensional,
                    None => return Ok(None),
                };
                // In 2D mode the page ends with repeated EOL + tag bit
                if self.reader.peek_bits(EOL_BITS) == Some(EOL) {
                    return Ok(None);
                }
                Ok(Some(coding))
            }
            FaxScheme::Group4 => {
                if self.reader.peek_bits(EOFB_BITS) == Some(EOFB) || self.only_padding_left() {
                    return Ok(None);
                }
                Ok(Some(RowCoding::TwoDimensional))
            }
        }
    }

    /// Skip fill bits and EOL codes, returning the number of EOLs.
    fn skip_eols(&mut self) -> usize {
        let mut eols = 0;
        loop {
            match self.reader.peek_bits(EOL_BITS) {
                Some(EOL) => {
                    self.reader.skip_bits(EOL_BITS as usize);
                    eols += 1;
                }
                // No code starts with twelve zeros, so these are fill bits
                Some(0) => self.reader.skip_bits(1),
                _ => return eols,
            }
        }
    }

    /// True when nothing but zero bits remains.
    fn only_padding_left(&self) -> bool {
        let remaining = self.reader.remaining_bits();
        self.reader.at_end()
            || (remaining <= 32 && self.reader.peek_bits(remaining as u32) == Some(0))
    }

    fn decode_row(&mut self, coding: RowCoding, row: u32) -> Result<(), CodecError> {
        self.current.clear();
        match coding {
            RowCoding::OneDimensional => self.decode_1d(row),
            RowCoding::TwoDimensional => self.decode_2d(row),
        }
    }

    fn finish_row(&mut self) {
        std::mem::swap(&mut self.reference, &mut self.current);
    }

    // -------------------------------------------------------------------------
    // 1D rows
    // -------------------------------------------------------------------------

    fn decode_1d(&mut self, row: u32) -> Result<(), CodecError> {
        let mut a0 = 0u32;
        let mut black = false;

        while a0 < self.columns {
            self.check_row_continues(row, a0)?;
            let run = self.read_run(black)?;
            a0 = a0.saturating_add(run);
            if a0 > self.columns {
                return Err(self.mismatch(row, a0));
            }
            self.current.push(a0);
            black = !black;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // 2D rows
    // -------------------------------------------------------------------------

    fn decode_2d(&mut self, row: u32) -> Result<(), CodecError> {
        let columns = self.columns;
        let mut a0 = 0u32;
        let mut started = false;
        let mut black = false;

        while a0 < columns {
            self.check_row_continues(row, a0)?;
            let mode = self.read_code(&MODE_TREE, "mode")?;
            let (b1, b2) = self.reference_changes(a0, started, black);

            match mode {
                MODE_PASS => {
                    // Colour carries on under b1..b2
                    a0 = b2;
                }
                MODE_HORIZONTAL => {
                    let first = self.read_run(black)?;
                    let second = self.read_run(!black)?;
                    let a1 = a0.saturating_add(first);
                    let a2 = a1.saturating_add(second);
                    if a2 > columns {
                        return Err(self.mismatch(row, a2));
                    }
                    self.current.push(a1);
                    self.current.push(a2);
                    a0 = a2;
                }
                vertical => {
                    let offset = vertical_offset(vertical);
                    let a1 = b1 as i64 + offset;
                    if a1 < a0 as i64 || a1 > columns as i64 {
                        return Err(self.mismatch(row, a1.max(0) as u32));
                    }
                    let a1 = a1 as u32;
                    self.current.push(a1);
                    a0 = a1;
                    black = !black;
                }
            }
            started = true;
        }
        Ok(())
    }

    /// Find b1 (the first reference change right of a0 to the colour
    /// opposite a0's) and b2 (the change after it).
    fn reference_changes(&self, a0: u32, started: bool, black: bool) -> (u32, u32) {
        // Changes to black sit at even indices
        let parity = usize::from(black);
        for (i, &position) in self.reference.iter().enumerate() {
            if i % 2 != parity {
                continue;
            }
            if position > a0 || (!started && position >= a0) {
                let b2 = self.reference.get(i + 1).copied().unwrap_or(self.columns);
                return (position, b2);
            }
        }
        (self.columns, self.columns)
    }

    // -------------------------------------------------------------------------
    // Codes
    // -------------------------------------------------------------------------

    /// Read one complete run: make-up codes followed by a terminating code.
    fn read_run(&mut self, black: bool) -> Result<u32, CodecError> {
        let (tree, table) = if black {
            (&BLACK_TREE, "black run")
        } else {
            (&WHITE_TREE, "white run")
        };

        let mut total = 0u32;
        loop {
            let length = self.read_code(tree, table)?;
            total = total.saturating_add(length as u32);
            if length < MAKEUP_THRESHOLD {
                return Ok(total);
            }
        }
    }

    fn read_code(&mut self, tree: &[Node], table: &'static str) -> Result<u16, CodecError> {
        let bit_offset = self.reader.bit_position();
        let mut node = 0usize;
        loop {
            let bit = self.reader.read_bit().ok_or_else(|| self.truncated())?;
            let link = tree[node].link(bit);
            if link == EMPTY {
                return Err(CodecError::UnknownCode { table, bit_offset });
            }
            if link & LEAF != 0 {
                return Ok(link & LEAF_VALUE);
            }
            node = link as usize;
        }
    }

    /// An EOL or the end of the data inside a row means the row came up short.
    fn check_row_continues(&self, row: u32, a0: u32) -> Result<(), CodecError> {
        if self.reader.peek_bits(EOL_BITS) == Some(EOL) || self.only_padding_left() {
            return Err(self.mismatch(row, a0));
        }
        Ok(())
    }

    fn mismatch(&self, row: u32, actual: u32) -> CodecError {
        CodecError::RunLengthMismatch {
            row,
            expected: self.columns,
            actual,
        }
    }

    fn truncated(&self) -> CodecError {
        CodecError::UnexpectedEof {
            codec: self.scheme.name(),
            decoded: self.produced,
            expected: self.expected,
        }
    }

    // -------------------------------------------------------------------------
    // Output
    // -------------------------------------------------------------------------

    /// Append the current row, packed MSB first with 1 = black.
    fn render_row(&mut self, output: &mut Vec<u8>, row_bytes: usize) {
        let start = output.len();
        output.resize(start + row_bytes, 0);
        let row = &mut output[start..];

        for span in self.current.chunks(2) {
            let from = span[0].min(self.columns);
            let to = span.get(1).copied().unwrap_or(self.columns).min(self.columns);
            fill_black(row, from, to);
        }
        self.produced = output.len();
    }
}

fn vertical_offset(mode: u16) -> i64 {
    match mode.saturating_sub(MODE_VERTICAL_ZERO) {
        0 => 0,
        1 => 1,
        2 => 2,
        3 => 3,
        4 => -1,
        5 => -2,
        _ => -3,
    }
}

/// Set bits `from..to` of a packed row.
fn fill_black(row: &mut [u8], from: u32, to: u32) {
    let mut x = from as usize;
    let to = to as usize;

    while x < to && x % 8 != 0 {
        row[x / 8] |= 0x80 >> (x % 8);
        x += 1;
    }
    while x + 8 <= to {
        row[x / 8] = 0xFF;
        x += 8;
    }
    while x < to {
        row[x / 8] |= 0x80 >> (x % 8);
        x += 1;
    }
}
