//! Bit-level cursor shared by the codecs.
//!
//! Codes in TIFF LZW and CCITT streams are packed most-significant bit first.
//! Some LZW encoders pack codes least-significant bit first instead, so the
//! reader supports both orders.
//!
//! Running out of data is reported as `None`, not as an error: whether an
//! exhausted stream is normal (end of unit) or corrupt (mid-row) is a
//! decision only the codec can make.

/// Order in which bits are taken from each byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    /// Bit 7 first, codes assembled high-to-low
    MsbFirst,
    /// Bit 0 first, codes assembled low-to-high
    LsbFirst,
}

/// Forward-only bit reader over a borrowed slice.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_offset: usize,
    order: BitOrder,
}

impl<'a> BitReader<'a> {
    /// Create an MSB-first reader.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_order(data, BitOrder::MsbFirst)
    }

    /// Create a reader with an explicit bit order.
    #[inline]
    pub fn with_order(data: &'a [u8], order: BitOrder) -> Self {
        Self {
            data,
            bit_offset: 0,
            order,
        }
    }

    /// Read a single bit.
    #[inline]
    pub fn read_bit(&mut self) -> Option<u32> {
        let byte = *self.data.get(self.bit_offset >> 3)? as u32;
        let bit_pos = (self.bit_offset & 7) as u32;
        self.bit_offset += 1;
        let shift = match self.order {
            BitOrder::MsbFirst => 7 - bit_pos,
            BitOrder::LsbFirst => bit_pos,
        };
        Some((byte >> shift) & 1)
    }

    /// Read `count` bits (at most 32) as one code.
    ///
    /// Returns `None` without consuming anything if fewer than `count` bits remain.
    #[inline]
    pub fn read_bits(&mut self, count: u32) -> Option<u32> {
        debug_assert!(count <= 32);
        if self.remaining_bits() < count as usize {
            return None;
        }

        let mut result = 0u32;
        for i in 0..count {
            let bit = self.read_bit()?;
            match self.order {
                BitOrder::MsbFirst => result = (result << 1) | bit,
                BitOrder::LsbFirst => result |= bit << i,
            }
        }
        Some(result)
    }

    /// Look at the next `count` bits without consuming them.
    #[inline]
    pub fn peek_bits(&self, count: u32) -> Option<u32> {
        self.clone().read_bits(count)
    }

    /// Skip `count` bits, clamping at the end of the data.
    #[inline]
    pub fn skip_bits(&mut self, count: usize) {
        self.bit_offset = (self.bit_offset + count).min(self.data.len() * 8);
    }

    /// Advance to the next byte boundary.
    #[inline]
    pub fn align(&mut self) {
        let rem = self.bit_offset & 7;
        if rem != 0 {
            self.bit_offset += 8 - rem;
        }
    }

    /// Whether every bit has been consumed.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.bit_offset >= self.data.len() * 8
    }

    /// Number of unread bits.
    #[inline]
    pub fn remaining_bits(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.bit_offset)
    }

    /// Current position in bits from the start of the data.
    #[inline]
    pub fn bit_position(&self) -> usize {
        self.bit_offset
    }

    /// Index of the byte holding the next bit.
    #[inline]
    pub fn byte_position(&self) -> usize {
        self.bit_offset >> 3
    }
}

/// Reverse the bit order of every byte (TIFF FillOrder 2).
pub fn reverse_fill_order(data: &mut [u8]) {
    for byte in data.iter_mut() {
        *byte = byte.reverse_bits();
    }
}
