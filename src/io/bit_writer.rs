//! Bit-level writer used by the LZW and CCITT encoders.
//!
//! The inverse of [`BitReader`](super::BitReader): codes are appended in
//! either bit order and the last partial byte is padded with zero bits.

use super::BitOrder;

/// Append-only code writer.
#[derive(Debug, Clone)]
pub struct BitWriter {
    out: Vec<u8>,
    acc: u32,
    acc_bits: u32,
    order: BitOrder,
}

impl BitWriter {
    /// Create an MSB-first writer.
    pub fn new() -> Self {
        Self::with_order(BitOrder::MsbFirst)
    }

    pub fn with_order(order: BitOrder) -> Self {
        Self {
            out: Vec::new(),
            acc: 0,
            acc_bits: 0,
            order,
        }
    }

    /// Append the low `bits` bits of `code` (at most 24).
    pub fn write(&mut self, code: u32, bits: u32) {
        debug_assert!(bits <= 24);
        let code = code & ((1u32 << bits) - 1);
        match self.order {
            BitOrder::MsbFirst => {
                self.acc = (self.acc << bits) | code;
                self.acc_bits += bits;
                while self.acc_bits >= 8 {
                    self.acc_bits -= 8;
                    self.out.push((self.acc >> self.acc_bits) as u8);
                }
                self.acc &= (1 << self.acc_bits) - 1;
            }
            BitOrder::LsbFirst => {
                self.acc |= code << self.acc_bits;
                self.acc_bits += bits;
                while self.acc_bits >= 8 {
                    self.out.push(self.acc as u8);
                    self.acc >>= 8;
                    self.acc_bits -= 8;
                }
            }
        }
    }

    /// Bits written so far.
    #[inline]
    pub fn bit_position(&self) -> usize {
        self.out.len() * 8 + self.acc_bits as usize
    }

    /// Pad with zero bits up to the next byte boundary.
    pub fn align(&mut self) {
        if self.acc_bits > 0 {
            self.write(0, 8 - self.acc_bits);
        }
    }

    /// Pad the last byte and return the data.
    pub fn finish(mut self) -> Vec<u8> {
        self.align();
        self.out
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}
