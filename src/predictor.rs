//! TIFF differencing predictors, undone one row at a time.
//!
//! # Key Concepts
//!
//! - **Horizontal (2)**: every sample after the first pixel is stored as the
//!   difference from the previous sample of the same channel, wrapping at
//!   the sample width. Sub-byte samples are differenced inside the packed
//!   bit stream.
//!
//! - **Floating point (3)**: the bytes of each sample are first split into
//!   planes (most significant bytes of every sample, then the next, ...) and
//!   the whole row is then byte-differenced with a stride of one pixel.
//!
//! ```text
//! floating point, 2 samples of 4 bytes (big-endian A0..A3, B0..B3)
//! planes      A0 B0 | A1 B1 | A2 B2 | A3 B3
//! differenced A0 B0-A0 | A1-B0 B1-A1 | ...
//! ```
//!
//! Rows use the file's byte order on input and output.

use crate::error::DecodeError;
use crate::format::tiff::{ByteOrder, Predictor};

/// A predictor bound to one row layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorFilter {
    predictor: Predictor,
    columns: usize,
    samples_per_pixel: usize,
    bits_per_sample: u16,
    byte_order: ByteOrder,
}

impl PredictorFilter {
    /// Bind a predictor to a row layout.
    ///
    /// # Errors
    /// `Unsupported` for bit depths the predictor does not handle.
    pub fn new(
        predictor: Predictor,
        columns: usize,
        samples_per_pixel: usize,
        bits_per_sample: u16,
        byte_order: ByteOrder,
    ) -> Result<Self, DecodeError> {
        let supported = match predictor {
            Predictor::None => true,
            Predictor::Horizontal => matches!(bits_per_sample, 1 | 2 | 4 | 8 | 16 | 32 | 64),
            Predictor::FloatingPoint => matches!(bits_per_sample, 16 | 24 | 32 | 64),
        };
        if !supported {
            return Err(DecodeError::unsupported(
                "predictor",
                format!("{:?} on {}-bit samples", predictor, bits_per_sample),
            ));
        }

        Ok(Self {
            predictor,
            columns,
            samples_per_pixel,
            bits_per_sample,
            byte_order,
        })
    }

    /// Bytes one row occupies.
    pub fn row_bytes(&self) -> usize {
        (self.columns * self.samples_per_pixel * self.bits_per_sample as usize).div_ceil(8)
    }

    /// Undo the differencing of one row in place.
    pub fn apply_inverse(&self, row: &mut [u8]) {
        let row = self.clip(row);
        match self.predictor {
            Predictor::None => {}
            Predictor::Horizontal => self.integer_inverse(row),
            Predictor::FloatingPoint => self.float_inverse(row),
        }
    }

    /// Apply the differencing to one row in place.
    pub fn apply_forward(&self, row: &mut [u8]) {
        let row = self.clip(row);
        match self.predictor {
            Predictor::None => {}
            Predictor::Horizontal => self.integer_forward(row),
            Predictor::FloatingPoint => self.float_forward(row),
        }
    }

    fn clip<'r>(&self, row: &'r mut [u8]) -> &'r mut [u8] {
        let len = self.row_bytes().min(row.len());
        &mut row[..len]
    }

    fn sample_count(&self) -> usize {
        self.columns * self.samples_per_pixel
    }

    // -------------------------------------------------------------------------
    // Horizontal differencing
    // -------------------------------------------------------------------------

    fn integer_inverse(&self, row: &mut [u8]) {
        let spp = self.samples_per_pixel;
        let count = self.sample_count();
        match self.bits_per_sample {
            8 => {
                for i in spp..count.min(row.len()) {
                    row[i] = row[i].wrapping_add(row[i - spp]);
                }
            }
            1 | 2 | 4 => {
                let mut samples = PackedSamples::new(row, self.bits_per_sample);
                for i in spp..count {
                    let value = samples.get(i).wrapping_add(samples.get(i - spp));
                    samples.set(i, value);
                }
            }
            _ => {
                let mut samples = WideSamples::new(row, self.bits_per_sample, self.byte_order);
                for i in spp..count.min(samples.len()) {
                    let value = samples.get(i).wrapping_add(samples.get(i - spp));
                    samples.set(i, value);
                }
            }
        }
    }

    fn integer_forward(&self, row: &mut [u8]) {
        let spp = self.samples_per_pixel;
        let count = self.sample_count();
        match self.bits_per_sample {
            8 => {
                for i in (spp..count.min(row.len())).rev() {
                    row[i] = row[i].wrapping_sub(row[i - spp]);
                }
            }
            1 | 2 | 4 => {
                let mut samples = PackedSamples::new(row, self.bits_per_sample);
                for i in (spp..count).rev() {
                    let value = samples.get(i).wrapping_sub(samples.get(i - spp));
                    samples.set(i, value);
                }
            }
            _ => {
                let mut samples = WideSamples::new(row, self.bits_per_sample, self.byte_order);
                for i in (spp..count.min(samples.len())).rev() {
                    let value = samples.get(i).wrapping_sub(samples.get(i - spp));
                    samples.set(i, value);
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Floating point differencing
    // -------------------------------------------------------------------------

    fn float_inverse(&self, row: &mut [u8]) {
        let spp = self.samples_per_pixel;
        for i in spp..row.len() {
            row[i] = row[i].wrapping_add(row[i - spp]);
        }

        let bytes = self.bits_per_sample as usize / 8;
        let count = row.len() / bytes;
        let planes = row.to_vec();
        for sample in 0..count {
            for b in 0..bytes {
                row[sample * bytes + b] = planes[self.plane_for_byte(b, bytes) * count + sample];
            }
        }
    }

    fn float_forward(&self, row: &mut [u8]) {
        let bytes = self.bits_per_sample as usize / 8;
        let count = row.len() / bytes;
        let samples = row.to_vec();
        for sample in 0..count {
            for b in 0..bytes {
                row[self.plane_for_byte(b, bytes) * count + sample] = samples[sample * bytes + b];
            }
        }

        let spp = self.samples_per_pixel;
        for i in (spp..row.len()).rev() {
            row[i] = row[i].wrapping_sub(row[i - spp]);
        }
    }

    /// Plane holding byte `b` of a sample: planes run most significant first.
    fn plane_for_byte(&self, b: usize, bytes: usize) -> usize {
        match self.byte_order {
            ByteOrder::BigEndian => b,
            ByteOrder::LittleEndian => bytes - 1 - b,
        }
    }
}

// =============================================================================
// Sample access
// =============================================================================

/// 1, 2 or 4-bit samples packed MSB first.
struct PackedSamples<'a> {
    row: &'a mut [u8],
    bits: usize,
    mask: u8,
}

impl<'a> PackedSamples<'a> {
    fn new(row: &'a mut [u8], bits: u16) -> Self {
        let bits = bits as usize;
        Self {
            row,
            bits,
            mask: ((1u16 << bits) - 1) as u8,
        }
    }

    fn shift(&self, index: usize) -> (usize, usize) {
        let bit = index * self.bits;
        (bit / 8, 8 - self.bits - bit % 8)
    }

    fn get(&self, index: usize) -> u8 {
        let (byte, shift) = self.shift(index);
        self.row.get(byte).map_or(0, |b| (b >> shift) & self.mask)
    }

    fn set(&mut self, index: usize, value: u8) {
        let (byte, shift) = self.shift(index);
        if let Some(b) = self.row.get_mut(byte) {
            *b = (*b & !(self.mask << shift)) | ((value & self.mask) << shift);
        }
    }
}

/// 16, 32 or 64-bit samples in file byte order, widened to u64.
struct WideSamples<'a> {
    row: &'a mut [u8],
    bytes: usize,
    byte_order: ByteOrder,
}

impl<'a> WideSamples<'a> {
    fn new(row: &'a mut [u8], bits: u16, byte_order: ByteOrder) -> Self {
        Self {
            row,
            bytes: bits as usize / 8,
            byte_order,
        }
    }

    fn len(&self) -> usize {
        self.row.len() / self.bytes
    }

    fn get(&self, index: usize) -> u64 {
        let at = &self.row[index * self.bytes..];
        match self.bytes {
            2 => self.byte_order.read_u16(at) as u64,
            4 => self.byte_order.read_u32(at) as u64,
            _ => self.byte_order.read_u64(at),
        }
    }

    fn set(&mut self, index: usize, value: u64) {
        let at = &mut self.row[index * self.bytes..(index + 1) * self.bytes];
        match (self.bytes, self.byte_order) {
            (2, ByteOrder::LittleEndian) => at.copy_from_slice(&(value as u16).to_le_bytes()),
            (2, ByteOrder::BigEndian) => at.copy_from_slice(&(value as u16).to_be_bytes()),
            (4, ByteOrder::LittleEndian) => at.copy_from_slice(&(value as u32).to_le_bytes()),
            (4, ByteOrder::BigEndian) => at.copy_from_slice(&(value as u32).to_be_bytes()),
            (_, ByteOrder::LittleEndian) => at.copy_from_slice(&value.to_le_bytes()),
            (_, ByteOrder::BigEndian) => at.copy_from_slice(&value.to_be_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    fn filter(predictor: Predictor, columns: usize, spp: usize, bits: u16) -> PredictorFilter {
        PredictorFilter::new(predictor, columns, spp, bits, ByteOrder::LittleEndian).unwrap()
    }

    // -------------------------------------------------------------------------
    // Horizontal
    // -------------------------------------------------------------------------

    #[test]
    fn test_horizontal_8bit_rgb() {
        let f = filter(Predictor::Horizontal, 3, 3, 8);
        let mut row = vec![10, 20, 30, 1, 2, 3, 255, 0, 1];
        f.apply_inverse(&mut row);
        assert_eq!(row, vec![10, 20, 30, 11, 22, 33, 10, 22, 34]);
    }

    #[test]
    fn test_horizontal_16bit_wraps() {
        let f = filter(Predictor::Horizontal, 2, 1, 16);
        let mut row = vec![0xFF, 0xFF, 0x02, 0x00];
        f.apply_inverse(&mut row);
        assert_eq!(row, vec![0xFF, 0xFF, 0x01, 0x00]);

        let f = PredictorFilter::new(Predictor::Horizontal, 2, 1, 16, ByteOrder::BigEndian).unwrap();
        let mut row = vec![0x01, 0x00, 0x00, 0x10];
        f.apply_inverse(&mut row);
        assert_eq!(row, vec![0x01, 0x00, 0x01, 0x10]);
    }

    #[test]
    fn test_horizontal_4bit_packed() {
        let f = filter(Predictor::Horizontal, 4, 1, 4);
        // Samples 3, +1, +15 (wraps), +2
        let mut row = vec![0x31, 0xF2];
        f.apply_inverse(&mut row);
        // 3, 4, 3, 5
        assert_eq!(row, vec![0x43, 0x35]);
    }

    #[test]
    fn test_horizontal_1bit_is_xor() {
        let f = filter(Predictor::Horizontal, 8, 1, 1);
        let mut row = vec![0b1000_0000];
        f.apply_inverse(&mut row);
        assert_eq!(row, vec![0xFF]);
    }

    #[test]
    fn test_horizontal_round_trip_all_depths() {
        for bits in [1u16, 2, 4, 8, 16, 32, 64] {
            for order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
                let f = PredictorFilter::new(Predictor::Horizontal, 7, 2, bits, order).unwrap();
                let original: Vec<u8> = (0..f.row_bytes()).map(|i| (i * 37 + 11) as u8).collect();
                let mut row = original.clone();
                f.apply_forward(&mut row);
                f.apply_inverse(&mut row);
                assert_eq!(row, original, "{} bits {:?}", bits, order);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Floating point
    // -------------------------------------------------------------------------

    #[test]
    fn test_float_inverse_big_endian() {
        let f = PredictorFilter::new(Predictor::FloatingPoint, 2, 1, 32, ByteOrder::BigEndian)
            .unwrap();
        let a = 1.5f32.to_be_bytes();
        let b = (-2.25f32).to_be_bytes();
        // Byte planes, then differenced
        let planes = [a[0], b[0], a[1], b[1], a[2], b[2], a[3], b[3]];
        let mut row = planes.to_vec();
        for i in (1..row.len()).rev() {
            row[i] = row[i].wrapping_sub(row[i - 1]);
        }

        f.apply_inverse(&mut row);
        assert_eq!(f32::from_be_bytes([row[0], row[1], row[2], row[3]]), 1.5);
        assert_eq!(f32::from_be_bytes([row[4], row[5], row[6], row[7]]), -2.25);
    }

    #[test]
    fn test_float_inverse_little_endian() {
        let f = filter(Predictor::FloatingPoint, 1, 2, 16);
        // Two half floats 0x3C00 and 0xC000: planes [3C C0 | 00 00], then
        // differenced with a stride of two samples
        let mut row = vec![0x3C, 0xC0, 0x00u8.wrapping_sub(0x3C), 0x00u8.wrapping_sub(0xC0)];
        f.apply_inverse(&mut row);
        assert_eq!(row, vec![0x00, 0x3C, 0x00, 0xC0]);
    }

    #[test]
    fn test_float_round_trip() {
        for bits in [16u16, 24, 32, 64] {
            for order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
                let f = PredictorFilter::new(Predictor::FloatingPoint, 5, 3, bits, order).unwrap();
                let original: Vec<u8> = (0..f.row_bytes()).map(|i| (i * 91 + 7) as u8).collect();
                let mut row = original.clone();
                f.apply_forward(&mut row);
                assert_ne!(row, original);
                f.apply_inverse(&mut row);
                assert_eq!(row, original);
            }
        }
    }

    #[test]
    fn test_unsupported_depths() {
        let err = PredictorFilter::new(Predictor::Horizontal, 4, 1, 24, ByteOrder::LittleEndian)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Unsupported);
        assert!(
            PredictorFilter::new(Predictor::FloatingPoint, 4, 1, 8, ByteOrder::LittleEndian)
                .is_err()
        );
        assert!(PredictorFilter::new(Predictor::None, 4, 1, 12, ByteOrder::LittleEndian).is_ok());
    }
}
