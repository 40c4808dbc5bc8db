mod bit_reader;
mod bit_writer;
mod range_reader;

pub use bit_reader::{reverse_fill_order, BitOrder, BitReader};
pub use bit_writer::BitWriter;
pub use range_reader::{
    read_i16_be, read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le,
    MemoryReader, RangeReader,
};
