//! Prefix-code trees for the T.4/T.6 run-length and mode codes.
//!
//! Each tree is a flat array of nodes built at compile time. A node holds
//! one link per input bit; a link is either the index of the next node, a
//! leaf carrying the decoded value, or empty (no code has that prefix).
//!
//! ```text
//! link value        meaning
//! 0x0000..=0x7FFF   index of the next node
//! 0x8000 | value    leaf: run length (or mode number)
//! 0xFFFF            no code
//! ```

pub(crate) const LEAF: u16 = 0x8000;
pub(crate) const LEAF_VALUE: u16 = 0x1FFF;
pub(crate) const EMPTY: u16 = 0xFFFF;

/// End of line: eleven zero bits then a one.
pub(crate) const EOL: u32 = 0x001;
pub(crate) const EOL_BITS: u32 = 12;

/// Group 4 end of facsimile block (two EOLs).
pub(crate) const EOFB: u32 = 0x001001;
pub(crate) const EOFB_BITS: u32 = 24;

/// Runs below this length are terminating codes.
pub(crate) const MAKEUP_THRESHOLD: u16 = 64;

/// Mode numbers stored in the mode tree leaves.
pub(crate) const MODE_PASS: u16 = 0;
pub(crate) const MODE_HORIZONTAL: u16 = 1;
pub(crate) const MODE_VERTICAL_ZERO: u16 = 2;

/// One entry of a published code table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Code {
    pub(crate) len: u8,
    pub(crate) bits: u16,
    pub(crate) value: u16,
}

const fn code(len: u8, bits: u16, value: u16) -> Code {
    Code { len, bits, value }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Node {
    pub(crate) zero: u16,
    pub(crate) one: u16,
}

impl Node {
    const EMPTY: Node = Node {
        zero: EMPTY,
        one: EMPTY,
    };

    #[inline]
    pub(crate) fn link(&self, bit: u32) -> u16 {
        if bit == 0 {
            self.zero
        } else {
            self.one
        }
    }
}

// =============================================================================
// Tree construction
// =============================================================================

const fn set_link<const N: usize>(nodes: &mut [Node; N], node: usize, bit: u16, link: u16) {
    if bit == 0 {
        nodes[node].zero = link;
    } else {
        nodes[node].one = link;
    }
}

/// Add every code of `codes` to the tree, returning the new node count.
const fn insert<const N: usize, const M: usize>(
    nodes: &mut [Node; N],
    mut used: usize,
    codes: &[Code; M],
) -> usize {
    let mut c = 0;
    while c < M {
        let Code { len, bits, value } = codes[c];
        let mut node = 0usize;
        let mut depth = 0u8;
        while depth < len {
            let bit = (bits >> (len - 1 - depth)) & 1;
            let link = if bit == 0 {
                nodes[node].zero
            } else {
                nodes[node].one
            };

            if depth + 1 == len {
                set_link(nodes, node, bit, LEAF | (value & LEAF_VALUE));
            } else if link == EMPTY || link & LEAF != 0 {
                set_link(nodes, node, bit, used as u16);
                node = used;
                used += 1;
            } else {
                node = link as usize;
            }
            depth += 1;
        }
        c += 1;
    }
    used
}

const fn run_tree<const N: usize, const T: usize, const M: usize>(
    terminating: &[Code; T],
    makeup: &[Code; M],
) -> [Node; N] {
    let mut nodes = [Node::EMPTY; N];
    let mut used = insert(&mut nodes, 1, terminating);
    used = insert(&mut nodes, used, makeup);
    insert(&mut nodes, used, &EXTENDED_MAKEUP);
    nodes
}

pub(crate) const WHITE_TREE: [Node; 104] = run_tree(&WHITE_TERMINATING, &WHITE_MAKEUP);
pub(crate) const BLACK_TREE: [Node; 104] = run_tree(&BLACK_TERMINATING, &BLACK_MAKEUP);
pub(crate) const MODE_TREE: [Node; 9] = {
    let mut nodes = [Node::EMPTY; 9];
    insert(&mut nodes, 1, &MODE_CODES);
    nodes
};

// =============================================================================
// Code tables (ITU-T T.4 tables 1-3, T.6 table 4)
// =============================================================================

pub(crate) const WHITE_TERMINATING: [Code; 64] = [
    code(8, 0b00110101, 0),
    code(6, 0b000111, 1),
    code(4, 0b0111, 2),
    code(4, 0b1000, 3),
    code(4, 0b1011, 4),
    code(4, 0b1100, 5),
    code(4, 0b1110, 6),
    code(4, 0b1111, 7),
    code(5, 0b10011, 8),
    code(5, 0b10100, 9),
    code(5, 0b00111, 10),
    code(5, 0b01000, 11),
    code(6, 0b001000, 12),
    code(6, 0b000011, 13),
    code(6, 0b110100, 14),
    code(6, 0b110101, 15),
    code(6, 0b101010, 16),
    code(6, 0b101011, 17),
    code(7, 0b0100111, 18),
    code(7, 0b0001100, 19),
    code(7, 0b0001000, 20),
    code(7, 0b0010111, 21),
    code(7, 0b0000011, 22),
    code(7, 0b0000100, 23),
    code(7, 0b0101000, 24),
    code(7, 0b0101011, 25),
    code(7, 0b0010011, 26),
    code(7, 0b0100100, 27),
    code(7, 0b0011000, 28),
    code(8, 0b00000010, 29),
    code(8, 0b00000011, 30),
    code(8, 0b00011010, 31),
    code(8, 0b00011011, 32),
    code(8, 0b00010010, 33),
    code(8, 0b00010011, 34),
    code(8, 0b00010100, 35),
    code(8, 0b00010101, 36),
    code(8, 0b00010110, 37),
    code(8, 0b00010111, 38),
    code(8, 0b00101000, 39),
    code(8, 0b00101001, 40),
    code(8, 0b00101010, 41),
    code(8, 0b00101011, 42),
    code(8, 0b00101100, 43),
    code(8, 0b00101101, 44),
    code(8, 0b00000100, 45),
    code(8, 0b00000101, 46),
    code(8, 0b00001010, 47),
    code(8, 0b00001011, 48),
    code(8, 0b01010010, 49),
    code(8, 0b01010011, 50),
    code(8, 0b01010100, 51),
    code(8, 0b01010101, 52),
    code(8, 0b00100100, 53),
    code(8, 0b00100101, 54),
    code(8, 0b01011000, 55),
    code(8, 0b01011001, 56),
    code(8, 0b01011010, 57),
    code(8, 0b01011011, 58),
    code(8, 0b01001010, 59),
    code(8, 0b01001011, 60),
    code(8, 0b00110010, 61),
    code(8, 0b00110011, 62),
    code(8, 0b00110100, 63),
];

pub(crate) const WHITE_MAKEUP: [Code; 27] = [
    code(5, 0b11011, 64),
    code(5, 0b10010, 128),
    code(6, 0b010111, 192),
    code(7, 0b0110111, 256),
    code(8, 0b00110110, 320),
    code(8, 0b00110111, 384),
    code(8, 0b01100100, 448),
    code(8, 0b01100101, 512),
    code(8, 0b01101000, 576),
    code(8, 0b01100111, 640),
    code(9, 0b011001100, 704),
    code(9, 0b011001101, 768),
    code(9, 0b011010010, 832),
    code(9, 0b011010011, 896),
    code(9, 0b011010100, 960),
    code(9, 0b011010101, 1024),
    code(9, 0b011010110, 1088),
    code(9, 0b011010111, 1152),
    code(9, 0b011011000, 1216),
    code(9, 0b011011001, 1280),
    code(9, 0b011011010, 1344),
    code(9, 0b011011011, 1408),
    code(9, 0b010011000, 1472),
    code(9, 0b010011001, 1536),
    code(9, 0b010011010, 1600),
    code(6, 0b011000, 1664),
    code(9, 0b010011011, 1728),
];

pub(crate) const BLACK_TERMINATING: [Code; 64] = [
    code(10, 0b0000110111, 0),
    code(3, 0b010, 1),
    code(2, 0b11, 2),
    code(2, 0b10, 3),
    code(3, 0b011, 4),
    code(4, 0b0011, 5),
    code(4, 0b0010, 6),
    code(5, 0b00011, 7),
    code(6, 0b000101, 8),
    code(6, 0b000100, 9),
    code(7, 0b0000100, 10),
    code(7, 0b0000101, 11),
    code(7, 0b0000111, 12),
    code(8, 0b00000100, 13),
    code(8, 0b00000111, 14),
    code(9, 0b000011000, 15),
    code(10, 0b0000010111, 16),
    code(10, 0b0000011000, 17),
    code(10, 0b0000001000, 18),
    code(11, 0b00001100111, 19),
    code(11, 0b00001101000, 20),
    code(11, 0b00001101100, 21),
    code(11, 0b00000110111, 22),
    code(11, 0b00000101000, 23),
    code(11, 0b00000010111, 24),
    code(11, 0b00000011000, 25),
    code(12, 0b000011001010, 26),
    code(12, 0b000011001011, 27),
    code(12, 0b000011001100, 28),
    code(12, 0b000011001101, 29),
    code(12, 0b000001101000, 30),
    code(12, 0b000001101001, 31),
    code(12, 0b000001101010, 32),
    code(12, 0b000001101011, 33),
    code(12, 0b000011010010, 34),
    code(12, 0b000011010011, 35),
    code(12, 0b000011010100, 36),
    code(12, 0b000011010101, 37),
    code(12, 0b000011010110, 38),
    code(12, 0b000011010111, 39),
    code(12, 0b000001101100, 40),
    code(12, 0b000001101101, 41),
    code(12, 0b000011011010, 42),
    code(12, 0b000011011011, 43),
    code(12, 0b000001010100, 44),
    code(12, 0b000001010101, 45),
    code(12, 0b000001010110, 46),
    code(12, 0b000001010111, 47),
    code(12, 0b000001100100, 48),
    code(12, 0b000001100101, 49),
    code(12, 0b000001010010, 50),
    code(12, 0b000001010011, 51),
    code(12, 0b000000100100, 52),
    code(12, 0b000000110111, 53),
    code(12, 0b000000111000, 54),
    code(12, 0b000000100111, 55),
    code(12, 0b000000101000, 56),
    code(12, 0b000001011000, 57),
    code(12, 0b000001011001, 58),
    code(12, 0b000000101011, 59),
    code(12, 0b000000101100, 60),
    code(12, 0b000001011010, 61),
    code(12, 0b000001100110, 62),
    code(12, 0b000001100111, 63),
];

pub(crate) const BLACK_MAKEUP: [Code; 27] = [
    code(10, 0b0000001111, 64),
    code(12, 0b000011001000, 128),
    code(12, 0b000011001001, 192),
    code(12, 0b000001011011, 256),
    code(12, 0b000000110011, 320),
    code(12, 0b000000110100, 384),
    code(12, 0b000000110101, 448),
    code(13, 0b0000001101100, 512),
    code(13, 0b0000001101101, 576),
    code(13, 0b0000001001010, 640),
    code(13, 0b0000001001011, 704),
    code(13, 0b0000001001100, 768),
    code(13, 0b0000001001101, 832),
    code(13, 0b0000001110010, 896),
    code(13, 0b0000001110011, 960),
    code(13, 0b0000001110100, 1024),
    code(13, 0b0000001110101, 1088),
    code(13, 0b0000001110110, 1152),
    code(13, 0b0000001110111, 1216),
    code(13, 0b0000001010010, 1280),
    code(13, 0b0000001010011, 1344),
    code(13, 0b0000001010100, 1408),
    code(13, 0b0000001010101, 1472),
    code(13, 0b0000001011010, 1536),
    code(13, 0b0000001011011, 1600),
    code(13, 0b0000001100100, 1664),
    code(13, 0b0000001100101, 1728),
];

/// Make-up codes shared by both colours (runs of 1792 and up).
pub(crate) const EXTENDED_MAKEUP: [Code; 13] = [
    code(11, 0b00000001000, 1792),
    code(11, 0b00000001100, 1856),
    code(11, 0b00000001101, 1920),
    code(12, 0b000000010010, 1984),
    code(12, 0b000000010011, 2048),
    code(12, 0b000000010100, 2112),
    code(12, 0b000000010101, 2176),
    code(12, 0b000000010110, 2240),
    code(12, 0b000000010111, 2304),
    code(12, 0b000000011100, 2368),
    code(12, 0b000000011101, 2432),
    code(12, 0b000000011110, 2496),
    code(12, 0b000000011111, 2560),
];

/// Pass, horizontal, then vertical offsets 0, +1, +2, +3, -1, -2, -3.
pub(crate) const MODE_CODES: [Code; 9] = [
    code(4, 0b0001, 0),
    code(3, 0b001, 1),
    code(1, 0b1, 2),
    code(3, 0b011, 3),
    code(6, 0b000011, 4),
    code(7, 0b0000011, 5),
    code(3, 0b010, 6),
    code(6, 0b000010, 7),
    code(7, 0b0000010, 8),
];
