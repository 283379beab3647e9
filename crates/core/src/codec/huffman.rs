//! Canonical T.4 run-length code tables and the prefix-code trie that
//! decodes them.
//!
//! The tries are built once per process from the [`RunCode`] tables and shared
//! read-only by every decoder.

use crate::codec::bit_reader::BitReader;
use crate::error::{PdfError, Result};
use once_cell::sync::Lazy;

/// Accumulated run length above which a stream is treated as corrupt.
pub const MAX_RUN_LENGTH: u32 = 1_000_000;

/// One entry of a canonical code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunCode {
    /// Code length in bits.
    pub bits: u8,
    /// Code value, right-aligned.
    pub code: u16,
    /// Run length the code stands for. Values of 64 and above are makeup codes.
    pub run: u16,
}

const fn rc(bits: u8, code: u16, run: u16) -> RunCode {
    RunCode { bits, code, run }
}

/// Pixel color a run-length code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub const fn flip(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
}

#[derive(Debug)]
enum Node<T> {
    Empty,
    Leaf(T),
    Branch(Box<Node<T>>, Box<Node<T>>),
}

/// Binary trie over a prefix-free code.
#[derive(Debug)]
pub struct HuffmanTrie<T> {
    root: Node<T>,
    max_bits: u32,
}

impl<T: Copy> HuffmanTrie<T> {
    /// Build a trie from `(bit length, code, value)` triples.
    ///
    /// # Panics
    ///
    /// Panics if the codes are not prefix-free. The tables are static, so this
    /// can only fire on a programming error.
    pub fn from_codes(codes: impl IntoIterator<Item = (u8, u32, T)>) -> Self {
        let mut root = Node::Empty;
        let mut max_bits = 0;
        for (bits, code, value) in codes {
            Self::add(&mut root, bits, code, value);
            max_bits = max_bits.max(u32::from(bits));
        }
        Self { root, max_bits }
    }

    fn add(root: &mut Node<T>, bits: u8, code: u32, value: T) {
        let mut current = root;
        for i in (0..bits).rev() {
            if matches!(current, Node::Empty) {
                *current = Node::Branch(Box::new(Node::Empty), Box::new(Node::Empty));
            }
            current = match current {
                Node::Branch(zero, one) => {
                    if (code >> i) & 1 == 1 {
                        one
                    } else {
                        zero
                    }
                }
                _ => panic!("conflicting Huffman codes at {code:0width$b}", width = bits as usize),
            };
        }
        assert!(
            matches!(current, Node::Empty),
            "conflicting Huffman codes at {code:0width$b}",
            width = bits as usize
        );
        *current = Node::Leaf(value);
    }

    /// Longest code in the trie.
    pub const fn max_bits(&self) -> u32 {
        self.max_bits
    }

    /// Walk the trie bit by bit until a leaf is reached.
    ///
    /// Fails on a dead branch or when more than `max_bits` bits are consumed.
    pub fn decode(&self, reader: &mut BitReader<'_>) -> Result<T> {
        let mut node = &self.root;
        let mut consumed = 0;
        loop {
            match node {
                Node::Leaf(value) => return Ok(*value),
                Node::Empty => {
                    return Err(PdfError::DecodeError(format!(
                        "invalid Huffman code at bit {}",
                        reader.bit_offset()
                    )));
                }
                Node::Branch(zero, one) => {
                    if consumed == self.max_bits {
                        return Err(PdfError::DecodeError(format!(
                            "Huffman code longer than {} bits",
                            self.max_bits
                        )));
                    }
                    node = if reader.read_bit() == 1 { one } else { zero };
                    consumed += 1;
                }
            }
        }
    }
}

/// Decode one complete run: any number of makeup codes followed by a
/// terminating code (< 64). Returns the summed length.
pub fn decode_run_length(reader: &mut BitReader<'_>, color: Color) -> Result<u32> {
    let trie = match color {
        Color::White => &*WHITE_TRIE,
        Color::Black => &*BLACK_TRIE,
    };
    let mut total = 0u32;
    loop {
        let run = u32::from(trie.decode(reader)?);
        total += run;
        if total > MAX_RUN_LENGTH {
            return Err(PdfError::DecodeError(format!(
                "{color:?} run exceeds {MAX_RUN_LENGTH} pixels"
            )));
        }
        if run < 64 {
            return Ok(total);
        }
    }
}

/// 2D coding modes (T.4 section 4.2.1.3, T.6 section 2.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Pass,
    Horizontal,
    /// a1 relative to b1, in -3..=3.
    Vertical(i8),
    /// `0000001xxx`; the three trailing bits select the extension.
    Extension(u8),
}

fn run_trie(own: &[RunCode]) -> HuffmanTrie<u16> {
    HuffmanTrie::from_codes(
        own.iter()
            .chain(EXTENDED_MAKEUP_CODES)
            .map(|c| (c.bits, u32::from(c.code), c.run)),
    )
}

fn mode_trie() -> HuffmanTrie<Mode> {
    let mut codes = vec![
        (1, 0b1, Mode::Vertical(0)),
        (3, 0b011, Mode::Vertical(1)),
        (3, 0b010, Mode::Vertical(-1)),
        (3, 0b001, Mode::Horizontal),
        (4, 0b0001, Mode::Pass),
        (6, 0b000011, Mode::Vertical(2)),
        (6, 0b000010, Mode::Vertical(-2)),
        (7, 0b0000011, Mode::Vertical(3)),
        (7, 0b0000010, Mode::Vertical(-3)),
    ];
    codes.extend((0..8u8).map(|x| (10, 0b0000001000 | u32::from(x), Mode::Extension(x))));
    HuffmanTrie::from_codes(codes)
}

pub static WHITE_TRIE: Lazy<HuffmanTrie<u16>> = Lazy::new(|| run_trie(WHITE_CODES));
pub static BLACK_TRIE: Lazy<HuffmanTrie<u16>> = Lazy::new(|| run_trie(BLACK_CODES));
pub static MODE_TRIE: Lazy<HuffmanTrie<Mode>> = Lazy::new(mode_trie);

/// White terminating (0..=63) and makeup (64..=1728) codes.
pub static WHITE_CODES: &[RunCode] = &[
    rc(8, 0b00110101, 0),
    rc(6, 0b000111, 1),
    rc(4, 0b0111, 2),
    rc(4, 0b1000, 3),
    rc(4, 0b1011, 4),
    rc(4, 0b1100, 5),
    rc(4, 0b1110, 6),
    rc(4, 0b1111, 7),
    rc(5, 0b10011, 8),
    rc(5, 0b10100, 9),
    rc(5, 0b00111, 10),
    rc(5, 0b01000, 11),
    rc(6, 0b001000, 12),
    rc(6, 0b000011, 13),
    rc(6, 0b110100, 14),
    rc(6, 0b110101, 15),
    rc(6, 0b101010, 16),
    rc(6, 0b101011, 17),
    rc(7, 0b0100111, 18),
    rc(7, 0b0001100, 19),
    rc(7, 0b0001000, 20),
    rc(7, 0b0010111, 21),
    rc(7, 0b0000011, 22),
    rc(7, 0b0000100, 23),
    rc(7, 0b0101000, 24),
    rc(7, 0b0101011, 25),
    rc(7, 0b0010011, 26),
    rc(7, 0b0100100, 27),
    rc(7, 0b0011000, 28),
    rc(8, 0b00000010, 29),
    rc(8, 0b00000011, 30),
    rc(8, 0b00011010, 31),
    rc(8, 0b00011011, 32),
    rc(8, 0b00010010, 33),
    rc(8, 0b00010011, 34),
    rc(8, 0b00010100, 35),
    rc(8, 0b00010101, 36),
    rc(8, 0b00010110, 37),
    rc(8, 0b00010111, 38),
    rc(8, 0b00101000, 39),
    rc(8, 0b00101001, 40),
    rc(8, 0b00101010, 41),
    rc(8, 0b00101011, 42),
    rc(8, 0b00101100, 43),
    rc(8, 0b00101101, 44),
    rc(8, 0b00000100, 45),
    rc(8, 0b00000101, 46),
    rc(8, 0b00001010, 47),
    rc(8, 0b00001011, 48),
    rc(8, 0b01010010, 49),
    rc(8, 0b01010011, 50),
    rc(8, 0b01010100, 51),
    rc(8, 0b01010101, 52),
    rc(8, 0b00100100, 53),
    rc(8, 0b00100101, 54),
    rc(8, 0b01011000, 55),
    rc(8, 0b01011001, 56),
    rc(8, 0b01011010, 57),
    rc(8, 0b01011011, 58),
    rc(8, 0b01001010, 59),
    rc(8, 0b01001011, 60),
    rc(8, 0b00110010, 61),
    rc(8, 0b00110011, 62),
    rc(8, 0b00110100, 63),
    rc(5, 0b11011, 64),
    rc(5, 0b10010, 128),
    rc(6, 0b010111, 192),
    rc(7, 0b0110111, 256),
    rc(8, 0b00110110, 320),
    rc(8, 0b00110111, 384),
    rc(8, 0b01100100, 448),
    rc(8, 0b01100101, 512),
    rc(8, 0b01101000, 576),
    rc(8, 0b01100111, 640),
    rc(9, 0b011001100, 704),
    rc(9, 0b011001101, 768),
    rc(9, 0b011010010, 832),
    rc(9, 0b011010011, 896),
    rc(9, 0b011010100, 960),
    rc(9, 0b011010101, 1024),
    rc(9, 0b011010110, 1088),
    rc(9, 0b011010111, 1152),
    rc(9, 0b011011000, 1216),
    rc(9, 0b011011001, 1280),
    rc(9, 0b011011010, 1344),
    rc(9, 0b011011011, 1408),
    rc(9, 0b010011000, 1472),
    rc(9, 0b010011001, 1536),
    rc(9, 0b010011010, 1600),
    rc(6, 0b011000, 1664),
    rc(9, 0b010011011, 1728),
];

/// Black terminating (0..=63) and makeup (64..=1728) codes.
pub static BLACK_CODES: &[RunCode] = &[
    rc(10, 0b0000110111, 0),
    rc(3, 0b010, 1),
    rc(2, 0b11, 2),
    rc(2, 0b10, 3),
    rc(3, 0b011, 4),
    rc(4, 0b0011, 5),
    rc(4, 0b0010, 6),
    rc(5, 0b00011, 7),
    rc(6, 0b000101, 8),
    rc(6, 0b000100, 9),
    rc(7, 0b0000100, 10),
    rc(7, 0b0000101, 11),
    rc(7, 0b0000111, 12),
    rc(8, 0b00000100, 13),
    rc(8, 0b00000111, 14),
    rc(9, 0b000011000, 15),
    rc(10, 0b0000010111, 16),
    rc(10, 0b0000011000, 17),
    rc(10, 0b0000001000, 18),
    rc(11, 0b00001100111, 19),
    rc(11, 0b00001101000, 20),
    rc(11, 0b00001101100, 21),
    rc(11, 0b00000110111, 22),
    rc(11, 0b00000101000, 23),
    rc(11, 0b00000010111, 24),
    rc(11, 0b00000011000, 25),
    rc(12, 0b000011001010, 26),
    rc(12, 0b000011001011, 27),
    rc(12, 0b000011001100, 28),
    rc(12, 0b000011001101, 29),
    rc(12, 0b000001101000, 30),
    rc(12, 0b000001101001, 31),
    rc(12, 0b000001101010, 32),
    rc(12, 0b000001101011, 33),
    rc(12, 0b000011010010, 34),
    rc(12, 0b000011010011, 35),
    rc(12, 0b000011010100, 36),
    rc(12, 0b000011010101, 37),
    rc(12, 0b000011010110, 38),
    rc(12, 0b000011010111, 39),
    rc(12, 0b000001101100, 40),
    rc(12, 0b000001101101, 41),
    rc(12, 0b000011011010, 42),
    rc(12, 0b000011011011, 43),
    rc(12, 0b000001010100, 44),
    rc(12, 0b000001010101, 45),
    rc(12, 0b000001010110, 46),
    rc(12, 0b000001010111, 47),
    rc(12, 0b000001100100, 48),
    rc(12, 0b000001100101, 49),
    rc(12, 0b000001010010, 50),
    rc(12, 0b000001010011, 51),
    rc(12, 0b000000100100, 52),
    rc(12, 0b000000110111, 53),
    rc(12, 0b000000111000, 54),
    rc(12, 0b000000100111, 55),
    rc(12, 0b000000101000, 56),
    rc(12, 0b000001011000, 57),
    rc(12, 0b000001011001, 58),
    rc(12, 0b000000101011, 59),
    rc(12, 0b000000101100, 60),
    rc(12, 0b000001011010, 61),
    rc(12, 0b000001100110, 62),
    rc(12, 0b000001100111, 63),
    rc(10, 0b0000001111, 64),
    rc(12, 0b000011001000, 128),
    rc(12, 0b000011001001, 192),
    rc(12, 0b000001011011, 256),
    rc(12, 0b000000110011, 320),
    rc(12, 0b000000110100, 384),
    rc(12, 0b000000110101, 448),
    rc(13, 0b0000001101100, 512),
    rc(13, 0b0000001101101, 576),
    rc(13, 0b0000001001010, 640),
    rc(13, 0b0000001001011, 704),
    rc(13, 0b0000001001100, 768),
    rc(13, 0b0000001001101, 832),
    rc(13, 0b0000001110010, 896),
    rc(13, 0b0000001110011, 960),
    rc(13, 0b0000001110100, 1024),
    rc(13, 0b0000001110101, 1088),
    rc(13, 0b0000001110110, 1152),
    rc(13, 0b0000001110111, 1216),
    rc(13, 0b0000001010010, 1280),
    rc(13, 0b0000001010011, 1344),
    rc(13, 0b0000001010100, 1408),
    rc(13, 0b0000001010101, 1472),
    rc(13, 0b0000001011010, 1536),
    rc(13, 0b0000001011011, 1600),
    rc(13, 0b0000001100100, 1664),
    rc(13, 0b0000001100101, 1728),
];

/// Makeup codes for 1792..=2560, shared by both colors.
pub static EXTENDED_MAKEUP_CODES: &[RunCode] = &[
    rc(11, 0b00000001000, 1792),
    rc(11, 0b00000001100, 1856),
    rc(11, 0b00000001101, 1920),
    rc(12, 0b000000010010, 1984),
    rc(12, 0b000000010011, 2048),
    rc(12, 0b000000010100, 2112),
    rc(12, 0b000000010101, 2176),
    rc(12, 0b000000010110, 2240),
    rc(12, 0b000000010111, 2304),
    rc(12, 0b000000011100, 2368),
    rc(12, 0b000000011101, 2432),
    rc(12, 0b000000011110, 2496),
    rc(12, 0b000000011111, 2560),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tries_have_expected_depth() {
        assert_eq!(WHITE_TRIE.max_bits(), 12);
        assert_eq!(BLACK_TRIE.max_bits(), 13);
        assert_eq!(MODE_TRIE.max_bits(), 10);
    }

    #[test]
    fn makeup_and_terminating_codes_sum() {
        // white 64 (11011) + white 3 (1000), padded with zeros
        let data = [0b1101_1100, 0b0000_0000];
        let mut r = BitReader::new(&data);
        assert_eq!(decode_run_length(&mut r, Color::White).unwrap(), 67);
        assert_eq!(r.bit_offset(), 9);
    }

    #[test]
    fn black_terminating_code() {
        // black 2 = 11
        let mut r = BitReader::new(&[0b1100_0000]);
        assert_eq!(decode_run_length(&mut r, Color::Black).unwrap(), 2);
    }

    #[test]
    fn dead_branch_is_an_error() {
        // 00000000 0000 is not a white code
        let mut r = BitReader::new(&[0x00, 0x00]);
        assert!(matches!(
            WHITE_TRIE.decode(&mut r),
            Err(PdfError::DecodeError(_))
        ));
    }

    #[test]
    fn mode_codes_decode() {
        // V0, H, P, VR2: 1 001 0001 000011
        let data = [0b1001_0001, 0b0000_1100];
        let mut r = BitReader::new(&data);
        assert_eq!(MODE_TRIE.decode(&mut r).unwrap(), Mode::Vertical(0));
        assert_eq!(MODE_TRIE.decode(&mut r).unwrap(), Mode::Horizontal);
        assert_eq!(MODE_TRIE.decode(&mut r).unwrap(), Mode::Pass);
        assert_eq!(MODE_TRIE.decode(&mut r).unwrap(), Mode::Vertical(2));
    }

    #[test]
    fn endless_makeup_runs_are_rejected() {
        // white 2560 repeated: 000000011111
        let data: Vec<u8> = std::iter::repeat([0x01, 0xF0, 0x1F])
            .take(400)
            .flatten()
            .collect();
        let mut r = BitReader::new(&data);
        assert!(decode_run_length(&mut r, Color::White).is_err());
    }
}
