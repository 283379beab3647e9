//! MSB-first bit cursor over a byte buffer.
//!
//! Reads past the end of the buffer yield zero bits. Decoders detect
//! truncation structurally (a missing terminating code) or via
//! [`BitReader::is_exhausted`].

/// Opaque saved cursor, see [`BitReader::save_position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitPosition {
    byte: usize,
    bit: u8,
}

#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    byte: usize,
    /// Next bit within `data[byte]`, 0 = most significant.
    bit: u8,
}

impl<'a> BitReader<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte: 0,
            bit: 0,
        }
    }

    #[inline]
    pub fn read_bit(&mut self) -> u32 {
        let value = match self.data.get(self.byte) {
            Some(b) => u32::from((b >> (7 - self.bit)) & 1),
            None => 0,
        };
        self.bit += 1;
        if self.bit == 8 {
            self.bit = 0;
            self.byte += 1;
        }
        value
    }

    /// Read `n` bits (1..=31) big-endian.
    #[inline]
    pub fn read_bits(&mut self, n: u32) -> u32 {
        debug_assert!((1..=31).contains(&n));
        let mut value = 0;
        for _ in 0..n {
            value = (value << 1) | self.read_bit();
        }
        value
    }

    /// Read `n` bits without moving the cursor.
    pub fn peek_bits(&self, n: u32) -> u32 {
        self.clone().read_bits(n)
    }

    /// Skip to the next byte boundary; no-op when already aligned.
    pub fn align_to_byte(&mut self) {
        if self.bit != 0 {
            self.bit = 0;
            self.byte += 1;
        }
    }

    pub const fn is_aligned(&self) -> bool {
        self.bit == 0
    }

    pub const fn save_position(&self) -> BitPosition {
        BitPosition {
            byte: self.byte,
            bit: self.bit,
        }
    }

    pub const fn restore_position(&mut self, pos: BitPosition) {
        self.byte = pos.byte;
        self.bit = pos.bit;
    }

    /// True once every bit of the buffer has been consumed.
    pub const fn is_exhausted(&self) -> bool {
        self.byte >= self.data.len()
    }

    /// Total bits consumed so far, including phantom bits past the end.
    pub const fn bit_offset(&self) -> usize {
        self.byte * 8 + self.bit as usize
    }
}
