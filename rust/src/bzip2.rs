//! bzip2 framing constants and the bit level marker matcher shared by
//! the locator and the extractor.

use std::fmt;
use std::ops::Range;

const BLOCK_HEADER: u64 = 0x0000_3141_5926_5359;
const BLOCK_ENDMARK: u64 = 0x0000_1772_4538_5090;

const COMPRESSED_MAGIC_LENGTH: u64 = 6 * 8;
const WINDOW_MASK: u64 = (1 << COMPRESSED_MAGIC_LENGTH) - 1;

/// `BZh` followed by the block size level digit.
pub const STREAM_SIGNATURE: [u8; 3] = *b"BZh";
pub const BLOCK_SIZE_LEVEL: u8 = 9;

/// Bits between the end of a matched marker and the bit that completed it.
pub(crate) const MARKER_TRAIL: u64 = COMPRESSED_MAGIC_LENGTH + 1;
/// Offset from a block start at which the window holds the block CRC in
/// its upper 32 bits.
pub(crate) const BLOCK_CRC_OFFSET: u64 = COMPRESSED_MAGIC_LENGTH - 1;
/// Shortest span between two markers accepted as a real block.
pub(crate) const MIN_BLOCK_BITS: u64 = 130;
/// Shortest unterminated tail accepted as a block at end of input.
pub(crate) const MIN_TRAILING_BITS: u64 = 40;

/// Fixed-size header and footer bytes framing an extracted block.
pub(crate) const FRAMING_BYTES: u64 = 22;
/// Slack for the partial bytes at both ends of an unaligned block.
pub(crate) const PADDING_BYTES: u64 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    /// π, starts every compressed block
    BlockHeader,
    /// √π, closes the stream and precedes the combined CRC
    EndOfStream,
}

impl Marker {
    pub fn value(self) -> u64 {
        match self {
            Self::BlockHeader => BLOCK_HEADER,
            Self::EndOfStream => BLOCK_ENDMARK,
        }
    }

    pub fn bytes(self) -> [u8; 6] {
        let be = self.value().to_be_bytes();
        [be[2], be[3], be[4], be[5], be[6], be[7]]
    }
}

/// 48-bit shift register over the most recently read bits.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkerWindow(u64);

impl MarkerWindow {
    pub fn push(&mut self, bit: u8) {
        self.0 = (self.0 << 1 | u64::from(bit & 1)) & WINDOW_MASK;
    }

    pub fn marker(&self) -> Option<Marker> {
        match self.0 {
            BLOCK_HEADER => Some(Marker::BlockHeader),
            BLOCK_ENDMARK => Some(Marker::EndOfStream),
            _ => None,
        }
    }

    /// The oldest 32 bits held in the window.
    pub fn leading_u32(&self) -> u32 {
        (self.0 >> (COMPRESSED_MAGIC_LENGTH - 32)) as u32
    }
}

/// Inclusive range of absolute bit offsets holding one compressed block,
/// excluding its leading marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockSpan {
    pub start_bit: u64,
    pub end_bit: u64,
}

impl BlockSpan {
    pub fn new(start_bit: u64, end_bit: u64) -> Self {
        Self { start_bit, end_bit }
    }

    pub fn len_bits(&self) -> u64 {
        self.end_bit.saturating_sub(self.start_bit) + 1
    }

    /// Size of the largest framed stream this block can produce, which
    /// is the smallest buffer `load_block` accepts for it.
    pub fn required_capacity(&self) -> usize {
        let body = self.end_bit.saturating_sub(self.start_bit) / 8;
        (body + PADDING_BYTES + FRAMING_BYTES + 1) as usize
    }

    /// Source bytes touched when reading this block.
    pub fn byte_range(&self) -> Range<u64> {
        (self.start_bit >> 3)..bits_to_bytes(self.end_bit + 1)
    }
}

impl fmt::Display for BlockSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bits {}..={}", self.start_bit, self.end_bit)
    }
}

/// Stream header written in front of every extracted block.
pub fn stream_header() -> [u8; 4] {
    let [b, z, h] = STREAM_SIGNATURE;
    [b, z, h, b'0' + BLOCK_SIZE_LEVEL]
}

fn bits_to_bytes(number: u64) -> u64 {
    let rounded_up = (number + 7) & !7;

    rounded_up >> 3
}
