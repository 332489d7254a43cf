//! BRR Block Reader
//!
//! A BRR stream is a sequence of 9-byte blocks. The first byte of each block
//! is a header:
//!
//! ```text
//!  7  6  5  4   3  2   1     0
//! [  shift   ] [filt] [loop] [end]
//! ```
//!
//! followed by 8 data bytes holding 16 signed 4-bit units, high half first.

use bitflags::bitflags;

use crate::constants::{BLOCK_DATA_SIZE, BLOCK_SIZE, MAX_NORMAL_SHIFT};
use crate::{BrrError, Result};

use super::filter::Filter;

bitflags! {
    /// Control flags in the low two bits of a block header
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BlockFlags: u8 {
        /// Last block of the sample
        const END = 0x01;
        /// Sample loops back to its loop point after the end block
        const LOOP = 0x02;
    }
}

/// Decoded view of a block header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockHeader(u8);

impl BlockHeader {
    /// Wrap a raw header byte
    pub const fn from_byte(raw: u8) -> Self {
        BlockHeader(raw)
    }

    /// Raw header byte
    pub const fn raw(&self) -> u8 {
        self.0
    }

    /// Shift amount (0-15)
    pub const fn shift(&self) -> u8 {
        self.0 >> 4
    }

    /// Filter selector bits (0-3)
    pub const fn filter_bits(&self) -> u8 {
        (self.0 >> 2) & 0x03
    }

    /// Prediction filter for this block
    pub fn filter(&self) -> Filter {
        Filter::from_bits(self.filter_bits())
    }

    /// Loop/end flags
    pub fn flags(&self) -> BlockFlags {
        BlockFlags::from_bits_truncate(self.0)
    }

    /// Whether the loop flag is set
    pub fn is_loop(&self) -> bool {
        self.flags().contains(BlockFlags::LOOP)
    }

    /// Whether the end flag is set
    pub fn is_end(&self) -> bool {
        self.flags().contains(BlockFlags::END)
    }

    /// Whether the shift is in the normally decoded range (0-12)
    pub const fn has_normal_shift(&self) -> bool {
        self.shift() <= MAX_NORMAL_SHIFT
    }
}

/// One 9-byte BRR block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Block {
    /// Header byte
    pub header: BlockHeader,
    /// Packed 4-bit units
    pub data: [u8; BLOCK_DATA_SIZE],
}

impl Block {
    /// Parse a block from exactly 9 bytes.
    ///
    /// Returns [`BrrError::InvalidBlockLength`] for any other slice length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != BLOCK_SIZE {
            return Err(BrrError::InvalidBlockLength(bytes.len()));
        }
        let mut data = [0u8; BLOCK_DATA_SIZE];
        data.copy_from_slice(&bytes[1..]);
        Ok(Block {
            header: BlockHeader::from_byte(bytes[0]),
            data,
        })
    }

    /// The 16 sign-extended units in decode order (high half of each byte first)
    pub fn units(&self) -> impl Iterator<Item = i8> + '_ {
        self.data
            .iter()
            .flat_map(|&byte| [sign_extend_unit(byte >> 4), sign_extend_unit(byte & 0x0F)])
    }
}

/// Sign-extend a 4-bit value (8-15 map to -8..-1).
#[inline]
pub fn sign_extend_unit(nibble: u8) -> i8 {
    ((nibble << 4) as i8) >> 4
}

/// Segments a byte buffer into 9-byte blocks
#[derive(Debug, Clone, Copy)]
pub struct BlockReader<'a> {
    data: &'a [u8],
}

impl<'a> BlockReader<'a> {
    /// Create a reader over a borrowed buffer
    pub fn new(data: &'a [u8]) -> Self {
        BlockReader { data }
    }

    /// Underlying buffer length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of complete blocks when read from offset 0
    pub fn block_count(&self) -> usize {
        self.data.len() / BLOCK_SIZE
    }

    /// Bytes left in the buffer from `offset`
    pub fn remaining(&self, offset: usize) -> usize {
        self.data.len().saturating_sub(offset)
    }

    /// Header at `offset`, if the byte exists
    pub fn header_at(&self, offset: usize) -> Option<BlockHeader> {
        self.data.get(offset).copied().map(BlockHeader::from_byte)
    }

    /// Full block at `offset`, or `None` when fewer than 9 bytes remain
    pub fn block_at(&self, offset: usize) -> Option<Block> {
        let end = offset.checked_add(BLOCK_SIZE)?;
        self.data
            .get(offset..end)
            .and_then(|bytes| Block::from_bytes(bytes).ok())
    }

    /// Iterate over consecutive blocks starting at offset 0.
    ///
    /// Trailing bytes that do not form a full block are ignored.
    pub fn blocks(&self) -> impl Iterator<Item = Block> + 'a {
        self.data
            .chunks_exact(BLOCK_SIZE)
            .filter_map(|chunk| Block::from_bytes(chunk).ok())
    }
}
