//! BRR Block Decoder
//!
//! Turns one 9-byte block into 16 PCM samples:
//!
//! 1. sign-extend each 4-bit unit
//! 2. apply the header shift (`(unit << shift) >> 1` for shifts 0-12)
//! 3. add the prediction term of the block's filter
//! 4. clamp to 16 bits and push into the filter history
//! 5. emit the clamped value doubled
//!
//! The doubled output can exceed the i16 range, so it is returned as `i32`;
//! the stream clamps again after envelope gain.

use crate::constants::{clamp16, BLOCK_SIZE, MAX_NORMAL_SHIFT, SAMPLES_PER_BLOCK};
use crate::{BrrError, Result};

use super::block::Block;
use super::filter::{Filter, FilterState};

/// Samples emitted by one block
pub type BlockSamples = [i32; SAMPLES_PER_BLOCK];

/// Apply the header shift to a sign-extended unit.
///
/// Shifts 13-15 saturate: the unit is masked with `!0x7FF`, giving -2048 for
/// negative units and 0 otherwise.
#[inline]
pub fn decode_unit(unit: i8, shift: u8) -> i32 {
    let unit = unit as i32;
    if shift <= MAX_NORMAL_SHIFT {
        (unit << shift) >> 1
    } else {
        unit & !0x7FF
    }
}

/// Decode a single sample and update the filter history.
///
/// Returns the clamped 16-bit sample (before the output doubling).
#[inline]
pub fn decode_sample(unit: i8, shift: u8, filter: Filter, state: &mut FilterState) -> i16 {
    let sample = clamp16(decode_unit(unit, shift) + filter.predict(state));
    state.push(sample);
    sample
}

/// Decode a parsed block, mutating `state` once per sample.
pub fn decode_block(block: &Block, state: &mut FilterState) -> BlockSamples {
    let shift = block.header.shift();
    let filter = block.header.filter();
    let mut out = [0i32; SAMPLES_PER_BLOCK];
    for (slot, unit) in out.iter_mut().zip(block.units()) {
        *slot = decode_sample(unit, shift, filter, state) as i32 * 2;
    }
    out
}

/// Decode a raw 9-byte block.
///
/// Fails with [`BrrError::InvalidBlockLength`] when `bytes` is not exactly
/// 9 bytes long; `state` is left untouched in that case.
pub fn decode_block_bytes(bytes: &[u8], state: &mut FilterState) -> Result<BlockSamples> {
    if bytes.len() != BLOCK_SIZE {
        return Err(BrrError::InvalidBlockLength(bytes.len()));
    }
    let block = Block::from_bytes(bytes)?;
    Ok(decode_block(&block, state))
}
