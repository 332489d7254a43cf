//! S-DSP Hardware Constants
//!
//! Shared constants used by the block decoder, envelope generator and
//! post-processing stages.

/// Size of one BRR block in bytes (1 header byte + 8 data bytes)
pub const BLOCK_SIZE: usize = 9;

/// Number of data bytes following the header of a block
pub const BLOCK_DATA_SIZE: usize = BLOCK_SIZE - 1;

/// Number of PCM samples produced by one block (two 4-bit units per data byte)
pub const SAMPLES_PER_BLOCK: usize = 16;

/// Output sample rate of the S-DSP in Hz
pub const SAMPLE_RATE: u32 = 32_000;

/// Largest shift value the hardware decodes normally.
///
/// Shifts 13-15 are still valid input but saturate (see
/// [`crate::brr::decoder::decode_unit`]).
pub const MAX_NORMAL_SHIFT: u8 = 12;

/// Pitch value that plays a sample back at its native rate (2.12 fixed point)
pub const UNITY_PITCH: u16 = 0x1000;

/// Largest pitch value representable in the 14-bit pitch register
pub const MAX_PITCH: u16 = 0x3FFF;

/// Number of fractional bits in the pitch register
pub const PITCH_FRACTION_BITS: u32 = 12;

/// Reference amplitude: gain values are expressed relative to this
pub const DEFAULT_AMP: u32 = 0x180;

/// Maximum envelope level (11 bits)
pub const ENVELOPE_MAX: i32 = 0x7FF;

/// Clamp a value to the signed 16-bit range.
#[inline]
pub fn clamp16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}
