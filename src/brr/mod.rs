//! BRR Block Decoding
//!
//! Block parsing, the predictive filter and the per-block decoder.

pub mod block;
pub mod decoder;
pub mod filter;

pub use block::{Block, BlockFlags, BlockHeader, BlockReader};
pub use decoder::{decode_block, decode_block_bytes, decode_sample, decode_unit, BlockSamples};
pub use filter::{Filter, FilterState};
