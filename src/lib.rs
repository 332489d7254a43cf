//! SNES S-DSP BRR Sample Decoder
//!
//! Decodes BRR (Bit Rate Reduction) compressed samples, the 9-byte-block
//! ADPCM format used by the SNES audio subsystem, into 16-bit PCM at
//! 32 kHz, reproducing the S-DSP's arithmetic including its quirks.
//!
//! # Features
//! - Bit-exact block decoding with all four prediction filters
//! - ADSR envelope generator with key-on/key-off
//! - Loop point handling with a bounded output length
//! - Pitch resampling, gain and fade-out post-processing
//! - Heuristic scanner for BRR samples inside ROM images
//! - WAV export with loop metadata
//!
//! # Crate feature flags
//! - `scanner` (default): ROM sample scanner (`scanner`)
//! - `export-wav` (default): WAV export via `hound` (`export`)
//!
//! # Quick start
//! ```no_run
//! use snes_brr::{decode, DecoderConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("strings.brr")?;
//! let config = DecoderConfig::default().looping(0, 32_000);
//! let output = decode(&data, &config)?;
//! println!("{} samples ({})", output.samples.len(), output.termination);
//! # Ok(())
//! # }
//! ```
//!
//! ## Scanning a ROM
//! ```no_run
//! # #[cfg(feature = "scanner")]
//! # fn main() -> std::io::Result<()> {
//! use snes_brr::RomSampleScanner;
//! let rom = std::fs::read("game.sfc")?;
//! let report = RomSampleScanner::new().scan_rom(&rom);
//! for record in &report.records {
//!     println!("0x{:06X}: {} blocks", record.offset, record.block_count);
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "scanner"))]
//! # fn main() {}
//! ```

#![warn(missing_docs)]

pub mod brr; // Block Parsing & Decoding
pub mod config; // Decoder Configuration
pub mod constants; // Format Constants
pub mod envelope; // ADSR Envelope
#[cfg(feature = "export-wav")]
pub mod export; // WAV Export
pub mod postprocess; // Resampling, Gain, Fade
#[cfg(feature = "scanner")]
pub mod scanner; // ROM Sample Scanner
pub mod stream; // Stream Decoding & Loops

/// Error types for BRR decoding operations
#[derive(thiserror::Error, Debug)]
pub enum BrrError {
    /// A block slice was not exactly 9 bytes
    #[error("Invalid block length: expected 9 bytes, got {0}")]
    InvalidBlockLength(usize),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Error writing audio file
    #[error("Audio file write error: {0}")]
    AudioFileError(String),

    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for BrrError {
    /// Converts a String into `BrrError::Other`.
    ///
    /// Prefer the specific variants (`ConfigError`, `AudioFileError`) where
    /// the failure has a known kind.
    fn from(msg: String) -> Self {
        BrrError::Other(msg)
    }
}

impl From<&str> for BrrError {
    /// Converts a string slice into `BrrError::Other`.
    fn from(msg: &str) -> Self {
        BrrError::Other(msg.to_string())
    }
}

/// Result type for BRR operations
pub type Result<T> = std::result::Result<T, BrrError>;

// Public API exports
pub use brr::{decode_block, Block, BlockHeader, Filter, FilterState};
pub use config::{parse_pitch, DecoderConfig};
pub use envelope::{AdsrParams, EnvelopeGenerator, Phase};
pub use postprocess::render;
pub use stream::{decode, decode_raw, DecodeOutput, Diagnostic, StreamDecoder, Termination};

#[cfg(feature = "export-wav")]
pub use export::{export_to_wav, write_loop_metadata, write_wav, ExportConfig, LoopInfo};
#[cfg(feature = "scanner")]
pub use scanner::{default_rom_regions, RomSampleScanner, SampleRecord, ScanRegion, ScanReport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            BrrError::InvalidBlockLength(4).to_string(),
            "Invalid block length: expected 9 bytes, got 4"
        );
        assert_eq!(BrrError::from("boom").to_string(), "boom");
        assert!(matches!(
            BrrError::from(String::from("x")),
            BrrError::Other(_)
        ));
    }
}
