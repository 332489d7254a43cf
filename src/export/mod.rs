//! Audio export
//!
//! Writes decoded BRR streams to 16-bit PCM WAV files, plus the optional
//! `<name>_loop.txt` companion file carrying loop information.
//!
//! # Example
//!
//! ```no_run
//! use snes_brr::{export::export_to_wav, DecoderConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("piano.brr")?;
//! let config = DecoderConfig::default().pitch(0x0800);
//! let summary = export_to_wav(&data, &config, "piano.wav")?;
//! println!("{} frames written", summary.frames_written);
//! # Ok(())
//! # }
//! ```

mod wav;

pub use wav::*;

use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::SAMPLE_RATE;
use crate::Result;

/// Export configuration options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Sample rate written to the WAV header (default: 32000 Hz)
    pub sample_rate: u32,
    /// Number of audio channels (1 = mono, 2 = duplicated stereo)
    pub channels: u16,
    /// Write `<name>_loop.txt` next to the WAV when looping is enabled
    pub loop_metadata: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            channels: 1,
            loop_metadata: false,
        }
    }
}

impl ExportConfig {
    /// Config for stereo export
    pub fn stereo() -> Self {
        Self {
            channels: 2,
            ..Default::default()
        }
    }

    /// Enable or disable the loop metadata file
    pub fn loop_metadata(mut self, enable: bool) -> Self {
        self.loop_metadata = enable;
        self
    }
}

/// Loop information written beside an exported WAV
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopInfo {
    /// Loop start as configured (byte offset into the BRR data)
    pub loop_start: usize,
    /// Whether the stream was decoded with looping
    pub loop_enabled: bool,
    /// Decoded sample count before pitch resampling
    pub total_samples: usize,
}

impl LoopInfo {
    /// Text body of the metadata file
    pub fn to_text(&self) -> String {
        format!(
            "Loop Start: {}\nLoop Enabled: {}\nTotal Samples: {}\n",
            self.loop_start,
            if self.loop_enabled { "True" } else { "False" },
            self.total_samples
        )
    }
}

/// Path of the loop metadata file for `wav_path` (`song.wav` -> `song_loop.txt`)
pub fn loop_metadata_path(wav_path: &Path) -> PathBuf {
    let stem = wav_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    wav_path.with_file_name(format!("{stem}_loop.txt"))
}

/// Write the loop metadata file for `wav_path`, returning its path
pub fn write_loop_metadata(wav_path: &Path, info: &LoopInfo) -> Result<PathBuf> {
    let path = loop_metadata_path(wav_path);
    fs::write(&path, info.to_text())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_metadata_path() {
        assert_eq!(
            loop_metadata_path(Path::new("out/piano.wav")),
            PathBuf::from("out/piano_loop.txt")
        );
    }

    #[test]
    fn test_loop_info_text() {
        let info = LoopInfo {
            loop_start: 18,
            loop_enabled: true,
            total_samples: 64,
        };
        assert_eq!(
            info.to_text(),
            "Loop Start: 18\nLoop Enabled: True\nTotal Samples: 64\n"
        );
    }

    #[test]
    fn test_write_loop_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("bass.wav");
        let info = LoopInfo {
            loop_start: 0,
            loop_enabled: false,
            total_samples: 16,
        };
        let path = write_loop_metadata(&wav, &info).unwrap();
        assert_eq!(path, dir.path().join("bass_loop.txt"));
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("Loop Enabled: False"));
    }

    #[test]
    fn test_export_config_defaults() {
        let config = ExportConfig::default();
        assert_eq!(config.sample_rate, 32_000);
        assert_eq!(config.channels, 1);
        assert!(!config.loop_metadata);
        assert_eq!(ExportConfig::stereo().loop_metadata(true).channels, 2);
    }
}
