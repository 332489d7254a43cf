//! WAV file export functionality

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{write_loop_metadata, ExportConfig, LoopInfo};
use crate::config::DecoderConfig;
use crate::postprocess::render;
use crate::stream::{decode, Termination};
use crate::{BrrError, Result};

/// What an export produced
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    /// Frames written to the WAV (after resampling)
    pub frames_written: usize,
    /// Frames decoded before resampling
    pub frames_decoded: usize,
    /// Why decoding stopped
    pub termination: Termination,
    /// Number of stream diagnostics raised
    pub diagnostics: usize,
    /// Path of the loop metadata file, when one was written
    pub loop_metadata: Option<PathBuf>,
}

/// Decode `data` and write it as a 32 kHz mono WAV file
///
/// # Examples
///
/// ```no_run
/// use snes_brr::{export::export_to_wav, DecoderConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let data = std::fs::read("snare.brr")?;
/// export_to_wav(&data, &DecoderConfig::default(), "snare.wav")?;
/// # Ok(())
/// # }
/// ```
pub fn export_to_wav<P: AsRef<Path>>(
    data: &[u8],
    config: &DecoderConfig,
    output_path: P,
) -> Result<ExportSummary> {
    export_to_wav_with_config(data, config, output_path, &ExportConfig::default())
}

/// Decode `data` and write it with custom export options
pub fn export_to_wav_with_config<P: AsRef<Path>>(
    data: &[u8],
    config: &DecoderConfig,
    output_path: P,
    export: &ExportConfig,
) -> Result<ExportSummary> {
    let output_path = output_path.as_ref();
    let decoded = decode(data, config)?;
    debug!(
        frames = decoded.samples.len(),
        termination = %decoded.termination,
        "decoded BRR stream"
    );

    let rendered = render(&decoded.samples, config);
    let final_samples = if export.channels == 2 {
        mono_to_stereo(&rendered)
    } else {
        rendered
    };
    write_wav_file(output_path, &final_samples, export.sample_rate, export.channels)?;

    let loop_metadata = if export.loop_metadata && config.loop_enabled {
        let info = LoopInfo {
            loop_start: config.loop_start,
            loop_enabled: config.loop_enabled,
            total_samples: decoded.samples.len(),
        };
        Some(write_loop_metadata(output_path, &info)?)
    } else {
        None
    };

    let frames_written = final_samples.len() / export.channels.max(1) as usize;
    info!(path = %output_path.display(), frames = frames_written, "wrote WAV file");
    Ok(ExportSummary {
        frames_written,
        frames_decoded: decoded.samples.len(),
        termination: decoded.termination,
        diagnostics: decoded.diagnostics.len(),
        loop_metadata,
    })
}

/// Write 16-bit mono samples at 32 kHz
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[i16]) -> Result<()> {
    let config = ExportConfig::default();
    write_wav_file(path.as_ref(), samples, config.sample_rate, config.channels)
}

/// Convert mono samples to stereo (duplicate each sample)
fn mono_to_stereo(mono: &[i16]) -> Vec<i16> {
    mono.iter().flat_map(|&sample| [sample, sample]).collect()
}

/// Write interleaved samples to a WAV file
fn write_wav_file(path: &Path, samples: &[i16], sample_rate: u32, channels: u16) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| BrrError::AudioFileError(format!("failed to create WAV file: {e}")))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| BrrError::AudioFileError(format!("failed to write sample: {e}")))?;
    }
    writer
        .finalize()
        .map_err(|e| BrrError::AudioFileError(format!("failed to finalize WAV file: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_to_stereo() {
        assert_eq!(mono_to_stereo(&[1, -2, 3]), vec![1, 1, -2, -2, 3, 3]);
    }

    #[test]
    fn test_write_wav_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ramp.wav");
        let samples: Vec<i16> = (-50..50).map(|i| i * 300).collect();
        write_wav(&path, &samples).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 32_000);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);
        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read, samples);
    }

    #[test]
    fn test_export_writes_loop_metadata_only_when_looping() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = vec![0x12u8];
        data.extend_from_slice(&[0x12, 0x34, 0x56, 0x70, 0xFE, 0xDC, 0xBA, 0x98]);
        data.push(0x13);
        data.extend_from_slice(&[0x12, 0x34, 0x56, 0x70, 0xFE, 0xDC, 0xBA, 0x98]);

        let export = ExportConfig::default().loop_metadata(true);
        let looping = DecoderConfig::raw().looping(9, 64);
        let path = dir.path().join("loop.wav");
        let summary = export_to_wav_with_config(&data, &looping, &path, &export).unwrap();
        assert_eq!(summary.frames_written, 64);
        assert_eq!(summary.termination, Termination::FrameLimit);
        let meta = summary.loop_metadata.unwrap();
        assert_eq!(
            std::fs::read_to_string(meta).unwrap(),
            "Loop Start: 9\nLoop Enabled: True\nTotal Samples: 64\n"
        );

        let path = dir.path().join("oneshot.wav");
        let summary = export_to_wav_with_config(&data, &DecoderConfig::raw(), &path, &export).unwrap();
        assert_eq!(summary.frames_written, 32);
        assert!(summary.loop_metadata.is_none());
        assert!(!dir.path().join("oneshot_loop.txt").exists());
    }

    #[test]
    fn test_export_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = DecoderConfig::raw().pitch(0);
        let result = export_to_wav(&[0u8; 9], &config, dir.path().join("bad.wav"));
        assert!(matches!(result, Err(BrrError::ConfigError(_))));
    }
}
