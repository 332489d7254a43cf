//! Single-file conversion

use std::fs;
use std::path::Path;

use anyhow::Context;
use snes_brr::export::export_to_wav_with_config;
use tracing::warn;

use crate::args::DecoderOptions;

pub fn run(input: &Path, output: &Path, options: &DecoderOptions) -> anyhow::Result<()> {
    let config = options
        .decoder_config()
        .context("invalid decoder settings")?;
    let data = fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;

    let summary = export_to_wav_with_config(&data, &config, output, &options.export_config())
        .with_context(|| format!("failed to convert {}", input.display()))?;

    if summary.diagnostics > 0 {
        warn!(
            input = %input.display(),
            diagnostics = summary.diagnostics,
            "stream had problems; output may be truncated"
        );
    }
    println!(
        "{} -> {}: {} frames ({})",
        input.display(),
        output.display(),
        summary.frames_written,
        summary.termination
    );
    if let Some(path) = summary.loop_metadata {
        println!("Loop metadata: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looping_block() -> Vec<u8> {
        vec![0x13, 0x12, 0x34, 0x56, 0x70, 0xFE, 0xDC, 0xBA, 0x98]
    }

    #[test]
    fn test_decode_writes_wav_and_loop_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pad.brr");
        let output = dir.path().join("pad.wav");
        fs::write(&input, looping_block()).unwrap();

        let options = DecoderOptions {
            looping: true,
            max_frames: Some(64),
            no_envelope: true,
            loop_metadata: true,
            ..DecoderOptions::default()
        };
        run(&input, &output, &options).unwrap();

        // 16-bit mono data follows the header
        assert!(fs::metadata(&output).unwrap().len() >= 64 * 2);
        let loop_file = fs::read_to_string(dir.path().join("pad_loop.txt")).unwrap();
        assert_eq!(
            loop_file,
            "Loop Start: 0\nLoop Enabled: True\nTotal Samples: 64\n"
        );
    }

    #[test]
    fn test_decode_without_loop_metadata_flag() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("hit.brr");
        let output = dir.path().join("hit.wav");
        fs::write(&input, looping_block()).unwrap();

        run(&input, &output, &DecoderOptions::default()).unwrap();
        assert!(output.exists());
        assert!(!dir.path().join("hit_loop.txt").exists());
    }

    #[test]
    fn test_decode_reports_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(
            &dir.path().join("missing.brr"),
            &dir.path().join("out.wav"),
            &DecoderOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
