//! Directory conversion

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use snes_brr::export::export_to_wav_with_config;
use snes_brr::{DecoderConfig, ExportConfig};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::args::DecoderOptions;

pub fn run(
    input_dir: &Path,
    output_dir: &Path,
    extension: &str,
    recursive: bool,
    options: &DecoderOptions,
) -> anyhow::Result<()> {
    let config = options
        .decoder_config()
        .context("invalid decoder settings")?;
    let export = options.export_config().loop_metadata(true);
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let files = collect_files(input_dir, extension, recursive);
    info!(count = files.len(), dir = %input_dir.display(), "found BRR files");

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .context("invalid progress template")?
            .progress_chars("#>-"),
    );

    let converted: usize = files
        .par_iter()
        .map(|path| {
            let result = convert_one(path, input_dir, output_dir, &config, &export);
            pb.inc(1);
            match result {
                Ok(()) => 1,
                Err(e) => {
                    warn!(file = %path.display(), "conversion failed: {e:#}");
                    0
                }
            }
        })
        .sum();

    pb.finish_and_clear();
    println!(
        "Converted {converted} of {} files into {}",
        files.len(),
        output_dir.display()
    );
    Ok(())
}

/// Files under `dir` whose extension matches, sorted by path
fn collect_files(dir: &Path, extension: &str, recursive: bool) -> Vec<PathBuf> {
    let extension = extension.trim_start_matches('.').to_lowercase();
    let mut walker = WalkDir::new(dir).follow_links(true);
    if !recursive {
        walker = walker.max_depth(1);
    }
    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| ext.to_lowercase() == extension)
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Output path mirroring `path`'s position under `input_dir`
fn output_path(path: &Path, input_dir: &Path, output_dir: &Path) -> PathBuf {
    let relative = match path.strip_prefix(input_dir) {
        Ok(relative) => relative,
        Err(_) => Path::new(path.file_name().unwrap_or_default()),
    };
    output_dir.join(relative).with_extension("wav")
}

fn convert_one(
    path: &Path,
    input_dir: &Path,
    output_dir: &Path,
    config: &DecoderConfig,
    export: &ExportConfig,
) -> anyhow::Result<()> {
    let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let target = output_path(path, input_dir, output_dir);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    export_to_wav_with_config(&data, config, &target, export)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_block_sample() -> Vec<u8> {
        vec![0x11, 0x12, 0x34, 0x56, 0x70, 0xFE, 0xDC, 0xBA, 0x98]
    }

    #[test]
    fn test_collect_files_filters_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.brr"), one_block_sample()).unwrap();
        fs::write(dir.path().join("b.BRR"), one_block_sample()).unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/c.brr"), one_block_sample()).unwrap();

        assert_eq!(collect_files(dir.path(), "brr", false).len(), 2);
        assert_eq!(collect_files(dir.path(), ".brr", true).len(), 3);
    }

    #[test]
    fn test_output_path_mirrors_layout() {
        let out = output_path(
            Path::new("in/sub/kick.brr"),
            Path::new("in"),
            Path::new("out"),
        );
        assert_eq!(out, PathBuf::from("out/sub/kick.wav"));
    }

    #[test]
    fn test_batch_converts_directory() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("ok.brr"), one_block_sample()).unwrap();
        fs::write(input.path().join("empty.brr"), b"").unwrap();

        run(
            input.path(),
            output.path(),
            "brr",
            false,
            &DecoderOptions::default(),
        )
        .unwrap();
        assert!(output.path().join("ok.wav").exists());
        // empty input still yields an (empty) WAV
        assert!(output.path().join("empty.wav").exists());
    }
}
