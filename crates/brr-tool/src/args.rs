//! Command line definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use snes_brr::{parse_pitch, AdsrParams, DecoderConfig, ScanRegion};

/// Frames decoded for `--loop` when no `--max-frames` is given (10 seconds)
pub const DEFAULT_LOOP_FRAMES: usize = 320_000;

#[derive(Parser)]
#[command(name = "brr", version, about = "SNES BRR sample decoder and ROM scanner")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode one BRR file to WAV.
    Decode {
        /// Input BRR file.
        input: PathBuf,
        /// Output WAV file.
        output: PathBuf,
        #[command(flatten)]
        options: DecoderOptions,
    },
    /// Convert every BRR file in a directory to WAV, in parallel.
    Batch {
        /// Directory holding BRR files.
        input_dir: PathBuf,
        /// Directory the WAV files are written to.
        output_dir: PathBuf,
        /// File extension to pick up (case-insensitive).
        #[arg(long, default_value = "brr")]
        extension: String,
        /// Descend into subdirectories.
        #[arg(short, long)]
        recursive: bool,
        #[command(flatten)]
        options: DecoderOptions,
    },
    /// Search a ROM image for BRR samples.
    Scan(ScanArgs),
}

/// Decoder settings shared by `decode` and `batch`
#[derive(Args, Debug, Clone, Default)]
pub struct DecoderOptions {
    /// JSON config file; the flags below override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Playback pitch, hex (0x1000) or decimal.
    #[arg(long, value_parser = parse_pitch)]
    pub pitch: Option<u16>,
    /// ADSR as attack,decay,sustain_level,sustain_rate.
    #[arg(long)]
    pub adsr: Option<AdsrParams>,
    /// Disable the envelope.
    #[arg(long)]
    pub no_envelope: bool,
    /// Output amplitude (0x180 = unity).
    #[arg(long)]
    pub amp: Option<u32>,
    /// Fade-out length in output frames.
    #[arg(long)]
    pub fade: Option<usize>,
    /// Loop start as a byte offset into the BRR data.
    #[arg(long)]
    pub loop_start: Option<usize>,
    /// Follow loop points.
    #[arg(long = "loop")]
    pub looping: bool,
    /// Maximum number of decoded frames.
    #[arg(long)]
    pub max_frames: Option<usize>,
    /// Key the envelope off at this frame.
    #[arg(long)]
    pub key_off_at: Option<usize>,
    /// Write <name>_loop.txt beside looping WAV files.
    #[arg(long)]
    pub loop_metadata: bool,
    /// Write duplicated stereo instead of mono.
    #[arg(long)]
    pub stereo: bool,
}

impl DecoderOptions {
    /// Build the decoder config: file (or defaults), then flag overrides.
    pub fn decoder_config(&self) -> snes_brr::Result<DecoderConfig> {
        let mut config = match &self.config {
            Some(path) => DecoderConfig::from_json_file(path)?,
            None => DecoderConfig::default(),
        };
        if let Some(pitch) = self.pitch {
            config.pitch = pitch;
        }
        if let Some(adsr) = self.adsr {
            config.adsr = adsr;
        }
        if self.no_envelope {
            config.envelope_enabled = false;
        }
        if let Some(amp) = self.amp {
            config.amp = amp;
        }
        if let Some(fade) = self.fade {
            config.fade_frames = fade;
        }
        if let Some(loop_start) = self.loop_start {
            config.loop_start = loop_start;
        }
        if self.looping {
            config.loop_enabled = true;
        }
        if let Some(max_frames) = self.max_frames {
            config.max_frames = Some(max_frames);
        }
        if config.loop_enabled && config.max_frames.is_none() {
            config.max_frames = Some(DEFAULT_LOOP_FRAMES);
        }
        if let Some(frame) = self.key_off_at {
            config.key_off_at = Some(frame);
        }
        config.validate()?;
        Ok(config)
    }

    /// WAV export settings
    pub fn export_config(&self) -> snes_brr::ExportConfig {
        let base = if self.stereo {
            snes_brr::ExportConfig::stereo()
        } else {
            snes_brr::ExportConfig::default()
        };
        base.loop_metadata(self.loop_metadata)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// ROM image or binary blob to scan.
    pub rom: PathBuf,
    /// Region to scan as START:END (repeatable); defaults to the standard SNES windows.
    #[arg(long = "region")]
    pub regions: Vec<ScanRegion>,
    /// Write the full report as JSON.
    #[arg(long)]
    pub json: Option<PathBuf>,
    /// Pretty-print the JSON report.
    #[arg(long)]
    pub pretty: bool,
    /// Write one CSV row per sample.
    #[arg(long)]
    pub csv: Option<PathBuf>,
    /// Extract each sample's bytes into this directory.
    #[arg(long)]
    pub extract_dir: Option<PathBuf>,
    /// Also render extracted samples to WAV.
    #[arg(long, requires = "extract_dir")]
    pub wav: bool,
    /// Chain length cap in blocks.
    #[arg(long, default_value_t = snes_brr::scanner::DEFAULT_MAX_BLOCKS)]
    pub max_blocks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "brr", "decode", "in.brr", "out.wav", "--pitch", "0x2000", "--adsr", "10,5,4,2",
            "--loop", "--loop-start", "18",
        ])
        .unwrap();
        let Commands::Decode { options, .. } = cli.command else {
            panic!("expected decode");
        };
        let config = options.decoder_config().unwrap();
        assert_eq!(config.pitch, 0x2000);
        assert_eq!(config.adsr, AdsrParams::new(10, 5, 4, 2));
        assert!(config.loop_enabled);
        assert_eq!(config.loop_start, 18);
        assert_eq!(config.max_frames, Some(DEFAULT_LOOP_FRAMES));
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice.json");
        std::fs::write(&path, r#"{ "pitch": 2048, "fade_frames": 64 }"#).unwrap();
        let options = DecoderOptions {
            config: Some(path),
            fade: Some(10),
            no_envelope: true,
            ..Default::default()
        };
        let config = options.decoder_config().unwrap();
        assert_eq!(config.pitch, 0x0800);
        assert_eq!(config.fade_frames, 10);
        assert!(!config.envelope_enabled);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Cli::try_parse_from(["brr", "decode", "a", "b", "--pitch", "0xZZ"]).is_err());
        assert!(Cli::try_parse_from(["brr", "decode", "a", "b", "--adsr", "1,2"]).is_err());
        let options = DecoderOptions {
            pitch: Some(0x4000),
            ..Default::default()
        };
        assert!(options.decoder_config().is_err());
    }

    #[test]
    fn test_scan_regions_parse() {
        let cli = Cli::try_parse_from([
            "brr", "scan", "game.sfc", "--region", "0x8000:0x10000", "--region", "0:512",
        ])
        .unwrap();
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(
            args.regions,
            vec![ScanRegion::new(0x8000, 0x10000), ScanRegion::new(0, 512)]
        );
        assert_eq!(args.max_blocks, 500);
    }
}
