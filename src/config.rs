//! Decoder Configuration
//!
//! [`DecoderConfig`] gathers every knob the decode pipeline accepts. It can
//! be built in code with the builder methods, or loaded from JSON; missing
//! fields take their defaults. Call [`DecoderConfig::validate`] (the decode
//! entry points do) before use.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_AMP, MAX_PITCH, UNITY_PITCH};
use crate::envelope::{AdsrParams, EnvelopeGenerator};
use crate::{BrrError, Result};

/// Decode and post-processing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Playback pitch, 2.12 fixed point (0x1000 = native rate)
    pub pitch: u16,
    /// Output amplitude relative to [`DEFAULT_AMP`]
    pub amp: u32,
    /// Envelope parameters
    pub adsr: AdsrParams,
    /// Apply the ADSR envelope (disabled means unity gain)
    pub envelope_enabled: bool,
    /// Byte offset the stream jumps to after a looping end block
    pub loop_start: usize,
    /// Follow loop points instead of stopping at the end block
    pub loop_enabled: bool,
    /// Length of the closing fade-out ramp in output frames (0 = none)
    pub fade_frames: usize,
    /// Upper bound on decoded frames; required when looping
    pub max_frames: Option<usize>,
    /// Frame at which the envelope is keyed off
    pub key_off_at: Option<usize>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            pitch: UNITY_PITCH,
            amp: DEFAULT_AMP,
            adsr: AdsrParams::default(),
            envelope_enabled: true,
            loop_start: 0,
            loop_enabled: false,
            fade_frames: 0,
            max_frames: None,
            key_off_at: None,
        }
    }
}

impl DecoderConfig {
    /// Config that decodes raw block output: no envelope, unity pitch and gain
    pub fn raw() -> Self {
        Self {
            envelope_enabled: false,
            ..Default::default()
        }
    }

    /// Load a config from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Parse a config from a JSON string
    pub fn from_json(text: &str) -> Result<Self> {
        let config: DecoderConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the playback pitch
    pub fn pitch(mut self, pitch: u16) -> Self {
        self.pitch = pitch;
        self
    }

    /// Set the output amplitude
    pub fn amp(mut self, amp: u32) -> Self {
        self.amp = amp;
        self
    }

    /// Set envelope parameters (and enable the envelope)
    pub fn adsr(mut self, adsr: AdsrParams) -> Self {
        self.adsr = adsr;
        self.envelope_enabled = true;
        self
    }

    /// Enable or disable the envelope
    pub fn envelope(mut self, enable: bool) -> Self {
        self.envelope_enabled = enable;
        self
    }

    /// Loop back to `loop_start` (byte offset), bounded by `max_frames`
    pub fn looping(mut self, loop_start: usize, max_frames: usize) -> Self {
        self.loop_enabled = true;
        self.loop_start = loop_start;
        self.max_frames = Some(max_frames);
        self
    }

    /// Cap the number of decoded frames
    pub fn max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Fade out over the last `frames` output frames
    pub fn fade(mut self, frames: usize) -> Self {
        self.fade_frames = frames;
        self
    }

    /// Key the envelope off at output frame `frame`
    pub fn key_off_at(mut self, frame: usize) -> Self {
        self.key_off_at = Some(frame);
        self
    }

    /// Check all fields; returns [`BrrError::ConfigError`] on the first problem
    pub fn validate(&self) -> Result<()> {
        if self.pitch == 0 || self.pitch > MAX_PITCH {
            return Err(BrrError::ConfigError(format!(
                "pitch must be in 0x0001..=0x{MAX_PITCH:04X}, got 0x{:04X}",
                self.pitch
            )));
        }
        if self.amp == 0 {
            return Err(BrrError::ConfigError("amp must be greater than 0".into()));
        }
        self.adsr.validate()?;
        if self.loop_enabled && self.max_frames.is_none() {
            return Err(BrrError::ConfigError(
                "looping streams need max_frames to bound their length".into(),
            ));
        }
        Ok(())
    }

    /// Envelope generator for a fresh stream
    pub fn envelope_generator(&self) -> EnvelopeGenerator {
        if self.envelope_enabled {
            EnvelopeGenerator::new(self.adsr)
        } else {
            EnvelopeGenerator::disabled()
        }
    }
}

/// Parse a pitch given as hex (`0x1000`) or decimal (`4096`)
pub fn parse_pitch(text: &str) -> Result<u16> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => text.parse::<u16>(),
    };
    parsed.map_err(|e| BrrError::ConfigError(format!("invalid pitch value '{text}': {e}")))
}
