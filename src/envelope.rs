//! S-DSP ADSR Envelope Generator
//!
//! Produces a per-sample gain from an 11-bit envelope level (0-2047) that
//! walks through four phases:
//!
//! - **Attack**: linear rise, +1024 per tick at attack rate 15, +32 otherwise
//! - **Decay**: exponential fall until the level's top 3 bits reach the
//!   sustain level
//! - **Sustain**: hold, or keep falling exponentially when a sustain rate is set
//! - **Release**: linear fall of 8 per tick down to silence
//!
//! The generator is ticked once per output sample, independent of block
//! boundaries. The gain returned by a tick reflects the level after that
//! tick's update.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::ENVELOPE_MAX;
use crate::{BrrError, Result};

/// Level step per attack tick at the fastest attack rate
const FAST_ATTACK_STEP: i32 = 1024;
/// Level step per attack tick at every other rate
const ATTACK_STEP: i32 = 32;
/// Level step per release tick
const RELEASE_STEP: i32 = 8;

/// ADSR register parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdsrParams {
    /// Attack rate (0-15); 15 selects the 2-tick attack
    pub attack_rate: u8,
    /// Decay rate (0-7)
    pub decay_rate: u8,
    /// Sustain level (0-7), compared against `level >> 8`
    pub sustain_level: u8,
    /// Sustain rate (0-31); 0 holds the level during sustain
    pub sustain_rate: u8,
}

impl AdsrParams {
    /// Create a parameter set (not validated)
    pub fn new(attack_rate: u8, decay_rate: u8, sustain_level: u8, sustain_rate: u8) -> Self {
        AdsrParams {
            attack_rate,
            decay_rate,
            sustain_level,
            sustain_rate,
        }
    }

    /// Check every field against its register width
    pub fn validate(&self) -> Result<()> {
        let check = |name: &str, value: u8, max: u8| {
            if value > max {
                Err(BrrError::ConfigError(format!(
                    "{name} must be in 0..={max}, got {value}"
                )))
            } else {
                Ok(())
            }
        };
        check("attack_rate", self.attack_rate, 15)?;
        check("decay_rate", self.decay_rate, 7)?;
        check("sustain_level", self.sustain_level, 7)?;
        check("sustain_rate", self.sustain_rate, 31)?;
        Ok(())
    }
}

impl Default for AdsrParams {
    fn default() -> Self {
        AdsrParams::new(15, 7, 7, 0)
    }
}

impl std::str::FromStr for AdsrParams {
    type Err = BrrError;

    /// Parse `attack,decay,sustain_level,sustain_rate`
    fn from_str(s: &str) -> Result<Self> {
        let values = s
            .split(',')
            .map(|part| part.trim().parse::<u8>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| BrrError::ConfigError(format!("invalid ADSR value in '{s}': {e}")))?;
        let &[attack, decay, level, rate] = values.as_slice() else {
            return Err(BrrError::ConfigError(format!(
                "ADSR must have 4 values (attack,decay,sustain_level,sustain_rate), got {}",
                values.len()
            )));
        };
        let params = AdsrParams::new(attack, decay, level, rate);
        params.validate()?;
        Ok(params)
    }
}

/// Envelope phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Rising toward full level
    Attack,
    /// Falling toward the sustain level
    Decay,
    /// Holding (or slowly falling)
    Sustain,
    /// Falling to silence after key-off
    Release,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Attack => write!(f, "Attack"),
            Phase::Decay => write!(f, "Decay"),
            Phase::Sustain => write!(f, "Sustain"),
            Phase::Release => write!(f, "Release"),
        }
    }
}

/// ADSR envelope state for one voice
#[derive(Debug, Clone)]
pub struct EnvelopeGenerator {
    params: AdsrParams,
    phase: Phase,
    level: i32,
    enabled: bool,
}

impl EnvelopeGenerator {
    /// Create an enabled envelope, keyed on (Attack, level 0)
    pub fn new(params: AdsrParams) -> Self {
        EnvelopeGenerator {
            params,
            phase: Phase::Attack,
            level: 0,
            enabled: true,
        }
    }

    /// Create a disabled envelope: every tick yields unity gain
    pub fn disabled() -> Self {
        EnvelopeGenerator {
            enabled: false,
            ..Self::new(AdsrParams::default())
        }
    }

    /// Restart the envelope from silence in the attack phase
    pub fn key_on(&mut self) {
        self.level = 0;
        self.phase = Phase::Attack;
    }

    /// Force the release phase, whatever the current phase is
    pub fn key_off(&mut self) {
        self.phase = Phase::Release;
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current level (0-2047)
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Whether the envelope shapes its output
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Parameters the envelope was built with
    pub fn params(&self) -> &AdsrParams {
        &self.params
    }

    /// Released all the way down to silence
    pub fn is_finished(&self) -> bool {
        self.enabled && self.phase == Phase::Release && self.level == 0
    }

    /// Advance one output sample and return the gain (0.0-1.0).
    pub fn tick(&mut self) -> f64 {
        if !self.enabled {
            return 1.0;
        }
        match self.phase {
            Phase::Attack => self.tick_attack(),
            Phase::Decay => self.tick_decay(),
            Phase::Sustain => self.tick_sustain(),
            Phase::Release => self.tick_release(),
        }
        self.gain()
    }

    /// Gain for the current level without advancing
    pub fn gain(&self) -> f64 {
        if self.enabled {
            self.level as f64 / ENVELOPE_MAX as f64
        } else {
            1.0
        }
    }

    /// Advance one tick and scale `sample` by the resulting gain.
    ///
    /// The product is truncated toward zero and clamped to 16 bits.
    #[inline]
    pub fn apply(&mut self, sample: i32) -> i16 {
        let gain = self.tick();
        let scaled = (sample as f64 * gain) as i32;
        crate::constants::clamp16(scaled)
    }

    fn tick_attack(&mut self) {
        self.level += if self.params.attack_rate == 15 {
            FAST_ATTACK_STEP
        } else {
            ATTACK_STEP
        };
        if self.level >= ENVELOPE_MAX {
            self.level = ENVELOPE_MAX;
            self.phase = Phase::Decay;
        }
    }

    fn tick_decay(&mut self) {
        self.exponential_step();
        if (self.level >> 8) <= self.params.sustain_level as i32 {
            self.phase = Phase::Sustain;
        }
    }

    fn tick_sustain(&mut self) {
        if self.params.sustain_rate > 0 {
            self.exponential_step();
        }
    }

    fn tick_release(&mut self) {
        self.level = (self.level - RELEASE_STEP).max(0);
    }

    fn exponential_step(&mut self) {
        let step = ((self.level - 1) >> 8).max(1);
        self.level = (self.level - step).max(0);
    }
}

impl Default for EnvelopeGenerator {
    fn default() -> Self {
        Self::new(AdsrParams::default())
    }
}
