//! # Configuration Module
//!
//! Every tunable constant of the analysis pipeline and the two games lives
//! here, with the classroom defaults. The structures derive `serde` so the
//! GUI can load partial overrides from JSON; missing fields fall back to the
//! defaults below.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WaveError};

/// Top-level configuration for a WaveLab session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    pub analysis: AnalysisConfig,
    pub tone_match: ToneMatchConfig,
    pub parcours: ParcoursConfig,
    pub synth: SynthConfig,
    /// Default log filter, overridden by `RUST_LOG`
    pub log_level: String,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            tone_match: ToneMatchConfig::default(),
            parcours: ParcoursConfig::default(),
            synth: SynthConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl WaveConfig {
    /// Validates every section, returning the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()?;
        self.tone_match.validate()?;
        self.parcours.validate()?;
        self.synth.validate()
    }
}

/// Parameters for the amplitude and pitch estimators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Samples per analysis window
    pub buffer_size: usize,
    /// RMS at or below this value is silence
    pub noise_gate: f32,
    /// Multiplier from RMS to the normalized amplitude
    pub sensitivity: f32,
    /// Pitch search only runs when the amplitude exceeds this value
    pub pitch_amplitude_gate: f32,
    /// First lag tested, inclusive
    pub min_lag: usize,
    /// Last lag tested, exclusive
    pub max_lag: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            buffer_size: 2048,
            noise_gate: 0.01,
            sensitivity: 5.0,
            pitch_amplitude_gate: 0.05,
            min_lag: 80,
            max_lag: 1000,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(WaveError::InvalidConfig(
                "analysis.buffer_size must be > 0".to_string(),
            ));
        }
        if self.min_lag == 0 || self.min_lag >= self.max_lag {
            return Err(WaveError::InvalidConfig(format!(
                "analysis lag range must satisfy 0 < min_lag < max_lag, got [{}, {})",
                self.min_lag, self.max_lag
            )));
        }
        if !(self.noise_gate >= 0.0) || !(self.sensitivity > 0.0) {
            return Err(WaveError::InvalidConfig(
                "analysis.noise_gate must be >= 0 and analysis.sensitivity > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Target ranges and tolerances of the tone-match game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneMatchConfig {
    /// Target frequency range in Hz (exclusive bounds)
    pub frequency_range: (f32, f32),
    /// Target amplitude range (exclusive bounds)
    pub amplitude_range: (f32, f32),
    /// Relative frequency tolerance, 0.07 = 7% of the target
    pub frequency_tolerance: f32,
    /// Absolute amplitude tolerance
    pub amplitude_tolerance: f32,
    /// The live amplitude must exceed this for a match
    pub min_amplitude: f32,
    /// How long the match must be held continuously
    pub hold_ms: u64,
}

impl Default for ToneMatchConfig {
    fn default() -> Self {
        Self {
            frequency_range: (150.0, 600.0),
            amplitude_range: (0.3, 0.7),
            frequency_tolerance: 0.07,
            amplitude_tolerance: 0.20,
            min_amplitude: 0.1,
            hold_ms: 500,
        }
    }
}

impl ToneMatchConfig {
    pub fn validate(&self) -> Result<()> {
        let (f_lo, f_hi) = self.frequency_range;
        let (a_lo, a_hi) = self.amplitude_range;
        if !(f_lo > 0.0 && f_lo < f_hi) {
            return Err(WaveError::InvalidConfig(format!(
                "tone_match.frequency_range must be increasing and positive, got ({f_lo}, {f_hi})"
            )));
        }
        if !(a_lo >= 0.0 && a_lo < a_hi && a_hi <= 1.0) {
            return Err(WaveError::InvalidConfig(format!(
                "tone_match.amplitude_range must lie within [0, 1], got ({a_lo}, {a_hi})"
            )));
        }
        Ok(())
    }
}

/// Playfield geometry and pacing of the amplitude parcours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParcoursConfig {
    pub playfield_width: f32,
    pub playfield_height: f32,
    /// Obstacle scroll speed in units per tick
    pub speed: f32,
    /// A new obstacle spawns every this many ticks
    pub spawn_interval: u32,
    pub obstacle_width: f32,
    pub gap_height: f32,
    /// Minimum distance between a gap and the playfield edges
    pub gap_margin: f32,
    pub player_x: f32,
    pub player_radius: f32,
    /// Fraction of the remaining distance covered per tick
    pub smoothing: f32,
    /// Amplitude-to-height gain, 1.5 makes the full height reachable at 0.67
    pub amplitude_gain: f32,
}

impl Default for ParcoursConfig {
    fn default() -> Self {
        Self {
            playfield_width: 800.0,
            playfield_height: 400.0,
            speed: 2.5,
            spawn_interval: 120,
            obstacle_width: 40.0,
            gap_height: 120.0,
            gap_margin: 20.0,
            player_x: 60.0,
            player_radius: 12.0,
            smoothing: 0.1,
            amplitude_gain: 1.5,
        }
    }
}

impl ParcoursConfig {
    pub fn validate(&self) -> Result<()> {
        if self.spawn_interval == 0 || !(self.speed > 0.0) {
            return Err(WaveError::InvalidConfig(
                "parcours.spawn_interval and parcours.speed must be > 0".to_string(),
            ));
        }
        if self.playfield_height < self.gap_height + 2.0 * self.gap_margin {
            return Err(WaveError::InvalidConfig(format!(
                "parcours.playfield_height {} cannot fit a gap of {} with margins of {}",
                self.playfield_height, self.gap_height, self.gap_margin
            )));
        }
        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(WaveError::InvalidConfig(format!(
                "parcours.smoothing must be in (0, 1], got {}",
                self.smoothing
            )));
        }
        Ok(())
    }
}

/// Initial synth settings and envelope times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub frequency: f32,
    pub amplitude: f32,
    /// Gain fade-in when a tone starts
    pub attack_ms: f32,
    /// Gain fade-out when a tone stops
    pub release_ms: f32,
    /// Gain of a keyboard note
    pub key_amplitude: f32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            frequency: 440.0,
            amplitude: 0.5,
            attack_ms: 10.0,
            release_ms: 100.0,
            key_amplitude: 0.5,
        }
    }
}

impl SynthConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.frequency > 0.0) || !(0.0..=1.0).contains(&self.amplitude) {
            return Err(WaveError::InvalidConfig(format!(
                "synth defaults out of range: {} Hz at {}",
                self.frequency, self.amplitude
            )));
        }
        if self.attack_ms < 0.0 || self.release_ms < 0.0 {
            return Err(WaveError::InvalidConfig(
                "synth envelope times must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(WaveConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_lag_range_is_rejected() {
        let mut config = WaveConfig::default();
        config.analysis.min_lag = 1000;
        config.analysis.max_lag = 80;
        assert!(matches!(
            config.validate(),
            Err(WaveError::InvalidConfig(_))
        ));
    }

    #[test]
    fn playfield_too_small_for_gap_is_rejected() {
        let mut config = WaveConfig::default();
        config.parcours.playfield_height = 100.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{ "parcours": { "speed": 4.0 }, "log_level": "debug" }"#;
        let config: WaveConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.parcours.speed, 4.0);
        assert_eq!(config.parcours.spawn_interval, 120);
        assert_eq!(config.analysis, AnalysisConfig::default());
        assert_eq!(config.log_level, "debug");
    }
}
