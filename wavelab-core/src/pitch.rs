//! # Pitch Detection Module
//!
//! Time-domain pitch estimation for a single voice or tone. The estimator
//! searches a fixed lag window for the strongest raw autocorrelation and
//! converts the winning lag into a frequency.
//!
//! ## Features
//! - RMS and amplitude gating so silent windows skip the lag search
//! - Raw (energy-unnormalized) correlation ranking, lowest lag wins ties
//! - Lag window [80, 1000) samples, about 44-550 Hz at 44.1 kHz

use crate::amplitude;
use crate::config::AnalysisConfig;

/// Result of one pitch search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PitchOutcome {
    /// A positive correlation peak was found at `lag` samples.
    Detected { frequency: f32, lag: usize },
    /// The window was too quiet to search.
    InsufficientSignal,
    /// No lag in the window correlated positively.
    NoDominantLag,
}

impl PitchOutcome {
    /// Frequency in Hz, 0 when nothing was detected.
    pub fn frequency(&self) -> f32 {
        match self {
            PitchOutcome::Detected { frequency, .. } => *frequency,
            PitchOutcome::InsufficientSignal | PitchOutcome::NoDominantLag => 0.0,
        }
    }
}

/// Estimates the dominant frequency of a window by autocorrelation.
///
/// 1. The window RMS must reach the noise gate.
/// 2. The normalized amplitude must exceed `pitch_amplitude_gate`.
/// 3. For each lag in `[min_lag, max_lag)` the raw correlation
///    `sum(s[i] * s[i + lag])` is computed.
/// 4. The first lag with the highest positive correlation wins.
///
/// # Arguments
/// * `signal` - Input audio samples
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Gates and lag window
pub fn detect_pitch_autocorrelation(
    signal: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> PitchOutcome {
    // --- Noise Gate: skip the lag search for silence ---
    let rms = amplitude::rms(signal);
    if !(rms >= config.noise_gate) {
        return PitchOutcome::InsufficientSignal;
    }
    if amplitude::amplitude_from_rms(rms, config) <= config.pitch_amplitude_gate {
        return PitchOutcome::InsufficientSignal;
    }

    // --- Lag search over the part of the window that overlaps itself ---
    let max_lag = config.max_lag.min(signal.len());
    let mut best_lag = 0;
    let mut best_correlation = 0.0f64;

    for lag in config.min_lag..max_lag {
        // Accumulate in f64: neighbouring lags differ by ~1e-4 relative.
        let correlation: f64 = signal
            .iter()
            .zip(&signal[lag..])
            .map(|(&a, &b)| f64::from(a) * f64::from(b))
            .sum();
        if correlation > best_correlation {
            best_correlation = correlation;
            best_lag = lag;
        }
    }

    if best_lag == 0 {
        return PitchOutcome::NoDominantLag;
    }

    PitchOutcome::Detected {
        frequency: sample_rate as f32 / best_lag as f32,
        lag: best_lag,
    }
}

/// Convenience wrapper returning only the frequency (0 = no pitch).
pub fn estimate_pitch(signal: &[f32], sample_rate: u32, config: &AnalysisConfig) -> f32 {
    detect_pitch_autocorrelation(signal, sample_rate, config).frequency()
}
