//! # Amplitude Estimation Module
//!
//! Turns an analysis window into a normalized loudness value in [0, 1]:
//! root-mean-square energy, a noise gate, and a fixed sensitivity gain.

use crate::config::AnalysisConfig;

/// Root-mean-square of the samples. An empty slice has an RMS of 0.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|&s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Normalized amplitude of a window.
///
/// Returns 0 when the RMS is at or below the noise gate, otherwise
/// `min(rms * sensitivity, 1.0)`. The result is always inside [0, 1], even
/// for samples outside [-1, 1] or non-finite input.
pub fn estimate_amplitude(samples: &[f32], config: &AnalysisConfig) -> f32 {
    amplitude_from_rms(rms(samples), config)
}

/// Applies the noise gate and sensitivity to an already computed RMS.
pub fn amplitude_from_rms(rms: f32, config: &AnalysisConfig) -> f32 {
    // NaN fails this comparison too and is treated as silence.
    if !(rms > config.noise_gate) {
        return 0.0;
    }
    (rms * config.sensitivity).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sine(amplitude: f32, frequency: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn silence_is_zero() {
        let config = AnalysisConfig::default();
        assert_eq!(estimate_amplitude(&[0.0; 2048], &config), 0.0);
        assert_eq!(estimate_amplitude(&[], &config), 0.0);
    }

    #[test]
    fn quiet_input_is_gated() {
        let config = AnalysisConfig::default();
        assert_eq!(estimate_amplitude(&[0.009; 512], &config), 0.0);
        assert_eq!(amplitude_from_rms(0.01, &config), 0.0);
        assert!(amplitude_from_rms(0.011, &config) > 0.0);
    }

    #[test]
    fn sine_uses_scaled_rms() {
        let config = AnalysisConfig::default();
        let samples = sine(0.1, 441.0, 44100.0, 2000);
        let expected = (rms(&samples) * 5.0).min(1.0);
        let amplitude = estimate_amplitude(&samples, &config);
        assert!((amplitude - expected).abs() < 1e-6);
        // 0.1 / sqrt(2) * 5 ≈ 0.354
        assert!((amplitude - 0.3536).abs() < 0.01, "got {amplitude}");
    }

    #[test]
    fn loud_input_saturates_at_one() {
        let config = AnalysisConfig::default();
        let samples = sine(0.9, 300.0, 44100.0, 2048);
        assert_eq!(estimate_amplitude(&samples, &config), 1.0);
    }

    #[test]
    fn nan_input_is_silence() {
        let config = AnalysisConfig::default();
        assert_eq!(estimate_amplitude(&[f32::NAN; 16], &config), 0.0);
    }

    proptest! {
        #[test]
        fn amplitude_is_always_clamped(samples in prop::collection::vec(-50.0f32..50.0, 0..1024)) {
            let amplitude = estimate_amplitude(&samples, &AnalysisConfig::default());
            prop_assert!((0.0..=1.0).contains(&amplitude));
        }
    }
}
