//! One analysis pass: buffer → amplitude → gated pitch → live signal.

use tracing::trace;

use crate::amplitude;
use crate::audio::SampleBuffer;
use crate::config::AnalysisConfig;
use crate::pitch::{self, PitchOutcome};
use crate::signal::LiveSignal;

/// Represents the result of a single audio analysis frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisResult {
    /// The signal to publish for this tick.
    pub signal: LiveSignal,
    /// Which branch the pitch search took.
    pub pitch: PitchOutcome,
}

/// Performs the full analysis of one window.
///
/// The amplitude is always computed; the lag search only runs when the
/// amplitude clears the pitch gate, and a window that fails it reports a
/// frequency of 0.
pub fn analyse(buffer: &SampleBuffer, config: &AnalysisConfig) -> AnalysisResult {
    let samples = buffer.samples();
    let amplitude = amplitude::estimate_amplitude(samples, config);

    let pitch = if amplitude > config.pitch_amplitude_gate {
        pitch::detect_pitch_autocorrelation(samples, buffer.sample_rate(), config)
    } else {
        PitchOutcome::InsufficientSignal
    };

    trace!(amplitude, ?pitch, "analysed window");

    AnalysisResult {
        signal: LiveSignal::new(pitch.frequency(), amplitude),
        pitch,
    }
}
