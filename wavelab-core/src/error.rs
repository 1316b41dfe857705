//! Error types for the WaveLab core.
//!
//! Only device and configuration problems are errors. A silent buffer or a
//! buffer without a dominant lag is a normal analysis outcome and is reported
//! through [`crate::pitch::PitchOutcome`] instead.

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, WaveError>;

/// Error type for audio devices and configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WaveError {
    /// Microphone permission denied or no input hardware present
    #[error("Input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// No usable output device for synth playback
    #[error("Output device unavailable: {0}")]
    OutputUnavailable(String),

    /// The audio backend failed after the stream was opened
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// A configuration value is out of its allowed range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
