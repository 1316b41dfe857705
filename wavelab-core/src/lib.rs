// wavelab-core/src/lib.rs

//! The core logic for the WaveLab sound-wave classroom.
//! This crate is responsible for audio capture and playback, amplitude and
//! pitch estimation, and the tone-match and amplitude-parcours games. It is
//! completely headless and contains no GUI code.

pub mod amplitude;
pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod parcours;
pub mod pitch;
pub mod session;
pub mod signal;
pub mod synth;
pub mod tone_match;
pub mod tuning;

pub use analysis::AnalysisResult;
pub use config::WaveConfig;
pub use error::{Result, WaveError};
pub use session::{Command, GameView, Session, SessionEvent, Snapshot, SourceState, Tone};
pub use signal::LiveSignal;
