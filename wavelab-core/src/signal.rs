//! Live signal state: the (frequency, amplitude) pair every game reads.

use serde::{Deserialize, Serialize};

/// The current frequency and loudness, published once per tick.
///
/// `frequency` is 0 when no confident pitch was found; `amplitude` is always
/// inside [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveSignal {
    /// Frequency in Hz
    pub frequency: f32,
    /// Normalized loudness
    pub amplitude: f32,
}

impl LiveSignal {
    /// Builds a signal, clamping both fields into their valid ranges.
    pub fn new(frequency: f32, amplitude: f32) -> Self {
        let frequency = if frequency.is_finite() { frequency.max(0.0) } else { 0.0 };
        let amplitude = if amplitude.is_finite() { amplitude.clamp(0.0, 1.0) } else { 0.0 };
        Self { frequency, amplitude }
    }

    /// The neutral value shown while nothing is playing or listening.
    pub const IDLE: LiveSignal = LiveSignal {
        frequency: 0.0,
        amplitude: 0.0,
    };

    pub fn is_idle(&self) -> bool {
        *self == Self::IDLE
    }
}

/// Single-writer holder of the live signal.
///
/// Both fields are replaced together, so readers never see a frequency from
/// one tick paired with an amplitude from another.
#[derive(Debug, Default)]
pub struct SignalState {
    current: LiveSignal,
}

impl SignalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, signal: LiveSignal) {
        self.current = signal;
    }

    pub fn current(&self) -> LiveSignal {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = LiveSignal::IDLE;
    }
}
