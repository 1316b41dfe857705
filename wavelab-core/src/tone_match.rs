//! # Tone-Match Game
//!
//! The player is given a random target tone and has to sing or play it: the
//! live frequency and amplitude must stay within tolerance of the target for
//! a continuous hold period. Breaking the match at any tick restarts the hold.

use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ToneMatchConfig;
use crate::signal::LiveSignal;

/// The tone the player has to match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    /// Target frequency in Hz
    pub target_frequency: f32,
    /// Target normalized amplitude
    pub target_amplitude: f32,
}

/// Game state. The hold timer only exists inside `MatchTiming`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToneMatchState {
    NoChallenge,
    ChallengePending(Challenge),
    MatchTiming { challenge: Challenge, since: Instant },
    Won(Challenge),
}

/// Notable transitions reported by [`ToneMatchGame::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToneMatchEvent {
    MatchStarted,
    MatchBroken,
    Won(Challenge),
}

#[derive(Debug, Clone)]
pub struct ToneMatchGame {
    config: ToneMatchConfig,
    state: ToneMatchState,
}

impl ToneMatchGame {
    pub fn new(config: ToneMatchConfig) -> Self {
        Self {
            config,
            state: ToneMatchState::NoChallenge,
        }
    }

    pub fn state(&self) -> ToneMatchState {
        self.state
    }

    /// The active challenge, if any.
    pub fn challenge(&self) -> Option<Challenge> {
        match self.state {
            ToneMatchState::NoChallenge => None,
            ToneMatchState::ChallengePending(c)
            | ToneMatchState::MatchTiming { challenge: c, .. }
            | ToneMatchState::Won(c) => Some(c),
        }
    }

    pub fn is_won(&self) -> bool {
        matches!(self.state, ToneMatchState::Won(_))
    }

    /// Fraction of the hold period completed at `now`, 0 when not timing.
    pub fn hold_progress(&self, now: Instant) -> f32 {
        match self.state {
            ToneMatchState::MatchTiming { since, .. } => {
                let held = now.saturating_duration_since(since).as_secs_f32();
                (held / self.hold().as_secs_f32().max(f32::EPSILON)).min(1.0)
            }
            ToneMatchState::Won(_) => 1.0,
            _ => 0.0,
        }
    }

    /// Draws a fresh target and drops any pending hold, from any state.
    pub fn new_challenge<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Challenge {
        let (f_lo, f_hi) = self.config.frequency_range;
        let (a_lo, a_hi) = self.config.amplitude_range;
        let challenge = Challenge {
            target_frequency: sample_open(rng, f_lo, f_hi),
            target_amplitude: sample_open(rng, a_lo, a_hi),
        };
        info!(
            "New tone-match challenge: {:.0} Hz at {:.0}%",
            challenge.target_frequency,
            challenge.target_amplitude * 100.0
        );
        self.state = ToneMatchState::ChallengePending(challenge);
        challenge
    }

    /// Whether `signal` is close enough to `challenge` this tick.
    pub fn is_match(&self, challenge: &Challenge, signal: &LiveSignal) -> bool {
        let frequency_match = (signal.frequency - challenge.target_frequency).abs()
            < challenge.target_frequency * self.config.frequency_tolerance;
        let amplitude_match = (signal.amplitude - challenge.target_amplitude).abs()
            < self.config.amplitude_tolerance;
        frequency_match && amplitude_match && signal.amplitude > self.config.min_amplitude
    }

    /// Advances the game by one tick with the current live signal.
    pub fn tick(&mut self, signal: &LiveSignal, now: Instant) -> Option<ToneMatchEvent> {
        match self.state {
            ToneMatchState::NoChallenge | ToneMatchState::Won(_) => None,
            ToneMatchState::ChallengePending(challenge) => {
                if self.is_match(&challenge, signal) {
                    debug!("Match started, holding for {:?}", self.hold());
                    self.state = ToneMatchState::MatchTiming {
                        challenge,
                        since: now,
                    };
                    Some(ToneMatchEvent::MatchStarted)
                } else {
                    None
                }
            }
            ToneMatchState::MatchTiming { challenge, since } => {
                if !self.is_match(&challenge, signal) {
                    debug!("Match broken after {:?}", now.saturating_duration_since(since));
                    self.state = ToneMatchState::ChallengePending(challenge);
                    Some(ToneMatchEvent::MatchBroken)
                } else if now.saturating_duration_since(since) >= self.hold() {
                    info!("Tone matched: {:.0} Hz", challenge.target_frequency);
                    self.state = ToneMatchState::Won(challenge);
                    Some(ToneMatchEvent::Won(challenge))
                } else {
                    None
                }
            }
        }
    }

    fn hold(&self) -> Duration {
        Duration::from_millis(self.config.hold_ms)
    }
}

/// Uniform sample strictly inside `(lo, hi)`.
fn sample_open<R: Rng + ?Sized>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    loop {
        let value = rng.random_range(lo..hi);
        if value > lo {
            return value;
        }
    }
}
