//! # Session
//!
//! The context object the presentation layer owns and ticks. It holds the
//! signal source (synth, microphone or nothing), the live signal, the open
//! game and the keyboard state. Presentation never mutates any of it directly:
//! it sends [`Command`]s, which are applied at the start of the next tick.
//!
//! ## Tick order
//! 1. Drain and apply queued commands
//! 2. Refresh the live signal from the active source
//! 3. Advance the open game with that signal
//! 4. Return a [`Snapshot`]

use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis;
use crate::audio::InputDevice;
use crate::config::WaveConfig;
use crate::parcours::{ParcoursEvent, ParcoursGame, ParcoursView};
use crate::signal::{LiveSignal, SignalState};
use crate::synth::SynthOutput;
use crate::tone_match::{Challenge, ToneMatchEvent, ToneMatchGame};
use crate::tuning::Keyboard;

/// A tone produced by the synth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub frequency: f32,
    pub amplitude: f32,
}

/// Where the live signal comes from. Synth and microphone are never active
/// at the same time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceState {
    Idle,
    Playing(Tone),
    /// `sample_rate` is `None` until the first window arrives.
    Listening { sample_rate: Option<u32> },
}

impl SourceState {
    pub fn is_playing(&self) -> bool {
        matches!(self, SourceState::Playing(_))
    }

    pub fn is_listening(&self) -> bool {
        matches!(self, SourceState::Listening { .. })
    }
}

/// Requests from the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StartSynth,
    StopSynth,
    ToggleSynth,
    SetFrequency(f32),
    SetAmplitude(f32),
    StartListening,
    StopListening,
    ToggleListening,
    OpenToneMatch,
    NewChallenge,
    OpenParcours,
    StartParcours,
    RestartParcours,
    ResizePlayfield(f32, f32),
    OpenKeyboard,
    /// Press a keyboard key by pitch class, e.g. "C#".
    PressKey(&'static str),
    ReleaseKey,
    OctaveUp,
    OctaveDown,
    CloseGame,
    Shutdown,
}

/// Something the presentation layer may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The microphone could not be opened or stopped delivering audio.
    DeviceUnavailable(String),
    /// The synth could not open an output device.
    OutputUnavailable(String),
    ToneMatch(ToneMatchEvent),
    Parcours(ParcoursEvent),
}

enum ActiveGame {
    None,
    ToneMatch(ToneMatchGame),
    Parcours(ParcoursGame),
    Keyboard,
}

/// What the open view should show.
#[derive(Debug, Clone, PartialEq)]
pub enum GameView {
    None,
    ToneMatch {
        challenge: Option<Challenge>,
        won: bool,
        /// Fraction of the hold period completed
        hold_progress: f32,
    },
    Parcours(ParcoursView),
    Keyboard {
        octave: i32,
        can_shift_down: bool,
        can_shift_up: bool,
        keys: Vec<(&'static str, f32)>,
    },
}

/// Immutable view of the session after one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub signal: LiveSignal,
    pub source: SourceState,
    /// Frequency and amplitude the explorer sliders are set to.
    pub tone: Tone,
    pub game: GameView,
    pub events: Vec<SessionEvent>,
    /// False once a `Shutdown` command was applied.
    pub running: bool,
}

pub struct Session {
    config: WaveConfig,
    input: Box<dyn InputDevice>,
    synth: Box<dyn SynthOutput>,
    source: SourceState,
    signal: SignalState,
    game: ActiveGame,
    keyboard: Keyboard,
    tone: Tone,
    rng: StdRng,
    command_tx: Sender<Command>,
    command_rx: Receiver<Command>,
    events: Vec<SessionEvent>,
    running: bool,
}

impl Session {
    pub fn new(
        config: WaveConfig,
        input: Box<dyn InputDevice>,
        synth: Box<dyn SynthOutput>,
    ) -> Self {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let tone = Tone {
            frequency: config.synth.frequency,
            amplitude: config.synth.amplitude,
        };
        Self {
            config,
            input,
            synth,
            source: SourceState::Idle,
            signal: SignalState::new(),
            game: ActiveGame::None,
            keyboard: Keyboard::new(),
            tone,
            rng: StdRng::from_os_rng(),
            command_tx,
            command_rx,
            events: Vec::new(),
            running: true,
        }
    }

    /// A session on the default microphone and speakers.
    #[cfg(feature = "audio")]
    pub fn with_default_devices(config: WaveConfig) -> Self {
        let input = crate::audio::CpalInput::new(config.analysis.buffer_size);
        let synth = crate::synth::CpalSynth::new(config.synth.clone());
        Self::new(config, Box::new(input), Box::new(synth))
    }

    /// A session without audio hardware; listening reports the device as
    /// unavailable and the synth refuses to start.
    #[cfg(not(feature = "audio"))]
    pub fn with_default_devices(config: WaveConfig) -> Self {
        Self::new(
            config,
            Box::new(crate::audio::NoInput),
            Box::new(crate::synth::NoOutput),
        )
    }

    /// Replaces the random source, for reproducible challenges and gaps.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// A handle for queueing commands; they take effect at the next tick.
    pub fn commands(&self) -> Sender<Command> {
        self.command_tx.clone()
    }

    /// Queues a command; shorthand for `commands().send(..)`.
    pub fn send(&self, command: Command) {
        // Cannot fail: the session owns the receiving end.
        let _ = self.command_tx.send(command);
    }

    pub fn config(&self) -> &WaveConfig {
        &self.config
    }

    pub fn source(&self) -> SourceState {
        self.source
    }

    pub fn signal(&self) -> LiveSignal {
        self.signal.current()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Runs one pass of the loop.
    pub fn tick(&mut self, now: Instant) -> Snapshot {
        let pending: Vec<Command> = self.command_rx.try_iter().collect();
        for command in pending {
            if !self.running {
                break;
            }
            self.apply(command);
        }

        if self.running {
            self.refresh_signal();
            self.advance_game(now);
        }

        Snapshot {
            signal: self.signal.current(),
            source: self.source,
            tone: self.tone,
            game: self.game_view(now),
            events: std::mem::take(&mut self.events),
            running: self.running,
        }
    }

    fn apply(&mut self, command: Command) {
        debug!(?command, "applying command");
        match command {
            Command::StartSynth => self.start_synth(),
            Command::StopSynth => self.stop_synth(),
            Command::ToggleSynth => {
                if self.source.is_playing() {
                    self.stop_synth();
                } else {
                    self.start_synth();
                }
            }
            Command::SetFrequency(frequency) => self.set_frequency(frequency),
            Command::SetAmplitude(amplitude) => self.set_amplitude(amplitude),
            Command::StartListening => self.start_listening(),
            Command::StopListening => self.stop_listening(),
            Command::ToggleListening => {
                if self.source.is_listening() {
                    self.stop_listening();
                } else {
                    self.start_listening();
                }
            }
            Command::OpenToneMatch => {
                self.release_sources();
                let mut game = ToneMatchGame::new(self.config.tone_match.clone());
                game.new_challenge(&mut self.rng);
                self.game = ActiveGame::ToneMatch(game);
                self.start_listening();
            }
            Command::NewChallenge => {
                if let ActiveGame::ToneMatch(game) = &mut self.game {
                    game.new_challenge(&mut self.rng);
                }
            }
            Command::OpenParcours => {
                self.release_sources();
                self.game = ActiveGame::Parcours(ParcoursGame::new(self.config.parcours.clone()));
                self.start_listening();
            }
            Command::StartParcours => {
                if let ActiveGame::Parcours(game) = &mut self.game {
                    game.start();
                }
            }
            Command::RestartParcours => {
                if let ActiveGame::Parcours(game) = &mut self.game {
                    game.restart();
                }
            }
            Command::ResizePlayfield(width, height) => {
                if let ActiveGame::Parcours(game) = &mut self.game {
                    game.resize(width, height);
                }
            }
            Command::OpenKeyboard => {
                self.release_sources();
                self.game = ActiveGame::Keyboard;
            }
            Command::PressKey(key) => self.press_key(key),
            Command::ReleaseKey => {
                if matches!(self.game, ActiveGame::Keyboard) {
                    self.stop_synth();
                }
            }
            Command::OctaveUp => self.keyboard.octave_up(),
            Command::OctaveDown => self.keyboard.octave_down(),
            Command::CloseGame => {
                self.release_sources();
                self.game = ActiveGame::None;
            }
            Command::Shutdown => {
                info!("Session shutting down");
                self.release_sources();
                self.signal.reset();
                self.game = ActiveGame::None;
                self.running = false;
            }
        }
    }

    fn start_synth(&mut self) {
        self.play(self.tone);
    }

    /// Every synth activation goes through here, so the microphone is
    /// always released first.
    fn play(&mut self, tone: Tone) {
        self.stop_listening();
        match self.synth.start(tone.frequency, tone.amplitude) {
            Ok(()) => self.source = SourceState::Playing(tone),
            Err(e) => {
                warn!("Synth unavailable: {}", e);
                self.source = SourceState::Idle;
                self.events.push(SessionEvent::OutputUnavailable(e.to_string()));
            }
        }
    }

    fn stop_synth(&mut self) {
        if self.source.is_playing() {
            self.synth.stop();
            self.source = SourceState::Idle;
        }
    }

    fn set_frequency(&mut self, frequency: f32) {
        self.tone.frequency = if frequency.is_finite() { frequency.max(0.0) } else { 0.0 };
        if let SourceState::Playing(tone) = &mut self.source {
            tone.frequency = self.tone.frequency;
            self.synth.set_frequency(self.tone.frequency);
        }
    }

    fn set_amplitude(&mut self, amplitude: f32) {
        self.tone.amplitude = if amplitude.is_finite() { amplitude.clamp(0.0, 1.0) } else { 0.0 };
        if let SourceState::Playing(tone) = &mut self.source {
            tone.amplitude = self.tone.amplitude;
            self.synth.set_amplitude(self.tone.amplitude);
        }
    }

    fn start_listening(&mut self) {
        if self.source.is_listening() {
            return;
        }
        self.stop_synth();
        match self.input.acquire() {
            Ok(()) => {
                info!("Listening on the microphone");
                self.source = SourceState::Listening { sample_rate: None };
            }
            Err(e) => self.device_unavailable(e.to_string()),
        }
    }

    fn stop_listening(&mut self) {
        if self.source.is_listening() {
            self.input.release();
            self.source = SourceState::Idle;
            self.signal.reset();
        }
    }

    fn release_sources(&mut self) {
        self.stop_synth();
        self.stop_listening();
    }

    /// Falls back to silence and leaves any game that needed the microphone.
    fn device_unavailable(&mut self, reason: String) {
        warn!("Microphone unavailable: {}", reason);
        self.input.release();
        self.source = SourceState::Idle;
        self.signal.reset();
        if !matches!(self.game, ActiveGame::Keyboard) {
            self.game = ActiveGame::None;
        }
        self.events.push(SessionEvent::DeviceUnavailable(reason));
    }

    fn press_key(&mut self, key: &'static str) {
        if !matches!(self.game, ActiveGame::Keyboard) {
            return;
        }
        let Some(frequency) = self.keyboard.key_frequency(key) else {
            warn!("Unknown keyboard key {:?}", key);
            return;
        };
        debug!("Key {}{} at {:.2} Hz", key, self.keyboard.octave(), frequency);
        self.play(Tone {
            frequency,
            amplitude: self.config.synth.key_amplitude,
        });
    }

    fn refresh_signal(&mut self) {
        let source = self.source;
        match source {
            SourceState::Idle => self.signal.reset(),
            SourceState::Playing(tone) => {
                self.signal.publish(LiveSignal::new(tone.frequency, tone.amplitude));
            }
            SourceState::Listening { sample_rate } => match self.input.read_buffer() {
                Ok(Some(buffer)) => {
                    if sample_rate.is_none() {
                        self.source = SourceState::Listening {
                            sample_rate: Some(buffer.sample_rate()),
                        };
                    }
                    let result = analysis::analyse(&buffer, &self.config.analysis);
                    self.signal.publish(result.signal);
                }
                // No new window since the last tick: keep the last value,
                // or silence while the device is still opening.
                Ok(None) => {
                    if sample_rate.is_none() {
                        self.signal.reset();
                    }
                }
                Err(e) => self.device_unavailable(e.to_string()),
            },
        }
    }

    fn advance_game(&mut self, now: Instant) {
        let signal = self.signal.current();
        match &mut self.game {
            ActiveGame::ToneMatch(game) => {
                if let Some(event) = game.tick(&signal, now) {
                    self.events.push(SessionEvent::ToneMatch(event));
                }
            }
            ActiveGame::Parcours(game) => {
                let events = game.tick(signal.amplitude, &mut self.rng);
                self.events.extend(events.into_iter().map(SessionEvent::Parcours));
            }
            ActiveGame::None | ActiveGame::Keyboard => {}
        }
    }

    fn game_view(&self, now: Instant) -> GameView {
        match &self.game {
            ActiveGame::None => GameView::None,
            ActiveGame::ToneMatch(game) => GameView::ToneMatch {
                challenge: game.challenge(),
                won: game.is_won(),
                hold_progress: game.hold_progress(now),
            },
            ActiveGame::Parcours(game) => GameView::Parcours(game.view()),
            ActiveGame::Keyboard => GameView::Keyboard {
                octave: self.keyboard.octave(),
                can_shift_down: self.keyboard.can_shift_down(),
                can_shift_up: self.keyboard.can_shift_up(),
                keys: self.keyboard.keys(),
            },
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release_sources();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleBuffer;
    use crate::error::{Result, WaveError};
    use crate::parcours::RunState;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct InputLog {
        acquired: bool,
        acquisitions: usize,
        releases: usize,
        fail_with: Option<String>,
        frames: VecDeque<SampleBuffer>,
    }

    struct MockInput(Arc<Mutex<InputLog>>);

    impl InputDevice for MockInput {
        fn acquire(&mut self) -> Result<()> {
            let mut log = self.0.lock().unwrap();
            if let Some(reason) = log.fail_with.clone() {
                return Err(WaveError::DeviceUnavailable(reason));
            }
            log.acquired = true;
            log.acquisitions += 1;
            Ok(())
        }

        fn read_buffer(&mut self) -> Result<Option<SampleBuffer>> {
            let mut log = self.0.lock().unwrap();
            if let Some(reason) = log.fail_with.clone() {
                return Err(WaveError::DeviceUnavailable(reason));
            }
            Ok(log.frames.pop_front())
        }

        fn release(&mut self) {
            let mut log = self.0.lock().unwrap();
            if log.acquired {
                log.releases += 1;
            }
            log.acquired = false;
        }
    }

    #[derive(Default)]
    struct SynthLog {
        playing: Option<(f32, f32)>,
        starts: usize,
        fail: bool,
    }

    struct MockSynth(Arc<Mutex<SynthLog>>);

    impl SynthOutput for MockSynth {
        fn start(&mut self, frequency: f32, amplitude: f32) -> Result<()> {
            let mut log = self.0.lock().unwrap();
            if log.fail {
                return Err(WaveError::OutputUnavailable("no speakers".to_string()));
            }
            log.playing = Some((frequency, amplitude));
            log.starts += 1;
            Ok(())
        }

        fn set_frequency(&mut self, frequency: f32) {
            if let Some((f, _)) = self.0.lock().unwrap().playing.as_mut() {
                *f = frequency;
            }
        }

        fn set_amplitude(&mut self, amplitude: f32) {
            if let Some((_, a)) = self.0.lock().unwrap().playing.as_mut() {
                *a = amplitude;
            }
        }

        fn stop(&mut self) {
            self.0.lock().unwrap().playing = None;
        }
    }

    struct Harness {
        session: Session,
        input: Arc<Mutex<InputLog>>,
        synth: Arc<Mutex<SynthLog>>,
        now: Instant,
    }

    impl Harness {
        fn new() -> Self {
            let input = Arc::new(Mutex::new(InputLog::default()));
            let synth = Arc::new(Mutex::new(SynthLog::default()));
            let session = Session::new(
                WaveConfig::default(),
                Box::new(MockInput(Arc::clone(&input))),
                Box::new(MockSynth(Arc::clone(&synth))),
            )
            .with_rng(StdRng::seed_from_u64(3));
            Self {
                session,
                input,
                synth,
                now: Instant::now(),
            }
        }

        fn run(&mut self, commands: &[Command]) -> Snapshot {
            for command in commands {
                self.session.send(command.clone());
            }
            self.tick()
        }

        fn tick(&mut self) -> Snapshot {
            self.now += Duration::from_millis(16);
            self.session.tick(self.now)
        }

        fn push_sine(&self, frequency: f64, peak: f32) {
            let samples = (0..2048)
                .map(|i| {
                    let phase = 2.0 * std::f64::consts::PI * frequency * i as f64 / 44100.0;
                    peak * phase.sin() as f32
                })
                .collect();
            self.input
                .lock()
                .unwrap()
                .frames
                .push_back(SampleBuffer::new(samples, 44100));
        }
    }

    #[test]
    fn commands_apply_on_the_next_tick() {
        let mut h = Harness::new();
        h.session.send(Command::StartSynth);
        assert_eq!(h.session.source(), SourceState::Idle);
        assert!(h.synth.lock().unwrap().playing.is_none());

        let snapshot = h.tick();
        assert!(snapshot.source.is_playing());
        assert_eq!(h.synth.lock().unwrap().playing, Some((440.0, 0.5)));
        assert_eq!(snapshot.signal, LiveSignal::new(440.0, 0.5));
    }

    #[test]
    fn synth_and_microphone_exclude_each_other() {
        let mut h = Harness::new();
        h.run(&[Command::StartSynth]);

        let snapshot = h.run(&[Command::StartListening]);
        assert!(snapshot.source.is_listening());
        assert!(h.synth.lock().unwrap().playing.is_none());
        assert!(h.input.lock().unwrap().acquired);

        let snapshot = h.run(&[Command::ToggleSynth]);
        assert!(snapshot.source.is_playing());
        assert!(!h.input.lock().unwrap().acquired);
        assert_eq!(h.input.lock().unwrap().releases, 1);
    }

    #[test]
    fn slider_changes_follow_the_playing_tone() {
        let mut h = Harness::new();
        h.run(&[Command::StartSynth]);
        let snapshot = h.run(&[Command::SetFrequency(250.0), Command::SetAmplitude(1.5)]);
        assert_eq!(snapshot.signal, LiveSignal::new(250.0, 1.0));
        assert_eq!(h.synth.lock().unwrap().playing, Some((250.0, 1.0)));

        let snapshot = h.run(&[Command::StopSynth]);
        assert!(snapshot.signal.is_idle());
        assert_eq!(snapshot.tone, Tone { frequency: 250.0, amplitude: 1.0 });
    }

    #[test]
    fn listening_publishes_analysed_windows() {
        let mut h = Harness::new();
        let snapshot = h.run(&[Command::StartListening]);
        // Device still opening.
        assert_eq!(snapshot.source, SourceState::Listening { sample_rate: None });
        assert!(snapshot.signal.is_idle());

        h.push_sine(300.0, 0.1);
        let snapshot = h.tick();
        assert_eq!(snapshot.source, SourceState::Listening { sample_rate: Some(44100) });
        assert!((snapshot.signal.frequency - 300.0).abs() < 0.01);

        // No new window: the last value stays.
        let held = h.tick();
        assert_eq!(held.signal, snapshot.signal);
    }

    #[test]
    fn stopping_the_microphone_resets_the_signal() {
        let mut h = Harness::new();
        h.run(&[Command::StartListening]);
        h.push_sine(300.0, 0.1);
        assert!(!h.tick().signal.is_idle());

        let snapshot = h.run(&[Command::ToggleListening]);
        assert_eq!(snapshot.source, SourceState::Idle);
        assert!(snapshot.signal.is_idle());
        assert!(!h.input.lock().unwrap().acquired);
    }

    #[test]
    fn unavailable_device_falls_back_to_silence() {
        let mut h = Harness::new();
        h.input.lock().unwrap().fail_with = Some("permission denied".to_string());

        let snapshot = h.run(&[Command::OpenToneMatch]);
        assert_eq!(snapshot.source, SourceState::Idle);
        assert!(snapshot.signal.is_idle());
        assert_eq!(snapshot.game, GameView::None);
        assert_eq!(
            snapshot.events,
            vec![SessionEvent::DeviceUnavailable(
                "Input device unavailable: permission denied".to_string()
            )]
        );
    }

    #[test]
    fn device_lost_while_listening_closes_the_game() {
        let mut h = Harness::new();
        h.run(&[Command::OpenParcours]);
        h.input.lock().unwrap().fail_with = Some("unplugged".to_string());

        let snapshot = h.tick();
        assert_eq!(snapshot.source, SourceState::Idle);
        assert_eq!(snapshot.game, GameView::None);
        assert!(matches!(snapshot.events[0], SessionEvent::DeviceUnavailable(_)));
        // The loop keeps ticking.
        assert!(h.tick().signal.is_idle());
    }

    #[test]
    fn synth_failure_leaves_the_source_idle() {
        let mut h = Harness::new();
        h.synth.lock().unwrap().fail = true;
        let snapshot = h.run(&[Command::StartSynth]);
        assert_eq!(snapshot.source, SourceState::Idle);
        assert!(matches!(snapshot.events[..], [SessionEvent::OutputUnavailable(_)]));
    }

    #[test]
    fn tone_match_opens_the_microphone_with_a_challenge() {
        let mut h = Harness::new();
        h.run(&[Command::StartSynth]);
        let snapshot = h.run(&[Command::OpenToneMatch]);
        assert!(snapshot.source.is_listening());
        assert!(h.synth.lock().unwrap().playing.is_none());
        match snapshot.game {
            GameView::ToneMatch { challenge: Some(c), won: false, .. } => {
                assert!(c.target_frequency > 150.0 && c.target_frequency < 600.0);
            }
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[test]
    fn singing_the_target_wins_the_tone_match() {
        let mut h = Harness::new();
        let mut snapshot = h.run(&[Command::OpenToneMatch]);
        // Redraw until the target sits well inside the detectable lag range
        // and away from the amplitude tolerance edge.
        let challenge = loop {
            match snapshot.game {
                GameView::ToneMatch { challenge: Some(c), .. }
                    if c.target_frequency < 500.0 && (c.target_amplitude - 0.5).abs() < 0.15 =>
                {
                    break c;
                }
                GameView::ToneMatch { .. } => snapshot = h.run(&[Command::NewChallenge]),
                other => panic!("unexpected view {:?}", other),
            }
        };

        // RMS 0.1 reads as amplitude 0.5.
        let peak = 0.1 * std::f32::consts::SQRT_2;
        let mut won = 0;
        for _ in 0..60 {
            h.push_sine(f64::from(challenge.target_frequency), peak);
            let snapshot = h.tick();
            won += snapshot
                .events
                .iter()
                .filter(|e| matches!(e, SessionEvent::ToneMatch(ToneMatchEvent::Won(_))))
                .count();
        }
        assert_eq!(won, 1);
    }

    #[test]
    fn parcours_runs_on_microphone_amplitude() {
        let mut h = Harness::new();
        h.run(&[Command::OpenParcours]);
        let snapshot = h.run(&[Command::StartParcours]);
        let GameView::Parcours(view) = snapshot.game else {
            panic!("parcours not open");
        };
        assert_eq!(view.state, RunState::Running);

        let mut spawned = 0;
        for _ in 0..130 {
            let snapshot = h.tick();
            spawned += snapshot
                .events
                .iter()
                .filter(|e| matches!(e, SessionEvent::Parcours(ParcoursEvent::Spawned(_))))
                .count();
        }
        assert_eq!(spawned, 1);
    }

    #[test]
    fn keyboard_plays_notes_through_the_synth() {
        let mut h = Harness::new();
        h.run(&[Command::StartListening]);
        let snapshot = h.run(&[Command::OpenKeyboard, Command::PressKey("A")]);
        assert!(!h.input.lock().unwrap().acquired);
        assert_eq!(snapshot.signal, LiveSignal::new(440.0, 0.5));

        let snapshot = h.run(&[Command::ReleaseKey, Command::OctaveUp, Command::PressKey("A")]);
        let (frequency, _) = h.synth.lock().unwrap().playing.unwrap();
        assert!((frequency - 880.0).abs() < 1e-3);
        match snapshot.game {
            GameView::Keyboard { octave, keys, .. } => {
                assert_eq!(octave, 5);
                assert_eq!(keys.len(), 12);
            }
            other => panic!("unexpected view {:?}", other),
        }

        let snapshot = h.run(&[Command::ReleaseKey]);
        assert!(snapshot.signal.is_idle());
        assert!(h.synth.lock().unwrap().playing.is_none());
    }

    #[test]
    fn key_press_releases_a_running_microphone() {
        let mut h = Harness::new();
        let snapshot = h.run(&[Command::OpenKeyboard, Command::StartListening]);
        assert!(snapshot.source.is_listening());
        assert!(h.input.lock().unwrap().acquired);

        let snapshot = h.run(&[Command::PressKey("A")]);
        assert_eq!(
            snapshot.source,
            SourceState::Playing(Tone { frequency: 440.0, amplitude: 0.5 })
        );
        assert!(!h.input.lock().unwrap().acquired);
        assert_eq!(h.input.lock().unwrap().releases, 1);
        assert!(h.synth.lock().unwrap().playing.is_some());

        // Leaving the keyboard must not leave anything running.
        h.run(&[Command::ReleaseKey, Command::CloseGame]);
        assert!(h.synth.lock().unwrap().playing.is_none());
        assert!(!h.input.lock().unwrap().acquired);
    }

    #[test]
    fn keys_are_ignored_outside_the_keyboard() {
        let mut h = Harness::new();
        let snapshot = h.run(&[Command::PressKey("C")]);
        assert_eq!(snapshot.source, SourceState::Idle);
        assert_eq!(h.synth.lock().unwrap().starts, 0);
    }

    #[test]
    fn closing_a_game_releases_the_microphone() {
        let mut h = Harness::new();
        h.run(&[Command::OpenParcours]);
        let snapshot = h.run(&[Command::CloseGame]);
        assert_eq!(snapshot.game, GameView::None);
        assert_eq!(snapshot.source, SourceState::Idle);
        assert_eq!(h.input.lock().unwrap().releases, 1);
    }

    #[test]
    fn shutdown_stops_applying_commands() {
        let mut h = Harness::new();
        let snapshot = h.run(&[Command::StartSynth, Command::Shutdown, Command::StartListening]);
        assert!(!snapshot.running);
        assert_eq!(snapshot.source, SourceState::Idle);
        assert!(h.synth.lock().unwrap().playing.is_none());
        assert_eq!(h.input.lock().unwrap().acquisitions, 0);
    }
}
