//! # WaveLab - Sound Wave Classroom GUI
//!
//! The iced front end for the WaveLab core. It owns the [`Session`], ticks it
//! every 16 ms and renders the returned [`Snapshot`]. Every button press and
//! slider move becomes a [`Command`] for the next tick.
//!
//! ## Architecture
//! - **Main Thread**: Iced GUI application with dark theme
//! - **Audio Threads**: Capture and playback streams owned by the core
//! - **Updates**: 60 FPS session ticks via the subscription system

mod ui;

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use iced::{Element, Size, Subscription, Task, Theme};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wavelab_core::{Command, GameView, Session, SessionEvent, Snapshot, WaveConfig};

use ui::main_display::create_main_view;

/// Environment variable naming an optional JSON configuration file.
const CONFIG_ENV: &str = "WAVELAB_CONFIG";

/// Horizontal padding around the parcours canvas.
const PLAYFIELD_PADDING: f32 = 40.0;

/// Phase advance of the drawn wave per tick, in radians.
const WAVE_PHASE_STEP: f32 = 0.05;

/// Main entry point: loads the configuration, sets up logging and runs the GUI.
pub fn main() -> Result<()> {
    let config = load_config()?;
    init_logging(&config.log_level);

    info!("Starting WaveLab");
    let session = Session::with_default_devices(config);
    iced::application("WaveLab", WaveLab::update, WaveLab::view)
        .subscription(WaveLab::subscription)
        .theme(WaveLab::theme)
        .window_size(Size::new(960.0, 720.0))
        .run_with(move || (WaveLab::new(session), Task::none()))
        .context("GUI terminated with an error")?;
    info!("WaveLab finished");
    Ok(())
}

/// Reads `WAVELAB_CONFIG` if set; otherwise returns the classroom defaults.
fn load_config() -> Result<WaveConfig> {
    let Ok(path) = std::env::var(CONFIG_ENV) else {
        return Ok(WaveConfig::default());
    };
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading configuration file {}", path))?;
    let config: WaveConfig = serde_json::from_str(&raw)
        .with_context(|| format!("parsing configuration file {}", path))?;
    config.validate().context("validating configuration")?;
    Ok(config)
}

/// Console logging on stderr; `RUST_LOG` overrides the configured level.
fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Application message types.
#[derive(Debug, Clone)]
pub enum Message {
    // Navigation
    OpenExplorer,
    OpenToneMatch,
    OpenParcours,
    OpenKeyboard,
    BackToMenu,

    // Explorer controls
    ToggleSynth,
    ToggleListening,
    FrequencyChanged(f32),
    AmplitudeChanged(f32),

    // Game controls
    NewChallenge,
    StartParcours,
    RestartParcours,

    // Keyboard
    KeyPressed(&'static str),
    KeyReleased,
    OctaveUp,
    OctaveDown,

    // Application control
    WindowResized(Size),
    Exit,

    // Continuous update message
    Tick,
}

/// Which screen is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Menu,
    Explorer,
    ToneMatch,
    Parcours,
    Keyboard,
}

/// Everything the views need to render one frame.
#[derive(Debug, Clone)]
pub struct AppDisplayData {
    pub page: Page,
    pub snapshot: Option<Snapshot>,
    /// Animation phase of the drawn waves
    pub phase: f32,
    /// Last device problem, shown until the next navigation
    pub error: Option<String>,
    pub running: bool,
    pub config: WaveConfig,
}

struct WaveLab {
    session: Session,
    display_data: AppDisplayData,
}

impl WaveLab {
    fn new(session: Session) -> Self {
        let config = session.config().clone();
        Self {
            session,
            display_data: AppDisplayData {
                page: Page::Menu,
                snapshot: None,
                phase: 0.0,
                error: None,
                running: true,
                config,
            },
        }
    }

    fn navigate(&mut self, page: Page, command: Command) {
        self.display_data.page = page;
        self.display_data.error = None;
        self.session.send(command);
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::OpenExplorer => self.navigate(Page::Explorer, Command::CloseGame),
            Message::OpenToneMatch => self.navigate(Page::ToneMatch, Command::OpenToneMatch),
            Message::OpenParcours => self.navigate(Page::Parcours, Command::OpenParcours),
            Message::OpenKeyboard => self.navigate(Page::Keyboard, Command::OpenKeyboard),
            Message::BackToMenu => self.navigate(Page::Menu, Command::CloseGame),
            Message::ToggleSynth => self.session.send(Command::ToggleSynth),
            Message::ToggleListening => self.session.send(Command::ToggleListening),
            Message::FrequencyChanged(f) => self.session.send(Command::SetFrequency(f)),
            Message::AmplitudeChanged(a) => self.session.send(Command::SetAmplitude(a)),
            Message::NewChallenge => self.session.send(Command::NewChallenge),
            Message::StartParcours => self.session.send(Command::StartParcours),
            Message::RestartParcours => self.session.send(Command::RestartParcours),
            Message::KeyPressed(key) => self.session.send(Command::PressKey(key)),
            Message::KeyReleased => self.session.send(Command::ReleaseKey),
            Message::OctaveUp => self.session.send(Command::OctaveUp),
            Message::OctaveDown => self.session.send(Command::OctaveDown),
            Message::WindowResized(size) => {
                let height = self.session.config().parcours.playfield_height;
                let width = (size.width - PLAYFIELD_PADDING).max(1.0);
                self.session.send(Command::ResizePlayfield(width, height));
            }
            Message::Exit => {
                info!("Window close requested");
                self.session.send(Command::Shutdown);
                self.tick();
                return iced::exit();
            }
            Message::Tick => self.tick(),
        }
        Task::none()
    }

    fn tick(&mut self) {
        let snapshot = self.session.tick(Instant::now());

        for event in &snapshot.events {
            match event {
                SessionEvent::DeviceUnavailable(reason) => {
                    warn!("Microphone unavailable: {}", reason);
                    self.display_data.error = Some(
                        "Could not access the microphone. Check the recording permissions."
                            .to_string(),
                    );
                    // The games need the microphone; the explorer just stays silent.
                    if matches!(self.display_data.page, Page::ToneMatch | Page::Parcours) {
                        self.display_data.page = Page::Menu;
                    }
                }
                SessionEvent::OutputUnavailable(reason) => {
                    warn!("Speakers unavailable: {}", reason);
                    self.display_data.error = Some("Could not play the tone.".to_string());
                }
                SessionEvent::ToneMatch(_) | SessionEvent::Parcours(_) => {}
            }
        }

        if !snapshot.signal.is_idle() || matches!(snapshot.game, GameView::ToneMatch { .. }) {
            self.display_data.phase =
                (self.display_data.phase + WAVE_PHASE_STEP) % std::f32::consts::TAU;
        }
        self.display_data.running = snapshot.running;
        self.display_data.snapshot = Some(snapshot);
    }

    fn view(&self) -> Element<'_, Message> {
        create_main_view(&self.display_data)
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            iced::time::every(Duration::from_millis(16)).map(|_| Message::Tick),
            iced::window::resize_events().map(|(_id, size)| Message::WindowResized(size)),
        ])
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}
