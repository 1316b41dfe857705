//! # Main Display
//!
//! Builds the screen for the current [`Page`] from the latest session
//! snapshot. Nothing here holds state; all values come from
//! [`AppDisplayData`].

use iced::widget::{button, column, container, progress_bar, row, slider, text, Space};
use iced::{Alignment, Color, Element, Length};
use wavelab_core::parcours::RunState;
use wavelab_core::{GameView, LiveSignal, SourceState, Tone};

use super::match_meter::MatchMeter;
use super::parcours_display::ParcoursDisplay;
use super::piano_keyboard::PianoKeyboard;
use super::wave_display::{Wave, WaveDisplay};
use crate::{AppDisplayData, Message, Page};

/// Slider range of the explorer frequency in Hz.
const FREQUENCY_RANGE: std::ops::RangeInclusive<f32> = 20.0..=2000.0;
/// Half width of the frequency meter, relative to the target.
const FREQUENCY_METER_RANGE: f32 = 0.25;
/// Half width of the amplitude meter.
const AMPLITUDE_METER_RANGE: f32 = 0.5;

const LIVE_COLOR: Color = rgb(0.0, 1.0, 0.75);
const TARGET_COLOR: Color = rgb(0.0, 1.0, 0.0);
const MIC_COLOR: Color = rgb(1.0, 0.2, 0.2);
const KEY_COLOR: Color = rgb(0.2, 0.6, 1.0);
const ERROR_COLOR: Color = rgb(1.0, 0.4, 0.4);

const fn rgb(r: f32, g: f32, b: f32) -> Color {
    Color { r, g, b, a: 1.0 }
}

pub fn create_main_view(data: &AppDisplayData) -> Element<'static, Message> {
    if !data.running {
        return container(text("Shutting down...").size(40))
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into();
    }

    let body = match data.page {
        Page::Menu => create_menu(),
        Page::Explorer => create_explorer_panel(data),
        Page::ToneMatch => create_tone_match_panel(data),
        Page::Parcours => create_parcours_panel(data),
        Page::Keyboard => create_keyboard_panel(data),
    };

    let mut content = column![body].spacing(10);
    if let Some(error) = &data.error {
        content = content.push(text(error.clone()).size(16).color(ERROR_COLOR));
    }

    container(content.padding(20))
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn signal(data: &AppDisplayData) -> LiveSignal {
    data.snapshot.as_ref().map(|s| s.signal).unwrap_or_default()
}

fn source(data: &AppDisplayData) -> SourceState {
    data.snapshot
        .as_ref()
        .map(|s| s.source)
        .unwrap_or(SourceState::Idle)
}

fn game(data: &AppDisplayData) -> GameView {
    data.snapshot
        .as_ref()
        .map(|s| s.game.clone())
        .unwrap_or(GameView::None)
}

fn header(title: &str) -> Element<'static, Message> {
    row![
        button(text("Back").size(14)).on_press(Message::BackToMenu).padding([6, 10]),
        Space::with_width(20),
        text(title.to_string()).size(28),
    ]
    .align_y(Alignment::Center)
    .into()
}

fn menu_button(label: &'static str, message: Message) -> Element<'static, Message> {
    button(text(label).size(18))
        .on_press(message)
        .padding([12, 20])
        .width(Length::Fixed(280.0))
        .into()
}

fn create_menu() -> Element<'static, Message> {
    let buttons = column![
        text("WaveLab").size(40),
        Space::with_height(10),
        text("Explore frequency and amplitude with sound").size(16),
        Space::with_height(30),
        menu_button("Wave Explorer", Message::OpenExplorer),
        menu_button("Tone Match", Message::OpenToneMatch),
        menu_button("Amplitude Parcours", Message::OpenParcours),
        menu_button("Keyboard", Message::OpenKeyboard),
        Space::with_height(30),
        menu_button("Exit", Message::Exit),
    ]
    .spacing(12)
    .align_x(Alignment::Center);

    container(buttons).width(Length::Fill).center_x(Length::Fill).into()
}

fn create_explorer_panel(data: &AppDisplayData) -> Element<'static, Message> {
    let source = source(data);
    let signal = signal(data);
    let tone = data
        .snapshot
        .as_ref()
        .map(|s| s.tone)
        .unwrap_or(Tone {
            frequency: data.config.synth.frequency,
            amplitude: data.config.synth.amplitude,
        });
    let listening = source.is_listening();

    // Microphone input shows the measured values; otherwise the sliders.
    let shown = if listening {
        signal
    } else {
        LiveSignal::new(tone.frequency, tone.amplitude)
    };
    let wave = Wave {
        frequency: shown.frequency,
        amplitude: shown.amplitude,
        phase: data.phase,
        color: if listening { MIC_COLOR } else { LIVE_COLOR },
    };

    let enabled = sliders_enabled(source);
    let frequency_slider = tone_slider(
        FREQUENCY_RANGE,
        tone.frequency,
        1.0,
        Message::FrequencyChanged,
        enabled,
    );
    let amplitude_slider = tone_slider(
        0.0..=1.0,
        tone.amplitude,
        0.01,
        Message::AmplitudeChanged,
        enabled,
    );

    let play_label = if source.is_playing() { "Stop Tone" } else { "Play Tone" };
    let mic_label = if listening { "Stop Microphone" } else { "Use Microphone" };
    let play_button = button(text(play_label).size(14))
        .padding([6, 10])
        .on_press_maybe((!listening).then_some(Message::ToggleSynth));
    let mic_button = button(text(mic_label).size(14))
        .padding([6, 10])
        .on_press_maybe((!source.is_playing()).then_some(Message::ToggleListening));

    column![
        header("Wave Explorer"),
        WaveDisplay::new(vec![wave]).view(),
        row![
            text("Frequency").size(16).width(Length::Fixed(110.0)),
            frequency_slider,
            text(format!("{:.0} Hz", shown.frequency)).size(16).width(Length::Fixed(90.0)),
        ]
        .spacing(10)
        .align_y(Alignment::Center),
        row![
            text("Amplitude").size(16).width(Length::Fixed(110.0)),
            amplitude_slider,
            text(format!("{:.0}%", shown.amplitude * 100.0)).size(16).width(Length::Fixed(90.0)),
        ]
        .spacing(10)
        .align_y(Alignment::Center),
        row![play_button, mic_button].spacing(10),
    ]
    .spacing(16)
    .into()
}

/// The tone sliders only drive the synth; the microphone owns the display.
fn sliders_enabled(source: SourceState) -> bool {
    !source.is_listening()
}

/// A slider, or a read-only bar at the same position when disabled.
fn tone_slider(
    range: std::ops::RangeInclusive<f32>,
    value: f32,
    step: f32,
    on_change: fn(f32) -> Message,
    enabled: bool,
) -> Element<'static, Message> {
    if enabled {
        slider(range, value, on_change).step(step).into()
    } else {
        progress_bar(range, value).height(Length::Fixed(12.0)).into()
    }
}

fn create_tone_match_panel(data: &AppDisplayData) -> Element<'static, Message> {
    let signal = signal(data);
    let GameView::ToneMatch { challenge, won, hold_progress } = game(data) else {
        return column![header("Tone Match"), text("Waiting for the microphone...").size(16)].into();
    };
    let tolerances = &data.config.tone_match;

    let mut waves = Vec::new();
    if let Some(c) = challenge {
        waves.push(Wave {
            frequency: c.target_frequency,
            amplitude: c.target_amplitude,
            phase: 0.0,
            color: TARGET_COLOR,
        });
    }
    waves.push(Wave {
        frequency: signal.frequency,
        amplitude: signal.amplitude,
        phase: data.phase,
        color: MIC_COLOR,
    });

    let (target_text, frequency_deviation, amplitude_deviation) = match challenge {
        Some(c) => (
            format!("Target: {:.0} Hz at {:.0}%", c.target_frequency, c.target_amplitude * 100.0),
            (signal.frequency > 0.0)
                .then(|| (signal.frequency - c.target_frequency) / c.target_frequency),
            Some(signal.amplitude - c.target_amplitude),
        ),
        None => ("No challenge".to_string(), None, None),
    };

    let status: Element<'static, Message> = if won {
        text("Well done! You matched the tone.")
            .size(22)
            .color(TARGET_COLOR)
            .into()
    } else {
        progress_bar(0.0..=1.0, hold_progress)
            .height(Length::Fixed(12.0))
            .into()
    };

    column![
        header("Tone Match"),
        WaveDisplay::new(waves).view(),
        text(target_text).size(18),
        text(format!(
            "You: {:.0} Hz at {:.0}%",
            signal.frequency,
            signal.amplitude * 100.0
        ))
        .size(18),
        text("Frequency").size(14),
        MatchMeter::new(
            frequency_deviation,
            tolerances.frequency_tolerance,
            FREQUENCY_METER_RANGE
        )
        .view(),
        text("Amplitude").size(14),
        MatchMeter::new(
            amplitude_deviation,
            tolerances.amplitude_tolerance,
            AMPLITUDE_METER_RANGE
        )
        .view(),
        status,
        button(text("New Challenge").size(14))
            .padding([6, 10])
            .on_press(Message::NewChallenge),
    ]
    .spacing(12)
    .into()
}

fn create_parcours_panel(data: &AppDisplayData) -> Element<'static, Message> {
    let GameView::Parcours(view) = game(data) else {
        return column![header("Amplitude Parcours"), text("Waiting for the microphone...").size(16)]
            .into();
    };

    let (message, action) = match view.state {
        RunState::AwaitingStart => ("Ready to start?", Some(("Start", Message::StartParcours))),
        RunState::Running => ("Make some noise to rise!", None),
        RunState::GameOver => ("Game Over!", Some(("Try Again", Message::RestartParcours))),
    };

    let mut controls = row![
        text(format!("Score: {}", view.score)).size(20),
        Space::with_width(30),
        text(message).size(20),
    ]
    .spacing(10)
    .align_y(Alignment::Center);
    if let Some((label, msg)) = action {
        controls = controls.push(button(text(label).size(14)).padding([6, 10]).on_press(msg));
    }

    column![
        header("Amplitude Parcours"),
        controls,
        ParcoursDisplay::new(view).view(),
    ]
    .spacing(12)
    .into()
}

fn create_keyboard_panel(data: &AppDisplayData) -> Element<'static, Message> {
    let signal = signal(data);
    let GameView::Keyboard { octave, can_shift_down, can_shift_up, .. } = game(data) else {
        return column![header("Keyboard")].into();
    };

    let wave = Wave {
        frequency: signal.frequency,
        amplitude: signal.amplitude,
        phase: data.phase,
        color: KEY_COLOR,
    };

    let octave_row = row![
        button(text("Octave -").size(14))
            .padding([6, 10])
            .on_press_maybe(can_shift_down.then_some(Message::OctaveDown)),
        text(format!("Octave {}", octave)).size(18),
        button(text("Octave +").size(14))
            .padding([6, 10])
            .on_press_maybe(can_shift_up.then_some(Message::OctaveUp)),
        Space::with_width(30),
        text(format!("{:.0} Hz", signal.frequency)).size(18),
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    column![
        header("Keyboard"),
        WaveDisplay::new(vec![wave]).view(),
        octave_row,
        PianoKeyboard::new().view(),
    ]
    .spacing(16)
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sliders_lock_while_the_microphone_is_on() {
        assert!(sliders_enabled(SourceState::Idle));
        assert!(sliders_enabled(SourceState::Playing(Tone {
            frequency: 440.0,
            amplitude: 0.5
        })));
        assert!(!sliders_enabled(SourceState::Listening { sample_rate: None }));
        assert!(!sliders_enabled(SourceState::Listening {
            sample_rate: Some(44100)
        }));
    }
}
