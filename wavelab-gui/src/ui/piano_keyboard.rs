//! # Piano Keyboard Widget
//!
//! A one-octave keyboard (C to B). Pressing a key plays its note until the
//! mouse button is released anywhere in the window.

use iced::widget::canvas::{self, event, Event, Fill, Geometry, Path, Stroke};
use iced::widget::container;
use iced::{mouse, Color, Element, Point, Rectangle, Renderer, Size, Theme};
use wavelab_core::tuning::KEY_NAMES;

const WHITE_KEY_COUNT: usize = 7;
const KEYBOARD_HEIGHT: f32 = 160.0;

/// Pattern indicating which keys in an octave are black keys.
/// This array represents the pattern: C, C#, D, D#, E, F, F#, G, G#, A, A#, B
const IS_BLACK: [bool; 12] = [
    false, true, false, true, false, false, true, false, true, false, true, false,
];

#[derive(Debug, Clone, Default)]
pub struct PianoKeyboard;

impl PianoKeyboard {
    pub fn new() -> Self {
        Self
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fixed(KEYBOARD_HEIGHT)),
        )
        .into()
    }

    /// Key rectangles as (pitch-class index, rect), black keys first so
    /// they win hit tests.
    fn layout(bounds: Size) -> Vec<(usize, Rectangle)> {
        let white_key_width = bounds.width / WHITE_KEY_COUNT as f32;
        let black_key_width = white_key_width * 0.6;
        let black_key_height = bounds.height * 0.6;

        let mut black = Vec::new();
        let mut white = Vec::new();
        let mut white_key_idx: f32 = 0.0;
        for (i, &is_black) in IS_BLACK.iter().enumerate() {
            if is_black {
                black.push((
                    i,
                    Rectangle {
                        x: white_key_idx * white_key_width - black_key_width / 2.0,
                        y: 0.0,
                        width: black_key_width,
                        height: black_key_height,
                    },
                ));
            } else {
                white.push((
                    i,
                    Rectangle {
                        x: white_key_idx * white_key_width,
                        y: 0.0,
                        width: white_key_width,
                        height: bounds.height,
                    },
                ));
                white_key_idx += 1.0;
            }
        }
        black.extend(white);
        black
    }

    fn key_at(bounds: Size, pos: Point) -> Option<usize> {
        Self::layout(bounds)
            .into_iter()
            .find(|(_, rect)| rect.contains(pos))
            .map(|(i, _)| i)
    }
}

impl canvas::Program<crate::Message> for PianoKeyboard {
    /// The key currently held down.
    type State = Option<usize>;

    fn update(
        &self,
        state: &mut Self::State,
        event: Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> (event::Status, Option<crate::Message>) {
        match event {
            Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                if let Some(position) = cursor.position_in(bounds) {
                    if let Some(key) = Self::key_at(bounds.size(), position) {
                        *state = Some(key);
                        return (
                            event::Status::Captured,
                            Some(crate::Message::KeyPressed(KEY_NAMES[key])),
                        );
                    }
                }
            }
            Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                if state.take().is_some() {
                    return (event::Status::Captured, Some(crate::Message::KeyReleased));
                }
            }
            _ => {}
        }
        (event::Status::Ignored, None)
    }

    fn draw(
        &self,
        state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        let pressed = Color::from_rgb8(0x34, 0xDB, 0x98);

        // Paint in reverse so black keys end up on top.
        for (i, rect) in Self::layout(bounds.size()).into_iter().rev() {
            let color = match (*state == Some(i), IS_BLACK[i]) {
                (true, _) => pressed,
                (false, true) => Color::BLACK,
                (false, false) => Color::WHITE,
            };
            frame.fill_rectangle(rect.position(), rect.size(), Fill::from(color));
            if !IS_BLACK[i] {
                frame.stroke(
                    &Path::rectangle(rect.position(), rect.size()),
                    Stroke::default().with_color(Color::BLACK),
                );
            }
        }

        vec![frame.into_geometry()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_keys_win_hit_tests() {
        let size = Size::new(700.0, 160.0);
        // Boundary between C and D, high up: C#.
        assert_eq!(PianoKeyboard::key_at(size, Point::new(100.0, 10.0)), Some(1));
        // Below the black key: D.
        assert_eq!(PianoKeyboard::key_at(size, Point::new(110.0, 150.0)), Some(2));
        assert_eq!(PianoKeyboard::key_at(size, Point::new(650.0, 150.0)), Some(11));
    }

    #[test]
    fn layout_covers_all_twelve_keys() {
        let layout = PianoKeyboard::layout(Size::new(700.0, 160.0));
        assert_eq!(layout.len(), 12);
        assert_eq!(KEY_NAMES[layout[0].0], "C#");
    }
}
