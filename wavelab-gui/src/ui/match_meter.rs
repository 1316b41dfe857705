//! # Match Meter Widget
//!
//! A horizontal deviation meter for the tone-match game. The shaded band is
//! the accepted tolerance; the needle shows how far the live value is from
//! the target.

use iced::widget::canvas::{self, Geometry, Path, Stroke};
use iced::widget::container;
use iced::{mouse, Color, Element, Point, Rectangle, Renderer, Size, Theme};

/// Deviation meter, centered on the target.
pub struct MatchMeter {
    /// Current deviation (None if there is nothing to compare)
    deviation: Option<f32>,
    /// Accepted deviation on either side of the target
    tolerance: f32,
    /// Deviation shown at the meter edges
    range: f32,
}

impl MatchMeter {
    pub fn new(deviation: Option<f32>, tolerance: f32, range: f32) -> Self {
        Self {
            deviation,
            tolerance,
            range: range.max(f32::EPSILON),
        }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fixed(36.0)),
        )
        .into()
    }

    fn x_for(&self, deviation: f32, width: f32) -> f32 {
        let clamped = deviation.clamp(-self.range, self.range);
        (clamped + self.range) / (2.0 * self.range) * width
    }
}

impl canvas::Program<crate::Message> for MatchMeter {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        let background = Path::rectangle(Point::ORIGIN, bounds.size());
        frame.fill(&background, Color::from_rgb8(0x40, 0x40, 0x40));

        // Tolerance band
        let left = self.x_for(-self.tolerance, bounds.width);
        let right = self.x_for(self.tolerance, bounds.width);
        frame.fill(
            &Path::rectangle(Point::new(left, 0.0), Size::new(right - left, bounds.height)),
            Color::from_rgba8(0x34, 0xDB, 0x98, 0.25),
        );

        let center_x = bounds.width / 2.0;
        frame.stroke(
            &Path::line(Point::new(center_x, 0.0), Point::new(center_x, bounds.height)),
            Stroke::default().with_width(2.0).with_color(Color::WHITE),
        );

        if let Some(d) = self.deviation {
            let needle_pos = self.x_for(d, bounds.width);
            let color = if d.abs() < self.tolerance {
                Color::from_rgb8(0x34, 0xDB, 0x98) // Green
            } else if d.abs() < 2.0 * self.tolerance {
                Color::from_rgb8(0xFF, 0xC3, 0x00) // Yellow
            } else {
                Color::from_rgb8(0xFF, 0x33, 0x33) // Red
            };
            let needle =
                Path::rectangle(Point::new(needle_pos - 2.0, 0.0), Size::new(4.0, bounds.height));
            frame.fill(&needle, color);
        }

        vec![frame.into_geometry()]
    }
}
