//! # Wave Display Widget
//!
//! Draws sine waves over a light grid. One cycle on screen stands for
//! 100 Hz, and the height follows the amplitude, so students can see both
//! parameters change.

use iced::widget::canvas::{self, Geometry, Path, Stroke};
use iced::widget::container;
use iced::{mouse, Color, Element, Point, Rectangle, Renderer, Theme};

/// Hz per drawn cycle.
const HZ_PER_CYCLE: f32 = 100.0;
/// Fraction of the half height used at full amplitude.
const HEIGHT_SCALE: f32 = 0.8;
const GRID_SPACING: f32 = 50.0;

/// One wave to draw.
#[derive(Debug, Clone, Copy)]
pub struct Wave {
    pub frequency: f32,
    pub amplitude: f32,
    pub phase: f32,
    pub color: Color,
}

pub struct WaveDisplay {
    waves: Vec<Wave>,
}

impl WaveDisplay {
    pub fn new(waves: Vec<Wave>) -> Self {
        Self { waves }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fixed(260.0)),
        )
        .into()
    }
}

fn draw_grid(frame: &mut canvas::Frame, bounds: Rectangle) {
    let mid = bounds.height / 2.0;
    let faint = || {
        Stroke::default()
            .with_width(1.0)
            .with_color(Color::from_rgba(1.0, 1.0, 1.0, 0.15))
    };

    let mut x = GRID_SPACING;
    while x < bounds.width {
        frame.stroke(&Path::line(Point::new(x, 0.0), Point::new(x, bounds.height)), faint());
        x += GRID_SPACING;
    }
    for y in [mid * 0.5, mid * 1.5] {
        frame.stroke(&Path::line(Point::new(0.0, y), Point::new(bounds.width, y)), faint());
    }
    frame.stroke(
        &Path::line(Point::new(0.0, mid), Point::new(bounds.width, mid)),
        Stroke::default()
            .with_width(1.5)
            .with_color(Color::from_rgba(1.0, 1.0, 1.0, 0.4)),
    );
}

impl canvas::Program<crate::Message> for WaveDisplay {
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
        draw_grid(&mut frame, bounds);

        let mid = bounds.height / 2.0;
        for wave in &self.waves {
            let path = Path::new(|builder| {
                builder.move_to(Point::new(0.0, mid));
                if wave.frequency > 0.0 {
                    let total_angle = wave.frequency / HZ_PER_CYCLE * std::f32::consts::TAU;
                    let mut x = 0.0;
                    while x < bounds.width {
                        let angle = x / bounds.width * total_angle + wave.phase;
                        let y = mid - angle.sin() * mid * wave.amplitude * HEIGHT_SCALE;
                        builder.line_to(Point::new(x, y));
                        x += 1.0;
                    }
                } else {
                    builder.line_to(Point::new(bounds.width, mid));
                }
            });
            frame.stroke(&path, Stroke::default().with_width(3.0).with_color(wave.color));
        }

        vec![frame.into_geometry()]
    }
}
