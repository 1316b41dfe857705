//! # Parcours Display Widget
//!
//! Renders a [`ParcoursView`]: obstacle columns with their gaps and the
//! player ball, scaled from playfield coordinates to the canvas.

use iced::widget::canvas::{self, Geometry, Path};
use iced::widget::container;
use iced::{mouse, Color, Element, Point, Rectangle, Renderer, Size, Theme};
use wavelab_core::parcours::ParcoursView;

pub struct ParcoursDisplay {
    view: ParcoursView,
}

impl ParcoursDisplay {
    pub fn new(view: ParcoursView) -> Self {
        Self { view }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        let height = self.view.playfield_height;
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fixed(height)),
        )
        .into()
    }
}

impl canvas::Program<crate::Message> for ParcoursDisplay {
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
        let sx = bounds.width / self.view.playfield_width.max(1.0);
        let sy = bounds.height / self.view.playfield_height.max(1.0);

        frame.fill(
            &Path::rectangle(Point::ORIGIN, bounds.size()),
            Color::from_rgb8(0x1E, 0x22, 0x2A),
        );

        let obstacle_color = Color::from_rgb8(0x4D, 0x94, 0xE6);
        for o in &self.view.obstacles {
            let x = o.x * sx;
            let width = o.width * sx;
            frame.fill_rectangle(Point::new(x, 0.0), Size::new(width, o.gap_top * sy), obstacle_color);
            let bottom = o.gap_bottom() * sy;
            frame.fill_rectangle(
                Point::new(x, bottom),
                Size::new(width, (bounds.height - bottom).max(0.0)),
                obstacle_color,
            );
        }

        let player = self.view.player;
        frame.fill(
            &Path::circle(Point::new(player.x * sx, player.y * sy), player.radius * sx.min(sy)),
            Color::from_rgb8(0xFF, 0x66, 0x80),
        );

        vec![frame.into_geometry()]
    }
}
