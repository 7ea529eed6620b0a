//! Opaque drawing surface.
//!
//! Systems describe what they look like through [`Canvas`]; they never
//! read anything back, so skipping rendering entirely (headless runs,
//! tests) cannot change gameplay. [`DrawList`] records the calls for
//! inspection.

use crate::math::{Fixed, Vec2Fixed};

/// RGB colour with alpha in `0..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Opaque colour.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Same colour with the alpha scaled by `fraction` (clamped to `[0, 1]`).
    #[must_use]
    pub fn faded(self, fraction: Fixed) -> Self {
        let fraction = fraction.clamp(Fixed::ZERO, Fixed::from_num(1));
        let alpha = (Fixed::from_num(self.a) * fraction).to_num::<u8>();
        Self { a: alpha, ..self }
    }

    /// Plain white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Crit gold.
    pub const GOLD: Self = Self::rgb(255, 200, 40);
    /// Miss grey.
    pub const GREY: Self = Self::rgb(150, 150, 150);
    /// Reward yellow.
    pub const YELLOW: Self = Self::rgb(255, 240, 90);
    /// Heal green.
    pub const GREEN: Self = Self::rgb(90, 220, 110);
    /// Enemy red.
    pub const RED: Self = Self::rgb(220, 60, 60);
    /// Explosion orange.
    pub const ORANGE: Self = Self::rgb(255, 140, 40);
}

/// A 2D drawing target.
pub trait Canvas {
    /// Fill an axis-aligned rectangle.
    fn fill_rect(&mut self, origin: Vec2Fixed, width: Fixed, height: Fixed, color: Color);
    /// Fill a circle.
    fn fill_circle(&mut self, center: Vec2Fixed, radius: Fixed, color: Color);
    /// Draw a line segment.
    fn line(&mut self, from: Vec2Fixed, to: Vec2Fixed, color: Color);
    /// Draw a text label.
    fn text(&mut self, at: Vec2Fixed, text: &str, color: Color);
}

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    /// See [`Canvas::fill_rect`].
    Rect {
        /// Top-left corner.
        origin: Vec2Fixed,
        /// Width.
        width: Fixed,
        /// Height.
        height: Fixed,
        /// Fill colour.
        color: Color,
    },
    /// See [`Canvas::fill_circle`].
    Circle {
        /// Centre.
        center: Vec2Fixed,
        /// Radius.
        radius: Fixed,
        /// Fill colour.
        color: Color,
    },
    /// See [`Canvas::line`].
    Line {
        /// Start.
        from: Vec2Fixed,
        /// End.
        to: Vec2Fixed,
        /// Stroke colour.
        color: Color,
    },
    /// See [`Canvas::text`].
    Text {
        /// Anchor.
        at: Vec2Fixed,
        /// Label.
        text: String,
        /// Colour.
        color: Color,
    },
}

/// Canvas that records every call.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    /// Empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded commands in call order.
    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Number of recorded commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing was drawn.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// All text labels drawn, in order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Canvas for DrawList {
    fn fill_rect(&mut self, origin: Vec2Fixed, width: Fixed, height: Fixed, color: Color) {
        self.commands.push(DrawCommand::Rect {
            origin,
            width,
            height,
            color,
        });
    }

    fn fill_circle(&mut self, center: Vec2Fixed, radius: Fixed, color: Color) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            color,
        });
    }

    fn line(&mut self, from: Vec2Fixed, to: Vec2Fixed, color: Color) {
        self.commands.push(DrawCommand::Line { from, to, color });
    }

    fn text(&mut self, at: Vec2Fixed, text: &str, color: Color) {
        self.commands.push(DrawCommand::Text {
            at,
            text: text.to_string(),
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faded_scales_alpha() {
        let half = Color::WHITE.faded(Fixed::from_num(0.5));
        assert_eq!(half.a, 127);
        assert_eq!(Color::WHITE.faded(Fixed::from_num(3)).a, 255);
    }

    #[test]
    fn test_draw_list_records_texts() {
        let mut list = DrawList::new();
        list.fill_circle(Vec2Fixed::ZERO, Fixed::from_num(3), Color::RED);
        list.text(Vec2Fixed::ZERO, "-40", Color::WHITE);
        assert_eq!(list.len(), 2);
        assert_eq!(list.texts().collect::<Vec<_>>(), vec!["-40"]);
    }
}
