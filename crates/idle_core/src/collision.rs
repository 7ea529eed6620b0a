//! Hit-test predicates.
//!
//! Pure geometry with no mutation. Bullet-vs-enemy tests use
//! [`point_rect`], which treats the rectangle as a circle around its
//! centre. That approximation is the gameplay hitbox, not a bug to fix.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Top edge.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
    /// Width.
    #[serde(with = "fixed_serde")]
    pub width: Fixed,
    /// Height.
    #[serde(with = "fixed_serde")]
    pub height: Fixed,
}

impl Rect {
    /// Create a rectangle.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed, width: Fixed, height: Fixed) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from integer values.
    #[must_use]
    pub fn from_ints(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(
            Fixed::from_num(x),
            Fixed::from_num(y),
            Fixed::from_num(width),
            Fixed::from_num(height),
        )
    }

    /// Centre point.
    #[must_use]
    pub fn center(&self) -> Vec2Fixed {
        let two = Fixed::from_num(2);
        Vec2Fixed::new(self.x + self.width / two, self.y + self.height / two)
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> Fixed {
        self.x + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> Fixed {
        self.y + self.height
    }
}

/// Circle with an optional radius (absent means a point).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Circle {
    /// Centre.
    pub center: Vec2Fixed,
    /// Radius, treated as zero when `None`.
    pub radius: Option<Fixed>,
}

impl Circle {
    /// Circle with a radius.
    #[must_use]
    pub const fn new(center: Vec2Fixed, radius: Fixed) -> Self {
        Self {
            center,
            radius: Some(radius),
        }
    }

    /// Degenerate circle of radius zero.
    #[must_use]
    pub const fn point(center: Vec2Fixed) -> Self {
        Self {
            center,
            radius: None,
        }
    }

    fn radius_or_zero(&self) -> Fixed {
        self.radius.unwrap_or(Fixed::ZERO)
    }
}

/// Point against a rectangle approximated as a circle of radius
/// `rect.width / 2 + tolerance` around the rectangle's centre.
#[must_use]
pub fn point_rect(point: Vec2Fixed, rect: &Rect, tolerance: Fixed) -> bool {
    let radius = rect.width / Fixed::from_num(2) + tolerance;
    point.distance_squared(rect.center()) < radius.saturating_mul(radius)
}

/// Axis-aligned overlap. Touching edges do not count.
#[must_use]
pub fn rect_rect(a: &Rect, b: &Rect) -> bool {
    a.x < b.right() && a.right() > b.x && a.y < b.bottom() && a.bottom() > b.y
}

/// Centre distance strictly less than the sum of radii.
#[must_use]
pub fn circle_circle(a: &Circle, b: &Circle) -> bool {
    let reach = a.radius_or_zero() + b.radius_or_zero();
    a.center.distance_squared(b.center) < reach.saturating_mul(reach)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_rect_uses_circle_around_center() {
        let rect = Rect::from_ints(0, 0, 40, 40);
        // Corner lies outside the inscribed circle even though inside the AABB.
        assert!(!point_rect(Vec2Fixed::from_ints(1, 1), &rect, Fixed::ZERO));
        assert!(point_rect(Vec2Fixed::from_ints(20, 5), &rect, Fixed::ZERO));
    }

    #[test]
    fn test_point_rect_tolerance_extends_reach() {
        let rect = Rect::from_ints(0, 0, 40, 40);
        let point = Vec2Fixed::from_ints(20, -5);
        // Distance 25 from centre (20,20); radius 20 misses, 20+10 hits.
        assert!(!point_rect(point, &rect, Fixed::ZERO));
        assert!(point_rect(point, &rect, Fixed::from_num(10)));
    }

    #[test]
    fn test_rect_rect_strict_edges() {
        let a = Rect::from_ints(0, 0, 10, 10);
        let touching = Rect::from_ints(10, 0, 10, 10);
        let overlapping = Rect::from_ints(9, 9, 10, 10);
        assert!(!rect_rect(&a, &touching));
        assert!(rect_rect(&a, &overlapping));
    }

    #[test]
    fn test_circle_circle() {
        let a = Circle::new(Vec2Fixed::ZERO, Fixed::from_num(5));
        let b = Circle::new(Vec2Fixed::from_ints(9, 0), Fixed::from_num(5));
        let c = Circle::new(Vec2Fixed::from_ints(10, 0), Fixed::from_num(5));
        assert!(circle_circle(&a, &b));
        assert!(!circle_circle(&a, &c));
    }

    #[test]
    fn test_circle_without_radius_is_point() {
        let area = Circle::new(Vec2Fixed::ZERO, Fixed::from_num(5));
        assert!(circle_circle(&area, &Circle::point(Vec2Fixed::from_ints(3, 3))));
        assert!(!circle_circle(&area, &Circle::point(Vec2Fixed::from_ints(4, 4))));
    }
}
