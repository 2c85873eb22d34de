//! Geometry primitives
//!
//! All rects live in the list's local coordinate space. A zero rect is the
//! "not yet measured" marker that layout produces before the first pass.

use serde::{Deserialize, Serialize};

use crate::scheduler::Timestamp;

/// 2D point
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 2D size
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// 2D rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        origin: Point::ZERO,
        size: Size::ZERO,
    };

    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn x(&self) -> f32 {
        self.origin.x
    }

    pub fn y(&self) -> f32 {
        self.origin.y
    }

    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn height(&self) -> f32 {
        self.size.height
    }

    /// Top edge
    pub fn min_y(&self) -> f32 {
        self.origin.y
    }

    /// Bottom edge
    pub fn max_y(&self) -> f32 {
        self.origin.y + self.size.height
    }

    pub fn min_x(&self) -> f32 {
        self.origin.x
    }

    /// True for the layout engine's "not yet measured" value
    pub fn is_zero(&self) -> bool {
        *self == Rect::ZERO
    }

    /// Offset the rect by a delta
    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Rect {
            origin: Point::new(self.origin.x + dx, self.origin.y + dy),
            size: self.size,
        }
    }

    /// Whether the two rects overlap vertically
    pub fn intersects_y(&self, other: &Rect) -> bool {
        self.min_y() < other.max_y() && other.min_y() < self.max_y()
    }
}

/// 2D translation applied to a row while it animates in
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub dx: f32,
    pub dy: f32,
}

impl Offset {
    pub const ZERO: Offset = Offset { dx: 0.0, dy: 0.0 };

    pub const fn new(dx: f32, dy: f32) -> Self {
        Self { dx, dy }
    }

    pub fn is_zero(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

/// A measured rect stamped with the time it was observed
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeometrySample {
    pub rect: Rect,
    pub observed_at: Timestamp,
}

impl GeometrySample {
    pub const fn new(rect: Rect, observed_at: Timestamp) -> Self {
        Self { rect, observed_at }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rect_is_unmeasured() {
        assert!(Rect::ZERO.is_zero());
        assert!(Rect::default().is_zero());
        assert!(!Rect::new(0.0, 0.0, 0.0, 1.0).is_zero());
    }

    #[test]
    fn test_edges() {
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(rect.min_y(), 20.0);
        assert_eq!(rect.max_y(), 70.0);
        assert_eq!(rect.offset(0.0, -20.0).min_y(), 0.0);
    }

    #[test]
    fn test_intersects_y() {
        let viewport = Rect::new(0.0, 0.0, 320.0, 600.0);
        assert!(Rect::new(0.0, 580.0, 320.0, 44.0).intersects_y(&viewport));
        assert!(!Rect::new(0.0, 600.0, 320.0, 44.0).intersects_y(&viewport));
    }
}
