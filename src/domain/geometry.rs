//! Geometric value types shared by the scene, the tools and the renderer
//!
//! All coordinates are in scene space (zoom = 1, padding included) unless a
//! function says otherwise.

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// A point in scene space
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Midpoint between two points
    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }

    /// Rotate around the origin by `degrees` (clockwise in screen space)
    pub fn rotate(self, degrees: f32) -> Point {
        if degrees == 0.0 {
            return self;
        }
        let (sin, cos) = degrees.to_radians().sin_cos();
        Point::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Width and height in scene pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Scale both axes by the same factor
    pub fn scaled(self, factor: f32) -> Size {
        Size::new(self.width * factor, self.height * factor)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Axis-aligned rectangle described by its top-left corner and size
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle from its top-left corner and size
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Normalized rectangle spanned by two arbitrary corners
    ///
    /// Left/top are the minimum of the two points and the size is the
    /// absolute difference, so dragging in any direction yields a
    /// non-negative rectangle.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    /// Smallest rectangle containing every point, `None` for an empty iterator
    pub fn enclosing(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut min, mut max) = (first, first);
        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some(Rect::from_corners(min, max))
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Calculate the intersection of two rectangles
    pub fn intersect(&self, other: Rect) -> Option<Rect> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if left < right && top < bottom {
            Some(Rect::new(left, top, right - left, bottom - top))
        } else {
            None
        }
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: Rect) -> Rect {
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(left, top, right - left, bottom - top)
    }

    /// Translate the rectangle by the given offset
    pub fn translate(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(self.left + dx, self.top + dy, self.width, self.height)
    }

    /// Grow the rectangle by `amount` on every side
    pub fn inflate(&self, amount: f32) -> Rect {
        Rect::new(
            self.left - amount,
            self.top - amount,
            self.width + amount * 2.0,
            self.height + amount * 2.0,
        )
    }

    /// Check if this rectangle contains a point (edges inclusive)
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right() && p.y >= self.top && p.y <= self.bottom()
    }

    /// The four corners, clockwise from top-left
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.left, self.top),
            Point::new(self.right(), self.top),
            Point::new(self.right(), self.bottom()),
            Point::new(self.left, self.bottom()),
        ]
    }
}

/// Space added around the source image on each side
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Padding {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Padding {
    /// Same padding on all four sides
    pub const fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }

    /// Scene-space position of the source image's top-left corner
    pub fn image_offset(&self) -> Point {
        Point::new(self.left, self.top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_normalizes_any_drag_direction() {
        let start = Point::new(100.0, 80.0);
        for end in [
            Point::new(140.0, 120.0),
            Point::new(60.0, 120.0),
            Point::new(140.0, 40.0),
            Point::new(60.0, 40.0),
        ] {
            let rect = Rect::from_corners(start, end);
            assert_eq!(rect.left, start.x.min(end.x));
            assert_eq!(rect.top, start.y.min(end.y));
            assert_eq!(rect.width, 40.0);
            assert_eq!(rect.height, 40.0);
        }
    }

    #[test]
    fn test_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.intersect(b), Some(Rect::new(5.0, 5.0, 5.0, 5.0)));
        assert_eq!(a.intersect(Rect::new(20.0, 20.0, 1.0, 1.0)), None);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let p = Point::new(1.0, 0.0).rotate(90.0);
        assert!(p.x.abs() < 1e-6);
        assert!((p.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_enclosing() {
        let rect = Rect::enclosing([Point::new(3.0, -1.0), Point::new(-2.0, 4.0)]);
        assert_eq!(rect, Some(Rect::new(-2.0, -1.0, 5.0, 5.0)));
        assert_eq!(Rect::enclosing(std::iter::empty()), None);
    }
}
