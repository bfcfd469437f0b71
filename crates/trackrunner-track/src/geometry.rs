//! Axis-aligned rectangles used to describe track layouts
//!
//! All containment tests are strict: a point lying exactly on an edge is
//! not inside the rectangle.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle with `min` as the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    /// Create from two opposite corners (normalized so `min <= max`)
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create from a top-left corner and a size
    pub fn from_origin_size(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(Vec2::new(x, y), Vec2::new(x + width, y + height))
    }

    /// Create a square of half-extent `half` centered on `center`
    pub fn around(center: Vec2, half: f32) -> Self {
        Self::new(center - Vec2::splat(half), center + Vec2::splat(half))
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Strict interior test. NaN coordinates are never inside.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x > self.min.x && x < self.max.x && y > self.min.y && y < self.max.y
    }

    /// True if `other` lies entirely inside this rectangle's interior
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.min.x > self.min.x
            && other.max.x < self.max.x
            && other.min.y > self.min.y
            && other.max.y < self.max.y
    }

    /// True if the open interiors of both rectangles overlap
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_normalizes_corners() {
        let rect = Rect::new(Vec2::new(10.0, 20.0), Vec2::new(0.0, 5.0));
        assert_eq!(rect.min, Vec2::new(0.0, 5.0));
        assert_eq!(rect.max, Vec2::new(10.0, 20.0));
        assert_eq!(rect.width(), 10.0);
        assert_eq!(rect.height(), 15.0);
    }

    #[test]
    fn test_contains_is_strict() {
        let rect = Rect::from_origin_size(0.0, 0.0, 10.0, 10.0);
        assert!(rect.contains(5.0, 5.0));
        assert!(!rect.contains(0.0, 5.0));
        assert!(!rect.contains(10.0, 5.0));
        assert!(!rect.contains(5.0, 10.0));
        assert!(!rect.contains(f32::NAN, 5.0));
    }

    #[test]
    fn test_around_center() {
        let rect = Rect::around(Vec2::new(680.0, 480.0), 20.0);
        assert_eq!(rect.center(), Vec2::new(680.0, 480.0));
        assert!(rect.contains(699.0, 499.0));
        assert!(!rect.contains(700.0, 480.0));
    }

    #[test]
    fn test_contains_rect_and_intersects() {
        let outer = Rect::from_origin_size(100.0, 100.0, 600.0, 400.0);
        let inner = Rect::from_origin_size(300.0, 250.0, 200.0, 100.0);
        assert!(outer.contains_rect(&inner));
        assert!(!inner.contains_rect(&outer));
        assert!(outer.intersects(&inner));

        // Touching edges do not overlap
        let left = Rect::from_origin_size(0.0, 0.0, 10.0, 10.0);
        let right = Rect::from_origin_size(10.0, 0.0, 10.0, 10.0);
        assert!(!left.intersects(&right));
    }
}
