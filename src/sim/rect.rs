//! Axis-aligned rectangle geometry for sprites in pixel space
//!
//! Bricks, power-ups and the paddle are compared as rectangles:
//! - pickups overlap the paddle rect
//! - bomb explosions hit every brick whose rect meets an inflated rect

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A rectangle given by its top-left corner and size (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Build a rect of the given size centered on `center`
    pub fn from_center(center: Vec2, w: f32, h: f32) -> Self {
        Self {
            x: center.x - w / 2.0,
            y: center.y - h / 2.0,
            w,
            h,
        }
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Move the rect so its center lands on `center`
    pub fn set_center(&mut self, center: Vec2) {
        self.x = center.x - self.w / 2.0;
        self.y = center.y - self.h / 2.0;
    }

    /// Grow the rect by `dw` total width and `dh` total height, keeping its center
    pub fn inflate(&self, dw: f32, dh: f32) -> Self {
        Self {
            x: self.x - dw / 2.0,
            y: self.y - dh / 2.0,
            w: self.w + dw,
            h: self.h + dh,
        }
    }

    /// Overlap test; rects that only share an edge do not intersect
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Rect::new(5.0, 5.0, 10.0, 10.0)));
        assert!(!a.intersects(&Rect::new(20.0, 0.0, 10.0, 10.0)));
        // Touching edges only
        assert!(!a.intersects(&Rect::new(10.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn test_inflate_keeps_center() {
        let a = Rect::new(100.0, 50.0, 40.0, 20.0);
        let b = a.inflate(50.0, 50.0);
        assert_eq!(a.center(), b.center());
        assert_eq!(b.w, 90.0);
        assert_eq!(b.h, 70.0);
        // A neighbour two gaps away is inside the blast
        assert!(b.intersects(&Rect::new(142.0, 50.0, 40.0, 20.0)));
    }
}
