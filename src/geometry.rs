//! Axis-aligned boxes in map pixel space

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    /// Two boxes overlap unless they are separated on either axis.
    /// Touching edges count as overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        !(self.right() < other.x
            || self.x > other.right()
            || self.bottom() < other.y
            || self.y > other.bottom())
    }

    /// Whether a box of `size` whose top-left sits at `(x, y)` fits entirely
    /// inside this rectangle.
    pub fn holds_box_at(&self, x: i32, y: i32, size: (i32, i32)) -> bool {
        let (w, h) = size;
        x >= self.x && x <= self.right() - w && y >= self.y && y <= self.bottom() - h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_is_inclusive_of_edges() {
        let a = Rect::new(0, 0, 10, 10);
        assert!(a.overlaps(&Rect::new(10, 10, 5, 5)));
        assert!(!a.overlaps(&Rect::new(11, 0, 5, 5)));
        assert!(!a.overlaps(&Rect::new(0, 11, 5, 5)));
        assert!(a.overlaps(&Rect::new(-4, -4, 5, 5)));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let a = Rect::new(60, 60, 44, 56);
        let b = Rect::new(90, 100, 28, 28);
        assert_eq!(a.overlaps(&b), b.overlaps(&a));
        assert!(a.overlaps(&b));
    }

    #[test]
    fn test_holds_box_at() {
        let zone = Rect::new(20, 20, 340, 180);
        assert!(zone.holds_box_at(20, 20, (44, 56)));
        assert!(zone.holds_box_at(316, 144, (44, 56)));
        assert!(!zone.holds_box_at(317, 144, (44, 56)));
        assert!(!zone.holds_box_at(19, 40, (44, 56)));
    }
}
