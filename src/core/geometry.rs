use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle. `x0`/`y0` are inclusive, `x1`/`y1` exclusive,
/// so `width() == x1 - x0`. A zero-area box stands for unknown geometry.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl BBox {
    /// Builds a box from two corners, swapping coordinates when needed so
    /// that `x0 <= x1` and `y0 <= y1` always hold.
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    pub fn width(&self) -> i32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> i32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    pub fn center(&self) -> (i32, i32) {
        (self.x0 + self.width() / 2, self.y0 + self.height() / 2)
    }

    /// Smallest box covering both. Empty boxes are the identity element, so a
    /// degenerate polygon never drags the union towards the origin.
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Whether `self` lies completely inside `outer`. An empty box is inside
    /// everything.
    pub fn is_within(&self, outer: &Self) -> bool {
        if self.is_empty() {
            return true;
        }
        self.x0 >= outer.x0 && self.y0 >= outer.y0 && self.x1 <= outer.x1 && self.y1 <= outer.y1
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self {
            x0: self.x0 + dx,
            y0: self.y0 + dy,
            x1: self.x1 + dx,
            y1: self.y1 + dy,
        }
    }

    /// HOCR `title` payload: `bbox x0 y0 x1 y1`.
    pub fn to_hocr(&self) -> String {
        format!("bbox {} {} {} {}", self.x0, self.y0, self.x1, self.y1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_corners() {
        let b = BBox::new(10, 20, 0, 5);
        assert_eq!(b, BBox::new(0, 5, 10, 20));
        assert_eq!(b.width(), 10);
        assert_eq!(b.height(), 15);
    }

    #[test]
    fn union_ignores_empty_boxes() {
        let a = BBox::new(10, 10, 20, 20);
        assert_eq!(a.union(&BBox::default()), a);
        assert_eq!(BBox::default().union(&a), a);
        assert_eq!(a.union(&BBox::new(0, 15, 12, 30)), BBox::new(0, 10, 20, 30));
    }

    #[test]
    fn containment() {
        let outer = BBox::new(0, 100, 50, 240);
        assert!(BBox::new(5, 120, 40, 200).is_within(&outer));
        assert!(!BBox::new(5, 90, 40, 200).is_within(&outer));
        assert!(BBox::default().is_within(&outer));
    }

    #[test]
    fn translation_round_trips() {
        let b = BBox::new(3, 7, 30, 70);
        assert_eq!(b.translate(12, -100).translate(-12, 100), b);
    }
}
