use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn default() -> Self {
        Point { x: 0.0, y: 0.0 }
    }
    pub fn new(_x: f64, _y: f64) -> Self {
        Point { x: _x, y: _y }
    }
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned bounding box in integer pixel coordinates.
///
/// Both corners are inclusive: a box spanning columns 0..=10 has `width == 11`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn default() -> Self {
        Rect {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        }
    }
    pub fn new(_x: i32, _y: i32, _width: i32, _height: i32) -> Self {
        Rect {
            x: _x,
            y: _y,
            width: _width,
            height: _height,
        }
    }
    /// Creates box from its inclusive corners
    ///
    /// Basic usage:
    ///
    /// ```
    /// use combine_annotations::utils::Rect;
    /// let rect = Rect::from_corners(0, 0, 10, 10);
    /// assert_eq!(rect.width, 11);
    /// assert_eq!(rect.right(), 10);
    /// ```
    pub fn from_corners(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Rect {
            x: left,
            y: top,
            width: right.saturating_sub(left).saturating_add(1),
            height: bottom.saturating_sub(top).saturating_add(1),
        }
    }
    /// Smallest integer box enclosing the given coordinate extents (floor for minimums, ceil for maximums)
    pub fn from_extents(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Rect::from_corners(
            min_x.floor() as i32,
            min_y.floor() as i32,
            max_x.ceil() as i32,
            max_y.ceil() as i32,
        )
    }
    /// Bounding box of a point list. Returns None for an empty list.
    pub fn enclosing(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (min_x, min_y, max_x, max_y) = points.iter().fold(
            (first.x, first.y, first.x, first.y),
            |(min_x, min_y, max_x, max_y), pt| {
                (min_x.min(pt.x), min_y.min(pt.y), max_x.max(pt.x), max_y.max(pt.y))
            },
        );
        Some(Rect::from_extents(min_x, min_y, max_x, max_y))
    }
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width).saturating_sub(1)
    }
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height).saturating_sub(1)
    }
    /// Corners in ring order: (left,top), (right,top), (right,bottom), (left,bottom)
    pub fn corners(&self) -> [Point; 4] {
        let (left, top) = (self.x as f64, self.y as f64);
        let (right, bottom) = (self.right() as f64, self.bottom() as f64);
        [
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
        ]
    }
}
