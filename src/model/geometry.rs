//! Geometry primitives shared by document and viewport space.
//!
//! The types here carry no notion of which space they live in; the
//! `transform` module is the only place that converts between the two.

use serde::{Deserialize, Serialize};

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Component-wise difference `self - origin`.
    pub fn delta_from(&self, origin: Point) -> (f32, f32) {
        (self.x - origin.x, self.y - origin.y)
    }
}

/// An axis-aligned rectangle stored as its four edges.
///
/// Valid rectangles satisfy `right > left` and `bottom > top`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a rectangle from its top-left corner and size.
    pub fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Square of side `size` centered on `center`.
    pub fn centered_square(center: Point, size: f32) -> Self {
        let half = size / 2.0;
        Self::new(
            center.x - half,
            center.y - half,
            center.x + half,
            center.y + half,
        )
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Whether both edges are ordered (`right > left`, `bottom > top`).
    pub fn is_valid(&self) -> bool {
        self.right > self.left && self.bottom > self.top
    }

    /// Check if a point is inside the rectangle (edges inclusive).
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.top && point.y <= self.bottom
    }

    /// Move the rectangle without changing its size.
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.left + dx, self.top + dy, self.right + dx, self.bottom + dy)
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }

    /// Position of the given corner.
    pub fn corner(&self, handle: Handle) -> Point {
        match handle {
            Handle::TopLeft => Point::new(self.left, self.top),
            Handle::TopRight => Point::new(self.right, self.top),
            Handle::BottomLeft => Point::new(self.left, self.bottom),
            Handle::BottomRight => Point::new(self.right, self.bottom),
        }
    }
}

/// A resize handle at one corner of an annotation's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Handle {
    /// All handles in hit-test order.
    pub fn all() -> &'static [Handle] {
        &[
            Handle::TopLeft,
            Handle::TopRight,
            Handle::BottomLeft,
            Handle::BottomRight,
        ]
    }

    /// Display name of the handle (`top-left`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            Handle::TopLeft => "top-left",
            Handle::TopRight => "top-right",
            Handle::BottomLeft => "bottom-left",
            Handle::BottomRight => "bottom-right",
        }
    }

    /// The diagonally opposite corner, which stays fixed while this handle is dragged.
    pub fn opposite(&self) -> Handle {
        match self {
            Handle::TopLeft => Handle::BottomRight,
            Handle::TopRight => Handle::BottomLeft,
            Handle::BottomLeft => Handle::TopRight,
            Handle::BottomRight => Handle::TopLeft,
        }
    }

    /// Whether dragging this handle to the right grows the rectangle.
    pub fn grows_rightward(&self) -> bool {
        matches!(self, Handle::TopRight | Handle::BottomRight)
    }
}
