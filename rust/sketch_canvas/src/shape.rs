//! Canvas-space points and the committed shapes built from a drag gesture.

use crate::mask::{Mask, Rect};
use crate::paint::Paint;
use crate::tool::{Style, Tool};
use crate::color::Rgb;

/// Position in canvas space (pixels from top-left)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

/// A shape described by the anchor and release points of a drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Axis-aligned, corners at `from` and `to` in any order
    Rectangle { from: Point, to: Point },
    /// Centered on `center`, passing through `edge`
    Circle { center: Point, edge: Point },
    Line { from: Point, to: Point },
}

impl Shape {
    /// The shape a shape tool produces for a drag, `None` for other tools
    pub fn from_drag(tool: Tool, anchor: Point, release: Point) -> Option<Self> {
        match tool {
            Tool::Rectangle => Some(Shape::Rectangle { from: anchor, to: release }),
            Tool::Circle => Some(Shape::Circle { center: anchor, edge: release }),
            Tool::Line => Some(Shape::Line { from: anchor, to: release }),
            Tool::Brush | Tool::Eraser | Tool::Text => None,
        }
    }

    /// Coverage of the stroked outline within `clip`
    pub fn outline(&self, line_width: f32, clip: Rect) -> Mask {
        match *self {
            Shape::Rectangle { from, to } => {
                let (left, right) = (from.x.min(to.x), from.x.max(to.x));
                let (top, bottom) = (from.y.min(to.y), from.y.max(to.y));
                let corners = [
                    Point::new(left, top),
                    Point::new(right, top),
                    Point::new(right, bottom),
                    Point::new(left, bottom),
                ];
                Mask::stroke_polyline(&corners, true, line_width, clip)
            }
            Shape::Circle { center, edge } => {
                Mask::stroke_circle(center, center.distance(edge), line_width, clip)
            }
            Shape::Line { from, to } => Mask::stroke_polyline(&[from, to], false, line_width, clip),
        }
    }

    /// Paint for this shape's stroke. With gradients on, rectangles and lines
    /// ramp along the drag, circles ramp radially from the center.
    pub fn paint(&self, style: &Style) -> Paint {
        if !style.gradient {
            return Paint::Solid(style.color);
        }
        match *self {
            Shape::Rectangle { from, to } | Shape::Line { from, to } => Paint::Linear {
                start: from,
                end: to,
                from: style.color,
                to: Rgb::WHITE,
            },
            Shape::Circle { center, edge } => Paint::Radial {
                center,
                radius: center.distance(edge),
                from: style.color,
                to: Rgb::WHITE,
            },
        }
    }
}
