//! Fill sources for coverage masks: a flat color or a two-stop gradient.

use crate::color::Rgb;
use crate::shape::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    Solid(Rgb),
    /// Color ramp along `start -> end`, padded beyond both ends
    Linear {
        start: Point,
        end: Point,
        from: Rgb,
        to: Rgb,
    },
    /// Color ramp from `center` (t = 0) out to `radius` (t = 1), padded beyond
    Radial {
        center: Point,
        radius: f32,
        from: Rgb,
        to: Rgb,
    },
}

impl Paint {
    /// Color at a canvas-space position.
    ///
    /// A degenerate gradient (zero length or zero radius) paints nothing and
    /// yields `None`.
    pub fn color_at(&self, p: Point) -> Option<Rgb> {
        match *self {
            Paint::Solid(color) => Some(color),
            Paint::Linear { start, end, from, to } => {
                let (dx, dy) = (end.x - start.x, end.y - start.y);
                let len_sq = dx * dx + dy * dy;
                if len_sq == 0.0 {
                    return None;
                }
                let t = ((p.x - start.x) * dx + (p.y - start.y) * dy) / len_sq;
                Some(from.lerp(to, t))
            }
            Paint::Radial { center, radius, from, to } => {
                if radius <= 0.0 {
                    return None;
                }
                Some(from.lerp(to, p.distance(center) / radius))
            }
        }
    }
}
