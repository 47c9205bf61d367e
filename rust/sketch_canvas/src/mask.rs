//! Coverage Masks
//!
//! A stroke or fill is first rasterized into a coverage mask (0.0-1.0 per
//! pixel) and only then composited onto the canvas. Overlapping parts of one
//! draw call therefore never accumulate alpha, which is how a single canvas
//! `stroke()` behaves.
//!
//! Masks only span the bounding box of what they cover, clipped to the area
//! a draw can affect, so a short freehand segment touches a few hundred
//! pixels and a huge one never more than the canvas.

use crate::shape::Point;

/// Pixel rectangle `[left, right) x [top, bottom)` in canvas space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    /// Every pixel of a `width` x `height` canvas
    pub fn of_size(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: i32::try_from(width).unwrap_or(i32::MAX),
            bottom: i32::try_from(height).unwrap_or(i32::MAX),
        }
    }

    /// Grown by `by` pixels on every side
    pub fn expanded(self, by: i32) -> Self {
        Self {
            left: self.left.saturating_sub(by),
            top: self.top.saturating_sub(by),
            right: self.right.saturating_add(by),
            bottom: self.bottom.saturating_add(by),
        }
    }

    /// Pixels touched by the float box `[min, max]`, limited to `self`.
    /// Float to int casts saturate, so arbitrarily large boxes are fine.
    fn clip_box(self, min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            left: (min_x.floor() as i32).max(self.left),
            top: (min_y.floor() as i32).max(self.top),
            right: (max_x.ceil() as i32).saturating_add(1).min(self.right),
            bottom: (max_y.ceil() as i32).saturating_add(1).min(self.bottom),
        }
    }

    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left).max(0)
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top).max(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    /// Canvas-space position of the top-left mask pixel
    left: i32,
    top: i32,
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Mask {
    /// An empty (zero coverage) mask spanning `[left, right) x [top, bottom)`
    pub fn covering(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        let width = right.saturating_sub(left).max(0) as usize;
        let height = bottom.saturating_sub(top).max(0) as usize;
        Self {
            left,
            top,
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    fn within(rect: Rect) -> Self {
        Self::covering(rect.left, rect.top, rect.right, rect.bottom)
    }

    /// Round-capped, round-joined stroke through `points`, rasterized only
    /// inside `clip`.
    ///
    /// Each consecutive pair is stroked as a capsule; `closed` adds the
    /// segment from the last point back to the first.
    pub fn stroke_polyline(points: &[Point], closed: bool, line_width: f32, clip: Rect) -> Self {
        let half = line_width / 2.0;
        let Some(first) = points.first() else {
            return Self::covering(0, 0, 0, 0);
        };

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let reach = half + 1.0;
        let mut mask = Self::within(clip.clip_box(
            min_x - reach,
            min_y - reach,
            max_x + reach,
            max_y + reach,
        ));

        let mut segments: Vec<(Point, Point)> = points.windows(2).map(|w| (w[0], w[1])).collect();
        if closed && points.len() > 2 {
            segments.push((points[points.len() - 1], points[0]));
        }
        if segments.is_empty() {
            // A single point still leaves a round dot
            segments.push((*first, *first));
        }

        mask.fill_with(|p| {
            let d = segments
                .iter()
                .map(|(a, b)| distance_to_segment(p, *a, *b))
                .fold(f32::INFINITY, f32::min);
            edge_coverage(half - d)
        });
        mask
    }

    /// Outline of a full circle, rasterized only inside `clip`
    pub fn stroke_circle(center: Point, radius: f32, line_width: f32, clip: Rect) -> Self {
        let half = line_width / 2.0;
        let reach = radius + half + 1.0;
        let mut mask = Self::within(clip.clip_box(
            center.x - reach,
            center.y - reach,
            center.x + reach,
            center.y + reach,
        ));
        mask.fill_with(|p| {
            let d = (p.distance(center) - radius).abs();
            edge_coverage(half - d)
        });
        mask
    }

    /// Evaluate `coverage` at every pixel center
    fn fill_with(&mut self, coverage: impl Fn(Point) -> f32) {
        for row in 0..self.height {
            for col in 0..self.width {
                let p = Point::new(
                    (self.left + col as i32) as f32 + 0.5,
                    (self.top + row as i32) as f32 + 0.5,
                );
                self.data[row * self.width + col] = coverage(p);
            }
        }
    }

    /// Take the maximum of the existing and the given coverage at a
    /// canvas-space pixel. Pixels outside the mask are ignored.
    pub fn accumulate(&mut self, x: i32, y: i32, coverage: f32) {
        if let Some(i) = self.index(x, y) {
            let slot = &mut self.data[i];
            *slot = slot.max(coverage.clamp(0.0, 1.0));
        }
    }

    /// Coverage at a canvas-space pixel, zero outside the mask
    pub fn get(&self, x: i32, y: i32) -> f32 {
        self.index(x, y).map_or(0.0, |i| self.data[i])
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let col = x - self.left;
        let row = y - self.top;
        if col < 0 || row < 0 || col as usize >= self.width || row as usize >= self.height {
            return None;
        }
        Some(row as usize * self.width + col as usize)
    }

    /// Canvas-space bounds as `(left, top, right, bottom)`, exclusive max
    pub fn bounds(&self) -> (i32, i32, i32, i32) {
        (
            self.left,
            self.top,
            self.left + self.width as i32,
            self.top + self.height as i32,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&c| c <= 0.0)
    }

    /// Iterate `(x, y, coverage)` over non-zero pixels in canvas space
    pub fn covered(&self) -> impl Iterator<Item = (i32, i32, f32)> + '_ {
        self.data.iter().enumerate().filter(|&(_, &c)| c > 0.0).map(move |(i, &c)| {
            (
                self.left + (i % self.width) as i32,
                self.top + (i / self.width) as i32,
                c,
            )
        })
    }

    /// Pixels a shadow with the given `blur` spreads past its shape
    pub fn blur_margin(blur: f32) -> i32 {
        blur_radius(blur).map_or(0, |radius| (radius * 3) as i32)
    }

    /// Approximate Gaussian blur with `sigma = blur / 2`, the convention
    /// 2D canvases use for `shadowBlur`. Returns a larger mask that includes
    /// the blurred fringe.
    pub fn blurred(&self, blur: f32) -> Self {
        let Some(radius) = blur_radius(blur) else {
            return self.clone();
        };
        if self.width == 0 || self.height == 0 {
            return self.clone();
        }

        let margin = (radius * 3) as i32;
        let (left, top, right, bottom) = self.bounds();
        let mut out = Self::covering(left - margin, top - margin, right + margin, bottom + margin);
        for (x, y, c) in self.covered() {
            if let Some(i) = out.index(x, y) {
                out.data[i] = c;
            }
        }

        let mut scratch = vec![0.0; out.data.len()];
        for _ in 0..3 {
            box_blur_rows(&out.data, &mut scratch, out.width, out.height, radius);
            box_blur_cols(&scratch, &mut out.data, out.width, out.height, radius);
        }
        out
    }
}

/// Box radius for three passes approximating `sigma = blur / 2`; three
/// passes of radius r give variance 3 * ((2r+1)^2 - 1) / 12
fn blur_radius(blur: f32) -> Option<usize> {
    let sigma = blur / 2.0;
    if sigma.is_nan() || sigma <= 0.0 {
        return None;
    }
    Some((((4.0 * sigma * sigma + 1.0).sqrt() - 1.0) / 2.0).round().max(1.0) as usize)
}

/// Anti-aliased coverage from the signed distance to a shape edge
/// (positive inside), using a one-pixel ramp.
#[inline]
fn edge_coverage(signed_distance: f32) -> f32 {
    (signed_distance + 0.5).clamp(0.0, 1.0)
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let (abx, aby) = (b.x - a.x, b.y - a.y);
    let len_sq = abx * abx + aby * aby;
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * abx + (p.y - a.y) * aby) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + abx * t, a.y + aby * t))
}

fn box_blur_rows(src: &[f32], dst: &mut [f32], width: usize, height: usize, radius: usize) {
    let norm = 1.0 / (2 * radius + 1) as f32;
    for row in 0..height {
        let line = &src[row * width..(row + 1) * width];
        let out = &mut dst[row * width..(row + 1) * width];
        let mut sum: f32 = line.iter().take(radius + 1).sum();
        for x in 0..width {
            out[x] = sum * norm;
            if x + radius + 1 < width {
                sum += line[x + radius + 1];
            }
            if x >= radius {
                sum -= line[x - radius];
            }
        }
    }
}

fn box_blur_cols(src: &[f32], dst: &mut [f32], width: usize, height: usize, radius: usize) {
    let norm = 1.0 / (2 * radius + 1) as f32;
    for col in 0..width {
        let at = |row: usize| src[row * width + col];
        let mut sum: f32 = (0..height.min(radius + 1)).map(at).sum();
        for y in 0..height {
            dst[y * width + col] = sum * norm;
            if y + radius + 1 < height {
                sum += at(y + radius + 1);
            }
            if y >= radius {
                sum -= at(y - radius);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AREA: Rect = Rect {
        left: -100,
        top: -100,
        right: 200,
        bottom: 200,
    };

    #[test]
    fn test_segment_covers_its_midpoint() {
        let mask = Mask::stroke_polyline(&[Point::new(10.0, 10.0), Point::new(50.0, 50.0)], false, 3.0, AREA);
        assert_eq!(mask.get(30, 30), 1.0);
        // Well off the diagonal
        assert_eq!(mask.get(30, 40), 0.0);
    }

    #[test]
    fn test_round_cap_extends_past_endpoint() {
        let mask = Mask::stroke_polyline(&[Point::new(10.5, 10.5), Point::new(20.5, 10.5)], false, 6.0, AREA);
        // Two pixels beyond the end, within the cap radius of 3
        assert!(mask.get(22, 10) > 0.9);
        assert_eq!(mask.get(25, 10), 0.0);
    }

    #[test]
    fn test_single_point_leaves_a_dot() {
        let mask = Mask::stroke_polyline(&[Point::new(5.5, 5.5)], false, 4.0, AREA);
        assert_eq!(mask.get(5, 5), 1.0);
        assert!(!mask.is_empty());
    }

    #[test]
    fn test_closed_polyline_strokes_last_edge() {
        let square = [
            Point::new(0.5, 0.5),
            Point::new(20.5, 0.5),
            Point::new(20.5, 20.5),
            Point::new(0.5, 20.5),
        ];
        let open = Mask::stroke_polyline(&square, false, 2.0, AREA);
        let closed = Mask::stroke_polyline(&square, true, 2.0, AREA);
        assert_eq!(open.get(0, 10), 0.0);
        assert_eq!(closed.get(0, 10), 1.0);
        // The interior stays empty
        assert_eq!(closed.get(10, 10), 0.0);
    }

    #[test]
    fn test_circle_is_hollow() {
        let mask = Mask::stroke_circle(Point::new(50.5, 50.5), 20.0, 2.0, AREA);
        assert_eq!(mask.get(70, 50), 1.0);
        assert_eq!(mask.get(50, 30), 1.0);
        assert_eq!(mask.get(50, 50), 0.0);
    }

    #[test]
    fn test_accumulate_keeps_maximum() {
        let mut mask = Mask::covering(0, 0, 4, 4);
        mask.accumulate(1, 1, 0.7);
        mask.accumulate(1, 1, 0.3);
        mask.accumulate(9, 9, 1.0);
        assert_eq!(mask.get(1, 1), 0.7);
        assert_eq!(mask.get(9, 9), 0.0);
    }

    #[test]
    fn test_blur_spreads_and_preserves_energy() {
        let mut mask = Mask::covering(0, 0, 11, 11);
        mask.accumulate(5, 5, 1.0);
        let blurred = mask.blurred(10.0);

        let (left, top, right, bottom) = blurred.bounds();
        assert!(left < 0 && top < 0 && right > 11 && bottom > 11);
        assert!(blurred.get(5, 5) < 1.0);
        assert!(blurred.get(8, 5) > 0.0);

        let total: f32 = blurred.covered().map(|(_, _, c)| c).sum();
        assert!((total - 1.0).abs() < 0.01, "blur lost energy: {total}");
    }

    #[test]
    fn test_zero_blur_is_identity() {
        let mask = Mask::stroke_circle(Point::new(10.0, 10.0), 5.0, 1.0, AREA);
        assert_eq!(mask.blurred(0.0), mask);
    }

    #[test]
    fn test_huge_stroke_stays_inside_clip() {
        let clip = Rect::of_size(40, 30).expanded(15);
        let mask = Mask::stroke_polyline(&[Point::new(5.0, 20.0), Point::new(6.0, 20.0)], false, 1.0e9, clip);
        assert_eq!(mask.bounds(), (-15, -15, 55, 45));
        assert_eq!(mask.get(0, 0), 1.0);
        assert_eq!(mask.get(39, 29), 1.0);

        let ring = Mask::stroke_circle(Point::new(20.0, 15.0), 3.0e9, 2.0, clip);
        assert_eq!(ring.bounds(), (-15, -15, 55, 45));
        assert!(ring.is_empty());
    }

    #[test]
    fn test_stroke_outside_clip_is_empty() {
        let clip = Rect::of_size(40, 30);
        let mask = Mask::stroke_polyline(&[Point::new(500.0, 500.0), Point::new(600.0, 500.0)], false, 4.0, clip);
        let (left, top, right, bottom) = mask.bounds();
        assert!(right <= left || bottom <= top);
        assert_eq!(mask.covered().count(), 0);
    }

    #[test]
    fn test_blur_margin_matches_blurred_growth() {
        assert_eq!(Mask::blur_margin(0.0), 0);
        assert_eq!(Mask::blur_margin(10.0), 15);

        let mut mask = Mask::covering(0, 0, 4, 4);
        mask.accumulate(1, 1, 1.0);
        let (left, _, right, _) = mask.blurred(10.0).bounds();
        assert_eq!(left, -Mask::blur_margin(10.0));
        assert_eq!(right, 4 + Mask::blur_margin(10.0));
    }
}
