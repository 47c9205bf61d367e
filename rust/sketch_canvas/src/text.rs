//! Text Rasterization
//!
//! Shapes and scales glyphs with swash and turns them into a coverage mask
//! positioned on an alphabetic baseline, ready for the canvas to fill.

use std::path::Path;

use swash::scale::{Render, ScaleContext, Source};
use swash::shape::ShapeContext;
use swash::zeno::{Format, Vector};
use swash::FontRef;

use crate::error::FontError;
use crate::mask::{Mask, Rect};
use crate::shape::Point;

/// Glyphs are never rasterized larger than this multiple of the clip's
/// longer side
const MAX_SIZE_PER_CLIP: f32 = 2.0;

/// An owned font face plus the swash caches used to draw it
pub struct TextRenderer {
    data: Vec<u8>,
    index: usize,
    scale_context: ScaleContext,
    shape_context: ShapeContext,
}

impl TextRenderer {
    pub fn from_bytes(data: Vec<u8>, index: usize) -> Result<Self, FontError> {
        if FontRef::from_index(&data, index).is_none() {
            return Err(FontError::InvalidFace);
        }
        Ok(Self {
            data,
            index,
            scale_context: ScaleContext::new(),
            shape_context: ShapeContext::new(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, FontError> {
        let data = std::fs::read(path).map_err(|source| FontError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_bytes(data, 0)
    }

    /// First sans-serif face the system font database offers
    #[cfg(not(target_arch = "wasm32"))]
    pub fn system_sans_serif() -> Result<Self, FontError> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        let query = fontdb::Query {
            families: &[fontdb::Family::SansSerif],
            ..fontdb::Query::default()
        };
        let (data, index) = db
            .query(&query)
            .and_then(|id| db.with_face_data(id, |data, index| (data.to_vec(), index as usize)))
            .ok_or(FontError::NoSystemFont)?;
        Self::from_bytes(data, index)
    }

    /// Coverage of `text` drawn at `size` pixels with its baseline starting at
    /// `origin`, limited to `clip`. Glyphs that cannot reach `clip` are
    /// skipped without rendering.
    pub fn coverage(&mut self, text: &str, size: f32, origin: Point, clip: Rect) -> Mask {
        // Validated in the constructor
        let Some(font) = FontRef::from_index(&self.data, self.index) else {
            return Mask::covering(0, 0, 0, 0);
        };
        let limit = MAX_SIZE_PER_CLIP * clip.width().max(clip.height()) as f32;
        if size > limit {
            log::debug!("Text size {}px capped to {}px", size, limit);
        }
        let size = size.min(limit);

        let mut shaper = self.shape_context.builder(font).size(size).build();
        shaper.add_str(text);

        let mut scaler = self.scale_context.builder(font).size(size).hint(false).build();

        // Rendered glyph bitmaps with their canvas-space top-left corners
        let mut glyphs = Vec::new();
        let mut pen_x = origin.x;
        let reach = size * 2.0;
        shaper.shape_with(|cluster| {
            for glyph in cluster.glyphs {
                let x = pen_x + glyph.x;
                let y = origin.y - glyph.y;
                pen_x += glyph.advance;
                if x + reach < clip.left as f32
                    || x - reach > clip.right as f32
                    || y + reach < clip.top as f32
                    || y - reach > clip.bottom as f32
                {
                    continue;
                }

                let (col, dx) = split_subpixel(x);
                let (row, dy) = split_subpixel(y);
                let rendered = Render::new(&[Source::Outline])
                    .format(Format::Alpha)
                    .offset(Vector::new(dx, dy))
                    .render(&mut scaler, glyph.id);

                if let Some(image) = rendered {
                    let left = col + image.placement.left;
                    let top = row - image.placement.top;
                    glyphs.push((left, top, image));
                }
            }
        });

        let placed = glyphs
            .iter()
            .filter(|(_, _, image)| image.placement.width > 0 && image.placement.height > 0);
        let (mut left, mut top, mut right, mut bottom) = (i32::MAX, i32::MAX, i32::MIN, i32::MIN);
        for (x, y, image) in placed.clone() {
            left = left.min(*x);
            top = top.min(*y);
            right = right.max(x + image.placement.width as i32);
            bottom = bottom.max(y + image.placement.height as i32);
        }
        if left > right {
            return Mask::covering(0, 0, 0, 0);
        }

        let mut mask = Mask::covering(
            left.max(clip.left),
            top.max(clip.top),
            right.min(clip.right),
            bottom.min(clip.bottom),
        );
        for (x, y, image) in placed {
            let width = image.placement.width as usize;
            for (i, &alpha) in image.data.iter().enumerate() {
                if alpha > 0 {
                    let col = (i % width) as i32;
                    let row = (i / width) as i32;
                    mask.accumulate(x + col, y + row, alpha as f32 / 255.0);
                }
            }
        }
        log::debug!("Rasterized {:?} at {}px, bounds {:?}", text, size, mask.bounds());
        mask
    }
}

/// Whole pixel and the non-negative fraction left over, so that
/// `pixel as f32 + fraction == v` for negative positions too
fn split_subpixel(v: f32) -> (i32, f32) {
    let floor = v.floor();
    (floor as i32, v - floor)
}
