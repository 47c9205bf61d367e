//! Raster Canvas
//!
//! The drawing surface: an RGBA8 pixel buffer with stroke, fill, snapshot and
//! encode operations. All draw calls take a [`Style`] and rasterize into a
//! coverage [`Mask`] before compositing, so one call never double-blends
//! where its own geometry overlaps.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};

use crate::color::{blend_over, Rgb};
use crate::error::CanvasError;
use crate::export::ExportFormat;
use crate::mask::{Mask, Rect};
use crate::paint::Paint;
use crate::shape::{Point, Shape};
use crate::text::TextRenderer;
use crate::tool::Style;

/// Immutable full-canvas pixel buffer captured for history
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pixels: RgbaImage,
}

impl Snapshot {
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Heap size of the captured buffer
    pub fn byte_size(&self) -> usize {
        self.pixels.as_raw().len()
    }
}

pub struct Canvas {
    pixels: RgbaImage,
    background: Rgb,
}

impl Canvas {
    /// A blank canvas filled with `background`
    pub fn new(width: u32, height: u32, background: Rgb) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, background.to_rgba()),
            background,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    /// Blank the whole canvas back to the background color
    pub fn clear(&mut self) {
        let fill = self.background.to_rgba();
        self.pixels.pixels_mut().for_each(|px| *px = fill);
    }

    /// True if every pixel equals the background
    pub fn is_blank(&self) -> bool {
        let fill = self.background.to_rgba();
        self.pixels.pixels().all(|px| *px == fill)
    }

    /// Area worth rasterizing for a draw in `style`: the canvas itself, plus
    /// the fringe a shadow can blur back onto it
    fn clip(&self, style: &Style) -> Rect {
        let margin = style.shadow.map_or(0, |shadow| Mask::blur_margin(shadow.blur));
        Rect::of_size(self.width(), self.height()).expanded(margin)
    }

    /// One freehand segment, always flat colored
    pub fn stroke_segment(&mut self, from: Point, to: Point, style: &Style) {
        let mask = Mask::stroke_polyline(&[from, to], false, style.line_width, self.clip(style));
        self.draw_mask(&mask, &Paint::Solid(style.color), style);
    }

    /// Stroke a committed shape. A gradient, when enabled, applies to this
    /// call only.
    pub fn stroke_shape(&mut self, shape: &Shape, style: &Style) {
        let mask = shape.outline(style.line_width, self.clip(style));
        self.draw_mask(&mask, &shape.paint(style), style);
    }

    /// Fill `text` with its alphabetic baseline starting at `origin`
    pub fn fill_text(&mut self, text: &str, origin: Point, size: f32, style: &Style, font: &mut TextRenderer) {
        let mask = font.coverage(text, size, origin, self.clip(style));
        self.draw_mask(&mask, &Paint::Solid(style.color), style);
    }

    /// Composite coverage with the given paint at the style's global alpha,
    /// drawing the drop shadow first when the style has one.
    pub fn draw_mask(&mut self, mask: &Mask, paint: &Paint, style: &Style) {
        if mask.is_empty() {
            return;
        }
        if let Some(shadow) = style.shadow {
            let blurred = mask.blurred(shadow.blur);
            self.composite(&blurred, &Paint::Solid(shadow.color), style.alpha);
        }
        self.composite(mask, paint, style.alpha);
    }

    fn composite(&mut self, mask: &Mask, paint: &Paint, alpha: f32) {
        let (width, height) = (self.width() as i32, self.height() as i32);
        for (x, y, coverage) in mask.covered() {
            if x < 0 || y < 0 || x >= width || y >= height {
                continue;
            }
            let center = Point::new(x as f32 + 0.5, y as f32 + 0.5);
            let Some(color) = paint.color_at(center) else {
                continue;
            };
            blend_over(self.pixels.get_pixel_mut(x as u32, y as u32), color, coverage * alpha);
        }
    }

    /// Draw `image` scaled to cover the whole canvas, blended over what is
    /// already there
    pub fn draw_image_scaled(&mut self, image: &RgbaImage) {
        if image.dimensions() == self.pixels.dimensions() {
            imageops::overlay(&mut self.pixels, image, 0, 0);
        } else {
            let scaled = imageops::resize(image, self.width(), self.height(), FilterType::Triangle);
            imageops::overlay(&mut self.pixels, &scaled, 0, 0);
        }
    }

    /// Copy the current pixels into a new snapshot.
    ///
    /// The buffer is reserved fallibly so an exhausted heap shows up as
    /// [`CanvasError::Capture`] rather than an abort.
    pub fn snapshot(&self) -> Result<Snapshot, CanvasError> {
        let (width, height) = self.pixels.dimensions();
        let failed = || CanvasError::Capture { width, height };

        let raw = self.pixels.as_raw();
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(raw.len()).map_err(|_| failed())?;
        buffer.extend_from_slice(raw);
        let pixels = RgbaImage::from_raw(width, height, buffer).ok_or_else(failed)?;
        Ok(Snapshot { pixels })
    }

    /// Replace the canvas contents with a snapshot
    pub fn restore(&mut self, snapshot: &Snapshot) {
        if snapshot.pixels.dimensions() == self.pixels.dimensions() {
            self.pixels.copy_from_slice(snapshot.pixels.as_raw());
        } else {
            self.clear();
            self.draw_image_scaled(&snapshot.pixels);
        }
    }

    /// Encode the canvas. JPEG has no alpha channel, so it is dropped.
    pub fn encode(&self, format: ExportFormat, jpeg_quality: u8) -> Result<Vec<u8>, CanvasError> {
        let mut bytes = Vec::new();
        match format {
            ExportFormat::Png => PngEncoder::new(&mut bytes).write_image(
                self.pixels.as_raw(),
                self.width(),
                self.height(),
                ExtendedColorType::Rgba8,
            ),
            ExportFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgba8(self.pixels.clone()).to_rgb8();
                JpegEncoder::new_with_quality(&mut bytes, jpeg_quality.clamp(1, 100)).encode_image(&rgb)
            }
        }
        .map_err(CanvasError::Encode)?;
        Ok(bytes)
    }
}

/// Decode PNG or JPEG bytes into RGBA pixels
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, CanvasError> {
    let image = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CanvasError::Decode(image::ImageError::IoError(e)))?
        .decode()
        .map_err(CanvasError::Decode)?;
    Ok(image.to_rgba8())
}
