//! Freehand signature capture.
//!
//! Strokes are recorded as polylines in pad pixel coordinates and rasterized
//! on demand into a transparent PNG cropped to the ink.

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

use crate::constants::SIGNATURE_PAD_SIZE;
use crate::error::SignatureError;
use crate::model::Point;

/// Transparent margin kept around the ink when cropping.
const CROP_PADDING: u32 = 10;

const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// A drawing surface that records pen strokes.
#[derive(Debug, Clone)]
pub struct SignaturePad {
    width: u32,
    height: u32,
    strokes: Vec<Vec<Point>>,
    drawing: bool,
}

impl Default for SignaturePad {
    fn default() -> Self {
        Self::new(SIGNATURE_PAD_SIZE.0, SIGNATURE_PAD_SIZE.1)
    }
}

impl SignaturePad {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            strokes: Vec::new(),
            drawing: false,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pen down at `point`.
    pub fn begin_stroke(&mut self, point: Point) {
        self.strokes.push(vec![point]);
        self.drawing = true;
    }

    /// Pen moved. Ignored unless a stroke is in progress.
    pub fn extend_stroke(&mut self, point: Point) {
        if !self.drawing {
            return;
        }
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.push(point);
        }
    }

    /// Pen up.
    pub fn end_stroke(&mut self) {
        self.drawing = false;
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.drawing = false;
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    /// Rasterize all strokes onto a full-size transparent canvas.
    pub fn rasterize(&self) -> RgbaImage {
        let mut canvas = RgbaImage::new(self.width, self.height);
        for stroke in &self.strokes {
            match stroke.as_slice() {
                [] => {}
                [dot] => {
                    draw_filled_circle_mut(
                        &mut canvas,
                        (dot.x.round() as i32, dot.y.round() as i32),
                        1,
                        INK,
                    );
                }
                points => {
                    for pair in points.windows(2) {
                        draw_pen_segment(&mut canvas, pair[0], pair[1]);
                    }
                }
            }
        }
        canvas
    }

    /// Encode the signature as a PNG cropped to the ink plus padding.
    pub fn to_png(&self) -> Result<Vec<u8>, SignatureError> {
        let canvas = self.rasterize();
        let (left, top, right, bottom) = ink_bounds(&canvas).ok_or(SignatureError::Empty)?;

        let left = left.saturating_sub(CROP_PADDING);
        let top = top.saturating_sub(CROP_PADDING);
        let right = (right + CROP_PADDING).min(self.width - 1);
        let bottom = (bottom + CROP_PADDING).min(self.height - 1);
        let cropped =
            image::imageops::crop_imm(&canvas, left, top, right - left + 1, bottom - top + 1)
                .to_image();

        let mut png = Vec::new();
        cropped.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        log::debug!(
            "✍️ Signature rasterized: {} strokes, {}x{}",
            self.strokes.len(),
            cropped.width(),
            cropped.height()
        );
        Ok(png)
    }
}

/// A 2 px wide line: the segment plus copies shifted one pixel right and down.
fn draw_pen_segment(canvas: &mut RgbaImage, from: Point, to: Point) {
    for (ox, oy) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)] {
        draw_line_segment_mut(canvas, (from.x + ox, from.y + oy), (to.x + ox, to.y + oy), INK);
    }
}

/// Inclusive pixel bounds of all non-transparent pixels.
fn ink_bounds(canvas: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in canvas.enumerate_pixels() {
        if pixel[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((l, t, r, b)) => (l.min(x), t.min(y), r.max(x), b.max(y)),
        });
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_size() {
        assert_eq!(SignaturePad::default().size(), (400, 200));
    }

    #[test]
    fn test_empty_pad_has_no_png() {
        let pad = SignaturePad::default();
        assert!(pad.is_empty());
        assert!(matches!(pad.to_png(), Err(SignatureError::Empty)));
    }

    #[test]
    fn test_extend_without_begin_is_ignored() {
        let mut pad = SignaturePad::default();
        pad.extend_stroke(Point::new(10.0, 10.0));
        assert!(pad.is_empty());

        pad.begin_stroke(Point::new(10.0, 10.0));
        pad.end_stroke();
        pad.extend_stroke(Point::new(50.0, 50.0));
        assert_eq!(pad.stroke_count(), 1);
    }

    #[test]
    fn test_png_cropped_to_ink() {
        let mut pad = SignaturePad::default();
        pad.begin_stroke(Point::new(100.0, 100.0));
        pad.extend_stroke(Point::new(150.0, 100.0));
        pad.end_stroke();

        let png = pad.to_png().unwrap();
        let image = image::load_from_memory(&png).unwrap().to_rgba8();
        let ink_width = image.width() - 2 * CROP_PADDING;
        assert!((51..=52).contains(&ink_width));
        assert_eq!(image.height(), 2 + 2 * CROP_PADDING);
        assert_eq!(image.get_pixel(0, 0)[3], 0);
        assert_eq!(*image.get_pixel(CROP_PADDING + 20, CROP_PADDING), INK);
    }

    #[test]
    fn test_crop_clamped_at_canvas_edge() {
        let mut pad = SignaturePad::new(50, 50);
        pad.begin_stroke(Point::new(0.0, 0.0));
        pad.extend_stroke(Point::new(5.0, 5.0));
        pad.end_stroke();

        let png = pad.to_png().unwrap();
        let image = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(*image.get_pixel(0, 0), INK);
        assert!(image.width() <= 50 && image.height() <= 50);
    }

    #[test]
    fn test_clear() {
        let mut pad = SignaturePad::default();
        pad.begin_stroke(Point::new(1.0, 1.0));
        pad.clear();
        assert!(pad.is_empty());
        assert!(pad.rasterize().pixels().all(|p| p[3] == 0));
    }
}
