//! Frame composition: page bitmap, annotations and selection chrome.
//!
//! The renderer produces a finished RGBA frame the host can blit as-is. Text
//! is the one thing it does not rasterize; instructional strings are returned
//! as [`Label`]s with positions so the host can draw them in its own font.

use image::imageops;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
    draw_polygon_mut,
};
use imageproc::point::Point as PixelPoint;
use imageproc::rect::Rect as PixelRect;

use crate::image_cache::ImageCache;
use crate::interaction::handle_rect;
use crate::model::{Annotation, AnnotationId, Handle, Point, Rect};
use crate::transform::to_viewport;

/// Text the host should draw on top of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    /// Center of the text, in frame pixels.
    pub position: Point,
    /// Suggested font size in pixels.
    pub size: f32,
    /// Primary (larger, darker) or secondary text.
    pub primary: bool,
}

/// A composited frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbaImage,
    pub labels: Vec<Label>,
}

/// Colors used when drawing.
#[derive(Debug, Clone)]
pub struct RenderStyle {
    pub background: Rgba<u8>,
    pub page_border: Rgba<u8>,
    pub selection: Rgba<u8>,
    pub handle_fill: Rgba<u8>,
    pub hover: Rgba<u8>,
    pub drop_panel: Rgba<u8>,
    pub drop_border: Rgba<u8>,
    pub drop_icon: Rgba<u8>,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            background: Rgba([240, 240, 240, 255]),
            page_border: Rgba([160, 160, 160, 255]),
            selection: Rgba([0, 120, 215, 255]),
            handle_fill: Rgba([255, 255, 255, 255]),
            hover: Rgba([150, 190, 240, 255]),
            drop_panel: Rgba([250, 250, 250, 255]),
            drop_border: Rgba([170, 170, 170, 255]),
            drop_icon: Rgba([130, 130, 130, 255]),
        }
    }
}

/// Composites frames for the current page.
#[derive(Debug, Clone)]
pub struct Renderer {
    style: RenderStyle,
    /// Frame size used when no document is loaded.
    viewport_size: (u32, u32),
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

impl Renderer {
    /// Create a renderer whose empty-state frame is `width`×`height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            style: RenderStyle::default(),
            viewport_size: (width.max(1), height.max(1)),
        }
    }

    pub fn with_style(mut self, style: RenderStyle) -> Self {
        self.style = style;
        self
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.viewport_size = (width.max(1), height.max(1));
    }

    /// Compose a frame.
    ///
    /// With a page bitmap: the page at the origin, every annotation in
    /// z-order at its viewport rect, a hover outline, and the selection border
    /// with its handles. Without one: the drop-zone affordance.
    ///
    /// Annotations whose image cannot be prepared are logged and skipped.
    pub fn render<'a>(
        &self,
        page: Option<&RgbaImage>,
        annotations: impl IntoIterator<Item = (AnnotationId, &'a Annotation)>,
        selected: Option<AnnotationId>,
        hovered: Option<AnnotationId>,
        zoom: f32,
        cache: &mut ImageCache,
    ) -> Frame {
        let Some(page) = page else {
            return self.render_drop_zone();
        };

        let mut canvas = page.clone();
        let (width, height) = canvas.dimensions();
        draw_hollow_rect_mut(
            &mut canvas,
            PixelRect::at(0, 0).of_size(width, height),
            self.style.page_border,
        );

        let mut selected_rect = None;
        let mut hovered_rect = None;
        for (id, annotation) in annotations {
            let rect = to_viewport(annotation.rect, zoom);
            self.draw_annotation(&mut canvas, annotation, rect, cache);
            if Some(id) == selected {
                selected_rect = Some(rect);
            }
            if Some(id) == hovered && hovered != selected {
                hovered_rect = Some(rect);
            }
        }

        if let Some(rect) = hovered_rect {
            stroke_rect(&mut canvas, rect, 1, self.style.hover);
        }
        if let Some(rect) = selected_rect {
            stroke_rect(&mut canvas, rect, 2, self.style.selection);
            for handle in Handle::all() {
                let square = handle_rect(rect, *handle);
                if let Some(pixels) = to_pixel_rect(square) {
                    draw_filled_rect_mut(&mut canvas, pixels, self.style.handle_fill);
                    draw_hollow_rect_mut(&mut canvas, pixels, self.style.selection);
                }
            }
        }

        Frame {
            image: canvas,
            labels: Vec::new(),
        }
    }

    fn draw_annotation(
        &self,
        canvas: &mut RgbaImage,
        annotation: &Annotation,
        rect: Rect,
        cache: &mut ImageCache,
    ) {
        let width = rect.width().round().max(1.0) as u32;
        let height = rect.height().round().max(1.0) as u32;
        match cache.get(
            &annotation.content.image_bytes,
            width,
            height,
            annotation.content.tint,
        ) {
            Ok(image) => {
                imageops::overlay(
                    canvas,
                    image.as_ref(),
                    rect.left.round() as i64,
                    rect.top.round() as i64,
                );
            }
            Err(e) => {
                log::error!(
                    "❌ Skipping '{}' while rendering: {}",
                    annotation.display_name(),
                    e
                );
            }
        }
    }

    /// Empty-state frame inviting the user to drop or open a PDF.
    pub fn render_drop_zone(&self) -> Frame {
        let (width, height) = self.viewport_size;
        let mut canvas = RgbaImage::from_pixel(width, height, self.style.background);

        let panel_w = (width as f32 * 0.6).max(1.0);
        let panel_h = (height as f32 * 0.5).max(1.0);
        let panel = Rect::from_xywh(
            (width as f32 - panel_w) / 2.0,
            (height as f32 - panel_h) / 2.0,
            panel_w,
            panel_h,
        );
        let radius = (panel_w.min(panel_h) * 0.08).clamp(2.0, 16.0);
        fill_rounded_rect(&mut canvas, panel, radius, self.style.drop_panel);
        dashed_rect(&mut canvas, panel, 10.0, 6.0, self.style.drop_border);

        let center_x = (panel.left + panel.right) / 2.0;
        let icon_top = panel.top + panel_h * 0.18;
        let icon_size = panel_h * 0.25;
        draw_down_arrow(&mut canvas, center_x, icon_top, icon_size, self.style.drop_icon);

        let text_size = (panel_h * 0.09).clamp(10.0, 24.0);
        let labels = vec![
            Label {
                text: "Drop PDF here".to_string(),
                position: Point::new(center_x, icon_top + icon_size + text_size * 1.5),
                size: text_size,
                primary: true,
            },
            Label {
                text: "or click Open to select a file".to_string(),
                position: Point::new(center_x, icon_top + icon_size + text_size * 3.0),
                size: text_size * 0.75,
                primary: false,
            },
        ];

        Frame {
            image: canvas,
            labels,
        }
    }
}

/// Pixel rect covering a float rect, or `None` if it rounds to nothing.
fn to_pixel_rect(rect: Rect) -> Option<PixelRect> {
    let left = rect.left.round() as i32;
    let top = rect.top.round() as i32;
    let width = (rect.right.round() as i32 - left).max(0) as u32;
    let height = (rect.bottom.round() as i32 - top).max(0) as u32;
    (width > 0 && height > 0).then(|| PixelRect::at(left, top).of_size(width, height))
}

/// Outline `rect` with a border `thickness` pixels wide, drawn inward.
fn stroke_rect(canvas: &mut RgbaImage, rect: Rect, thickness: u32, color: Rgba<u8>) {
    for t in 0..thickness {
        let inset = t as f32;
        let inner = Rect::new(
            rect.left + inset,
            rect.top + inset,
            rect.right - inset,
            rect.bottom - inset,
        );
        if let Some(pixels) = to_pixel_rect(inner) {
            draw_hollow_rect_mut(canvas, pixels, color);
        }
    }
}

fn fill_rounded_rect(canvas: &mut RgbaImage, rect: Rect, radius: f32, color: Rgba<u8>) {
    let r = radius;
    let horizontal = Rect::new(rect.left, rect.top + r, rect.right, rect.bottom - r);
    let vertical = Rect::new(rect.left + r, rect.top, rect.right - r, rect.bottom);
    for part in [horizontal, vertical] {
        if let Some(pixels) = to_pixel_rect(part) {
            draw_filled_rect_mut(canvas, pixels, color);
        }
    }
    let corners = [
        (rect.left + r, rect.top + r),
        (rect.right - r, rect.top + r),
        (rect.left + r, rect.bottom - r),
        (rect.right - r, rect.bottom - r),
    ];
    for (x, y) in corners {
        draw_filled_circle_mut(
            canvas,
            (x.round() as i32, y.round() as i32),
            r.round() as i32,
            color,
        );
    }
}

fn dashed_line(
    canvas: &mut RgbaImage,
    start: (f32, f32),
    end: (f32, f32),
    dash: f32,
    gap: f32,
    color: Rgba<u8>,
) {
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let length = (dx * dx + dy * dy).sqrt();
    if length <= 0.0 {
        return;
    }
    let (ux, uy) = (dx / length, dy / length);
    let mut offset = 0.0;
    while offset < length {
        let stop = (offset + dash).min(length);
        draw_line_segment_mut(
            canvas,
            (start.0 + ux * offset, start.1 + uy * offset),
            (start.0 + ux * stop, start.1 + uy * stop),
            color,
        );
        offset += dash + gap;
    }
}

fn dashed_rect(canvas: &mut RgbaImage, rect: Rect, dash: f32, gap: f32, color: Rgba<u8>) {
    let corners = [
        (rect.left, rect.top),
        (rect.right, rect.top),
        (rect.right, rect.bottom),
        (rect.left, rect.bottom),
    ];
    for i in 0..corners.len() {
        let next = corners[(i + 1) % corners.len()];
        dashed_line(canvas, corners[i], next, dash, gap, color);
    }
}

/// Downward arrow: a shaft with a triangular head, `size` tall.
fn draw_down_arrow(canvas: &mut RgbaImage, center_x: f32, top: f32, size: f32, color: Rgba<u8>) {
    let head = size * 0.4;
    let shaft_bottom = top + size - head;
    for offset in [-1.0, 0.0, 1.0] {
        draw_line_segment_mut(
            canvas,
            (center_x + offset, top),
            (center_x + offset, shaft_bottom),
            color,
        );
    }
    let half = (head * 0.8).max(2.0);
    let points = [
        PixelPoint::new((center_x - half).round() as i32, shaft_bottom.round() as i32),
        PixelPoint::new((center_x + half).round() as i32, shaft_bottom.round() as i32),
        PixelPoint::new(center_x.round() as i32, (top + size).round() as i32),
    ];
    if points[0] != points[2] {
        draw_polygon_mut(canvas, &points, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnnotationContent, AnnotationKind};
    use crate::test_image::solid_png;

    fn red_stamp(rect: Rect) -> Annotation {
        Annotation::new(
            AnnotationKind::Stamp,
            rect,
            0,
            AnnotationContent::new(solid_png(10, 5, [200, 0, 0, 255]), "Red", 2.0),
        )
    }

    fn white_page() -> RgbaImage {
        RgbaImage::from_pixel(200, 200, Rgba([255, 255, 255, 255]))
    }

    #[test]
    fn test_annotation_drawn_at_viewport_rect() {
        let renderer = Renderer::default();
        let mut cache = ImageCache::new(8);
        let annotation = red_stamp(Rect::new(10.0, 10.0, 50.0, 30.0));
        let page = white_page();

        let frame = renderer.render(
            Some(&page),
            [(AnnotationId(1), &annotation)],
            None,
            None,
            2.0,
            &mut cache,
        );

        assert!(frame.labels.is_empty());
        assert_eq!(frame.image.dimensions(), (200, 200));
        // Inside (20,20)-(100,60) at zoom 2
        assert_eq!(*frame.image.get_pixel(60, 40), Rgba([200, 0, 0, 255]));
        assert_eq!(*frame.image.get_pixel(150, 150), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_selection_draws_handles_at_corners() {
        let renderer = Renderer::default();
        let mut cache = ImageCache::new(8);
        let annotation = red_stamp(Rect::new(40.0, 40.0, 120.0, 80.0));
        let page = white_page();
        let id = AnnotationId(1);

        let frame = renderer.render(Some(&page), [(id, &annotation)], Some(id), None, 1.0, &mut cache);

        let style = renderer.style();
        // Handle squares stick out 4px beyond each corner
        assert_eq!(*frame.image.get_pixel(36, 36), style.selection);
        assert_eq!(*frame.image.get_pixel(38, 38), style.handle_fill);
        assert_eq!(*frame.image.get_pixel(121, 81), style.handle_fill);
        // Border along the top edge
        assert_eq!(*frame.image.get_pixel(80, 40), style.selection);
    }

    #[test]
    fn test_hover_outline() {
        let renderer = Renderer::default();
        let mut cache = ImageCache::new(8);
        let annotation = red_stamp(Rect::new(40.0, 40.0, 120.0, 80.0));
        let page = white_page();
        let id = AnnotationId(1);

        let frame = renderer.render(Some(&page), [(id, &annotation)], None, Some(id), 1.0, &mut cache);
        assert_eq!(*frame.image.get_pixel(80, 40), renderer.style().hover);
    }

    #[test]
    fn test_broken_image_is_skipped() {
        let renderer = Renderer::default();
        let mut cache = ImageCache::new(8);
        let broken = Annotation::new(
            AnnotationKind::Stamp,
            Rect::new(10.0, 10.0, 50.0, 30.0),
            0,
            AnnotationContent::new(b"garbage".to_vec(), "Broken", 2.0),
        );
        let page = white_page();

        let frame = renderer.render(Some(&page), [(AnnotationId(1), &broken)], None, None, 1.0, &mut cache);
        assert_eq!(*frame.image.get_pixel(30, 20), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_drop_zone_without_page() {
        let renderer = Renderer::new(400, 300);
        let mut cache = ImageCache::new(8);
        let frame = renderer.render(None, std::iter::empty(), None, None, 1.0, &mut cache);

        assert_eq!(frame.image.dimensions(), (400, 300));
        let texts: Vec<_> = frame.labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Drop PDF here", "or click Open to select a file"]);
        assert!(frame.labels[0].primary && !frame.labels[1].primary);
        assert!(frame.labels[0].position.y < frame.labels[1].position.y);
        assert_eq!(*frame.image.get_pixel(2, 2), renderer.style().background);
        assert_eq!(*frame.image.get_pixel(200, 280 - 60), renderer.style().drop_panel);
    }
}
