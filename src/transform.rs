//! Document/viewport coordinate mathematics.
//!
//! Document space is tied to the PDF page's native units and never changes
//! with zoom. Viewport space is the pixel grid of the page as currently
//! rendered, i.e. document space scaled by the zoom factor, with the page's
//! top-left corner at the origin.
//!
//! Every function takes the zoom explicitly. Callers must pass the session's
//! zoom at call time; results computed under different zooms are not
//! comparable.

use crate::constants::{MAX_ZOOM, MIN_SIZE, MIN_ZOOM};
use crate::model::{Point, Rect};

/// Map a document-space rectangle to viewport space.
pub fn to_viewport(doc_rect: Rect, zoom: f32) -> Rect {
    Rect::new(
        doc_rect.left * zoom,
        doc_rect.top * zoom,
        doc_rect.right * zoom,
        doc_rect.bottom * zoom,
    )
}

/// Map a document-space point to viewport space.
pub fn to_viewport_point(doc_point: Point, zoom: f32) -> Point {
    Point::new(doc_point.x * zoom, doc_point.y * zoom)
}

/// Map a viewport-space point to document space.
pub fn to_document(viewport_point: Point, zoom: f32) -> Point {
    Point::new(viewport_point.x / zoom, viewport_point.y / zoom)
}

/// Map a viewport-space rectangle to document space.
pub fn to_document_rect(viewport_rect: Rect, zoom: f32) -> Rect {
    Rect::new(
        viewport_rect.left / zoom,
        viewport_rect.top / zoom,
        viewport_rect.right / zoom,
        viewport_rect.bottom / zoom,
    )
}

/// Convert a pointer delta measured in viewport pixels to document units.
pub fn to_document_delta(dx: f32, dy: f32, zoom: f32) -> (f32, f32) {
    (dx / zoom, dy / zoom)
}

/// The minimum annotation size expressed in document units at `zoom`.
pub fn min_document_size(zoom: f32) -> f32 {
    MIN_SIZE / zoom
}

/// Whether `zoom` lies inside the supported range.
pub fn is_valid_zoom(zoom: f32) -> bool {
    (MIN_ZOOM..=MAX_ZOOM).contains(&zoom)
}

/// Clamp a zoom factor into the supported range.
pub fn clamp_zoom(zoom: f32) -> f32 {
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Zoom in by a factor (e.g., 1.2 for 20% zoom in), capped at the maximum.
pub fn zoom_in(zoom: f32, factor: f32) -> f32 {
    (zoom * factor).min(MAX_ZOOM)
}

/// Zoom out by a factor, floored at the minimum.
pub fn zoom_out(zoom: f32, factor: f32) -> f32 {
    (zoom / factor).max(MIN_ZOOM)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON * a.abs().max(1.0)
    }

    fn rect_approx_eq(a: Rect, b: Rect) -> bool {
        approx_eq(a.left, b.left)
            && approx_eq(a.top, b.top)
            && approx_eq(a.right, b.right)
            && approx_eq(a.bottom, b.bottom)
    }

    #[test]
    fn test_to_viewport_scales_all_edges() {
        let r = Rect::new(10.0, 20.0, 110.0, 70.0);
        assert_eq!(to_viewport(r, 2.0), Rect::new(20.0, 40.0, 220.0, 140.0));
        assert_eq!(to_viewport(r, 1.0), r);
    }

    #[test]
    fn test_to_document_divides() {
        let p = to_document(Point::new(50.0, 25.0), 2.5);
        assert!(approx_eq(p.x, 20.0));
        assert!(approx_eq(p.y, 10.0));
    }

    #[test]
    fn test_roundtrip_across_zoom_range() {
        let rects = [
            Rect::new(0.0, 0.0, 1.0, 1.0),
            Rect::new(10.0, 10.0, 110.0, 60.0),
            Rect::new(312.5, 700.25, 590.75, 791.0),
        ];
        let mut zoom = MIN_ZOOM;
        while zoom <= MAX_ZOOM {
            for r in rects {
                let back = to_document_rect(to_viewport(r, zoom), zoom);
                assert!(rect_approx_eq(back, r), "zoom {zoom}: {back:?} != {r:?}");

                let corner = to_document(to_viewport_point(r.top_left(), zoom), zoom);
                assert!(approx_eq(corner.x, r.left) && approx_eq(corner.y, r.top));
            }
            zoom += 0.05;
        }
    }

    #[test]
    fn test_document_delta() {
        let (dx, dy) = to_document_delta(50.0, -10.0, 2.0);
        assert_eq!(dx, 25.0);
        assert_eq!(dy, -5.0);
    }

    #[test]
    fn test_min_document_size() {
        assert_eq!(min_document_size(1.0), 20.0);
        assert_eq!(min_document_size(2.0), 10.0);
        assert!(approx_eq(min_document_size(0.1), 200.0));
    }

    #[test]
    fn test_zoom_in_with_max() {
        // 4.0 * 1.5 = 6.0, but max is 5.0
        assert_eq!(zoom_in(4.0, 1.5), MAX_ZOOM);
        assert!(approx_eq(zoom_in(1.0, 1.2), 1.2));
    }

    #[test]
    fn test_zoom_out_with_min() {
        assert_eq!(zoom_out(0.12, 1.5), MIN_ZOOM);
        assert!(approx_eq(zoom_out(1.0, 1.2), 1.0 / 1.2));
    }

    #[test]
    fn test_zoom_validity_and_clamp() {
        assert!(is_valid_zoom(0.1));
        assert!(is_valid_zoom(5.0));
        assert!(!is_valid_zoom(0.05));
        assert!(!is_valid_zoom(5.01));
        assert_eq!(clamp_zoom(9.0), MAX_ZOOM);
        assert_eq!(clamp_zoom(0.0), MIN_ZOOM);
    }

    #[test]
    fn test_multiple_zoom_operations() {
        // Zoom in then out should approximately return to original
        let zoomed = zoom_out(zoom_in(1.0, 1.5), 1.5);
        assert!(approx_eq(zoomed, 1.0));
    }
}
