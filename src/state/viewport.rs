//! Transient pointer-interaction state.

use crate::model::{AnnotationId, Handle, Point, Rect};

/// Selection, hover and the anchors of an in-flight drag or resize.
///
/// Nothing here is persisted. Annotations are referenced by handle, so
/// removing one from the store can never leave a dangling reference here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewportState {
    /// Currently selected annotation.
    pub selected: Option<AnnotationId>,
    /// Annotation under the pointer.
    pub hovered: Option<AnnotationId>,
    /// Corner being dragged while resizing.
    pub resize_handle: Option<Handle>,
    /// Pointer position at press time (viewport space).
    pub drag_start: Option<Point>,
    /// Annotation rect at press time (document space).
    pub drag_start_rect: Option<Rect>,
}

impl ViewportState {
    /// Record the anchors for moving `id`.
    pub fn start_drag(&mut self, pos: Point, id: AnnotationId, rect: Rect) {
        self.selected = Some(id);
        self.resize_handle = None;
        self.drag_start = Some(pos);
        self.drag_start_rect = Some(rect);
    }

    /// Record the anchors for resizing `id` from `handle`.
    pub fn start_resize(&mut self, pos: Point, id: AnnotationId, handle: Handle, rect: Rect) {
        self.selected = Some(id);
        self.resize_handle = Some(handle);
        self.drag_start = Some(pos);
        self.drag_start_rect = Some(rect);
    }

    /// Drop drag/resize anchors. Selection and hover are kept.
    pub fn clear_anchors(&mut self) {
        self.resize_handle = None;
        self.drag_start = None;
        self.drag_start_rect = None;
    }

    /// Reset everything, including selection.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Update the hovered annotation. Returns true if it changed.
    pub fn update_hover(&mut self, hovered: Option<AnnotationId>) -> bool {
        if self.hovered != hovered {
            self.hovered = hovered;
            true
        } else {
            false
        }
    }

    /// Forget any reference to `id`.
    pub fn forget(&mut self, id: AnnotationId) {
        if self.selected == Some(id) {
            self.selected = None;
            self.clear_anchors();
        }
        if self.hovered == Some(id) {
            self.hovered = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_anchors_keeps_selection() {
        let mut state = ViewportState::default();
        let id = AnnotationId(3);
        state.start_resize(
            Point::new(1.0, 2.0),
            id,
            Handle::TopLeft,
            Rect::new(0.0, 0.0, 10.0, 10.0),
        );
        state.clear_anchors();
        assert_eq!(state.selected, Some(id));
        assert!(state.resize_handle.is_none());
        assert!(state.drag_start.is_none());
        assert!(state.drag_start_rect.is_none());
    }

    #[test]
    fn test_update_hover_reports_change() {
        let mut state = ViewportState::default();
        assert!(state.update_hover(Some(AnnotationId(1))));
        assert!(!state.update_hover(Some(AnnotationId(1))));
        assert!(state.update_hover(None));
    }

    #[test]
    fn test_forget_clears_matching_refs_only() {
        let mut state = ViewportState {
            selected: Some(AnnotationId(1)),
            hovered: Some(AnnotationId(2)),
            ..Default::default()
        };
        state.forget(AnnotationId(2));
        assert_eq!(state.selected, Some(AnnotationId(1)));
        assert_eq!(state.hovered, None);
        state.forget(AnnotationId(1));
        assert_eq!(state.selected, None);
    }
}
