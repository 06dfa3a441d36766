//! Pointer interaction: selection, dragging and aspect-locked resizing.
//!
//! Pointer positions arrive in viewport space. Everything written back to the
//! store is in document space, converted with the zoom passed to each call.

use crate::constants::HANDLE_SIZE;
use crate::model::{AnnotationId, Handle, Point, Rect};
use crate::store::AnnotationStore;
use crate::transform::{min_document_size, to_document, to_document_delta, to_viewport};

/// Current pointer interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    #[default]
    Idle,
    Dragging,
    Resizing,
}

/// What the host should do after an event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionResponse {
    /// The frame must be redrawn.
    pub repaint: bool,
    /// Hover text to show. Only set when the hovered annotation changed.
    pub tooltip: Option<String>,
    /// Annotation whose rect changed during this event.
    pub changed: Option<AnnotationId>,
}

impl InteractionResponse {
    fn repaint() -> Self {
        Self {
            repaint: true,
            ..Default::default()
        }
    }

    fn merge_hover(mut self, hover: InteractionResponse) -> Self {
        self.repaint |= hover.repaint;
        if hover.tooltip.is_some() {
            self.tooltip = hover.tooltip;
        }
        self
    }
}

/// Interaction state machine. Anchors live in the store's `ViewportState`.
#[derive(Debug, Clone, Default)]
pub struct Interaction {
    mode: InteractionMode,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Reset to `Idle` and drop any anchors (e.g. when the page changes).
    pub fn cancel(&mut self, store: &mut AnnotationStore) {
        self.mode = InteractionMode::Idle;
        store.state_mut().clear_anchors();
    }

    /// Pointer pressed at a viewport position on `page`.
    pub fn press(
        &mut self,
        store: &mut AnnotationStore,
        pos: Point,
        page: usize,
        zoom: f32,
    ) -> InteractionResponse {
        // Handles of the current selection take priority over body hits
        if let Some((id, handle, rect)) = handle_at(store, pos, page, zoom) {
            store.state_mut().start_resize(pos, id, handle, rect);
            self.mode = InteractionMode::Resizing;
            log::debug!("↘️ Resize {} from {}", id, handle.name());
            return InteractionResponse::repaint();
        }

        let doc_point = to_document(pos, zoom);
        match store.find_at(doc_point, page) {
            Some(id) => {
                let Some(rect) = store.get(id).map(|a| a.rect) else {
                    return InteractionResponse::default();
                };
                store.state_mut().start_drag(pos, id, rect);
                self.mode = InteractionMode::Dragging;
                log::debug!("✋ Selected {} for dragging", id);
                InteractionResponse::repaint()
            }
            None => {
                let had_selection = store.selected().is_some();
                store.select(None);
                store.state_mut().clear_anchors();
                self.mode = InteractionMode::Idle;
                InteractionResponse {
                    repaint: had_selection,
                    ..Default::default()
                }
            }
        }
    }

    /// Pointer moved. `button_held` is whether the primary button is down.
    pub fn pointer_move(
        &mut self,
        store: &mut AnnotationStore,
        pos: Point,
        button_held: bool,
        page: usize,
        zoom: f32,
    ) -> InteractionResponse {
        let hover = self.hover(store, pos, page, zoom);
        if !button_held {
            return hover;
        }

        let response = match self.mode {
            InteractionMode::Idle => InteractionResponse::default(),
            InteractionMode::Dragging => drag(store, pos, zoom),
            InteractionMode::Resizing => resize(store, pos, zoom),
        };
        response.merge_hover(hover)
    }

    /// Pointer released. Selection is kept.
    pub fn release(&mut self, store: &mut AnnotationStore) -> InteractionResponse {
        let was_active = self.mode != InteractionMode::Idle;
        self.mode = InteractionMode::Idle;
        store.state_mut().clear_anchors();
        InteractionResponse {
            repaint: was_active,
            ..Default::default()
        }
    }

    /// Update hover from a viewport position.
    ///
    /// Uses the same hit test as [`Interaction::press`], so the highlighted
    /// annotation is always the one a click would select.
    pub fn hover(
        &mut self,
        store: &mut AnnotationStore,
        pos: Point,
        page: usize,
        zoom: f32,
    ) -> InteractionResponse {
        let hovered = store.find_at(to_document(pos, zoom), page);
        if !store.state_mut().update_hover(hovered) {
            return InteractionResponse::default();
        }
        let tooltip = hovered
            .and_then(|id| store.get(id))
            .map(|a| a.display_name().to_string());
        InteractionResponse {
            repaint: true,
            tooltip,
            changed: None,
        }
    }
}

/// Square hit region of `handle` around a viewport rect.
pub fn handle_rect(viewport_rect: Rect, handle: Handle) -> Rect {
    Rect::centered_square(viewport_rect.corner(handle), HANDLE_SIZE)
}

/// Handle of the selected annotation under `pos`, with its document rect.
fn handle_at(
    store: &AnnotationStore,
    pos: Point,
    page: usize,
    zoom: f32,
) -> Option<(AnnotationId, Handle, Rect)> {
    let id = store.selected()?;
    let annotation = store.get(id).filter(|a| a.page == page)?;
    let viewport_rect = to_viewport(annotation.rect, zoom);
    Handle::all()
        .iter()
        .find(|h| handle_rect(viewport_rect, **h).contains(pos))
        .map(|h| (id, *h, annotation.rect))
}

fn drag_anchors(store: &AnnotationStore) -> Option<(AnnotationId, Point, Rect)> {
    let state = store.state();
    Some((state.selected?, state.drag_start?, state.drag_start_rect?))
}

fn drag(store: &mut AnnotationStore, pos: Point, zoom: f32) -> InteractionResponse {
    let Some((id, start, start_rect)) = drag_anchors(store) else {
        return InteractionResponse::default();
    };
    let (dx, dy) = pos.delta_from(start);
    let (dx, dy) = to_document_delta(dx, dy, zoom);
    if !store.set_rect(id, start_rect.translated(dx, dy)) {
        return InteractionResponse::default();
    }
    InteractionResponse {
        repaint: true,
        tooltip: None,
        changed: Some(id),
    }
}

fn resize(store: &mut AnnotationStore, pos: Point, zoom: f32) -> InteractionResponse {
    let Some((id, start, start_rect)) = drag_anchors(store) else {
        return InteractionResponse::default();
    };
    let Some(handle) = store.state().resize_handle else {
        return InteractionResponse::default();
    };
    let Some(ratio) = store.get(id).map(|a| a.aspect_ratio()) else {
        return InteractionResponse::default();
    };

    let (dx, dy) = pos.delta_from(start);
    let (dx, _) = to_document_delta(dx, dy, zoom);
    let Some(rect) = resized_rect(start_rect, handle, dx, ratio, min_document_size(zoom)) else {
        return InteractionResponse::default();
    };

    store.set_rect(id, rect);
    InteractionResponse {
        repaint: true,
        tooltip: None,
        changed: Some(id),
    }
}

/// Resize `start` by dragging `handle` horizontally by `dx` document units.
///
/// Width follows the pointer, height is `width / aspect_ratio`, and the corner
/// opposite `handle` stays put. Returns `None` when either side would fall
/// below `min_size`.
pub fn resized_rect(
    start: Rect,
    handle: Handle,
    dx: f32,
    aspect_ratio: f32,
    min_size: f32,
) -> Option<Rect> {
    let width = if handle.grows_rightward() {
        start.width() + dx
    } else {
        start.width() - dx
    };
    let height = width / aspect_ratio;
    if !(width >= min_size && height >= min_size) {
        return None;
    }

    let rect = match handle {
        Handle::BottomRight => Rect::new(start.left, start.top, start.left + width, start.top + height),
        Handle::TopLeft => Rect::new(start.right - width, start.bottom - height, start.right, start.bottom),
        Handle::BottomLeft => Rect::new(start.right - width, start.top, start.right, start.top + height),
        Handle::TopRight => Rect::new(start.left, start.bottom - height, start.left + width, start.bottom),
    };
    Some(rect)
}
