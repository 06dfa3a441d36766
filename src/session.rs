//! Document session: the open PDF plus everything layered on top of it.
//!
//! A session owns the backend document handle, the current page and zoom,
//! the annotation store, undo history, pointer interaction and the image
//! cache. Every state change is announced synchronously, in order, to the
//! observers registered with [`DocumentSession::subscribe`].

use std::path::{Path, PathBuf};

use crate::color::{TintColor, apply_tint, effective_tint};
use crate::constants::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_STAMP_WIDTH, DEFAULT_UNDO_HISTORY, DEFAULT_ZOOM, ZOOM_STEP,
};
use crate::error::{PdfError, SessionError};
use crate::image_cache::ImageCache;
use crate::interaction::{Interaction, InteractionResponse};
use crate::model::{Annotation, AnnotationId, Point};
use crate::pdf::{DocumentHandle, LopdfBackend, PageSize, PdfBackend};
use crate::render::{Frame, Renderer};
use crate::store::AnnotationStore;
use crate::transform::{self, is_valid_zoom};
use crate::undo::{Applied, Command, UndoConfig, UndoStack};

/// Notification sent to observers after a state change.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    DocumentLoaded { page_count: usize },
    DocumentClosed,
    PageChanged { page: usize, total: usize },
    ZoomChanged(f32),
    AnnotationAdded(AnnotationId),
    AnnotationRemoved(AnnotationId),
    /// Rect or tint changed
    AnnotationChanged(AnnotationId),
    Saved(PathBuf),
}

/// Callback registered with [`DocumentSession::subscribe`].
pub type Observer = Box<dyn FnMut(&SessionEvent)>;

/// Tunables for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Zoom applied when a document is opened
    pub default_zoom: f32,
    /// Factor used by zoom in/out
    pub zoom_step: f32,
    /// Width of dropped stamps in viewport pixels
    pub default_stamp_width: f32,
    pub cache_capacity: usize,
    pub undo_history: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            default_zoom: DEFAULT_ZOOM,
            zoom_step: ZOOM_STEP,
            default_stamp_width: DEFAULT_STAMP_WIDTH,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            undo_history: DEFAULT_UNDO_HISTORY,
        }
    }
}

#[derive(Debug, Clone)]
struct OpenDocument {
    handle: DocumentHandle,
    path: Option<PathBuf>,
    page_count: usize,
}

/// An editing session over at most one open document.
pub struct DocumentSession<B: PdfBackend = LopdfBackend> {
    backend: B,
    document: Option<OpenDocument>,
    current_page: usize,
    zoom: f32,
    store: AnnotationStore,
    undo: UndoStack,
    interaction: Interaction,
    cache: ImageCache,
    observers: Vec<Observer>,
    options: SessionOptions,
}

impl<B: PdfBackend> DocumentSession<B> {
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, SessionOptions::default())
    }

    pub fn with_options(backend: B, options: SessionOptions) -> Self {
        Self {
            backend,
            document: None,
            current_page: 0,
            zoom: transform::clamp_zoom(options.default_zoom),
            store: AnnotationStore::new(),
            undo: UndoStack::with_config(UndoConfig {
                max_history: options.undo_history,
            }),
            interaction: Interaction::new(),
            cache: ImageCache::new(options.cache_capacity),
            observers: Vec::new(),
            options,
        }
    }

    /// Register an observer. Observers are called in registration order.
    pub fn subscribe(&mut self, observer: Observer) {
        self.observers.push(observer);
    }

    fn emit(&mut self, event: SessionEvent) {
        for observer in self.observers.iter_mut() {
            observer(&event);
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    // ========================================================================
    // Document lifecycle
    // ========================================================================

    /// Open a PDF from disk, replacing any open document.
    ///
    /// On failure the session is left exactly as it was.
    pub fn open(&mut self, path: &Path) -> Result<usize, SessionError> {
        let handle = self.backend.open(path)?;
        self.install(handle, Some(path.to_path_buf()))
    }

    /// Open a PDF from memory, replacing any open document.
    pub fn open_bytes(&mut self, bytes: &[u8]) -> Result<usize, SessionError> {
        let handle = self.backend.open_bytes(bytes)?;
        self.install(handle, None)
    }

    fn install(
        &mut self,
        handle: DocumentHandle,
        path: Option<PathBuf>,
    ) -> Result<usize, SessionError> {
        let page_count = match self.backend.page_count(handle) {
            Ok(count) => count,
            Err(e) => {
                self.backend.close(handle);
                return Err(e.into());
            }
        };

        if let Some(previous) = self.document.take() {
            self.backend.close(previous.handle);
        }
        self.document = Some(OpenDocument {
            handle,
            path,
            page_count,
        });
        self.current_page = 0;
        self.zoom = transform::clamp_zoom(self.options.default_zoom);
        self.store.clear();
        self.undo.clear();
        self.interaction = Interaction::new();
        self.cache.clear();

        log::info!("📄 Document loaded: {} pages", page_count);
        self.emit(SessionEvent::DocumentLoaded { page_count });
        self.emit(SessionEvent::PageChanged {
            page: 0,
            total: page_count,
        });
        self.emit(SessionEvent::ZoomChanged(self.zoom));
        Ok(page_count)
    }

    /// Close the open document and drop all annotations.
    pub fn close(&mut self) {
        let Some(document) = self.document.take() else {
            return;
        };
        self.backend.close(document.handle);
        self.current_page = 0;
        self.store.clear();
        self.undo.clear();
        self.interaction = Interaction::new();
        log::info!("📕 Document closed");
        self.emit(SessionEvent::DocumentClosed);
    }

    pub fn is_open(&self) -> bool {
        self.document.is_some()
    }

    /// Path the document was opened from, if it came from disk.
    pub fn source_path(&self) -> Option<&Path> {
        self.document.as_ref().and_then(|d| d.path.as_deref())
    }

    /// Number of pages, 0 without a document.
    pub fn page_count(&self) -> usize {
        self.document.as_ref().map_or(0, |d| d.page_count)
    }

    // ========================================================================
    // Navigation and zoom
    // ========================================================================

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Go to a 0-based page. Returns false if out of range.
    pub fn set_page(&mut self, page: usize) -> bool {
        let total = self.page_count();
        if page >= total {
            log::debug!("Page {} rejected (document has {})", page, total);
            return false;
        }
        if page != self.current_page {
            self.current_page = page;
            self.interaction.cancel(&mut self.store);
            self.store.select(None);
            log::debug!("📑 Page {}/{}", page + 1, total);
            self.emit(SessionEvent::PageChanged { page, total });
        }
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.set_page(self.current_page + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        match self.current_page.checked_sub(1) {
            Some(page) => self.set_page(page),
            None => false,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Set the zoom factor. Values outside the supported range are rejected.
    pub fn set_zoom(&mut self, zoom: f32) -> bool {
        if !is_valid_zoom(zoom) {
            log::debug!("Zoom {:.2} rejected", zoom);
            return false;
        }
        if zoom != self.zoom {
            self.zoom = zoom;
            log::debug!("🔍 Zoom: {:.2}x", zoom);
            self.emit(SessionEvent::ZoomChanged(zoom));
        }
        true
    }

    pub fn zoom_in(&mut self) -> bool {
        self.set_zoom(transform::zoom_in(self.zoom, self.options.zoom_step))
    }

    pub fn zoom_out(&mut self) -> bool {
        self.set_zoom(transform::zoom_out(self.zoom, self.options.zoom_step))
    }

    /// Zoom so the current page spans `viewport_width` pixels.
    ///
    /// The result is clamped to the supported zoom range. Returns false
    /// without a document or for a non-positive width.
    pub fn fit_width(&mut self, viewport_width: f32) -> bool {
        if !(viewport_width.is_finite() && viewport_width > 0.0) {
            return false;
        }
        let Some(page) = self.page_size() else {
            return false;
        };
        if page.width <= 0.0 {
            return false;
        }
        self.set_zoom(transform::clamp_zoom(viewport_width / page.width))
    }

    /// Size of the current page in document units.
    pub fn page_size(&self) -> Option<PageSize> {
        let document = self.document.as_ref()?;
        self.backend
            .page_size(document.handle, self.current_page)
            .inspect_err(|e| log::warn!("⚠️ Page size unavailable: {}", e))
            .ok()
    }

    // ========================================================================
    // Annotations
    // ========================================================================

    /// Add an annotation.
    ///
    /// Fails without a document, for a page out of range, for an inverted or
    /// empty rect, and for an aspect ratio that is not a positive number.
    pub fn add_annotation(&mut self, annotation: Annotation) -> Option<AnnotationId> {
        if annotation.page >= self.page_count() {
            log::warn!(
                "⚠️ Cannot add annotation on page {} ({} pages open)",
                annotation.page,
                self.page_count()
            );
            return None;
        }
        let ratio = annotation.aspect_ratio();
        if !annotation.rect.is_valid() || !(ratio.is_finite() && ratio > 0.0) {
            log::warn!(
                "⚠️ Rejected annotation '{}': rect {:?}, aspect ratio {}",
                annotation.display_name(),
                annotation.rect,
                ratio
            );
            return None;
        }
        let id = self.store.add(annotation.clone());
        let index = self.store.index_of(id)?;
        self.undo.push(Command::AddAnnotation { index, annotation });
        log::info!("📌 Added annotation {}", id);
        self.emit(SessionEvent::AnnotationAdded(id));
        Some(id)
    }

    /// Remove an annotation. Returns false if `id` is unknown.
    pub fn remove_annotation(&mut self, id: AnnotationId) -> bool {
        let Some(index) = self.store.index_of(id) else {
            return false;
        };
        let Some(annotation) = self.store.remove_at(index) else {
            return false;
        };
        self.undo.push(Command::RemoveAnnotation { index, annotation });
        log::info!("🗑️ Removed annotation {}", id);
        self.emit(SessionEvent::AnnotationRemoved(id));
        true
    }

    /// Remove the selected annotation, if any.
    pub fn delete_selected(&mut self) -> bool {
        match self.store.selected() {
            Some(id) => self.remove_annotation(id),
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        let applied = self.undo.undo(&mut self.store);
        self.announce(applied)
    }

    pub fn redo(&mut self) -> bool {
        let applied = self.undo.redo(&mut self.store);
        self.announce(applied)
    }

    fn announce(&mut self, applied: Option<Applied>) -> bool {
        match applied {
            Some(Applied::Added(id)) => self.emit(SessionEvent::AnnotationAdded(id)),
            Some(Applied::Removed(id)) => self.emit(SessionEvent::AnnotationRemoved(id)),
            None => return false,
        }
        true
    }

    /// Change an annotation's tint. Invalidates every cached bitmap.
    pub fn set_tint(&mut self, id: AnnotationId, tint: Option<TintColor>) -> bool {
        if !self.store.set_tint(id, tint) {
            return false;
        }
        self.cache.clear();
        log::debug!("🎨 Tint of {} set to {:?}", id, tint.map(|t| t.to_hex()));
        self.emit(SessionEvent::AnnotationChanged(id));
        true
    }

    // ========================================================================
    // Pointer input
    // ========================================================================

    pub fn pointer_press(&mut self, pos: Point) -> InteractionResponse {
        if !self.is_open() {
            return InteractionResponse::default();
        }
        self.interaction
            .press(&mut self.store, pos, self.current_page, self.zoom)
    }

    pub fn pointer_move(&mut self, pos: Point, button_held: bool) -> InteractionResponse {
        if !self.is_open() {
            return InteractionResponse::default();
        }
        let response = self.interaction.pointer_move(
            &mut self.store,
            pos,
            button_held,
            self.current_page,
            self.zoom,
        );
        if let Some(id) = response.changed {
            self.emit(SessionEvent::AnnotationChanged(id));
        }
        response
    }

    pub fn pointer_release(&mut self) -> InteractionResponse {
        self.interaction.release(&mut self.store)
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    // ========================================================================
    // Rendering and saving
    // ========================================================================

    /// Compose the frame for the current page (or the drop zone).
    pub fn render_current(&mut self, renderer: &Renderer) -> Frame {
        let page = self.document.as_ref().and_then(|document| {
            self.backend
                .render_page(document.handle, self.current_page, self.zoom)
                .inspect_err(|e| log::error!("❌ Failed to render page: {}", e))
                .ok()
        });
        let state = self.store.state();
        let frame = renderer.render(
            page.as_ref(),
            self.store.for_page(self.current_page),
            state.selected,
            state.hovered,
            self.zoom,
            &mut self.cache,
        );
        self.store.clear_dirty();
        frame
    }

    /// Flatten every annotation into a copy of the document and write it.
    ///
    /// Works on a snapshot of the annotations and a duplicate of the source
    /// document; live state is never touched, even on failure.
    pub fn save(&mut self, path: &Path) -> Result<(), SessionError> {
        let source = self
            .document
            .as_ref()
            .map(|d| d.handle)
            .ok_or(SessionError::NoDocument)?;
        let annotations = self.store.snapshot();

        let copy = self.backend.duplicate(source)?;
        let result = flatten_into(&mut self.backend, copy, &annotations, path);
        self.backend.close(copy);
        result?;

        log::info!(
            "💾 Saved {} annotations to {}",
            annotations.len(),
            path.display()
        );
        self.emit(SessionEvent::Saved(path.to_path_buf()));
        Ok(())
    }
}

/// Composite each annotation at its document-space rect, then save.
fn flatten_into<B: PdfBackend>(
    backend: &mut B,
    doc: DocumentHandle,
    annotations: &[Annotation],
    path: &Path,
) -> Result<(), PdfError> {
    for annotation in annotations {
        let mut image = image::load_from_memory(&annotation.content.image_bytes)?.to_rgba8();
        if let Some(tint) = effective_tint(annotation.content.tint) {
            apply_tint(&mut image, tint);
        }
        backend.composite_image(doc, annotation.page, annotation.rect, &image)?;
    }
    backend.save(doc, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnnotationContent, AnnotationKind, Rect};
    use crate::test_image::{blank_pdf, blank_pdf_file, stamp_png};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn open_session(pages: usize) -> DocumentSession {
        let mut session = DocumentSession::new(LopdfBackend::new());
        session.open_bytes(&blank_pdf(pages, 612.0, 792.0)).unwrap();
        session
    }

    fn stamp(page: usize, rect: Rect) -> Annotation {
        Annotation::new(
            AnnotationKind::Stamp,
            rect,
            page,
            AnnotationContent::new(stamp_png(40, 20), "Approved", 2.0),
        )
    }

    fn record(session: &mut DocumentSession) -> Rc<RefCell<Vec<SessionEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        session.subscribe(Box::new(move |event| sink.borrow_mut().push(event.clone())));
        events
    }

    #[test]
    fn test_open_resets_state() {
        let mut session = open_session(3);
        session.set_page(2);
        session.set_zoom(2.0);
        session.add_annotation(stamp(0, Rect::new(0.0, 0.0, 40.0, 20.0)));

        session.open_bytes(&blank_pdf(1, 100.0, 100.0)).unwrap();
        assert_eq!(session.page_count(), 1);
        assert_eq!(session.current_page(), 0);
        assert_eq!(session.zoom(), DEFAULT_ZOOM);
        assert!(session.store().is_empty());
        assert!(!session.can_undo());
        assert_eq!(session.backend().open_count(), 1);
    }

    #[test]
    fn test_failed_open_leaves_state_unchanged() {
        let mut session = open_session(2);
        session.set_page(1);
        session.add_annotation(stamp(1, Rect::new(0.0, 0.0, 40.0, 20.0)));
        let events = record(&mut session);

        assert!(session.open(Path::new("/nonexistent/file.pdf")).is_err());
        assert!(session.open_bytes(b"garbage").is_err());

        assert_eq!(session.page_count(), 2);
        assert_eq!(session.current_page(), 1);
        assert_eq!(session.store().len(), 1);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_navigation_bounds() {
        let mut session = open_session(2);
        assert!(!session.prev_page());
        assert!(session.next_page());
        assert_eq!(session.current_page(), 1);
        assert!(!session.next_page());
        assert!(!session.set_page(5));
        assert_eq!(session.current_page(), 1);
    }

    #[test]
    fn test_zoom_range() {
        let mut session = open_session(1);
        assert!(!session.set_zoom(0.05));
        assert!(!session.set_zoom(5.5));
        assert_eq!(session.zoom(), 1.0);
        assert!(session.set_zoom(5.0));
        assert!(session.zoom_in());
        assert_eq!(session.zoom(), 5.0);
        assert!(session.set_zoom(0.1));
        session.zoom_out();
        assert_eq!(session.zoom(), 0.1);
    }

    #[test]
    fn test_fit_width() {
        let mut session = DocumentSession::new(LopdfBackend::new());
        assert!(!session.fit_width(800.0));

        let mut session = open_session(1);
        let events = record(&mut session);
        assert!(session.fit_width(918.0));
        assert!((session.zoom() - 1.5).abs() < 1e-6);
        assert_eq!(*events.borrow(), vec![SessionEvent::ZoomChanged(session.zoom())]);

        assert!(session.fit_width(10_000.0));
        assert_eq!(session.zoom(), 5.0);
        assert!(session.fit_width(1.0));
        assert_eq!(session.zoom(), 0.1);
        assert!(!session.fit_width(0.0));
        assert!(!session.fit_width(f32::NAN));
    }

    #[test]
    fn test_add_rejects_bad_geometry() {
        let mut session = open_session(1);
        let inverted = stamp(0, Rect::new(50.0, 50.0, 10.0, 10.0));
        assert!(session.add_annotation(inverted).is_none());

        for ratio in [0.0, -2.0, f32::NAN, f32::INFINITY] {
            let annotation = Annotation::new(
                AnnotationKind::Stamp,
                Rect::new(0.0, 0.0, 40.0, 20.0),
                0,
                AnnotationContent::new(stamp_png(4, 2), "Odd", ratio),
            );
            assert!(session.add_annotation(annotation).is_none(), "ratio {ratio}");
        }
        assert!(session.store().is_empty());
        assert!(!session.can_undo());
    }

    #[test]
    fn test_add_requires_document_and_valid_page() {
        let mut session = DocumentSession::new(LopdfBackend::new());
        assert!(session.add_annotation(stamp(0, Rect::new(0.0, 0.0, 4.0, 2.0))).is_none());

        let mut session = open_session(1);
        assert!(session.add_annotation(stamp(1, Rect::new(0.0, 0.0, 4.0, 2.0))).is_none());
        assert!(session.add_annotation(stamp(0, Rect::new(0.0, 0.0, 4.0, 2.0))).is_some());
    }

    #[test]
    fn test_events_in_order() {
        let mut session = DocumentSession::new(LopdfBackend::new());
        let events = record(&mut session);

        session.open_bytes(&blank_pdf(2, 612.0, 792.0)).unwrap();
        let id = session
            .add_annotation(stamp(0, Rect::new(0.0, 0.0, 40.0, 20.0)))
            .unwrap();
        session.set_tint(id, Some(TintColor::new(255, 0, 0)));
        session.remove_annotation(id);
        session.next_page();
        session.close();

        let events = events.borrow();
        assert_eq!(
            *events,
            vec![
                SessionEvent::DocumentLoaded { page_count: 2 },
                SessionEvent::PageChanged { page: 0, total: 2 },
                SessionEvent::ZoomChanged(1.0),
                SessionEvent::AnnotationAdded(id),
                SessionEvent::AnnotationChanged(id),
                SessionEvent::AnnotationRemoved(id),
                SessionEvent::PageChanged { page: 1, total: 2 },
                SessionEvent::DocumentClosed,
            ]
        );
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut session = open_session(1);
        session.add_annotation(stamp(0, Rect::new(0.0, 0.0, 40.0, 20.0)));
        assert!(!session.remove_annotation(AnnotationId(999)));
        assert_eq!(session.store().len(), 1);
        assert!(session.can_undo());
    }

    #[test]
    fn test_undo_redo_add_remove() {
        let mut session = open_session(1);
        let a = session
            .add_annotation(stamp(0, Rect::new(0.0, 0.0, 40.0, 20.0)))
            .unwrap();
        session.add_annotation(stamp(0, Rect::new(50.0, 0.0, 90.0, 20.0)));
        session.remove_annotation(a);
        assert_eq!(session.store().len(), 1);

        assert!(session.undo());
        assert_eq!(session.store().len(), 2);
        let (_, bottom) = session.store().get_at(0).unwrap();
        assert_eq!(bottom.rect, Rect::new(0.0, 0.0, 40.0, 20.0));

        assert!(session.redo());
        assert_eq!(session.store().len(), 1);
        assert!(session.undo());
        assert!(session.undo());
        assert!(session.undo());
        assert!(session.store().is_empty());
        assert!(!session.undo());
    }

    #[test]
    fn test_moves_are_not_undoable() {
        let mut session = open_session(1);
        let id = session
            .add_annotation(stamp(0, Rect::new(10.0, 10.0, 50.0, 30.0)))
            .unwrap();

        session.pointer_press(Point::new(20.0, 20.0));
        session.pointer_move(Point::new(120.0, 20.0), true);
        session.pointer_release();
        assert_eq!(session.store().get(id).unwrap().rect.left, 110.0);

        // The only history entry is the add
        assert!(session.undo());
        assert!(session.store().is_empty());
        assert!(!session.undo());
    }

    #[test]
    fn test_delete_selected() {
        let mut session = open_session(1);
        session.add_annotation(stamp(0, Rect::new(10.0, 10.0, 50.0, 30.0)));
        assert!(!session.delete_selected());

        session.pointer_press(Point::new(20.0, 20.0));
        session.pointer_release();
        assert!(session.delete_selected());
        assert!(session.store().is_empty());
        assert!(session.can_undo());
    }

    #[test]
    fn test_set_tint_clears_cache() {
        let mut session = open_session(1);
        let id = session
            .add_annotation(stamp(0, Rect::new(10.0, 10.0, 50.0, 30.0)))
            .unwrap();
        session.render_current(&Renderer::default());
        assert_eq!(session.cache().len(), 1);

        assert!(session.set_tint(id, Some(TintColor::new(0, 0, 255))));
        assert!(session.cache().is_empty());
        assert!(!session.set_tint(AnnotationId(42), None));
    }

    #[test]
    fn test_render_current_page_only() {
        let mut session = open_session(2);
        session.add_annotation(stamp(1, Rect::new(10.0, 10.0, 50.0, 30.0)));
        let frame = session.render_current(&Renderer::default());
        assert_eq!(frame.image.dimensions(), (612, 792));
        assert_eq!(*frame.image.get_pixel(12, 12), image::Rgba([255, 255, 255, 255]));
        assert_eq!(session.cache().len(), 0);
    }

    #[test]
    fn test_render_without_document_is_drop_zone() {
        let mut session = DocumentSession::new(LopdfBackend::new());
        let frame = session.render_current(&Renderer::new(300, 200));
        assert_eq!(frame.image.dimensions(), (300, 200));
        assert_eq!(frame.labels.len(), 2);
    }

    #[test]
    fn test_save_flattens_into_copy() {
        let dir = tempfile::tempdir().unwrap();
        let source = blank_pdf_file(dir.path(), "in.pdf", 2);
        let output = dir.path().join("out.pdf");

        let mut session = DocumentSession::new(LopdfBackend::new());
        session.open(&source).unwrap();
        let id = session
            .add_annotation(stamp(1, Rect::new(10.0, 10.0, 110.0, 60.0)))
            .unwrap();
        session.set_zoom(2.5);
        session.set_tint(id, Some(TintColor::new(255, 0, 0)));
        let events = record(&mut session);

        session.save(&output).unwrap();
        assert_eq!(*events.borrow(), vec![SessionEvent::Saved(output.clone())]);

        // Live state untouched, and the temporary copy is released
        assert_eq!(session.store().len(), 1);
        assert_eq!(session.backend().open_count(), 1);

        let saved = lopdf::Document::load(&output).unwrap();
        let pages = saved.get_pages();
        let page_id = pages[&2];
        let content = String::from_utf8_lossy(&saved.get_page_content(page_id).unwrap()).into_owned();
        // Document-space rect regardless of zoom: y = 792 - 60
        assert!(content.contains("100.0000 0.0000 0.0000 50.0000 10.0000 732.0000 cm"), "{content}");
        let first = String::from_utf8_lossy(&saved.get_page_content(pages[&1]).unwrap()).into_owned();
        assert!(!first.contains(" Do"));
    }

    #[test]
    fn test_save_without_document() {
        let mut session = DocumentSession::new(LopdfBackend::new());
        let err = session.save(Path::new("out.pdf")).unwrap_err();
        assert!(matches!(err, SessionError::NoDocument));
    }

    #[test]
    fn test_save_with_broken_image_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = open_session(1);
        session.add_annotation(Annotation::new(
            AnnotationKind::Stamp,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            0,
            AnnotationContent::new(b"nope".to_vec(), "Broken", 1.0),
        ));

        let output = dir.path().join("out.pdf");
        assert!(session.save(&output).is_err());
        assert!(!output.exists());
        assert_eq!(session.backend().open_count(), 1);
        assert_eq!(session.store().len(), 1);
    }
}
