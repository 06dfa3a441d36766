//! In-memory annotation storage.
//!
//! Annotations live in an arena keyed by [`AnnotationId`]; a separate list
//! records z-order (insertion order, later = on top). The store also owns the
//! transient [`ViewportState`] so that removals can invalidate selection and
//! hover in one place.

use std::collections::HashMap;

use crate::color::TintColor;
use crate::model::{Annotation, AnnotationId, Point, Rect};
use crate::state::ViewportState;

/// Ordered collection of placed annotations plus interaction state.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    /// All annotations, keyed by their handle.
    annotations: HashMap<AnnotationId, Annotation>,
    /// Handles in z-order, bottom first.
    order: Vec<AnnotationId>,
    /// Counter for generating unique handles.
    next_id: u64,
    /// Selection/hover/drag state.
    state: ViewportState,
    /// Set whenever annotations change; cleared by the renderer's owner.
    dirty: bool,
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self {
            annotations: HashMap::new(),
            order: Vec::new(),
            next_id: 1,
            state: ViewportState::default(),
            dirty: true,
        }
    }

    /// Check if the store has been modified since last `clear_dirty()`.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn allocate_id(&mut self) -> AnnotationId {
        let id = AnnotationId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append an annotation on top of the z-order and return its handle.
    pub fn add(&mut self, annotation: Annotation) -> AnnotationId {
        let id = self.allocate_id();
        self.annotations.insert(id, annotation);
        self.order.push(id);
        self.mark_dirty();
        log::debug!("➕ Added annotation {} (total {})", id, self.order.len());
        id
    }

    /// Insert an annotation at a z-order position (clamped to the end).
    pub fn insert_at(&mut self, index: usize, annotation: Annotation) -> AnnotationId {
        let id = self.allocate_id();
        let index = index.min(self.order.len());
        self.annotations.insert(id, annotation);
        self.order.insert(index, id);
        self.mark_dirty();
        log::debug!("➕ Inserted annotation {} at z-index {}", id, index);
        id
    }

    /// Remove an annotation by handle.
    ///
    /// Returns `None` and leaves the store untouched if the handle is unknown.
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let index = self.index_of(id)?;
        self.remove_at(index)
    }

    /// Remove the annotation at a z-order index.
    ///
    /// Returns `None` and leaves the store untouched if `index` is out of range.
    pub fn remove_at(&mut self, index: usize) -> Option<Annotation> {
        if index >= self.order.len() {
            log::debug!("Remove ignored: index {} out of range", index);
            return None;
        }
        let id = self.order.remove(index);
        let removed = self.annotations.remove(&id);
        self.state.forget(id);
        self.mark_dirty();
        log::debug!("🗑️ Removed annotation {}", id);
        removed
    }

    /// Remove everything and reset interaction state.
    pub fn clear(&mut self) {
        self.annotations.clear();
        self.order.clear();
        self.state.clear();
        self.mark_dirty();
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.get(&id)
    }

    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.dirty = true;
        self.annotations.get_mut(&id)
    }

    /// Annotation at a z-order index.
    pub fn get_at(&self, index: usize) -> Option<(AnnotationId, &Annotation)> {
        let id = *self.order.get(index)?;
        self.annotations.get(&id).map(|a| (id, a))
    }

    /// Z-order index of a handle.
    pub fn index_of(&self, id: AnnotationId) -> Option<usize> {
        self.order.iter().position(|&other| other == id)
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.annotations.contains_key(&id)
    }

    /// Replace an annotation's rect. Returns false for unknown handles.
    pub fn set_rect(&mut self, id: AnnotationId, rect: Rect) -> bool {
        match self.annotations.get_mut(&id) {
            Some(ann) => {
                ann.rect = rect;
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Replace an annotation's tint. Returns false for unknown handles.
    pub fn set_tint(&mut self, id: AnnotationId, tint: Option<TintColor>) -> bool {
        match self.annotations.get_mut(&id) {
            Some(ann) => {
                ann.content.tint = tint;
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All annotations in z-order.
    pub fn iter(&self) -> impl Iterator<Item = (AnnotationId, &Annotation)> {
        self.order
            .iter()
            .filter_map(|id| self.annotations.get(id).map(|a| (*id, a)))
    }

    /// Annotations on `page` in z-order (bottom first).
    pub fn for_page(&self, page: usize) -> impl Iterator<Item = (AnnotationId, &Annotation)> {
        self.iter().filter(move |(_, a)| a.page == page)
    }

    /// Topmost annotation on `page` whose rect contains `point` (document space).
    ///
    /// Click selection and hover both go through here, so whatever is
    /// highlighted is exactly what a click would pick.
    pub fn find_at(&self, point: Point, page: usize) -> Option<AnnotationId> {
        self.order.iter().rev().copied().find(|id| {
            self.annotations
                .get(id)
                .is_some_and(|a| a.page == page && a.contains(point))
        })
    }

    /// Immutable copy of all annotations in z-order, for saving.
    pub fn snapshot(&self) -> Vec<Annotation> {
        self.iter().map(|(_, a)| a.clone()).collect()
    }

    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ViewportState {
        &mut self.state
    }

    /// Currently selected annotation, if it still exists.
    pub fn selected(&self) -> Option<AnnotationId> {
        self.state.selected.filter(|id| self.contains(*id))
    }

    /// Select an annotation, or clear the selection with `None`.
    pub fn select(&mut self, id: Option<AnnotationId>) {
        self.state.selected = id.filter(|id| self.annotations.contains_key(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnnotationContent, AnnotationKind};

    fn stamp(rect: Rect, page: usize, name: &str) -> Annotation {
        let ratio = rect.width() / rect.height();
        Annotation::new(
            AnnotationKind::Stamp,
            rect,
            page,
            AnnotationContent::new(vec![], name, ratio),
        )
    }

    #[test]
    fn test_add_and_get() {
        let mut store = AnnotationStore::new();
        let id = store.add(stamp(Rect::new(0.0, 0.0, 10.0, 10.0), 0, "a"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id).unwrap().display_name(), "a");
        assert_eq!(store.index_of(id), Some(0));
    }

    #[test]
    fn test_find_at_returns_topmost() {
        let mut store = AnnotationStore::new();
        let lower = store.add(stamp(Rect::new(0.0, 0.0, 100.0, 100.0), 0, "lower"));
        let upper = store.add(stamp(Rect::new(50.0, 50.0, 150.0, 150.0), 0, "upper"));

        assert_eq!(store.find_at(Point::new(75.0, 75.0), 0), Some(upper));
        assert_eq!(store.find_at(Point::new(25.0, 25.0), 0), Some(lower));
        assert_eq!(store.find_at(Point::new(200.0, 200.0), 0), None);
    }

    #[test]
    fn test_find_at_filters_by_page() {
        let mut store = AnnotationStore::new();
        let first = store.add(stamp(Rect::new(0.0, 0.0, 100.0, 100.0), 0, "p0"));
        let _second = store.add(stamp(Rect::new(0.0, 0.0, 100.0, 100.0), 1, "p1"));

        assert_eq!(store.find_at(Point::new(10.0, 10.0), 0), Some(first));
        assert_eq!(store.find_at(Point::new(10.0, 10.0), 2), None);
    }

    #[test]
    fn test_for_page_preserves_z_order() {
        let mut store = AnnotationStore::new();
        let a = store.add(stamp(Rect::new(0.0, 0.0, 10.0, 10.0), 0, "a"));
        let _b = store.add(stamp(Rect::new(0.0, 0.0, 10.0, 10.0), 1, "b"));
        let c = store.add(stamp(Rect::new(0.0, 0.0, 10.0, 10.0), 0, "c"));

        let ids: Vec<_> = store.for_page(0).map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn test_remove_out_of_range_leaves_store_unchanged() {
        let mut store = AnnotationStore::new();
        store.add(stamp(Rect::new(0.0, 0.0, 10.0, 10.0), 0, "a"));
        store.add(stamp(Rect::new(5.0, 5.0, 20.0, 20.0), 0, "b"));
        let before = store.snapshot();

        assert!(store.remove_at(2).is_none());
        assert!(store.remove(AnnotationId(999)).is_none());

        assert_eq!(store.len(), 2);
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_remove_clears_selection_and_hover() {
        let mut store = AnnotationStore::new();
        let id = store.add(stamp(Rect::new(0.0, 0.0, 10.0, 10.0), 0, "a"));
        let other = store.add(stamp(Rect::new(20.0, 0.0, 30.0, 10.0), 0, "b"));
        store.select(Some(id));
        store.state_mut().hovered = Some(id);

        assert!(store.remove(other).is_some());
        assert_eq!(store.selected(), Some(id));

        assert!(store.remove(id).is_some());
        assert_eq!(store.selected(), None);
        assert_eq!(store.state().hovered, None);
    }

    #[test]
    fn test_handles_are_stable_across_removal() {
        let mut store = AnnotationStore::new();
        let a = store.add(stamp(Rect::new(0.0, 0.0, 10.0, 10.0), 0, "a"));
        let b = store.add(stamp(Rect::new(0.0, 0.0, 10.0, 10.0), 0, "b"));
        store.remove(a);
        assert_eq!(store.get(b).unwrap().display_name(), "b");
        assert_eq!(store.index_of(b), Some(0));
        assert!(store.get(a).is_none());
    }

    #[test]
    fn test_insert_at_restores_position() {
        let mut store = AnnotationStore::new();
        store.add(stamp(Rect::new(0.0, 0.0, 10.0, 10.0), 0, "a"));
        store.add(stamp(Rect::new(0.0, 0.0, 10.0, 10.0), 0, "c"));
        store.insert_at(1, stamp(Rect::new(0.0, 0.0, 10.0, 10.0), 0, "b"));

        let names: Vec<_> = store.iter().map(|(_, a)| a.display_name().to_string()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        // Out-of-range index appends
        store.insert_at(42, stamp(Rect::new(0.0, 0.0, 10.0, 10.0), 0, "d"));
        assert_eq!(store.get_at(3).unwrap().1.display_name(), "d");
    }

    #[test]
    fn test_select_ignores_unknown_handles() {
        let mut store = AnnotationStore::new();
        store.select(Some(AnnotationId(7)));
        assert_eq!(store.selected(), None);
    }

    #[test]
    fn test_dirty_flag() {
        let mut store = AnnotationStore::new();
        assert!(store.is_dirty());
        store.clear_dirty();
        let id = store.add(stamp(Rect::new(0.0, 0.0, 10.0, 10.0), 0, "a"));
        assert!(store.is_dirty());
        store.clear_dirty();
        assert!(store.set_rect(id, Rect::new(1.0, 1.0, 11.0, 11.0)));
        assert!(store.is_dirty());
        assert!(!store.set_rect(AnnotationId(99), Rect::new(0.0, 0.0, 1.0, 1.0)));
    }
}
