//! Undo/Redo for adding and removing annotations.
//!
//! Each undoable action is a [`Command`] carrying enough to reverse itself.
//! Moves and resizes are not recorded; undoing an add removes the annotation
//! in whatever position and size it has at that moment.

use crate::constants::DEFAULT_UNDO_HISTORY;
use crate::model::{Annotation, AnnotationId};
use crate::store::AnnotationStore;

// ============================================================================
// Command Types
// ============================================================================

/// A command that can be undone and redone.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// An annotation was added
    AddAnnotation {
        /// Z-order index it was added at
        index: usize,
        /// The annotation as it was added (refreshed on undo)
        annotation: Annotation,
    },
    /// An annotation was removed
    RemoveAnnotation {
        /// Z-order index it was removed from
        index: usize,
        /// The removed annotation, restored on undo
        annotation: Annotation,
    },
}

impl Command {
    /// Get a human-readable description of this command
    pub fn description(&self) -> String {
        match self {
            Command::AddAnnotation { annotation, .. } => {
                format!("Add {} '{}'", annotation.kind.name(), annotation.display_name())
            }
            Command::RemoveAnnotation { annotation, .. } => {
                format!(
                    "Delete {} '{}'",
                    annotation.kind.name(),
                    annotation.display_name()
                )
            }
        }
    }
}

/// Effect of an undo or redo step on the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// An annotation was (re)inserted under this handle
    Added(AnnotationId),
    /// The annotation with this handle was taken out
    Removed(AnnotationId),
}

// ============================================================================
// Undo Stack
// ============================================================================

/// Configuration for the undo stack
#[derive(Debug, Clone)]
pub struct UndoConfig {
    /// Maximum number of commands to keep in history
    pub max_history: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_UNDO_HISTORY,
        }
    }
}

/// The undo/redo history stack.
///
/// Pushing a new command clears the redo stack. Undo moves a command to the
/// redo stack and redo moves it back.
#[derive(Debug, Clone, Default)]
pub struct UndoStack {
    /// Stack of commands that can be undone
    undo_stack: Vec<Command>,
    /// Stack of commands that can be redone
    redo_stack: Vec<Command>,
    /// Configuration
    config: UndoConfig,
}

impl UndoStack {
    /// Create a new empty undo stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration
    pub fn with_config(config: UndoConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Push a command to the undo stack.
    /// This clears the redo stack (can't redo after a new action).
    pub fn push(&mut self, command: Command) {
        log::debug!("📝 Undo: pushed '{}'", command.description());
        self.undo_stack.push(command);
        self.redo_stack.clear();

        // Limit history size
        while self.undo_stack.len() > self.config.max_history {
            self.undo_stack.remove(0);
        }
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get the description of the command that would be undone
    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.last().map(|c| c.description())
    }

    /// Get the description of the command that would be redone
    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.last().map(|c| c.description())
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        log::debug!("🗑️ Undo history cleared");
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Undo the most recent command against `store`.
    ///
    /// Returns `None` if there was nothing to undo or the store no longer
    /// matches the recorded history.
    pub fn undo(&mut self, store: &mut AnnotationStore) -> Option<Applied> {
        let cmd = self.undo_stack.pop()?;
        log::debug!("⏪ Undo: '{}'", cmd.description());
        let (applied, cmd) = apply_undo(cmd, store);
        self.redo_stack.push(cmd);
        applied
    }

    /// Redo the most recently undone command against `store`.
    pub fn redo(&mut self, store: &mut AnnotationStore) -> Option<Applied> {
        let cmd = self.redo_stack.pop()?;
        log::debug!("⏩ Redo: '{}'", cmd.description());
        let (applied, cmd) = apply_redo(cmd, store);
        self.undo_stack.push(cmd);
        applied
    }
}

// ============================================================================
// Undo/Redo Execution
// ============================================================================

/// Remove the annotation at `index`, returning its handle and current state.
fn take_at(store: &mut AnnotationStore, index: usize) -> Option<(AnnotationId, Annotation)> {
    let (id, _) = store.get_at(index)?;
    let annotation = store.remove_at(index)?;
    Some((id, annotation))
}

/// Apply the undo operation for a command, returning the command to keep for redo.
fn apply_undo(cmd: Command, store: &mut AnnotationStore) -> (Option<Applied>, Command) {
    match cmd {
        Command::AddAnnotation { index, annotation } => match take_at(store, index) {
            // Undo add = remove, remembering any move/resize since
            Some((id, current)) => (
                Some(Applied::Removed(id)),
                Command::AddAnnotation {
                    index,
                    annotation: current,
                },
            ),
            None => {
                log::warn!("⚠️ Undo add: nothing at index {}", index);
                (None, Command::AddAnnotation { index, annotation })
            }
        },
        Command::RemoveAnnotation { index, annotation } => {
            // Undo remove = put back at the same z-position
            let id = store.insert_at(index, annotation.clone());
            (
                Some(Applied::Added(id)),
                Command::RemoveAnnotation { index, annotation },
            )
        }
    }
}

/// Apply the redo operation for a command, returning the command to keep for undo.
fn apply_redo(cmd: Command, store: &mut AnnotationStore) -> (Option<Applied>, Command) {
    match cmd {
        Command::AddAnnotation { index, annotation } => {
            let id = store.insert_at(index, annotation.clone());
            (
                Some(Applied::Added(id)),
                Command::AddAnnotation { index, annotation },
            )
        }
        Command::RemoveAnnotation { index, annotation } => match take_at(store, index) {
            Some((id, current)) => (
                Some(Applied::Removed(id)),
                Command::RemoveAnnotation {
                    index,
                    annotation: current,
                },
            ),
            None => {
                log::warn!("⚠️ Redo remove: nothing at index {}", index);
                (None, Command::RemoveAnnotation { index, annotation })
            }
        },
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnnotationContent, AnnotationKind, Rect};

    fn stamp(name: &str) -> Annotation {
        Annotation::new(
            AnnotationKind::Stamp,
            Rect::new(0.0, 0.0, 20.0, 10.0),
            0,
            AnnotationContent::new(vec![], name, 2.0),
        )
    }

    fn names(store: &AnnotationStore) -> Vec<String> {
        store
            .iter()
            .map(|(_, a)| a.display_name().to_string())
            .collect()
    }

    fn add(store: &mut AnnotationStore, stack: &mut UndoStack, name: &str) -> AnnotationId {
        let annotation = stamp(name);
        let id = store.add(annotation.clone());
        let index = store.index_of(id).unwrap();
        stack.push(Command::AddAnnotation { index, annotation });
        id
    }

    fn remove(store: &mut AnnotationStore, stack: &mut UndoStack, id: AnnotationId) {
        let index = store.index_of(id).unwrap();
        let annotation = store.remove(id).unwrap();
        stack.push(Command::RemoveAnnotation { index, annotation });
    }

    #[test]
    fn test_undo_add_then_redo() {
        let mut store = AnnotationStore::new();
        let mut stack = UndoStack::new();
        add(&mut store, &mut stack, "a");

        assert!(matches!(stack.undo(&mut store), Some(Applied::Removed(_))));
        assert!(store.is_empty());
        assert!(stack.can_redo());

        assert!(matches!(stack.redo(&mut store), Some(Applied::Added(_))));
        assert_eq!(names(&store), vec!["a"]);
    }

    #[test]
    fn test_undo_remove_restores_z_order() {
        let mut store = AnnotationStore::new();
        let mut stack = UndoStack::new();
        add(&mut store, &mut stack, "a");
        let b = add(&mut store, &mut stack, "b");
        add(&mut store, &mut stack, "c");

        remove(&mut store, &mut stack, b);
        assert_eq!(names(&store), vec!["a", "c"]);

        stack.undo(&mut store);
        assert_eq!(names(&store), vec!["a", "b", "c"]);

        stack.redo(&mut store);
        assert_eq!(names(&store), vec!["a", "c"]);
    }

    #[test]
    fn test_undo_add_keeps_later_geometry_for_redo() {
        let mut store = AnnotationStore::new();
        let mut stack = UndoStack::new();
        let id = add(&mut store, &mut stack, "a");
        let moved = Rect::new(50.0, 50.0, 70.0, 60.0);
        store.set_rect(id, moved);

        stack.undo(&mut store);
        stack.redo(&mut store);
        let (_, restored) = store.get_at(0).unwrap();
        assert_eq!(restored.rect, moved);
    }

    #[test]
    fn test_push_clears_redo() {
        let mut store = AnnotationStore::new();
        let mut stack = UndoStack::new();
        add(&mut store, &mut stack, "a");
        stack.undo(&mut store);
        assert_eq!(stack.redo_count(), 1);

        add(&mut store, &mut stack, "b");
        assert_eq!(stack.redo_count(), 0);
        assert!(stack.redo(&mut store).is_none());
    }

    #[test]
    fn test_history_limit() {
        let mut store = AnnotationStore::new();
        let mut stack = UndoStack::with_config(UndoConfig { max_history: 3 });
        for name in ["a", "b", "c", "d", "e"] {
            add(&mut store, &mut stack, name);
        }
        assert_eq!(stack.undo_count(), 3);
        while stack.undo(&mut store).is_some() {}
        assert_eq!(names(&store), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_stack() {
        let mut store = AnnotationStore::new();
        let mut stack = UndoStack::new();
        assert!(!stack.can_undo());
        assert!(stack.undo(&mut store).is_none());
        assert!(stack.redo(&mut store).is_none());
        assert_eq!(stack.undo_description(), None);
    }

    #[test]
    fn test_descriptions() {
        let mut store = AnnotationStore::new();
        let mut stack = UndoStack::new();
        add(&mut store, &mut stack, "Approved");
        assert_eq!(stack.undo_description().as_deref(), Some("Add Stamp 'Approved'"));
        stack.undo(&mut store);
        assert_eq!(stack.redo_description().as_deref(), Some("Add Stamp 'Approved'"));
    }
}
