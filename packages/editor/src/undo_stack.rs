//! # Undo/Redo Stack
//!
//! Tracks applied changes and enables undo/redo.
//!
//! ## Design
//!
//! - Every committed change is recorded once it has been applied
//! - Undo commits the inverse of the newest change, then moves it to the redo stack
//! - Redo re-commits the original change
//! - New changes clear the redo stack
//!
//! The stack never talks to the remote authority itself. The controller
//! peeks the next entry, commits it, and only on success calls
//! [`UndoStack::commit_undo`] / [`UndoStack::commit_redo`], so a failed
//! commit leaves the history untouched.

use crate::changes::Change;

/// One undoable step
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// The change as it was applied, with server data folded in
    pub change: Change,

    /// Optional description of this step
    pub description: Option<String>,
}

impl HistoryEntry {
    pub fn new(change: Change) -> Self {
        Self {
            change,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Undo/redo history of one editing session
#[derive(Debug)]
pub struct UndoStack {
    /// Applied changes (most recent last)
    undo_stack: Vec<HistoryEntry>,

    /// Undone changes (most recent last)
    redo_stack: Vec<HistoryEntry>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Record an applied change
    pub fn record(&mut self, entry: HistoryEntry) {
        self.push_undo(entry);
        // A new action invalidates the undone future
        self.redo_stack.clear();
    }

    fn push_undo(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);
        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }
    }

    /// The step the next undo would revert
    pub fn peek_undo(&self) -> Option<&HistoryEntry> {
        self.undo_stack.last()
    }

    /// The step the next redo would re-apply
    pub fn peek_redo(&self) -> Option<&HistoryEntry> {
        self.redo_stack.last()
    }

    /// The inverse of the newest step was committed: move it to the redo stack
    pub fn commit_undo(&mut self) -> bool {
        match self.undo_stack.pop() {
            Some(entry) => {
                self.redo_stack.push(entry);
                true
            }
            None => false,
        }
    }

    /// The newest undone step was committed again as `reapplied`
    pub fn commit_redo(&mut self, reapplied: Change) -> bool {
        match self.redo_stack.pop() {
            Some(entry) => {
                self.push_undo(HistoryEntry {
                    change: reapplied,
                    description: entry.description,
                });
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Get description of the next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }

    /// Get description of the next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::{ClipboardChange, EditChange, EntryEdit};
    use sitemap_model::{Entry, SitemapState, SitemapTree};

    fn state() -> SitemapState {
        SitemapState::new(SitemapTree::new(
            Entry::root("/").with_children(vec![Entry::page("a.html")]),
        ))
    }

    fn edit(state: &SitemapState, title: &str) -> Change {
        let id = state.tree.lookup("/a.html").unwrap().id;
        Change::Edit(EditChange::new(state, id, &EntryEdit::title(title)).unwrap())
    }

    #[test]
    fn test_undo_stack_creation() {
        let stack = UndoStack::new();
        assert_eq!(stack.undo_levels(), 0);
        assert_eq!(stack.redo_levels(), 0);
        assert_eq!(stack.max_levels(), 100);
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_undo_and_redo_move_between_stacks() {
        let state = state();
        let mut stack = UndoStack::new();
        let change = edit(&state, "Hello");
        stack.record(HistoryEntry::new(change.clone()).with_description("Retitle"));

        assert_eq!(stack.undo_description(), Some("Retitle"));
        assert_eq!(stack.peek_undo().unwrap().change, change);
        assert!(stack.commit_undo());
        assert_eq!(stack.undo_levels(), 0);
        assert_eq!(stack.redo_description(), Some("Retitle"));

        assert!(stack.commit_redo(change));
        assert_eq!(stack.undo_levels(), 1);
        assert_eq!(stack.redo_levels(), 0);
        assert!(!stack.commit_redo(edit(&state, "x")));
    }

    #[test]
    fn test_new_change_clears_redo() {
        let state = state();
        let mut stack = UndoStack::new();
        stack.record(HistoryEntry::new(edit(&state, "Hello")));
        stack.commit_undo();
        assert_eq!(stack.redo_levels(), 1);

        stack.record(HistoryEntry::new(Change::ClearModified(
            ClipboardChange::clear_modified(&state),
        )));
        assert_eq!(stack.redo_levels(), 0);
    }

    #[test]
    fn test_max_levels_enforced() {
        let state = state();
        let mut stack = UndoStack::with_max_levels(2);
        for i in 0..3 {
            stack.record(HistoryEntry::new(edit(&state, &format!("Text {}", i))).with_description(i.to_string()));
        }
        assert_eq!(stack.undo_levels(), 2);
        stack.commit_undo();
        stack.commit_undo();
        assert!(!stack.commit_undo());
        assert_eq!(stack.redo_description(), Some("1"));
    }
}
