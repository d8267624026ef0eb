//! # Clipboard
//!
//! Session-local lists of recently modified entries and soft-deleted
//! entries. An entry id never appears in both lists at once.

use crate::entry::{Entry, EntryId};
use crate::path;
use serde::{Deserialize, Serialize};

/// Default cap of the modified list
pub const DEFAULT_MAX_MODIFIED: usize = 10;

fn default_max_modified() -> usize {
    DEFAULT_MAX_MODIFIED
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clipboard {
    /// Most recent edit first, without children
    modified: Vec<Entry>,
    /// Most recent deletion first, with the deleted subtree
    deleted: Vec<Entry>,
    #[serde(default = "default_max_modified")]
    max_modified: usize,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::with_max_modified(DEFAULT_MAX_MODIFIED)
    }

    pub fn with_max_modified(max_modified: usize) -> Self {
        Self {
            modified: Vec::new(),
            deleted: Vec::new(),
            max_modified,
        }
    }

    pub fn modified(&self) -> &[Entry] {
        &self.modified
    }

    pub fn deleted(&self) -> &[Entry] {
        &self.deleted
    }

    pub fn max_modified(&self) -> usize {
        self.max_modified
    }

    pub fn is_modified(&self, id: EntryId) -> bool {
        self.modified.iter().any(|e| e.id == id)
    }

    pub fn is_deleted(&self, id: EntryId) -> bool {
        self.deleted.iter().any(|e| e.id == id)
    }

    pub fn find_deleted(&self, id: EntryId) -> Option<&Entry> {
        self.deleted.iter().find(|e| e.id == id)
    }

    /// Record an edit. Moves the entry to the front and enforces the cap.
    pub fn add_modified(&mut self, entry: &Entry) {
        self.modified.retain(|e| e.id != entry.id);
        self.deleted.retain(|e| e.id != entry.id);
        self.modified.insert(0, entry.shallow_copy());
        if self.max_modified > 0 {
            self.modified.truncate(self.max_modified);
        }
    }

    pub fn remove_modified(&mut self, id: EntryId) -> Option<Entry> {
        let index = self.modified.iter().position(|e| e.id == id)?;
        Some(self.modified.remove(index))
    }

    /// Record a deletion; the entry and every descendant leave the modified list.
    pub fn add_deleted(&mut self, entry: Entry) {
        let ids = entry.subtree_ids();
        self.modified.retain(|e| !ids.contains(&e.id));
        self.deleted.retain(|e| e.id != entry.id);
        self.deleted.insert(0, entry);
    }

    pub fn remove_deleted(&mut self, id: EntryId) -> Option<Entry> {
        let index = self.deleted.iter().position(|e| e.id == id)?;
        Some(self.deleted.remove(index))
    }

    /// Drop modified-list entries for the given ids
    pub fn forget_modified(&mut self, ids: &[EntryId]) {
        self.modified.retain(|e| !ids.contains(&e.id));
    }

    pub fn clear_modified(&mut self) {
        self.modified.clear();
    }

    pub fn clear_deleted(&mut self) {
        self.deleted.clear();
    }

    /// Rewrite paths of modified entries after a move or rename
    pub fn rebase_paths(&mut self, old_prefix: &str, new_prefix: &str) {
        for entry in &mut self.modified {
            if let Some(rebased) = path::rebase(&entry.site_path, old_prefix, new_prefix) {
                entry.site_path = rebased;
            }
        }
    }

    /// True when no id is listed as both modified and deleted
    pub fn is_consistent(&self) -> bool {
        self.modified.iter().all(|m| !self.is_deleted(m.id))
    }
}

impl Default for Clipboard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modified_is_most_recent_first_and_capped() {
        let mut clipboard = Clipboard::with_max_modified(2);
        let a = Entry::page("a.html");
        let b = Entry::page("b.html");
        let c = Entry::page("c.html");
        clipboard.add_modified(&a);
        clipboard.add_modified(&b);
        clipboard.add_modified(&a);
        assert_eq!(clipboard.modified()[0].id, a.id);
        assert_eq!(clipboard.modified().len(), 2);
        clipboard.add_modified(&c);
        assert_eq!(clipboard.modified().len(), 2);
        assert!(!clipboard.is_modified(b.id));
    }

    #[test]
    fn test_lists_are_exclusive() {
        let mut clipboard = Clipboard::new();
        let child = Entry::page("child.html");
        let folder = Entry::folder("f").with_children(vec![child.clone()]);
        clipboard.add_modified(&folder);
        clipboard.add_modified(&child);

        clipboard.add_deleted(folder.clone());
        assert!(clipboard.is_deleted(folder.id));
        assert!(!clipboard.is_modified(folder.id));
        assert!(!clipboard.is_modified(child.id));
        assert!(clipboard.is_consistent());

        clipboard.add_modified(&folder);
        assert!(!clipboard.is_deleted(folder.id));
        assert!(clipboard.is_consistent());
    }

    #[test]
    fn test_deleted_keeps_subtree() {
        let mut clipboard = Clipboard::new();
        let folder = Entry::folder("f").with_children(vec![Entry::page("x.html")]);
        clipboard.add_deleted(folder.clone());
        assert_eq!(clipboard.find_deleted(folder.id).unwrap().child_count(), 1);
        assert!(clipboard.remove_deleted(folder.id).is_some());
        assert!(clipboard.deleted().is_empty());
    }
}
