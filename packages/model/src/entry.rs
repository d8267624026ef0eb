//! # Sitemap Entries
//!
//! An [`Entry`] is one node of the content tree: a folder, a page or a
//! redirect. Entries own their children; there is no parent pointer; the
//! parent is derived from the site path.
//!
//! ## Invariants
//!
//! - `site_path == parent.site_path + name + ("/" if container)`
//! - `position` is the true index of the entry in its parent's children
//! - positions of one parent's children form `0..n` in array order
//!
//! Every mutator on this type re-establishes these invariants before it
//! returns.

use crate::error::{ModelError, ModelResult};
use crate::path;
use crate::property::PropertyValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Opaque entry identity, stable across moves and renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What kind of resource an entry stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryKind {
    /// Container entry, may have children, path ends with `/`
    Folder,
    /// Leaf content page
    Page,
    /// Leaf entry pointing somewhere else
    Redirect,
}

/// Edit status of an entry within the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum EditStatus {
    #[default]
    Unmodified,
    Edited,
    /// Created in this session and never saved as an existing entry
    New,
    DeletedPending,
}

/// Lock descriptor reported by the remote authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockInfo {
    pub owner: Option<String>,
    pub editable: bool,
}

impl LockInfo {
    pub fn unlocked() -> Self {
        Self {
            owner: None,
            editable: true,
        }
    }

    /// True if someone other than `user` holds the lock
    pub fn is_locked_by_other(&self, user: &str) -> bool {
        matches!(&self.owner, Some(owner) if owner != user)
    }
}

impl Default for LockInfo {
    fn default() -> Self {
        Self::unlocked()
    }
}

/// One node of the sitemap tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: EntryId,
    pub site_path: String,
    pub name: String,
    #[serde(default)]
    pub position: usize,
    #[serde(default)]
    pub title: String,
    /// Path of the backing resource, if it differs from the site path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vfs_path: Option<String>,
    pub kind: EntryKind,
    #[serde(default)]
    children: Vec<Entry>,
    /// False when the children still have to be fetched lazily
    #[serde(default)]
    pub children_loaded: bool,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    /// Properties of the folder's index file
    #[serde(default)]
    pub default_file_properties: BTreeMap<String, PropertyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_file_id: Option<EntryId>,
    /// Content type this entry is a detail page for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_page_type: Option<String>,
    #[serde(default)]
    pub edit_status: EditStatus,
    #[serde(default)]
    pub lock: LockInfo,
    #[serde(default)]
    pub in_navigation: bool,
}

impl Entry {
    /// Create a detached entry. Its path is fixed once it is inserted.
    pub fn new(kind: EntryKind, name: impl Into<String>) -> Self {
        let name = name.into();
        let container = kind == EntryKind::Folder;
        Self {
            id: EntryId::new(),
            site_path: path::child_path("/", &name, container),
            title: name.clone(),
            name,
            position: 0,
            vfs_path: None,
            kind,
            children: Vec::new(),
            children_loaded: container,
            properties: BTreeMap::new(),
            default_file_properties: BTreeMap::new(),
            default_file_id: None,
            detail_page_type: None,
            edit_status: EditStatus::Unmodified,
            lock: LockInfo::unlocked(),
            in_navigation: true,
        }
    }

    /// Create a container entry that serves as tree root at `site_path`
    pub fn root(site_path: impl Into<String>) -> Self {
        let site_path = site_path.into();
        let mut root = Self::folder(path::name_of(&site_path));
        root.site_path = site_path;
        root
    }

    pub fn folder(name: impl Into<String>) -> Self {
        Self::new(EntryKind::Folder, name)
    }

    pub fn page(name: impl Into<String>) -> Self {
        Self::new(EntryKind::Page, name)
    }

    pub fn redirect(name: impl Into<String>) -> Self {
        Self::new(EntryKind::Redirect, name)
    }

    /// Builder: append children (paths and positions are fixed up)
    pub fn with_children(mut self, children: Vec<Entry>) -> Self {
        for child in children {
            self.append_child(child);
        }
        self.children_loaded = true;
        self
    }

    /// Builder: set an own property
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties
            .insert(name.into(), PropertyValue::new(value.into()));
        self
    }

    /// Builder: set a property of the folder's index file
    pub fn with_default_file_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_file_properties
            .insert(name.into(), PropertyValue::new(value.into()));
        self
    }

    /// Builder: mark as detail page for a content type
    pub fn with_detail_page_type(mut self, type_name: impl Into<String>) -> Self {
        self.detail_page_type = Some(type_name.into());
        self
    }

    /// Builder: mark children as not yet fetched
    pub fn unloaded(mut self) -> Self {
        self.children.clear();
        self.children_loaded = false;
        self
    }

    pub fn is_container(&self) -> bool {
        self.kind == EntryKind::Folder
    }

    pub fn is_leaf_type(&self) -> bool {
        !self.is_container()
    }

    pub fn is_redirect(&self) -> bool {
        self.kind == EntryKind::Redirect
    }

    pub fn is_detail_page(&self) -> bool {
        self.detail_page_type.is_some()
    }

    pub fn is_new(&self) -> bool {
        self.edit_status == EditStatus::New
    }

    pub fn children(&self) -> &[Entry] {
        &self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, name: &str) -> Option<&Entry> {
        self.children.iter().find(|c| c.name == name)
    }

    pub(crate) fn child_mut(&mut self, name: &str) -> Option<&mut Entry> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    pub fn child_at(&self, position: usize) -> Option<&Entry> {
        self.children.get(position)
    }

    /// Case-insensitive sibling name check
    pub fn has_child_named(&self, name: &str) -> bool {
        self.children
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Path a child with the given name and kind would have
    pub fn path_for_child(&self, name: &str, kind: EntryKind) -> String {
        path::child_path(&self.site_path, name, kind == EntryKind::Folder)
    }

    /// Insert a child, clamping `position` to an append. Returns the
    /// position the child actually landed at.
    pub fn insert_child(&mut self, position: usize, mut child: Entry) -> usize {
        let position = position.min(self.children.len());
        child.update_site_path(self.path_for_child(&child.name, child.kind));
        self.children.insert(position, child);
        self.children_loaded = true;
        self.renumber_children();
        position
    }

    pub fn append_child(&mut self, child: Entry) -> usize {
        self.insert_child(self.children.len(), child)
    }

    /// Detach the child at `position`
    pub fn remove_child(&mut self, position: usize) -> ModelResult<Entry> {
        if position >= self.children.len() {
            return Err(ModelError::PositionOutOfRange {
                path: self.site_path.clone(),
                position,
                len: self.children.len(),
            });
        }
        let removed = self.children.remove(position);
        self.renumber_children();
        Ok(removed)
    }

    /// Replace all children at once
    pub fn replace_children(&mut self, children: Vec<Entry>) {
        self.children.clear();
        for child in children {
            self.append_child(child);
        }
        self.children_loaded = true;
    }

    /// Rename this entry in place, rewriting the paths below it.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        let new_path = match path::parent_path(&self.site_path) {
            Some(parent) => path::child_path(&parent, &self.name, self.is_container()),
            None => self.site_path.clone(),
        };
        self.update_site_path(new_path);
    }

    /// Rewrite this entry's path and every descendant's path in one pass.
    pub fn update_site_path(&mut self, new_path: String) {
        self.site_path = new_path;
        self.renumber_children();
        let parent_path = self.site_path.clone();
        for child in &mut self.children {
            let child_path = path::child_path(&parent_path, &child.name, child.is_container());
            child.update_site_path(child_path);
        }
    }

    fn renumber_children(&mut self) {
        for (index, child) in self.children.iter_mut().enumerate() {
            child.position = index;
        }
    }

    /// Pre-order visit of this entry and all loaded descendants
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Entry)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut Entry)) {
        visit(self);
        for child in &mut self.children {
            child.walk_mut(visit);
        }
    }

    /// Ids of this entry and all loaded descendants
    pub fn subtree_ids(&self) -> Vec<EntryId> {
        let mut ids = Vec::new();
        self.walk(&mut |e| ids.push(e.id));
        ids
    }

    /// Copy of this entry without its children
    pub fn shallow_copy(&self) -> Entry {
        Entry {
            children: Vec::new(),
            children_loaded: !self.is_container(),
            ..self.clone()
        }
    }

    /// Take over the server-owned fields of `remote`.
    ///
    /// Local structure (children, position, path) is kept.
    pub fn merge_server_data(&mut self, remote: &Entry) {
        self.id = remote.id;
        self.lock = remote.lock.clone();
        self.default_file_id = remote.default_file_id;
        if remote.vfs_path.is_some() {
            self.vfs_path = remote.vfs_path.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Entry {
        let mut root = Entry::folder("").with_children(vec![
            Entry::page("a.html"),
            Entry::folder("b").with_children(vec![Entry::page("c.html")]),
        ]);
        root.update_site_path("/".to_string());
        root
    }

    #[test]
    fn test_paths_follow_parent() {
        let root = sample();
        assert_eq!(root.children()[0].site_path, "/a.html");
        assert_eq!(root.children()[1].site_path, "/b/");
        assert_eq!(root.children()[1].children()[0].site_path, "/b/c.html");
    }

    #[test]
    fn test_insert_clamps_and_renumbers() {
        let mut root = sample();
        let pos = root.insert_child(99, Entry::page("z.html"));
        assert_eq!(pos, 2);
        let pos = root.insert_child(0, Entry::page("first.html"));
        assert_eq!(pos, 0);
        let positions: Vec<usize> = root.children().iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut root = sample();
        assert!(matches!(
            root.remove_child(5),
            Err(ModelError::PositionOutOfRange { len: 2, .. })
        ));
        let removed = root.remove_child(0).unwrap();
        assert_eq!(removed.name, "a.html");
        assert_eq!(root.children()[0].position, 0);
    }

    #[test]
    fn test_rename_rewrites_descendants() {
        let mut root = sample();
        let folder = root.child_mut("b").unwrap();
        folder.rename("renamed");
        assert_eq!(folder.site_path, "/renamed/");
        assert_eq!(folder.children()[0].site_path, "/renamed/c.html");
    }

    #[test]
    fn test_lock_owner() {
        let lock = LockInfo {
            owner: Some("alice".to_string()),
            editable: false,
        };
        assert!(lock.is_locked_by_other("bob"));
        assert!(!lock.is_locked_by_other("alice"));
        assert!(!LockInfo::unlocked().is_locked_by_other("bob"));
    }
}
