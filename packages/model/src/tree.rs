//! # Sitemap Tree
//!
//! A single rooted entry graph, addressed by path (root-relative traversal)
//! and by id (scan over loaded nodes). Only loaded subtrees are
//! materialized; a traversal through an unloaded node finds nothing.

use crate::entry::{Entry, EntryId};
use crate::error::{ModelError, ModelResult};
use crate::path;
use crate::property::InheritedProperty;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapTree {
    root: Entry,
    /// Absolute path of the site this tree's paths are relative to
    site_root: String,
    /// Properties inherited from the embedding sitemap
    #[serde(default)]
    parent_properties: BTreeMap<String, InheritedProperty>,
}

impl SitemapTree {
    /// Wrap `root`, fixing up every descendant path and position.
    pub fn new(mut root: Entry) -> Self {
        let root_path = root.site_path.clone();
        root.update_site_path(root_path);
        Self {
            root,
            site_root: "/".to_string(),
            parent_properties: BTreeMap::new(),
        }
    }

    pub fn with_site_root(mut self, site_root: impl Into<String>) -> Self {
        self.site_root = site_root.into();
        self
    }

    pub fn root(&self) -> &Entry {
        &self.root
    }

    pub fn site_root(&self) -> &str {
        &self.site_root
    }

    pub fn parent_properties(&self) -> &BTreeMap<String, InheritedProperty> {
        &self.parent_properties
    }

    pub fn set_parent_property(&mut self, name: impl Into<String>, property: InheritedProperty) {
        self.parent_properties.insert(name.into(), property);
    }

    /// Rewrite an absolute origin relative to the site root, if it lies below it
    pub fn relative_origin(&self, origin: &str) -> String {
        path::rebase(origin, &self.site_root, "/").unwrap_or_else(|| origin.to_string())
    }

    /// Find an entry by path. Any absent or unloaded segment aborts the lookup.
    pub fn lookup(&self, site_path: &str) -> Option<&Entry> {
        let segments = path::relative_segments(&self.root.site_path, site_path)?;
        let mut current = &self.root;
        for segment in segments {
            if !current.children_loaded {
                return None;
            }
            current = current.child(segment)?;
        }
        Some(current)
    }

    pub fn lookup_mut(&mut self, site_path: &str) -> Option<&mut Entry> {
        let segments = path::relative_segments(&self.root.site_path, site_path)?;
        let mut current = &mut self.root;
        for segment in segments {
            if !current.children_loaded {
                return None;
            }
            current = current.child_mut(segment)?;
        }
        Some(current)
    }

    pub fn contains_path(&self, site_path: &str) -> bool {
        self.lookup(site_path).is_some()
    }

    /// Parent entry, derived from the path
    pub fn parent_of(&self, site_path: &str) -> Option<&Entry> {
        if site_path == self.root.site_path {
            return None;
        }
        self.lookup(&path::parent_path(site_path)?)
    }

    /// Depth-first scan for one id
    pub fn entry_by_id(&self, id: EntryId) -> Option<&Entry> {
        self.entries_by_ids(&[id]).remove(&id)
    }

    /// Scan for several ids, stopping as soon as all of them are found
    pub fn entries_by_ids(&self, ids: &[EntryId]) -> HashMap<EntryId, &Entry> {
        let mut found = HashMap::with_capacity(ids.len());
        let mut stack = vec![&self.root];
        while let Some(entry) = stack.pop() {
            if ids.contains(&entry.id) {
                found.insert(entry.id, entry);
                if found.len() == ids.len() {
                    break;
                }
            }
            stack.extend(entry.children().iter().rev());
        }
        found
    }

    pub fn path_of(&self, id: EntryId) -> Option<String> {
        self.entry_by_id(id).map(|e| e.site_path.clone())
    }

    pub fn entry_by_id_mut(&mut self, id: EntryId) -> Option<&mut Entry> {
        let site_path = self.path_of(id)?;
        self.lookup_mut(&site_path)
    }

    /// Insert `entry` below `parent_path`. Returns the clamped position.
    pub fn insert(&mut self, parent_path: &str, position: usize, entry: Entry) -> ModelResult<usize> {
        let parent = self
            .lookup_mut(parent_path)
            .ok_or_else(|| ModelError::PathNotFound(parent_path.to_string()))?;
        if !parent.is_container() {
            return Err(ModelError::NotAContainer(parent_path.to_string()));
        }
        Ok(parent.insert_child(position, entry))
    }

    /// Detach the entry at `site_path`, returning it and its former position.
    pub fn remove(&mut self, site_path: &str) -> ModelResult<(Entry, usize)> {
        if site_path == self.root.site_path {
            return Err(ModelError::RootImmutable);
        }
        let parent_path = path::parent_path(site_path)
            .ok_or_else(|| ModelError::PathNotFound(site_path.to_string()))?;
        let name = path::name_of(site_path).to_string();
        let parent = self
            .lookup_mut(&parent_path)
            .ok_or_else(|| ModelError::PathNotFound(parent_path.clone()))?;
        let position = parent
            .children()
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| ModelError::PathNotFound(site_path.to_string()))?;
        let removed = parent.remove_child(position)?;
        Ok((removed, position))
    }

    /// Materialize lazily fetched children below `site_path`.
    pub fn set_children(&mut self, site_path: &str, children: Vec<Entry>) -> ModelResult<()> {
        let entry = self
            .lookup_mut(site_path)
            .ok_or_else(|| ModelError::PathNotFound(site_path.to_string()))?;
        if !entry.is_container() {
            return Err(ModelError::NotAContainer(site_path.to_string()));
        }
        entry.replace_children(children);
        Ok(())
    }

    /// True if `site_path` is loaded down to its children
    pub fn is_loaded(&self, site_path: &str) -> bool {
        self.lookup(site_path).is_some_and(|e| e.children_loaded)
    }

    /// Check position and path invariants over all loaded entries.
    ///
    /// Returns the path of the first entry that violates them.
    pub fn find_inconsistency(&self) -> Option<String> {
        fn check(entry: &Entry) -> Option<String> {
            for (index, child) in entry.children().iter().enumerate() {
                let expected = entry.path_for_child(&child.name, child.kind);
                if child.position != index || child.site_path != expected {
                    return Some(child.site_path.clone());
                }
                if let Some(bad) = check(child) {
                    return Some(bad);
                }
            }
            None
        }
        check(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> SitemapTree {
        SitemapTree::new(Entry::root("/").with_children(vec![
            Entry::page("index.html"),
            Entry::folder("news").with_children(vec![
                Entry::page("a.html"),
                Entry::page("b.html"),
            ]),
            Entry::folder("archive").unloaded(),
        ]))
    }

    #[test]
    fn test_lookup_by_path() {
        let tree = tree();
        assert_eq!(tree.lookup("/").unwrap().site_path, "/");
        assert_eq!(tree.lookup("/news/b.html").unwrap().position, 1);
        assert!(tree.lookup("/news/missing.html").is_none());
        assert!(tree.lookup("/archive/old.html").is_none());
        assert!(tree.lookup("/archive/").is_some());
    }

    #[test]
    fn test_lookup_outside_root() {
        let tree = SitemapTree::new(Entry::root("/sub/").with_children(vec![Entry::page("x.html")]));
        assert!(tree.lookup("/other/x.html").is_none());
        assert!(tree.lookup("/sub/x.html").is_some());
    }

    #[test]
    fn test_lookup_by_ids() {
        let tree = tree();
        let a = tree.lookup("/news/a.html").unwrap().id;
        let news = tree.lookup("/news/").unwrap().id;
        let found = tree.entries_by_ids(&[a, news, EntryId::new()]);
        assert_eq!(found.len(), 2);
        assert_eq!(tree.path_of(a).as_deref(), Some("/news/a.html"));
    }

    #[test]
    fn test_parent_of() {
        let tree = tree();
        assert_eq!(tree.parent_of("/news/a.html").unwrap().site_path, "/news/");
        assert!(tree.parent_of("/").is_none());
    }

    #[test]
    fn test_insert_and_remove_keep_positions() {
        let mut tree = tree();
        let pos = tree.insert("/news/", 1, Entry::page("mid.html")).unwrap();
        assert_eq!(pos, 1);
        assert_eq!(tree.lookup("/news/b.html").unwrap().position, 2);

        let (removed, position) = tree.remove("/news/a.html").unwrap();
        assert_eq!(removed.name, "a.html");
        assert_eq!(position, 0);
        assert_eq!(tree.lookup("/news/mid.html").unwrap().position, 0);
        assert!(tree.find_inconsistency().is_none());
    }

    #[test]
    fn test_insert_into_leaf_fails() {
        let mut tree = tree();
        let err = tree.insert("/index.html", 0, Entry::page("x.html")).unwrap_err();
        assert_eq!(err, ModelError::NotAContainer("/index.html".to_string()));
        assert_eq!(tree.remove("/").unwrap_err(), ModelError::RootImmutable);
    }

    #[test]
    fn test_set_children_materializes() {
        let mut tree = tree();
        assert!(!tree.is_loaded("/archive/"));
        tree.set_children("/archive/", vec![Entry::page("old.html")])
            .unwrap();
        assert_eq!(tree.lookup("/archive/old.html").unwrap().site_path, "/archive/old.html");
    }
}
