//! # Detail-Page Index
//!
//! Ordered table of detail-page bindings. For each content type, the first
//! binding of that type in table order is the default one.

use crate::entry::EntryId;
use crate::path;
use serde::{Deserialize, Serialize};

/// One detail-page binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailPageInfo {
    pub id: EntryId,
    pub site_path: String,
    pub type_name: String,
}

impl DetailPageInfo {
    pub fn new(id: EntryId, site_path: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id,
            site_path: site_path.into(),
            type_name: type_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetailPageTable {
    pages: Vec<DetailPageInfo>,
}

impl DetailPageTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pages(pages: Vec<DetailPageInfo>) -> Self {
        Self { pages }
    }

    pub fn pages(&self) -> &[DetailPageInfo] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn index_of(&self, id: EntryId) -> Option<usize> {
        self.pages.iter().position(|p| p.id == id)
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn get(&self, id: EntryId) -> Option<&DetailPageInfo> {
        self.pages.iter().find(|p| p.id == id)
    }

    /// Bindings for one content type, default first
    pub fn by_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a DetailPageInfo> + 'a {
        self.pages.iter().filter(move |p| p.type_name == type_name)
    }

    pub fn default_for_type(&self, type_name: &str) -> Option<&DetailPageInfo> {
        self.pages.iter().find(|p| p.type_name == type_name)
    }

    pub fn is_default(&self, id: EntryId) -> bool {
        self.get(id)
            .and_then(|info| self.default_for_type(&info.type_name))
            .is_some_and(|default| default.id == id)
    }

    /// Append a binding, replacing an existing one with the same id in place
    pub fn add(&mut self, info: DetailPageInfo) {
        match self.index_of(info.id) {
            Some(index) => self.pages[index] = info,
            None => self.pages.push(info),
        }
    }

    pub fn insert_at(&mut self, index: usize, info: DetailPageInfo) {
        let index = index.min(self.pages.len());
        self.pages.insert(index, info);
    }

    /// Remove a binding, returning its former index
    pub fn remove(&mut self, id: EntryId) -> Option<(usize, DetailPageInfo)> {
        let index = self.index_of(id)?;
        Some((index, self.pages.remove(index)))
    }

    /// Rewrite the paths of bindings below a moved or renamed entry
    pub fn rebase_paths(&mut self, old_prefix: &str, new_prefix: &str) {
        for page in &mut self.pages {
            if let Some(rebased) = path::rebase(&page.site_path, old_prefix, new_prefix) {
                page.site_path = rebased;
            }
        }
    }

    /// Make `id` the default binding for its type.
    ///
    /// Returns the index the binding had before, or `None` if it is unknown.
    pub fn bump(&mut self, id: EntryId) -> Option<usize> {
        let index = self.index_of(id)?;
        let type_name = self.pages[index].type_name.clone();
        let first = self.pages.iter().position(|p| p.type_name == type_name)?;
        if first != index {
            let info = self.pages.remove(index);
            self.pages.insert(first, info);
        }
        Some(index)
    }

    /// Put `id` back at `index`, undoing a [`bump`](Self::bump).
    pub fn restore_position(&mut self, id: EntryId, index: usize) -> bool {
        let Some(current) = self.index_of(id) else {
            return false;
        };
        let info = self.pages.remove(current);
        let index = index.min(self.pages.len());
        self.pages.insert(index, info);
        true
    }
}
