//! The aggregate every change mutates: tree, clipboard and detail pages.

use crate::clipboard::Clipboard;
use crate::detail_pages::{DetailPageInfo, DetailPageTable};
use crate::entry::Entry;
use crate::property::{EffectiveProperties, PropertyResolver};
use crate::tree::SitemapTree;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapState {
    pub tree: SitemapTree,
    #[serde(default)]
    pub clipboard: Clipboard,
    #[serde(default)]
    pub detail_pages: DetailPageTable,
}

impl SitemapState {
    /// State for a freshly loaded tree. Detail pages are collected from the tree.
    pub fn new(tree: SitemapTree) -> Self {
        let detail_pages = collect_detail_pages(tree.root());
        Self {
            tree,
            clipboard: Clipboard::new(),
            detail_pages,
        }
    }

    pub fn with_clipboard(mut self, clipboard: Clipboard) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn with_detail_pages(mut self, detail_pages: DetailPageTable) -> Self {
        self.detail_pages = detail_pages;
        self
    }

    /// Effective properties of every loaded entry
    pub fn compute_properties(&self) -> EffectiveProperties {
        PropertyResolver::new(&self.tree).compute_all()
    }
}

/// Detail-page bindings of a subtree, in pre-order
pub fn collect_detail_pages(entry: &Entry) -> DetailPageTable {
    let mut table = DetailPageTable::new();
    entry.walk(&mut |e| {
        if let Some(type_name) = &e.detail_page_type {
            table.add(DetailPageInfo::new(e.id, e.site_path.clone(), type_name.clone()));
        }
    });
    table
}
