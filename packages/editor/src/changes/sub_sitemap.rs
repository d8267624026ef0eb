//! Folding server-side sub-sitemap extraction and merging into the model.

use crate::remote::SubSitemapResult;
use crate::view::SitemapView;
use sitemap_model::{collect_detail_pages, Entry, EntryId, ModelError, SitemapState};

use super::edit::{EditChange, EntryEdit, PropertyModification};
use super::{has_detail_pages, ChangeError};

/// Property marking an entry whose children live in an external sitemap
pub const SUB_SITEMAP_PROPERTY: &str = "SubSitemap";

#[derive(Debug, Clone, PartialEq)]
pub struct SubSitemapChange {
    edit: EditChange,
    entry_id: EntryId,
    site_path: String,
    /// Server view of the entry after the operation
    result: Entry,
    changes_detail_pages: bool,
}

impl SubSitemapChange {
    /// Entry `entry_id` now points to an external sitemap
    pub fn created(state: &SitemapState, entry_id: EntryId, result: SubSitemapResult) -> Option<Self> {
        let marker = PropertyModification::set(SUB_SITEMAP_PROPERTY, "true");
        Self::new(state, entry_id, marker, result)
    }

    /// The external sitemap of `entry_id` was merged back
    pub fn merged(state: &SitemapState, entry_id: EntryId, result: SubSitemapResult) -> Option<Self> {
        let marker = PropertyModification::remove(SUB_SITEMAP_PROPERTY);
        Self::new(state, entry_id, marker, result)
    }

    fn new(
        state: &SitemapState,
        entry_id: EntryId,
        marker: PropertyModification,
        result: SubSitemapResult,
    ) -> Option<Self> {
        let edit = EditChange::new(state, entry_id, &EntryEdit::property(marker))?;
        let entry = state.tree.entry_by_id(entry_id)?;
        let changes_detail_pages = entry.children().iter().any(has_detail_pages)
            || result.entry.children().iter().any(has_detail_pages);
        Some(Self {
            edit,
            entry_id,
            site_path: entry.site_path.clone(),
            result: result.entry,
            changes_detail_pages,
        })
    }

    pub fn site_path(&self) -> &str {
        &self.site_path
    }

    pub(crate) fn is_changing_detail_pages(&self) -> bool {
        self.changes_detail_pages
    }

    pub(crate) fn apply(&self, state: &mut SitemapState) -> Result<(), ChangeError> {
        self.edit.apply(state)?;

        let entry = state
            .tree
            .lookup_mut(&self.site_path)
            .ok_or_else(|| ModelError::PathNotFound(self.site_path.clone()))?;
        let dropped: Vec<EntryId> = entry
            .children()
            .iter()
            .flat_map(Entry::subtree_ids)
            .collect();
        entry.merge_server_data(&self.result);
        entry.replace_children(self.result.children().to_vec());
        entry.children_loaded = self.result.children_loaded;
        let entry = entry.clone();

        state.clipboard.forget_modified(&dropped);
        for id in &dropped {
            state.detail_pages.remove(*id);
        }
        for info in collect_detail_pages(&entry).pages() {
            if info.id != entry.id {
                state.detail_pages.add(info.clone());
            }
        }
        Ok(())
    }

    pub(crate) fn apply_to_view(&self, view: &mut dyn SitemapView, state: &SitemapState) {
        let entry = state
            .tree
            .entry_by_id(self.entry_id)
            .or_else(|| state.tree.lookup(&self.site_path));
        if let Some(entry) = entry {
            view.subtree_replaced(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitemap_model::{PropertyValue, SitemapTree};

    fn state() -> SitemapState {
        SitemapState::new(SitemapTree::new(Entry::root("/").with_children(vec![
            Entry::folder("shop").with_children(vec![
                Entry::page("cart.html"),
                Entry::folder("item").with_detail_page_type("product"),
            ]),
        ])))
    }

    #[test]
    fn test_create_replaces_children_and_marks_entry() {
        let mut state = state();
        let shop = state.tree.lookup("/shop/").unwrap().clone();
        let cart = state.tree.lookup("/shop/cart.html").unwrap().clone();
        state.clipboard.add_modified(&cart);

        let result = SubSitemapResult {
            entry: shop.shallow_copy(),
        };
        let change = SubSitemapChange::created(&state, shop.id, result).unwrap();
        assert!(change.is_changing_detail_pages());
        change.apply(&mut state).unwrap();

        let shop = state.tree.lookup("/shop/").unwrap();
        assert_eq!(shop.child_count(), 0);
        assert!(shop.properties.contains_key(SUB_SITEMAP_PROPERTY));
        assert!(!state.clipboard.is_modified(cart.id));
        assert!(state.detail_pages.is_empty());
    }

    #[test]
    fn test_merge_brings_children_back() {
        let mut state = state();
        let shop_id = state.tree.lookup("/shop/").unwrap().id;
        state
            .tree
            .lookup_mut("/shop/")
            .unwrap()
            .properties
            .insert(SUB_SITEMAP_PROPERTY.to_string(), PropertyValue::new("true"));

        let mut merged = Entry::folder("shop").with_children(vec![Entry::page("faq.html")]);
        merged.id = shop_id;
        let change = SubSitemapChange::merged(&state, shop_id, SubSitemapResult { entry: merged }).unwrap();
        change.apply(&mut state).unwrap();

        let shop = state.tree.lookup("/shop/").unwrap();
        assert!(!shop.properties.contains_key(SUB_SITEMAP_PROPERTY));
        assert_eq!(state.tree.lookup("/shop/faq.html").unwrap().position, 0);
        assert!(state.tree.find_inconsistency().is_none());
    }
}
