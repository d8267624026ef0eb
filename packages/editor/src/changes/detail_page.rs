//! Reordering of the detail-page index. These changes never touch the tree.

use crate::commit::CommitRequest;
use sitemap_model::{DetailPageTable, EntryId, SitemapState};
use tracing::warn;

use super::ChangeError;

/// Make one binding the default for its content type
#[derive(Debug, Clone, PartialEq)]
pub struct BumpDetailPageChange {
    entry_id: EntryId,
    prior_index: usize,
    before: DetailPageTable,
    after: DetailPageTable,
}

impl BumpDetailPageChange {
    pub fn new(state: &SitemapState, entry_id: EntryId) -> Option<Self> {
        let before = state.detail_pages.clone();
        let mut after = before.clone();
        let Some(prior_index) = after.bump(entry_id) else {
            warn!(%entry_id, "entry is not a detail page");
            return None;
        };
        Some(Self {
            entry_id,
            prior_index,
            before,
            after,
        })
    }

    pub fn entry_id(&self) -> EntryId {
        self.entry_id
    }

    pub fn prior_index(&self) -> usize {
        self.prior_index
    }

    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }

    pub(crate) fn commit_request(&self) -> Option<CommitRequest> {
        if self.is_noop() {
            return None;
        }
        Some(CommitRequest::default().with_detail_pages(Some(self.after.clone())))
    }

    pub(crate) fn apply(&self, state: &mut SitemapState) -> Result<(), ChangeError> {
        state.detail_pages.bump(self.entry_id);
        Ok(())
    }

    pub fn invert(&self) -> UndoBumpDetailPageChange {
        UndoBumpDetailPageChange {
            entry_id: self.entry_id,
            prior_index: self.prior_index,
            before: self.after.clone(),
            after: self.before.clone(),
        }
    }
}

/// Put a bumped binding back at its prior index
#[derive(Debug, Clone, PartialEq)]
pub struct UndoBumpDetailPageChange {
    entry_id: EntryId,
    prior_index: usize,
    before: DetailPageTable,
    after: DetailPageTable,
}

impl UndoBumpDetailPageChange {
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }

    pub(crate) fn commit_request(&self) -> Option<CommitRequest> {
        if self.is_noop() {
            return None;
        }
        Some(CommitRequest::default().with_detail_pages(Some(self.after.clone())))
    }

    pub(crate) fn apply(&self, state: &mut SitemapState) -> Result<(), ChangeError> {
        state
            .detail_pages
            .restore_position(self.entry_id, self.prior_index);
        Ok(())
    }

    pub fn invert(&self) -> BumpDetailPageChange {
        BumpDetailPageChange {
            entry_id: self.entry_id,
            prior_index: self.prior_index,
            before: self.after.clone(),
            after: self.before.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitemap_model::{Entry, SitemapTree};

    fn state() -> SitemapState {
        SitemapState::new(SitemapTree::new(Entry::root("/").with_children(vec![
            Entry::folder("news").with_detail_page_type("article"),
            Entry::folder("events").with_detail_page_type("event"),
            Entry::folder("blog").with_detail_page_type("article"),
        ])))
    }

    #[test]
    fn test_bump_and_undo_restore_identical_order() {
        let mut state = state();
        let tree = state.tree.clone();
        let original = state.detail_pages.clone();
        let blog = state.tree.lookup("/blog/").unwrap().id;

        let bump = BumpDetailPageChange::new(&state, blog).unwrap();
        assert_eq!(bump.prior_index(), 2);
        bump.apply(&mut state).unwrap();
        assert!(state.detail_pages.is_default(blog));

        bump.invert().apply(&mut state).unwrap();
        assert_eq!(state.detail_pages, original);
        assert_eq!(state.tree, tree);
    }

    #[test]
    fn test_bump_of_default_is_noop() {
        let state = state();
        let news = state.tree.lookup("/news/").unwrap().id;
        let bump = BumpDetailPageChange::new(&state, news).unwrap();
        assert!(bump.is_noop());
        assert!(bump.commit_request().is_none());
    }

    #[test]
    fn test_bump_of_plain_entry_is_rejected() {
        let state = state();
        assert!(BumpDetailPageChange::new(&state, state.tree.root().id).is_none());
    }
}
