use crate::commit::{CommitKind, CommitRequest, EntryCommit};
use crate::view::SitemapView;
use sitemap_model::{DetailPageInfo, EditStatus, Entry, EntryId, SitemapState};
use tracing::warn;

use super::create::NewChange;
use super::{detail_page_slots, ChangeError};

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteChange {
    /// The removed subtree as it was in the tree
    entry: Entry,
    parent_id: EntryId,
    parent_path: String,
    position: usize,
    /// Never committed as an existing entry, so nothing to keep for restore
    was_new: bool,
    detail_slots: Vec<(Option<usize>, DetailPageInfo)>,
}

impl DeleteChange {
    pub fn new(state: &SitemapState, entry_id: EntryId) -> Option<Self> {
        let Some(entry) = state.tree.entry_by_id(entry_id) else {
            warn!(%entry_id, "delete of unknown entry abandoned");
            return None;
        };
        let Some(parent) = state.tree.parent_of(&entry.site_path) else {
            warn!(path = %entry.site_path, "the root entry cannot be deleted");
            return None;
        };
        let detail_slots = detail_page_slots(&state.detail_pages, entry)
            .into_iter()
            .map(|(index, info)| (Some(index), info))
            .collect();
        Some(Self::from_parts(
            entry.clone(),
            parent.id,
            parent.site_path.clone(),
            entry.position,
            entry.is_new(),
            detail_slots,
        ))
    }

    pub(crate) fn from_parts(
        entry: Entry,
        parent_id: EntryId,
        parent_path: String,
        position: usize,
        was_new: bool,
        detail_slots: Vec<(Option<usize>, DetailPageInfo)>,
    ) -> Self {
        Self {
            entry,
            parent_id,
            parent_path,
            position,
            was_new,
            detail_slots,
        }
    }

    pub fn site_path(&self) -> &str {
        &self.entry.site_path
    }

    pub(crate) fn is_changing_detail_pages(&self) -> bool {
        !self.detail_slots.is_empty()
    }

    pub(crate) fn commit_request(&self) -> Option<CommitRequest> {
        let mut commit = EntryCommit::new(CommitKind::Delete, self.entry.id, self.entry.site_path.clone());
        commit.parent_id = Some(self.parent_id);
        commit.is_new = self.was_new;
        Some(CommitRequest::single(commit))
    }

    pub(crate) fn apply(&self, state: &mut SitemapState) -> Result<(), ChangeError> {
        let (removed, _) = state.tree.remove(&self.entry.site_path)?;

        if self.was_new {
            state.clipboard.forget_modified(&removed.subtree_ids());
        } else {
            let mut pending = removed;
            pending.edit_status = EditStatus::DeletedPending;
            state.clipboard.add_deleted(pending);
        }

        for (_, info) in &self.detail_slots {
            state.detail_pages.remove(info.id);
        }
        Ok(())
    }

    pub(crate) fn apply_to_view(&self, view: &mut dyn SitemapView) {
        view.entry_removed(&self.entry.site_path);
    }

    pub fn invert(&self) -> NewChange {
        NewChange::restore(
            self.entry.clone(),
            self.parent_id,
            self.parent_path.clone(),
            self.position,
            !self.was_new,
            self.detail_slots.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitemap_model::SitemapTree;

    fn state() -> SitemapState {
        SitemapState::new(SitemapTree::new(Entry::root("/").with_children(vec![
            Entry::page("a.html"),
            Entry::folder("news").with_children(vec![
                Entry::page("x.html"),
                Entry::folder("detail").with_detail_page_type("article"),
            ]),
            Entry::page("z.html"),
        ])))
    }

    #[test]
    fn test_delete_moves_subtree_to_deleted_list() {
        let mut state = state();
        let x = state.tree.lookup("/news/x.html").unwrap().clone();
        let news = state.tree.lookup("/news/").unwrap().id;
        state.clipboard.add_modified(&x);

        let change = DeleteChange::new(&state, news).unwrap();
        assert!(change.is_changing_detail_pages());
        change.apply(&mut state).unwrap();

        assert!(state.tree.lookup("/news/").is_none());
        assert_eq!(state.tree.lookup("/z.html").unwrap().position, 1);
        assert!(state.clipboard.is_deleted(news));
        assert!(!state.clipboard.is_modified(x.id));
        assert!(state.detail_pages.is_empty());
        assert_eq!(
            state.clipboard.find_deleted(news).unwrap().edit_status,
            EditStatus::DeletedPending
        );
    }

    #[test]
    fn test_delete_of_new_entry_is_forgotten() {
        let mut state = state();
        state.tree.lookup_mut("/a.html").unwrap().edit_status = EditStatus::New;
        let a = state.tree.lookup("/a.html").unwrap().id;
        let change = DeleteChange::new(&state, a).unwrap();
        assert!(change.commit_request().unwrap().operations[0].is_new);
        change.apply(&mut state).unwrap();
        assert!(!state.clipboard.is_deleted(a));
    }

    #[test]
    fn test_invert_restores_tree_and_detail_pages() {
        let mut state = state();
        let tree = state.tree.clone();
        let detail_pages = state.detail_pages.clone();
        let news = state.tree.lookup("/news/").unwrap().id;

        let change = DeleteChange::new(&state, news).unwrap();
        change.apply(&mut state).unwrap();
        let undo = change.invert();
        assert!(undo.is_restored());
        undo.apply(&mut state).unwrap();

        assert_eq!(state.tree, tree);
        assert_eq!(state.detail_pages, detail_pages);
        assert!(!state.clipboard.is_deleted(news));
        assert!(state.clipboard.is_consistent());
    }

    #[test]
    fn test_root_cannot_be_deleted() {
        let state = state();
        assert!(DeleteChange::new(&state, state.tree.root().id).is_none());
    }
}
