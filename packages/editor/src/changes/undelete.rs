use crate::commit::{CommitKind, CommitRequest, CommitResponse, EntryCommit};
use crate::view::SitemapView;
use sitemap_model::{collect_detail_pages, path, EditStatus, Entry, EntryId, SitemapState};
use tracing::warn;

use super::delete::DeleteChange;
use super::{has_detail_pages, ChangeError};

/// Restore of an entry from the deleted list. The authority rebuilds the
/// subtree; the local model only learns it from the commit response.
#[derive(Debug, Clone, PartialEq)]
pub struct UndeleteChange {
    entry_id: EntryId,
    site_path: String,
    parent_path: String,
    parent_id: EntryId,
    position: usize,
    had_detail_pages: bool,
    restored: Option<Entry>,
}

impl UndeleteChange {
    pub fn new(state: &SitemapState, entry_id: EntryId) -> Option<Self> {
        let Some(deleted) = state.clipboard.find_deleted(entry_id) else {
            warn!(%entry_id, "entry is not in the deleted list");
            return None;
        };
        let Some(parent_path) = path::parent_path(&deleted.site_path) else {
            warn!(path = %deleted.site_path, "deleted entry has no parent path");
            return None;
        };
        let parent = match state.tree.lookup(&parent_path) {
            Some(parent) if parent.is_container() && parent.children_loaded => parent,
            _ => {
                warn!(parent = %parent_path, "parent of deleted entry is not loaded");
                return None;
            }
        };
        if parent.has_child_named(&deleted.name) {
            warn!(path = %deleted.site_path, "restore target is taken by another entry");
            return None;
        }

        Some(Self {
            entry_id,
            site_path: deleted.site_path.clone(),
            parent_path,
            parent_id: parent.id,
            position: parent.child_count(),
            had_detail_pages: has_detail_pages(deleted),
            restored: None,
        })
    }

    pub fn site_path(&self) -> &str {
        &self.site_path
    }

    pub(crate) fn is_changing_detail_pages(&self) -> bool {
        match &self.restored {
            Some(entry) => has_detail_pages(entry),
            None => self.had_detail_pages,
        }
    }

    pub(crate) fn commit_request(&self) -> Option<CommitRequest> {
        let mut commit = EntryCommit::new(CommitKind::Undelete, self.entry_id, self.site_path.clone());
        commit.parent_id = Some(self.parent_id);
        commit.position = Some(self.position);
        Some(CommitRequest::single(commit))
    }

    pub(crate) fn fold_response(&mut self, response: &CommitResponse) {
        let remote = response
            .entry(self.entry_id)
            .or_else(|| response.entry_at(&self.site_path));
        if let Some(remote) = remote {
            let mut entry = remote.clone();
            entry.edit_status = EditStatus::Edited;
            self.restored = Some(entry);
        }
    }

    pub(crate) fn apply(&self, state: &mut SitemapState) -> Result<(), ChangeError> {
        let entry = self
            .restored
            .clone()
            .ok_or(ChangeError::NotCommitted("undelete"))?;
        let id = entry.id;
        state.tree.insert(&self.parent_path, self.position, entry)?;
        state.clipboard.remove_deleted(self.entry_id);

        if let Some(inserted) = state.tree.lookup(&self.site_path) {
            state.clipboard.add_modified(inserted);
            for info in collect_detail_pages(inserted).pages() {
                state.detail_pages.add(info.clone());
            }
        } else {
            warn!(%id, path = %self.site_path, "restored entry landed at an unexpected path");
        }
        Ok(())
    }

    pub(crate) fn apply_to_view(&self, view: &mut dyn SitemapView, state: &SitemapState) {
        if let Some(inserted) = state.tree.lookup(&self.site_path) {
            view.entry_inserted(&self.parent_path, inserted.position, inserted);
        }
    }

    pub fn invert(&self) -> Result<DeleteChange, ChangeError> {
        let entry = self
            .restored
            .clone()
            .ok_or(ChangeError::NotCommitted("undelete"))?;
        let detail_slots = collect_detail_pages(&entry)
            .pages()
            .iter()
            .map(|info| (None, info.clone()))
            .collect();
        Ok(DeleteChange::from_parts(
            entry,
            self.parent_id,
            self.parent_path.clone(),
            self.position,
            false,
            detail_slots,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitemap_model::SitemapTree;

    fn state_with_deleted() -> (SitemapState, Entry) {
        let mut state = SitemapState::new(SitemapTree::new(
            Entry::root("/").with_children(vec![Entry::page("a.html")]),
        ));
        let mut gone = Entry::page("gone.html");
        gone.update_site_path("/gone.html".to_string());
        gone.edit_status = EditStatus::DeletedPending;
        state.clipboard.add_deleted(gone.clone());
        (state, gone)
    }

    #[test]
    fn test_apply_needs_server_data() {
        let (mut state, gone) = state_with_deleted();
        let change = UndeleteChange::new(&state, gone.id).unwrap();
        assert_eq!(
            change.apply(&mut state).unwrap_err(),
            ChangeError::NotCommitted("undelete")
        );
        assert!(change.invert().is_err());
    }

    #[test]
    fn test_restored_subtree_is_inserted_at_the_end() {
        let (mut state, gone) = state_with_deleted();
        let mut change = UndeleteChange::new(&state, gone.id).unwrap();
        let mut remote = gone.clone();
        remote.edit_status = EditStatus::Unmodified;
        change.fold_response(&CommitResponse {
            entries: vec![remote],
        });
        change.apply(&mut state).unwrap();

        let restored = state.tree.lookup("/gone.html").unwrap();
        assert_eq!(restored.position, 1);
        assert_eq!(restored.edit_status, EditStatus::Edited);
        assert!(!state.clipboard.is_deleted(gone.id));
        assert!(state.clipboard.is_modified(gone.id));

        let undo = change.invert().unwrap();
        undo.apply(&mut state).unwrap();
        assert!(state.tree.lookup("/gone.html").is_none());
        assert!(state.clipboard.is_deleted(gone.id));
    }

    #[test]
    fn test_unknown_entry_is_rejected() {
        let (state, _) = state_with_deleted();
        assert!(UndeleteChange::new(&state, EntryId::new()).is_none());
    }
}
