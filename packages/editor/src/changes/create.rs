//! Creation of new entries, and re-insertion of deleted ones on undo.

use crate::commit::{CommitKind, CommitRequest, CommitResponse, EntryCommit};
use crate::view::SitemapView;
use sitemap_model::{
    collect_detail_pages, DetailPageInfo, DetailPageTable, EditStatus, Entry, EntryId, SitemapState,
};
use tracing::warn;

use super::delete::DeleteChange;
use super::ChangeError;

#[derive(Debug, Clone, PartialEq)]
pub struct NewChange {
    entry: Entry,
    parent_id: EntryId,
    parent_path: String,
    position: usize,
    /// Re-inserted from the deleted list rather than created from scratch
    restored: bool,
    /// Detail-page bindings of the subtree, with the index to restore them at
    detail_slots: Vec<(Option<usize>, DetailPageInfo)>,
    detail_pages_after: Option<DetailPageTable>,
}

impl NewChange {
    /// Create `entry` as a brand-new child of `parent_id`
    pub fn new(state: &SitemapState, parent_id: EntryId, position: usize, mut entry: Entry) -> Option<Self> {
        let Some(parent) = state.tree.entry_by_id(parent_id) else {
            warn!(%parent_id, "parent of new entry not found");
            return None;
        };
        if !parent.is_container() || !parent.children_loaded {
            warn!(parent = %parent.site_path, "new entry needs a loaded container parent");
            return None;
        }
        if parent.has_child_named(&entry.name) {
            warn!(parent = %parent.site_path, name = %entry.name, "name of new entry already taken");
            return None;
        }

        entry.edit_status = EditStatus::New;
        entry.update_site_path(parent.path_for_child(&entry.name, entry.kind));
        let detail_slots: Vec<(Option<usize>, DetailPageInfo)> = collect_detail_pages(&entry)
            .pages()
            .iter()
            .map(|info| (None, info.clone()))
            .collect();
        let detail_pages_after = (!detail_slots.is_empty()).then(|| {
            let mut table = state.detail_pages.clone();
            for (_, info) in &detail_slots {
                table.add(info.clone());
            }
            table
        });

        Some(Self {
            position: position.min(parent.child_count()),
            parent_id,
            parent_path: parent.site_path.clone(),
            entry,
            restored: false,
            detail_slots,
            detail_pages_after,
        })
    }

    /// Put a deleted subtree back where it was
    pub(crate) fn restore(
        entry: Entry,
        parent_id: EntryId,
        parent_path: String,
        position: usize,
        restored: bool,
        detail_slots: Vec<(Option<usize>, DetailPageInfo)>,
    ) -> Self {
        Self {
            entry,
            parent_id,
            parent_path,
            position,
            restored,
            detail_slots,
            detail_pages_after: None,
        }
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    pub fn site_path(&self) -> &str {
        &self.entry.site_path
    }

    pub fn is_restored(&self) -> bool {
        self.restored
    }

    pub(crate) fn is_changing_detail_pages(&self) -> bool {
        !self.detail_slots.is_empty()
    }

    pub(crate) fn commit_request(&self) -> Option<CommitRequest> {
        let mut commit = EntryCommit::from_entry(CommitKind::Create, &self.entry);
        commit.parent_id = Some(self.parent_id);
        commit.position = Some(self.position);
        commit.is_new = !self.restored;
        Some(CommitRequest::single(commit).with_detail_pages(self.detail_pages_after.clone()))
    }

    pub(crate) fn fold_response(&mut self, response: &CommitResponse) {
        let remote = response
            .entry(self.entry.id)
            .or_else(|| response.entry_at(&self.entry.site_path));
        let Some(remote) = remote else {
            return;
        };
        let old_id = self.entry.id;
        self.entry.merge_server_data(remote);
        let new_id = self.entry.id;
        if old_id == new_id {
            return;
        }
        for (_, info) in &mut self.detail_slots {
            if info.id == old_id {
                info.id = new_id;
            }
        }
        if let Some(table) = &mut self.detail_pages_after {
            if let Some((index, mut info)) = table.remove(old_id) {
                info.id = new_id;
                table.insert_at(index, info);
            }
        }
    }

    pub(crate) fn apply(&self, state: &mut SitemapState) -> Result<(), ChangeError> {
        state
            .tree
            .insert(&self.parent_path, self.position, self.entry.clone())?;

        if self.restored {
            state.clipboard.remove_deleted(self.entry.id);
            if let Some(inserted) = state.tree.lookup(&self.entry.site_path) {
                state.clipboard.add_modified(inserted);
            }
        }

        let Some(inserted) = state.tree.lookup(&self.entry.site_path) else {
            return Ok(());
        };
        let mut slotted = Vec::new();
        for info in collect_detail_pages(inserted).pages() {
            let slot = self
                .detail_slots
                .iter()
                .find(|(_, slot)| slot.id == info.id)
                .and_then(|(index, _)| *index);
            match slot {
                Some(index) => slotted.push((index, info.clone())),
                None => state.detail_pages.add(info.clone()),
            }
        }
        // Ascending, so every earlier slot is already filled
        slotted.sort_by_key(|(index, _)| *index);
        for (index, info) in slotted {
            state.detail_pages.insert_at(index, info);
        }
        Ok(())
    }

    pub(crate) fn apply_to_view(&self, view: &mut dyn SitemapView, state: &SitemapState) {
        if let Some(inserted) = state.tree.lookup(&self.entry.site_path) {
            view.entry_inserted(&self.parent_path, inserted.position, inserted);
        }
    }

    pub fn invert(&self) -> DeleteChange {
        DeleteChange::from_parts(
            self.entry.clone(),
            self.parent_id,
            self.parent_path.clone(),
            self.position,
            !self.restored,
            self.detail_slots.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::CommitResponse;
    use sitemap_model::SitemapTree;

    fn state() -> SitemapState {
        SitemapState::new(SitemapTree::new(Entry::root("/").with_children(vec![
            Entry::page("a.html"),
            Entry::folder("news"),
        ])))
    }

    #[test]
    fn test_new_entry_is_inserted_as_new() {
        let mut state = state();
        let news = state.tree.lookup("/news/").unwrap().id;
        let change = NewChange::new(&state, news, 0, Entry::page("fresh.html")).unwrap();
        change.apply(&mut state).unwrap();
        let fresh = state.tree.lookup("/news/fresh.html").unwrap();
        assert!(fresh.is_new());
        assert!(!state.clipboard.is_modified(fresh.id));
    }

    #[test]
    fn test_name_collision_is_rejected() {
        let state = state();
        let root = state.tree.root().id;
        assert!(NewChange::new(&state, root, 0, Entry::page("A.html")).is_none());
        let page = state.tree.lookup("/a.html").unwrap().id;
        assert!(NewChange::new(&state, page, 0, Entry::page("x.html")).is_none());
    }

    #[test]
    fn test_detail_page_is_registered() {
        let mut state = state();
        let root = state.tree.root().id;
        let entry = Entry::folder("events").with_detail_page_type("event");
        let id = entry.id;
        let change = NewChange::new(&state, root, 9, entry).unwrap();
        assert!(change.is_changing_detail_pages());
        assert!(change.commit_request().unwrap().detail_pages.is_some());
        change.apply(&mut state).unwrap();
        assert_eq!(state.detail_pages.get(id).unwrap().site_path, "/events/");
    }

    #[test]
    fn test_server_id_is_taken_over() {
        let state = state();
        let root = state.tree.root().id;
        let mut change = NewChange::new(&state, root, 0, Entry::page("b.html")).unwrap();
        let mut remote = change.entry().clone();
        remote.id = EntryId::new();
        change.fold_response(&CommitResponse {
            entries: vec![remote.clone()],
        });
        assert_eq!(change.entry().id, remote.id);
    }
}
