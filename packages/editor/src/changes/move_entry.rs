//! Moves, reorders and renames.
//!
//! A rename is a move to the same parent and position under a new name, so
//! every path rewrite goes through [`MoveChange`].

use crate::commit::{CommitKind, CommitRequest, CommitResponse, EntryCommit};
use crate::view::SitemapView;
use sitemap_model::{path, DetailPageTable, EditStatus, EntryId, LockInfo, SitemapState};
use tracing::warn;

use super::{has_detail_pages, ChangeError};

/// Where an entry should end up
#[derive(Debug, Clone, PartialEq)]
pub struct MoveTarget {
    pub parent_path: String,
    /// Index among the target siblings once the entry has been detached
    pub position: usize,
    pub name: Option<String>,
    pub in_navigation: Option<bool>,
    /// Explicit status, used when reverting a move
    pub status: Option<EditStatus>,
    /// Commit even if nothing would change
    pub forced: bool,
}

impl MoveTarget {
    pub fn new(parent_path: impl Into<String>, position: usize) -> Self {
        Self {
            parent_path: parent_path.into(),
            position,
            name: None,
            in_navigation: None,
            status: None,
            forced: false,
        }
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn in_navigation(mut self, in_navigation: bool) -> Self {
        self.in_navigation = Some(in_navigation);
        self
    }

    pub fn with_status(mut self, status: EditStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn forced(mut self) -> Self {
        self.forced = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Placement {
    site_path: String,
    parent_path: String,
    parent_id: EntryId,
    position: usize,
    name: String,
    in_navigation: bool,
    status: EditStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveChange {
    entry_id: EntryId,
    source: Placement,
    target: Placement,
    forced: bool,
    moves_detail_pages: bool,
    detail_pages_after: Option<DetailPageTable>,
    detail_pages_before: Option<DetailPageTable>,
    lock: Option<LockInfo>,
}

impl MoveChange {
    pub fn new(state: &SitemapState, entry_id: EntryId, target: MoveTarget) -> Option<Self> {
        let tree = &state.tree;
        let Some(entry) = tree.entry_by_id(entry_id) else {
            warn!(%entry_id, "move of unknown entry abandoned");
            return None;
        };
        let Some(source_parent) = tree.parent_of(&entry.site_path) else {
            warn!(path = %entry.site_path, "the root entry cannot be moved");
            return None;
        };
        let target_parent = match tree.lookup(&target.parent_path) {
            Some(parent) if parent.is_container() && parent.children_loaded => parent,
            _ => {
                warn!(parent = %target.parent_path, "move target parent is not a loaded container");
                return None;
            }
        };
        if entry.is_container() && path::is_same_or_below(&entry.site_path, &target_parent.site_path) {
            warn!(
                path = %entry.site_path,
                parent = %target_parent.site_path,
                "move would create a cycle"
            );
            return None;
        }

        let name = target.name.unwrap_or_else(|| entry.name.clone());
        let collides = target_parent
            .children()
            .iter()
            .any(|c| c.id != entry_id && c.name.eq_ignore_ascii_case(&name));
        if collides {
            warn!(parent = %target_parent.site_path, %name, "move target name already taken");
            return None;
        }

        let same_parent = source_parent.site_path == target_parent.site_path;
        let sibling_count = if same_parent {
            target_parent.child_count() - 1
        } else {
            target_parent.child_count()
        };
        let default_status = if entry.is_new() {
            EditStatus::New
        } else {
            EditStatus::Edited
        };

        let target_path = path::child_path(&target_parent.site_path, &name, entry.is_container());
        let moves_detail_pages = has_detail_pages(entry);
        let (detail_pages_before, detail_pages_after) = if moves_detail_pages {
            let mut after = state.detail_pages.clone();
            after.rebase_paths(&entry.site_path, &target_path);
            (Some(state.detail_pages.clone()), Some(after))
        } else {
            (None, None)
        };

        Some(Self {
            entry_id,
            source: Placement {
                site_path: entry.site_path.clone(),
                parent_path: source_parent.site_path.clone(),
                parent_id: source_parent.id,
                position: entry.position,
                name: entry.name.clone(),
                in_navigation: entry.in_navigation,
                status: entry.edit_status,
            },
            target: Placement {
                site_path: target_path,
                parent_path: target_parent.site_path.clone(),
                parent_id: target_parent.id,
                position: target.position.min(sibling_count),
                name,
                in_navigation: target.in_navigation.unwrap_or(entry.in_navigation),
                status: target.status.unwrap_or(default_status),
            },
            forced: target.forced,
            moves_detail_pages,
            detail_pages_after,
            detail_pages_before,
            lock: None,
        })
    }

    pub fn entry_id(&self) -> EntryId {
        self.entry_id
    }

    pub fn source_path(&self) -> &str {
        &self.source.site_path
    }

    pub fn target_path(&self) -> &str {
        &self.target.site_path
    }

    pub fn target_position(&self) -> usize {
        self.target.position
    }

    pub fn is_noop(&self) -> bool {
        !self.forced
            && self.source.site_path == self.target.site_path
            && self.source.position == self.target.position
            && self.source.in_navigation == self.target.in_navigation
    }

    pub(crate) fn is_changing_detail_pages(&self) -> bool {
        self.moves_detail_pages && self.source.site_path != self.target.site_path
    }

    pub(crate) fn commit_request(&self) -> Option<CommitRequest> {
        if self.is_noop() {
            return None;
        }
        let mut commit = EntryCommit::new(CommitKind::Move, self.entry_id, self.source.site_path.clone());
        commit.parent_id = Some(self.target.parent_id);
        commit.name = Some(self.target.name.clone());
        commit.position = Some(self.target.position);
        commit.in_navigation = Some(self.target.in_navigation);
        commit.is_new = self.target.status == EditStatus::New;
        let detail_pages = self
            .is_changing_detail_pages()
            .then(|| self.detail_pages_after.clone())
            .flatten();
        Some(CommitRequest::single(commit).with_detail_pages(detail_pages))
    }

    pub(crate) fn fold_response(&mut self, response: &CommitResponse) {
        if let Some(remote) = response.entry(self.entry_id) {
            self.lock = Some(remote.lock.clone());
        }
    }

    pub(crate) fn apply(&self, state: &mut SitemapState) -> Result<(), ChangeError> {
        if self.is_noop() {
            return Ok(());
        }
        let (mut entry, _) = state.tree.remove(&self.source.site_path)?;
        entry.name = self.target.name.clone();
        entry.in_navigation = self.target.in_navigation;
        entry.edit_status = self.target.status;
        if let Some(lock) = &self.lock {
            entry.lock = lock.clone();
        }
        state
            .tree
            .insert(&self.target.parent_path, self.target.position, entry)?;

        state
            .clipboard
            .rebase_paths(&self.source.site_path, &self.target.site_path);
        if let Some(moved) = state.tree.lookup(&self.target.site_path) {
            state.clipboard.add_modified(moved);
        }
        state
            .detail_pages
            .rebase_paths(&self.source.site_path, &self.target.site_path);
        Ok(())
    }

    pub(crate) fn apply_to_view(&self, view: &mut dyn SitemapView, state: &SitemapState) {
        if self.is_noop() {
            return;
        }
        view.entry_removed(&self.source.site_path);
        if let Some(moved) = state.tree.lookup(&self.target.site_path) {
            view.entry_inserted(&self.target.parent_path, moved.position, moved);
        }
    }

    pub fn invert(&self) -> MoveChange {
        MoveChange {
            entry_id: self.entry_id,
            source: self.target.clone(),
            target: self.source.clone(),
            forced: self.forced,
            moves_detail_pages: self.moves_detail_pages,
            detail_pages_after: self.detail_pages_before.clone(),
            detail_pages_before: self.detail_pages_after.clone(),
            lock: self.lock.clone(),
        }
    }
}
