//! # Sitemap Changes
//!
//! A [`Change`] is one unit of edit. It never touches the model when it is
//! constructed: constructors capture the "before" state and compute the
//! "after" state, returning `None` when the edit is invalid against the
//! current model.
//!
//! ## Lifecycle
//!
//! ```text
//! constructed → committed → applied → (inverted)
//!      │            │           │
//!  to_commit    fold_response  apply_to_tree / apply_to_view
//! ```
//!
//! A change whose commit fails never leaves the constructed state.
//!
//! Sub-sitemap changes fold already committed server operations into the
//! local model; they have no commit request and no inverse.

mod clipboard;
mod composite;
mod create;
mod delete;
mod detail_page;
mod edit;
mod move_entry;
mod sub_sitemap;
mod undelete;

pub use clipboard::ClipboardChange;
pub use composite::CompositeChange;
pub use create::NewChange;
pub use delete::DeleteChange;
pub use detail_page::{BumpDetailPageChange, UndoBumpDetailPageChange};
pub use edit::{EditChange, EntryEdit, PropertyModification, PropertyTarget};
pub use move_entry::{MoveChange, MoveTarget};
pub use sub_sitemap::{SubSitemapChange, SUB_SITEMAP_PROPERTY};
pub use undelete::UndeleteChange;

use crate::commit::{CommitRequest, CommitResponse};
use crate::view::SitemapView;
use sitemap_model::{DetailPageInfo, DetailPageTable, Entry, ModelError, SitemapState};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChangeError {
    #[error("{change} does not support {operation}")]
    NotSupported {
        change: &'static str,
        operation: &'static str,
    },

    #[error("{0} needs the server response before it can be applied or inverted")]
    NotCommitted(&'static str),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

/// One unit of edit
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Edit(EditChange),
    Move(MoveChange),
    New(NewChange),
    Delete(DeleteChange),
    Undelete(UndeleteChange),
    Composite(CompositeChange),
    CreateSubSitemap(SubSitemapChange),
    MergeSubSitemap(SubSitemapChange),
    BumpDetailPage(BumpDetailPageChange),
    UndoBumpDetailPage(UndoBumpDetailPageChange),
    ClearModified(ClipboardChange),
    ClearDeleted(ClipboardChange),
    RestoreClipboard(ClipboardChange),
}

impl Change {
    /// Get a debug name for this change
    pub fn name(&self) -> &'static str {
        match self {
            Change::Edit(_) => "edit",
            Change::Move(_) => "move",
            Change::New(_) => "new",
            Change::Delete(_) => "delete",
            Change::Undelete(_) => "undelete",
            Change::Composite(_) => "composite",
            Change::CreateSubSitemap(_) => "create-sub-sitemap",
            Change::MergeSubSitemap(_) => "merge-sub-sitemap",
            Change::BumpDetailPage(_) => "bump-detail-page",
            Change::UndoBumpDetailPage(_) => "undo-bump-detail-page",
            Change::ClearModified(_) => "clear-modified",
            Change::ClearDeleted(_) => "clear-deleted",
            Change::RestoreClipboard(_) => "restore-clipboard",
        }
    }

    /// Serialize the change for the remote authority.
    ///
    /// `Ok(None)` means the change is a no-op and must not be sent.
    pub fn to_commit_request(&self) -> Result<Option<CommitRequest>, ChangeError> {
        Ok(match self {
            Change::Edit(c) => c.commit_request(),
            Change::Move(c) => c.commit_request(),
            Change::New(c) => c.commit_request(),
            Change::Delete(c) => c.commit_request(),
            Change::Undelete(c) => c.commit_request(),
            Change::Composite(c) => return c.commit_request(),
            Change::CreateSubSitemap(_) | Change::MergeSubSitemap(_) => {
                return Err(ChangeError::NotSupported {
                    change: self.name(),
                    operation: "commit",
                })
            }
            Change::BumpDetailPage(c) => c.commit_request(),
            Change::UndoBumpDetailPage(c) => c.commit_request(),
            Change::ClearModified(c) | Change::ClearDeleted(c) | Change::RestoreClipboard(c) => {
                c.commit_request()
            }
        })
    }

    /// Take over server-assigned data (ids, locks, restored subtrees)
    pub fn fold_response(&mut self, response: &CommitResponse) {
        match self {
            Change::Edit(c) => c.fold_response(response),
            Change::Move(c) => c.fold_response(response),
            Change::New(c) => c.fold_response(response),
            Change::Undelete(c) => c.fold_response(response),
            Change::Composite(c) => c.fold_response(response),
            Change::Delete(_)
            | Change::CreateSubSitemap(_)
            | Change::MergeSubSitemap(_)
            | Change::BumpDetailPage(_)
            | Change::UndoBumpDetailPage(_)
            | Change::ClearModified(_)
            | Change::ClearDeleted(_)
            | Change::RestoreClipboard(_) => {}
        }
    }

    /// Mutate tree, clipboard and detail pages to reflect the change
    pub fn apply_to_tree(&self, state: &mut SitemapState) -> Result<(), ChangeError> {
        match self {
            Change::Edit(c) => c.apply(state),
            Change::Move(c) => c.apply(state),
            Change::New(c) => c.apply(state),
            Change::Delete(c) => c.apply(state),
            Change::Undelete(c) => c.apply(state),
            Change::Composite(c) => c.apply(state),
            Change::CreateSubSitemap(c) | Change::MergeSubSitemap(c) => c.apply(state),
            Change::BumpDetailPage(c) => c.apply(state),
            Change::UndoBumpDetailPage(c) => c.apply(state),
            Change::ClearModified(c) | Change::ClearDeleted(c) | Change::RestoreClipboard(c) => {
                c.apply(state)
            }
        }
    }

    /// Push the minimal view update. `state` is the model after `apply_to_tree`.
    ///
    /// The detail-page view is refreshed at most once, however many parts touched it.
    pub fn apply_to_view(&self, view: &mut dyn SitemapView, state: &SitemapState) {
        self.notify_entries(view, state);
        if self.is_changing_detail_pages() {
            view.detail_pages_changed(&state.detail_pages);
        }
    }

    pub(crate) fn notify_entries(&self, view: &mut dyn SitemapView, state: &SitemapState) {
        match self {
            Change::Edit(c) => c.apply_to_view(view, state),
            Change::Move(c) => c.apply_to_view(view, state),
            Change::New(c) => c.apply_to_view(view, state),
            Change::Delete(c) => c.apply_to_view(view),
            Change::Undelete(c) => c.apply_to_view(view, state),
            Change::Composite(c) => c.apply_to_view(view, state),
            Change::CreateSubSitemap(c) | Change::MergeSubSitemap(c) => {
                c.apply_to_view(view, state)
            }
            Change::BumpDetailPage(_) | Change::UndoBumpDetailPage(_) => {}
            Change::ClearModified(_) | Change::ClearDeleted(_) | Change::RestoreClipboard(_) => {
                view.clipboard_changed(&state.clipboard)
            }
        }
    }

    /// Whether the detail-page index must be recomputed after applying
    pub fn is_changing_detail_pages(&self) -> bool {
        match self {
            Change::Edit(_)
            | Change::ClearModified(_)
            | Change::ClearDeleted(_)
            | Change::RestoreClipboard(_) => false,
            Change::Move(c) => c.is_changing_detail_pages(),
            Change::New(c) => c.is_changing_detail_pages(),
            Change::Delete(c) => c.is_changing_detail_pages(),
            Change::Undelete(c) => c.is_changing_detail_pages(),
            Change::Composite(c) => c.is_changing_detail_pages(),
            Change::CreateSubSitemap(c) | Change::MergeSubSitemap(c) => {
                c.is_changing_detail_pages()
            }
            Change::BumpDetailPage(_) | Change::UndoBumpDetailPage(_) => true,
        }
    }

    /// True when the change would not alter anything
    pub fn is_noop(&self) -> bool {
        match self {
            Change::Edit(c) => c.is_noop(),
            Change::Move(c) => c.is_noop(),
            Change::Composite(c) => c.is_noop(),
            Change::BumpDetailPage(c) => c.is_noop(),
            Change::UndoBumpDetailPage(c) => c.is_noop(),
            Change::ClearModified(c) | Change::ClearDeleted(c) | Change::RestoreClipboard(c) => {
                c.is_noop()
            }
            Change::New(_)
            | Change::Delete(_)
            | Change::Undelete(_)
            | Change::CreateSubSitemap(_)
            | Change::MergeSubSitemap(_) => false,
        }
    }

    /// Build the change that undoes this one
    pub fn invert(&self) -> Result<Change, ChangeError> {
        Ok(match self {
            Change::Edit(c) => Change::Edit(c.invert()),
            Change::Move(c) => Change::Move(c.invert()),
            Change::New(c) => Change::Delete(c.invert()),
            Change::Delete(c) => Change::New(c.invert()),
            Change::Undelete(c) => Change::Delete(c.invert()?),
            Change::Composite(c) => Change::Composite(c.invert()?),
            Change::CreateSubSitemap(_) | Change::MergeSubSitemap(_) => {
                return Err(ChangeError::NotSupported {
                    change: self.name(),
                    operation: "invert",
                })
            }
            Change::BumpDetailPage(c) => Change::UndoBumpDetailPage(c.invert()),
            Change::UndoBumpDetailPage(c) => Change::BumpDetailPage(c.invert()),
            Change::ClearModified(c) | Change::ClearDeleted(c) | Change::RestoreClipboard(c) => {
                Change::RestoreClipboard(c.invert())
            }
        })
    }

    /// Flatten nested composites into one combined change
    pub fn combine(changes: Vec<Change>) -> Option<Change> {
        let mut changes: Vec<Change> = changes.into_iter().filter(|c| !c.is_noop()).collect();
        match changes.len() {
            0 => None,
            1 => changes.pop(),
            _ => Some(Change::Composite(CompositeChange::new(changes))),
        }
    }
}

/// Detail-page bindings inside an entry subtree, with their table index
pub(crate) fn detail_page_slots(table: &DetailPageTable, entry: &Entry) -> Vec<(usize, DetailPageInfo)> {
    let ids = entry.subtree_ids();
    let mut slots: Vec<(usize, DetailPageInfo)> = table
        .pages()
        .iter()
        .enumerate()
        .filter(|(_, info)| ids.contains(&info.id))
        .map(|(index, info)| (index, info.clone()))
        .collect();
    slots.sort_by_key(|(index, _)| *index);
    slots
}

/// True if any entry of the subtree is a detail-page binding
pub(crate) fn has_detail_pages(entry: &Entry) -> bool {
    let mut found = false;
    entry.walk(&mut |e| found |= e.is_detail_page());
    found
}
