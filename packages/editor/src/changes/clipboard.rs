//! Clearing and restoring the clipboard lists.

use crate::commit::{ClipboardSnapshot, CommitRequest};
use sitemap_model::{Clipboard, SitemapState};

use super::ChangeError;

#[derive(Debug, Clone, PartialEq)]
pub struct ClipboardChange {
    before: Clipboard,
    after: Clipboard,
}

impl ClipboardChange {
    pub fn clear_modified(state: &SitemapState) -> Self {
        let mut after = state.clipboard.clone();
        after.clear_modified();
        Self {
            before: state.clipboard.clone(),
            after,
        }
    }

    pub fn clear_deleted(state: &SitemapState) -> Self {
        let mut after = state.clipboard.clone();
        after.clear_deleted();
        Self {
            before: state.clipboard.clone(),
            after,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }

    pub(crate) fn commit_request(&self) -> Option<CommitRequest> {
        if self.is_noop() {
            return None;
        }
        Some(CommitRequest {
            clipboard: Some(ClipboardSnapshot::from(&self.after)),
            ..CommitRequest::default()
        })
    }

    pub(crate) fn apply(&self, state: &mut SitemapState) -> Result<(), ChangeError> {
        state.clipboard = self.after.clone();
        Ok(())
    }

    pub fn invert(&self) -> ClipboardChange {
        ClipboardChange {
            before: self.after.clone(),
            after: self.before.clone(),
        }
    }
}
