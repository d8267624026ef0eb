//! The remote authority seam.
//!
//! The authority is the final arbiter of every edit. The controller only
//! touches its local model after the authority has accepted a commit.

use crate::commit::{CommitRequest, CommitResponse};
use async_trait::async_trait;
use sitemap_model::{Entry, EntryId};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    #[error("{path} is locked by {owner}")]
    Locked { path: String, owner: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("{0} was changed by another session")]
    StaleVersion(String),

    #[error("Not found on server: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result of a server-side sub-sitemap operation
#[derive(Debug, Clone, PartialEq)]
pub struct SubSitemapResult {
    /// The entry after the operation, with the children the local model should show
    pub entry: Entry,
}

#[async_trait]
pub trait RemoteAuthority: Send + Sync {
    /// Commit one change. Returns the entries the authority touched.
    async fn commit(&self, request: CommitRequest) -> Result<CommitResponse, RemoteError>;

    /// Children of `site_path`, loaded `depth` levels deep
    async fn load_children(&self, site_path: &str, depth: u32) -> Result<Vec<Entry>, RemoteError>;

    /// Collision-free (case-insensitive) name for a new child of `parent_path`
    async fn unique_name(&self, parent_path: &str, candidate: &str) -> Result<String, RemoteError>;

    async fn create_sub_sitemap(&self, entry_id: EntryId) -> Result<SubSitemapResult, RemoteError>;

    async fn merge_sub_sitemap(&self, entry_id: EntryId) -> Result<SubSitemapResult, RemoteError>;
}

#[async_trait]
impl<R: RemoteAuthority + ?Sized> RemoteAuthority for Arc<R> {
    async fn commit(&self, request: CommitRequest) -> Result<CommitResponse, RemoteError> {
        (**self).commit(request).await
    }

    async fn load_children(&self, site_path: &str, depth: u32) -> Result<Vec<Entry>, RemoteError> {
        (**self).load_children(site_path, depth).await
    }

    async fn unique_name(&self, parent_path: &str, candidate: &str) -> Result<String, RemoteError> {
        (**self).unique_name(parent_path, candidate).await
    }

    async fn create_sub_sitemap(&self, entry_id: EntryId) -> Result<SubSitemapResult, RemoteError> {
        (**self).create_sub_sitemap(entry_id).await
    }

    async fn merge_sub_sitemap(&self, entry_id: EntryId) -> Result<SubSitemapResult, RemoteError> {
        (**self).merge_sub_sitemap(entry_id).await
    }
}
