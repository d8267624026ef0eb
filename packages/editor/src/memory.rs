//! # In-Memory Authority
//!
//! A [`RemoteAuthority`] that keeps the authoritative tree in process. Used
//! by the replay binary and the tests.
//!
//! Every commit is applied to a copy of the server tree and swapped in only
//! if all of its operations succeed.

use crate::changes::SUB_SITEMAP_PROPERTY;
use crate::commit::{ClipboardSnapshot, CommitKind, CommitRequest, CommitResponse, EntryCommit};
use crate::remote::{RemoteAuthority, RemoteError, SubSitemapResult};
use async_trait::async_trait;
use sitemap_model::{
    path, DetailPageTable, EditStatus, Entry, EntryId, EntryKind, LockInfo, ModelError, PropertyValue,
    SitemapTree,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug)]
struct ServerState {
    tree: SitemapTree,
    /// Deleted subtrees kept for undelete
    deleted: HashMap<EntryId, Entry>,
    /// Children moved out into external sitemaps
    sub_sitemaps: HashMap<EntryId, Vec<Entry>>,
    detail_pages: Option<DetailPageTable>,
    clipboard: Option<ClipboardSnapshot>,
    user: String,
    requests: Vec<CommitRequest>,
    fail_next: Option<RemoteError>,
}

#[derive(Debug, Clone)]
pub struct InMemoryAuthority {
    state: Arc<Mutex<ServerState>>,
}

impl InMemoryAuthority {
    /// Serve `tree` to a session of `user`
    pub fn new(tree: SitemapTree, user: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServerState {
                tree,
                deleted: HashMap::new(),
                sub_sitemaps: HashMap::new(),
                detail_pages: None,
                clipboard: None,
                user: user.into(),
                requests: Vec::new(),
                fail_next: None,
            })),
        }
    }

    /// Copy of the authoritative tree
    pub async fn tree(&self) -> SitemapTree {
        self.state.lock().await.tree.clone()
    }

    /// Lock `site_path` for another user
    pub async fn lock_entry(&self, site_path: &str, owner: impl Into<String>) -> bool {
        let mut state = self.state.lock().await;
        match state.tree.lookup_mut(site_path) {
            Some(entry) => {
                entry.lock = LockInfo {
                    owner: Some(owner.into()),
                    editable: false,
                };
                true
            }
            None => false,
        }
    }

    /// Reject the next request with `error`
    pub async fn fail_next(&self, error: RemoteError) {
        self.state.lock().await.fail_next = Some(error);
    }

    /// Every commit request received so far, including rejected ones
    pub async fn requests(&self) -> Vec<CommitRequest> {
        self.state.lock().await.requests.clone()
    }

    pub async fn detail_pages(&self) -> Option<DetailPageTable> {
        self.state.lock().await.detail_pages.clone()
    }

    pub async fn clipboard(&self) -> Option<ClipboardSnapshot> {
        self.state.lock().await.clipboard.clone()
    }

    pub async fn is_deleted(&self, id: EntryId) -> bool {
        self.state.lock().await.deleted.contains_key(&id)
    }
}

#[async_trait]
impl RemoteAuthority for InMemoryAuthority {
    async fn commit(&self, request: CommitRequest) -> Result<CommitResponse, RemoteError> {
        let mut state = self.state.lock().await;
        state.requests.push(request.clone());
        if let Some(error) = state.fail_next.take() {
            warn!(%error, "commit rejected on request");
            return Err(error);
        }

        let mut tree = state.tree.clone();
        let mut deleted = state.deleted.clone();
        let mut touched = Vec::with_capacity(request.operations.len());
        for op in &request.operations {
            let entry = apply_operation(&mut tree, &mut deleted, &state.user, op)?;
            touched.push(entry);
        }

        state.tree = tree;
        state.deleted = deleted;
        if request.detail_pages.is_some() {
            state.detail_pages = request.detail_pages;
        }
        if request.clipboard.is_some() {
            state.clipboard = request.clipboard;
        }
        debug!(operations = touched.len(), "commit accepted");
        Ok(CommitResponse { entries: touched })
    }

    async fn load_children(&self, site_path: &str, depth: u32) -> Result<Vec<Entry>, RemoteError> {
        let mut state = self.state.lock().await;
        if let Some(error) = state.fail_next.take() {
            return Err(error);
        }
        let entry = state
            .tree
            .lookup(site_path)
            .ok_or_else(|| RemoteError::NotFound(site_path.to_string()))?;
        let depth = depth.max(1);
        Ok(entry
            .children()
            .iter()
            .map(|child| truncate(child, depth - 1))
            .collect())
    }

    async fn unique_name(&self, parent_path: &str, candidate: &str) -> Result<String, RemoteError> {
        let state = self.state.lock().await;
        let parent = state
            .tree
            .lookup(parent_path)
            .ok_or_else(|| RemoteError::NotFound(parent_path.to_string()))?;
        if !parent.has_child_named(candidate) {
            return Ok(candidate.to_string());
        }
        let (stem, extension) = match candidate.rfind('.') {
            Some(dot) if dot > 0 => candidate.split_at(dot),
            _ => (candidate, ""),
        };
        let mut counter = 1;
        loop {
            let name = format!("{}-{}{}", stem, counter, extension);
            if !parent.has_child_named(&name) {
                return Ok(name);
            }
            counter += 1;
        }
    }

    async fn create_sub_sitemap(&self, entry_id: EntryId) -> Result<SubSitemapResult, RemoteError> {
        let mut state = self.state.lock().await;
        if let Some(error) = state.fail_next.take() {
            return Err(error);
        }
        let user = state.user.clone();
        let entry = state
            .tree
            .entry_by_id_mut(entry_id)
            .ok_or_else(|| RemoteError::NotFound(entry_id.to_string()))?;
        check_lock(entry, &user)?;
        if !entry.is_container() {
            return Err(RemoteError::PermissionDenied(format!(
                "{} cannot hold a sub-sitemap",
                entry.site_path
            )));
        }
        let children = entry.children().to_vec();
        entry.replace_children(Vec::new());
        entry
            .properties
            .insert(SUB_SITEMAP_PROPERTY.to_string(), PropertyValue::new("true"));
        let result = entry.clone();
        state.sub_sitemaps.insert(entry_id, children);
        Ok(SubSitemapResult { entry: result })
    }

    async fn merge_sub_sitemap(&self, entry_id: EntryId) -> Result<SubSitemapResult, RemoteError> {
        let mut state = self.state.lock().await;
        if let Some(error) = state.fail_next.take() {
            return Err(error);
        }
        let children = state
            .sub_sitemaps
            .remove(&entry_id)
            .ok_or_else(|| RemoteError::NotFound(format!("sub-sitemap of {}", entry_id)))?;
        let entry = state
            .tree
            .entry_by_id_mut(entry_id)
            .ok_or_else(|| RemoteError::NotFound(entry_id.to_string()))?;
        entry.replace_children(children);
        entry.properties.remove(SUB_SITEMAP_PROPERTY);
        Ok(SubSitemapResult {
            entry: entry.clone(),
        })
    }
}

fn rejected(err: ModelError) -> RemoteError {
    RemoteError::NotFound(err.to_string())
}

fn check_lock(entry: &Entry, user: &str) -> Result<(), RemoteError> {
    let mut locked = None;
    entry.walk(&mut |e| {
        if locked.is_none() && e.lock.is_locked_by_other(user) {
            locked = Some((e.site_path.clone(), e.lock.owner.clone().unwrap_or_default()));
        }
    });
    match locked {
        Some((path, owner)) => Err(RemoteError::Locked { path, owner }),
        None => Ok(()),
    }
}

/// Copy of `entry` with children materialized `depth` levels deep
fn truncate(entry: &Entry, depth: u32) -> Entry {
    if !entry.is_container() {
        return entry.clone();
    }
    if depth == 0 {
        return entry.clone().unloaded();
    }
    let mut copy = entry.clone();
    copy.replace_children(
        entry
            .children()
            .iter()
            .map(|child| truncate(child, depth - 1))
            .collect(),
    );
    copy.children_loaded = entry.children_loaded;
    copy
}

fn find_path(tree: &SitemapTree, id: EntryId, fallback: &str) -> Option<String> {
    tree.path_of(id)
        .or_else(|| tree.contains_path(fallback).then(|| fallback.to_string()))
}

fn parent_path_for(tree: &SitemapTree, op: &EntryCommit) -> Result<String, RemoteError> {
    match op.parent_id {
        Some(parent_id) => tree
            .path_of(parent_id)
            .ok_or_else(|| RemoteError::NotFound(parent_id.to_string())),
        None => path::parent_path(&op.site_path)
            .ok_or_else(|| RemoteError::NotFound(op.site_path.clone())),
    }
}

fn apply_operation(
    tree: &mut SitemapTree,
    deleted: &mut HashMap<EntryId, Entry>,
    user: &str,
    op: &EntryCommit,
) -> Result<Entry, RemoteError> {
    match op.kind {
        CommitKind::Create => {
            let parent_path = parent_path_for(tree, op)?;
            let mut entry = match deleted.remove(&op.entry_id).filter(|_| !op.is_new) {
                Some(restored) => restored,
                None => {
                    let name = op
                        .name
                        .clone()
                        .unwrap_or_else(|| path::name_of(&op.site_path).to_string());
                    let mut entry = Entry::new(op.entry_kind.unwrap_or(EntryKind::Page), name);
                    entry.id = op.entry_id;
                    entry
                }
            };
            write_fields(&mut entry, op);
            entry.edit_status = EditStatus::Unmodified;
            let parent = tree
                .lookup(&parent_path)
                .ok_or_else(|| RemoteError::NotFound(parent_path.clone()))?;
            if parent.has_child_named(&entry.name) {
                return Err(RemoteError::StaleVersion(parent.path_for_child(&entry.name, entry.kind)));
            }
            let site_path = parent.path_for_child(&entry.name, entry.kind);
            tree.insert(&parent_path, op.position.unwrap_or(usize::MAX), entry)
                .map_err(rejected)?;
            tree.lookup(&site_path)
                .cloned()
                .ok_or(RemoteError::NotFound(site_path))
        }
        CommitKind::Edit => {
            let entry = tree
                .entry_by_id_mut(op.entry_id)
                .ok_or_else(|| RemoteError::NotFound(op.site_path.clone()))?;
            check_lock(&entry.shallow_copy(), user)?;
            write_fields(entry, op);
            Ok(entry.clone())
        }
        CommitKind::Move => {
            let source = find_path(tree, op.entry_id, &op.site_path)
                .ok_or_else(|| RemoteError::NotFound(op.site_path.clone()))?;
            let parent_path = parent_path_for(tree, op)?;
            if let Some(entry) = tree.lookup(&source) {
                check_lock(&entry.shallow_copy(), user)?;
            }
            let (mut entry, _) = tree.remove(&source).map_err(rejected)?;
            if let Some(name) = &op.name {
                entry.name = name.clone();
            }
            if let Some(in_navigation) = op.in_navigation {
                entry.in_navigation = in_navigation;
            }
            let site_path = path::child_path(&parent_path, &entry.name, entry.is_container());
            tree.insert(&parent_path, op.position.unwrap_or(usize::MAX), entry)
                .map_err(rejected)?;
            tree.lookup(&site_path)
                .cloned()
                .ok_or(RemoteError::NotFound(site_path))
        }
        CommitKind::Delete => {
            let source = find_path(tree, op.entry_id, &op.site_path)
                .ok_or_else(|| RemoteError::NotFound(op.site_path.clone()))?;
            if let Some(entry) = tree.lookup(&source) {
                check_lock(entry, user)?;
            }
            let (entry, _) = tree.remove(&source).map_err(rejected)?;
            if !op.is_new {
                deleted.insert(entry.id, entry.clone());
            }
            Ok(entry)
        }
        CommitKind::Undelete => {
            let entry = deleted
                .remove(&op.entry_id)
                .ok_or_else(|| RemoteError::NotFound(op.site_path.clone()))?;
            let parent_path = parent_path_for(tree, op)?;
            let site_path = path::child_path(&parent_path, &entry.name, entry.is_container());
            if tree.contains_path(&site_path) {
                return Err(RemoteError::StaleVersion(site_path));
            }
            tree.insert(&parent_path, op.position.unwrap_or(usize::MAX), entry)
                .map_err(rejected)?;
            tree.lookup(&site_path)
                .cloned()
                .ok_or(RemoteError::NotFound(site_path))
        }
    }
}

/// Copy the fields a commit carries onto the server entry
fn write_fields(entry: &mut Entry, op: &EntryCommit) {
    if let Some(title) = &op.title {
        entry.title = title.clone();
    }
    if op.vfs_path.is_some() {
        entry.vfs_path = op.vfs_path.clone();
    }
    if let Some(properties) = &op.properties {
        entry.properties = properties.clone();
    }
    if let Some(properties) = &op.default_file_properties {
        entry.default_file_properties = properties.clone();
    }
    if op.default_file_id.is_some() {
        entry.default_file_id = op.default_file_id;
    }
    if let Some(in_navigation) = op.in_navigation {
        entry.in_navigation = in_navigation;
    }
    if op.detail_page_type.is_some() {
        entry.detail_page_type = op.detail_page_type.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority() -> InMemoryAuthority {
        InMemoryAuthority::new(
            SitemapTree::new(Entry::root("/").with_children(vec![
                Entry::page("a.html"),
                Entry::page("a-1.html"),
                Entry::folder("news").with_children(vec![
                    Entry::folder("2024").with_children(vec![Entry::page("x.html")]),
                ]),
            ])),
            "alice",
        )
    }

    #[tokio::test]
    async fn test_unique_name_appends_counter() {
        let authority = authority();
        assert_eq!(authority.unique_name("/", "b.html").await.unwrap(), "b.html");
        assert_eq!(authority.unique_name("/", "A.html").await.unwrap(), "A-2.html");
        assert_eq!(authority.unique_name("/", "news").await.unwrap(), "news-1");
    }

    #[tokio::test]
    async fn test_load_children_respects_depth() {
        let authority = authority();
        let children = authority.load_children("/news/", 1).await.unwrap();
        assert_eq!(children.len(), 1);
        assert!(!children[0].children_loaded);

        let children = authority.load_children("/news/", 2).await.unwrap();
        assert_eq!(children[0].child_count(), 1);
    }

    #[tokio::test]
    async fn test_locked_entry_rejects_commit_atomically() {
        let authority = authority();
        let tree = authority.tree().await;
        let a = tree.lookup("/a.html").unwrap().clone();
        let news = tree.lookup("/news/").unwrap().clone();
        authority.lock_entry("/news/2024/x.html", "bob").await;

        let mut request = CommitRequest::single(EntryCommit::new(CommitKind::Delete, a.id, "/a.html"));
        request.append(CommitRequest::single(EntryCommit::new(
            CommitKind::Delete,
            news.id,
            "/news/",
        )));
        let err = authority.commit(request).await.unwrap_err();
        assert!(matches!(err, RemoteError::Locked { owner, .. } if owner == "bob"));
        assert!(authority.tree().await.contains_path("/a.html"));
        assert_eq!(authority.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_and_undelete_round_trip() {
        let authority = authority();
        let news = authority.tree().await.lookup("/news/").unwrap().clone();
        authority
            .commit(CommitRequest::single(EntryCommit::new(
                CommitKind::Delete,
                news.id,
                "/news/",
            )))
            .await
            .unwrap();
        assert!(authority.is_deleted(news.id).await);

        let response = authority
            .commit(CommitRequest::single(EntryCommit::new(
                CommitKind::Undelete,
                news.id,
                "/news/",
            )))
            .await
            .unwrap();
        let restored = response.entry(news.id).unwrap();
        assert_eq!(restored.site_path, "/news/");
        assert_eq!(restored.position, 2);
        assert!(authority.tree().await.contains_path("/news/2024/x.html"));
    }

    #[tokio::test]
    async fn test_fail_next_is_consumed_once() {
        let authority = authority();
        authority
            .fail_next(RemoteError::Transport("offline".to_string()))
            .await;
        assert!(authority.commit(CommitRequest::default()).await.is_err());
        assert!(authority.commit(CommitRequest::default()).await.is_ok());
    }
}
