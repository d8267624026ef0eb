//! # Sitemap Controller
//!
//! Owns the session state and sequences every edit:
//!
//! ```text
//! construct change → commit remotely → apply locally → notify view
//! ```
//!
//! The local model is only touched after the authority accepted the commit,
//! and then on a copy that is swapped in once the whole change applied. A
//! rejected commit therefore leaves tree, clipboard and detail pages exactly
//! as they were.
//!
//! Validation failures (unknown entry, unloaded parent, name collision) are
//! logged and reported as `Ok(false)`; remote rejections are returned as
//! errors and also pushed to the view.

use crate::changes::{
    BumpDetailPageChange, Change, ClipboardChange, DeleteChange, EditChange, EntryEdit,
    MoveChange, MoveTarget, NewChange, PropertyModification, SubSitemapChange, UndeleteChange,
};
use crate::config::EditorConfig;
use crate::errors::EditorError;
use crate::remote::{RemoteAuthority, RemoteError};
use crate::undo_stack::{HistoryEntry, UndoStack};
use crate::view::SitemapView;
use serde::{Deserialize, Serialize};
use sitemap_model::{
    collect_detail_pages, path, Clipboard, DetailPageTable, EffectiveProperties, Entry, EntryId,
    EntryKind, ModelError, ResolvedProperty, SitemapState, SitemapTree,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared busy indicator. At most one controller operation runs at a time.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Mark busy, or `None` if something else already holds the flag
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyGuard(self.0.clone()))
    }
}

/// Clears the busy flag when dropped
#[derive(Debug)]
pub struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Template for a new entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntryRequest {
    pub name: String,
    pub kind: EntryKind,
    #[serde(default)]
    pub title: Option<String>,
    /// Sibling index, appended when absent
    #[serde(default)]
    pub position: Option<usize>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub detail_page_type: Option<String>,
    #[serde(default = "default_in_navigation")]
    pub in_navigation: bool,
}

fn default_in_navigation() -> bool {
    true
}

impl NewEntryRequest {
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
            title: None,
            position: None,
            properties: BTreeMap::new(),
            detail_page_type: None,
            in_navigation: true,
        }
    }

    pub fn page(name: impl Into<String>) -> Self {
        Self::new(name, EntryKind::Page)
    }

    pub fn folder(name: impl Into<String>) -> Self {
        Self::new(name, EntryKind::Folder)
    }

    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    fn build(&self, name: String) -> Entry {
        let mut entry = Entry::new(self.kind, name);
        if let Some(title) = &self.title {
            entry.title = title.clone();
        }
        for (name, value) in &self.properties {
            entry = entry.with_property(name.clone(), value.clone());
        }
        entry.detail_page_type = self.detail_page_type.clone();
        entry.in_navigation = self.in_navigation;
        entry
    }
}

pub struct SitemapController<R, V> {
    remote: R,
    view: V,
    state: SitemapState,
    properties: EffectiveProperties,
    history: UndoStack,
    busy: BusyFlag,
    config: EditorConfig,
}

impl<R: RemoteAuthority, V: SitemapView> SitemapController<R, V> {
    pub fn new(remote: R, view: V, tree: SitemapTree, config: EditorConfig) -> Self {
        let state = SitemapState::new(tree)
            .with_clipboard(Clipboard::with_max_modified(config.max_modified_entries));
        Self::with_state(remote, view, state, config)
    }

    /// Resume a session from a saved state
    pub fn with_state(remote: R, view: V, state: SitemapState, config: EditorConfig) -> Self {
        let properties = state.compute_properties();
        Self {
            remote,
            view,
            state,
            properties,
            history: UndoStack::with_max_levels(config.max_undo_levels),
            busy: BusyFlag::default(),
            config,
        }
    }

    pub fn state(&self) -> &SitemapState {
        &self.state
    }

    pub fn tree(&self) -> &SitemapTree {
        &self.state.tree
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.state.clipboard
    }

    pub fn detail_pages(&self) -> &DetailPageTable {
        &self.state.detail_pages
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    pub fn lookup(&self, site_path: &str) -> Option<&Entry> {
        self.state.tree.lookup(site_path)
    }

    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.state.tree.entry_by_id(id)
    }

    pub fn effective_properties(&self, id: EntryId) -> Option<&BTreeMap<String, ResolvedProperty>> {
        self.properties.get(&id)
    }

    pub fn effective_property(&self, id: EntryId, name: &str) -> Option<&ResolvedProperty> {
        self.properties.get(&id)?.get(name)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn acquire(&self) -> Result<BusyGuard, EditorError> {
        self.busy.try_acquire().ok_or(EditorError::Busy)
    }

    /// Commit, apply and record an arbitrary change
    pub async fn apply_change(&mut self, change: Change) -> Result<bool, EditorError> {
        let _guard = self.acquire()?;
        self.run(change, None).await
    }

    /// Apply a change whose server side already happened
    pub fn apply_committed(&mut self, change: Change) -> Result<(), EditorError> {
        let _guard = self.acquire()?;
        self.apply_locally(&change)
    }

    pub async fn edit_entry(&mut self, id: EntryId, edit: EntryEdit) -> Result<bool, EditorError> {
        let _guard = self.acquire()?;
        let Some(change) = EditChange::new(&self.state, id, &edit) else {
            return Ok(false);
        };
        self.run(Change::Edit(change), Some("edit")).await
    }

    /// Edit and rename in one undoable step
    pub async fn edit_and_change_name(
        &mut self,
        id: EntryId,
        edit: EntryEdit,
        new_name: Option<String>,
    ) -> Result<bool, EditorError> {
        let _guard = self.acquire()?;
        let Some(entry) = self.state.tree.entry_by_id(id) else {
            warn!(%id, "edit of unknown entry abandoned");
            return Ok(false);
        };
        let Some(parent_path) = path::parent_path(&entry.site_path) else {
            warn!("the root entry cannot be renamed");
            return Ok(false);
        };
        let position = entry.position;
        let current_name = entry.name.clone();

        let mut parts = Vec::new();
        if let Some(change) = EditChange::new(&self.state, id, &edit) {
            parts.push(Change::Edit(change));
        }
        if let Some(name) = new_name {
            let name = self.sibling_name(&parent_path, &current_name, name).await?;
            let target = MoveTarget::new(parent_path, position).renamed(name);
            let Some(change) = MoveChange::new(&self.state, id, target) else {
                return Ok(false);
            };
            parts.push(Change::Move(change));
        }
        match Change::combine(parts) {
            Some(change) => self.run(change, Some("edit")).await,
            None => Ok(false),
        }
    }

    pub async fn rename(&mut self, id: EntryId, new_name: impl Into<String>) -> Result<bool, EditorError> {
        let _guard = self.acquire()?;
        let Some(entry) = self.state.tree.entry_by_id(id) else {
            warn!(%id, "rename of unknown entry abandoned");
            return Ok(false);
        };
        let Some(parent_path) = path::parent_path(&entry.site_path) else {
            warn!("the root entry cannot be renamed");
            return Ok(false);
        };
        let position = entry.position;
        let current_name = entry.name.clone();
        let name = self.sibling_name(&parent_path, &current_name, new_name.into()).await?;
        let target = MoveTarget::new(parent_path, position).renamed(name);
        let Some(change) = MoveChange::new(&self.state, id, target) else {
            return Ok(false);
        };
        self.run(Change::Move(change), Some("rename")).await
    }

    pub async fn move_entry(&mut self, id: EntryId, target: MoveTarget) -> Result<bool, EditorError> {
        let _guard = self.acquire()?;
        self.load_if_needed(&target.parent_path).await?;
        let Some(change) = MoveChange::new(&self.state, id, target) else {
            return Ok(false);
        };
        self.run(Change::Move(change), Some("move")).await
    }

    /// Create a child of `parent_id`. Returns the id of the created entry.
    pub async fn create_sub_entry(
        &mut self,
        parent_id: EntryId,
        request: NewEntryRequest,
    ) -> Result<Option<EntryId>, EditorError> {
        let _guard = self.acquire()?;
        let Some(parent_path) = self.state.tree.path_of(parent_id) else {
            warn!(%parent_id, "parent of new entry not found");
            return Ok(None);
        };
        self.load_if_needed(&parent_path).await?;

        let name = self.unique_name(&parent_path, &request.name).await?;

        let position = request.position.unwrap_or(usize::MAX);
        let Some(change) = NewChange::new(&self.state, parent_id, position, request.build(name)) else {
            return Ok(None);
        };
        let Some(applied) = self.commit_and_apply(Change::New(change)).await? else {
            return Ok(None);
        };
        let created = match &applied {
            Change::New(change) => Some(change.entry().id),
            _ => None,
        };
        self.history.record(HistoryEntry::new(applied).with_description("create"));
        Ok(created)
    }

    pub async fn delete(&mut self, id: EntryId) -> Result<bool, EditorError> {
        let _guard = self.acquire()?;
        let Some(change) = DeleteChange::new(&self.state, id) else {
            return Ok(false);
        };
        self.run(Change::Delete(change), Some("delete")).await
    }

    /// Restore an entry from the deleted list
    pub async fn undelete(&mut self, id: EntryId) -> Result<bool, EditorError> {
        let _guard = self.acquire()?;
        if let Some(parent_path) = self
            .state
            .clipboard
            .find_deleted(id)
            .and_then(|entry| path::parent_path(&entry.site_path))
        {
            self.load_if_needed(&parent_path).await?;
        }
        let Some(change) = UndeleteChange::new(&self.state, id) else {
            return Ok(false);
        };
        self.run(Change::Undelete(change), Some("undelete")).await
    }

    /// Make a detail page the default for its content type
    pub async fn bump_detail_page(&mut self, id: EntryId) -> Result<bool, EditorError> {
        let _guard = self.acquire()?;
        let Some(change) = BumpDetailPageChange::new(&self.state, id) else {
            return Ok(false);
        };
        self.run(Change::BumpDetailPage(change), Some("bump detail page"))
            .await
    }

    /// Show an entry in the navigation at `target`, giving it a navigation
    /// title if it has none yet
    pub async fn add_to_navigation(&mut self, id: EntryId, target: MoveTarget) -> Result<bool, EditorError> {
        let _guard = self.acquire()?;
        let Some(entry) = self.state.tree.entry_by_id(id) else {
            warn!(%id, "entry to add to the navigation not found");
            return Ok(false);
        };
        let nav_property = self.config.navigation_title_property.clone();
        let has_nav_title = self
            .effective_property(id, &nav_property)
            .is_some_and(|p| !p.is_empty());

        let mut parts = Vec::new();
        if !has_nav_title {
            let title = self
                .effective_property(id, &self.config.title_property)
                .filter(|p| !p.is_empty())
                .map(|p| p.value.clone())
                .or_else(|| (!entry.title.is_empty()).then(|| entry.title.clone()))
                .unwrap_or_else(|| entry.name.clone());
            let edit = EntryEdit::property(PropertyModification::set(nav_property, title));
            if let Some(change) = EditChange::new(&self.state, id, &edit) {
                parts.push(Change::Edit(change));
            }
        }
        self.load_if_needed(&target.parent_path).await?;
        let Some(change) = MoveChange::new(&self.state, id, target.in_navigation(true)) else {
            return Ok(false);
        };
        parts.push(Change::Move(change));

        match Change::combine(parts) {
            Some(change) => self.run(change, Some("add to navigation")).await,
            None => Ok(false),
        }
    }

    pub async fn remove_from_navigation(&mut self, id: EntryId) -> Result<bool, EditorError> {
        let _guard = self.acquire()?;
        let Some(entry) = self.state.tree.entry_by_id(id) else {
            warn!(%id, "entry to remove from the navigation not found");
            return Ok(false);
        };
        let Some(parent_path) = path::parent_path(&entry.site_path) else {
            return Ok(false);
        };
        let target = MoveTarget::new(parent_path, entry.position).in_navigation(false);
        let Some(change) = MoveChange::new(&self.state, id, target) else {
            return Ok(false);
        };
        self.run(Change::Move(change), Some("remove from navigation"))
            .await
    }

    pub async fn clear_modified(&mut self) -> Result<bool, EditorError> {
        let _guard = self.acquire()?;
        let change = ClipboardChange::clear_modified(&self.state);
        self.run(Change::ClearModified(change), Some("clear modified"))
            .await
    }

    pub async fn clear_deleted(&mut self) -> Result<bool, EditorError> {
        let _guard = self.acquire()?;
        let change = ClipboardChange::clear_deleted(&self.state);
        self.run(Change::ClearDeleted(change), Some("clear deleted"))
            .await
    }

    /// Materialize unloaded children down to `site_path`
    pub async fn ensure_loaded(&mut self, site_path: &str) -> Result<bool, EditorError> {
        let _guard = self.acquire()?;
        self.load_if_needed(site_path).await
    }

    /// Move the children of `id` into an external sitemap
    pub async fn create_sub_sitemap(&mut self, id: EntryId) -> Result<bool, EditorError> {
        let _guard = self.acquire()?;
        if self.state.tree.entry_by_id(id).is_none() {
            warn!(%id, "sub-sitemap root not found");
            return Ok(false);
        }
        self.view.set_busy(true);
        let result = self.remote.create_sub_sitemap(id).await;
        self.view.set_busy(false);
        let result = result.map_err(|err| self.reject(err))?;
        let Some(change) = SubSitemapChange::created(&self.state, id, result) else {
            return Ok(false);
        };
        self.apply_locally(&Change::CreateSubSitemap(change))?;
        self.history.clear();
        Ok(true)
    }

    /// Merge the external sitemap of `id` back into this one
    pub async fn merge_sub_sitemap(&mut self, id: EntryId) -> Result<bool, EditorError> {
        let _guard = self.acquire()?;
        if self.state.tree.entry_by_id(id).is_none() {
            warn!(%id, "sub-sitemap root not found");
            return Ok(false);
        }
        self.view.set_busy(true);
        let result = self.remote.merge_sub_sitemap(id).await;
        self.view.set_busy(false);
        let result = result.map_err(|err| self.reject(err))?;
        let Some(change) = SubSitemapChange::merged(&self.state, id, result) else {
            return Ok(false);
        };
        self.apply_locally(&Change::MergeSubSitemap(change))?;
        self.history.clear();
        Ok(true)
    }

    /// Revert the newest change. Returns false when there is nothing to undo.
    pub async fn undo(&mut self) -> Result<bool, EditorError> {
        let _guard = self.acquire()?;
        let Some(entry) = self.history.peek_undo() else {
            return Ok(false);
        };
        let inverse = entry.change.invert()?;
        self.commit_and_apply(inverse).await?;
        self.history.commit_undo();
        Ok(true)
    }

    /// Re-apply the newest undone change
    pub async fn redo(&mut self) -> Result<bool, EditorError> {
        let _guard = self.acquire()?;
        let Some(entry) = self.history.peek_redo() else {
            return Ok(false);
        };
        let change = entry.change.clone();
        let reapplied = self
            .commit_and_apply(change.clone())
            .await?
            .unwrap_or(change);
        self.history.commit_redo(reapplied);
        Ok(true)
    }

    async fn run(&mut self, change: Change, description: Option<&str>) -> Result<bool, EditorError> {
        let Some(applied) = self.commit_and_apply(change).await? else {
            return Ok(false);
        };
        let mut entry = HistoryEntry::new(applied);
        if let Some(description) = description {
            entry = entry.with_description(description);
        }
        self.history.record(entry);
        Ok(true)
    }

    /// Commit `change` and apply it locally. `Ok(None)` for no-ops.
    async fn commit_and_apply(&mut self, mut change: Change) -> Result<Option<Change>, EditorError> {
        let Some(request) = change.to_commit_request()? else {
            debug!(change = change.name(), "no-op change skipped");
            return Ok(None);
        };

        debug!(change = change.name(), operations = request.operations.len(), "committing");
        self.view.set_busy(true);
        let result = self.remote.commit(request).await;
        self.view.set_busy(false);
        let response = result.map_err(|err| self.reject(err))?;

        change.fold_response(&response);
        self.apply_locally(&change)?;
        info!(change = change.name(), "change committed");
        Ok(Some(change))
    }

    fn apply_locally(&mut self, change: &Change) -> Result<(), EditorError> {
        let mut next = self.state.clone();
        if let Err(err) = change.apply_to_tree(&mut next) {
            warn!(change = change.name(), %err, "committed change could not be applied locally");
            self.view.report_error(&err.to_string());
            return Err(err.into());
        }
        self.state = next;

        change.apply_to_view(&mut self.view, &self.state);
        self.properties = self.state.compute_properties();
        self.view.sitemap_changed();
        Ok(())
    }

    async fn load_if_needed(&mut self, site_path: &str) -> Result<bool, EditorError> {
        let root = self.state.tree.root().site_path.clone();
        let segments: Vec<String> = path::relative_segments(&root, site_path)
            .ok_or_else(|| ModelError::PathNotFound(site_path.to_string()))?
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut loaded_any = false;
        let mut current = root;
        let mut segments = segments.into_iter();
        loop {
            let entry = self
                .state
                .tree
                .lookup(&current)
                .ok_or_else(|| ModelError::PathNotFound(current.clone()))?;
            if entry.is_container() && !entry.children_loaded {
                self.load_children(&current).await?;
                loaded_any = true;
            }
            let Some(segment) = segments.next() else {
                break;
            };
            let entry = self
                .state
                .tree
                .lookup(&current)
                .ok_or_else(|| ModelError::PathNotFound(current.clone()))?;
            current = entry
                .child(&segment)
                .map(|child| child.site_path.clone())
                .ok_or_else(|| ModelError::PathNotFound(site_path.to_string()))?;
        }

        if loaded_any {
            self.properties = self.state.compute_properties();
        }
        Ok(loaded_any)
    }

    async fn load_children(&mut self, site_path: &str) -> Result<(), EditorError> {
        debug!(path = site_path, depth = self.config.lazy_load_depth, "loading children");
        self.view.set_busy(true);
        let children = self
            .remote
            .load_children(site_path, self.config.lazy_load_depth)
            .await;
        self.view.set_busy(false);
        let children = children.map_err(|err| self.reject(err))?;

        self.state.tree.set_children(site_path, children)?;
        if let Some(entry) = self.state.tree.lookup(site_path) {
            for info in collect_detail_pages(entry).pages() {
                if !self.state.detail_pages.contains(info.id) {
                    self.state.detail_pages.add(info.clone());
                }
            }
            self.view.subtree_replaced(entry);
        }
        Ok(())
    }

    /// Ask the remote authority for a free lowercase name under `parent_path`
    async fn unique_name(&mut self, parent_path: &str, candidate: &str) -> Result<String, EditorError> {
        let candidate = candidate.to_lowercase();
        self.view.set_busy(true);
        let name = self.remote.unique_name(parent_path, &candidate).await;
        self.view.set_busy(false);
        name.map_err(|err| self.reject(err))
    }

    /// New name for a renamed entry. A change of case only keeps its own slot.
    async fn sibling_name(
        &mut self,
        parent_path: &str,
        current_name: &str,
        new_name: String,
    ) -> Result<String, EditorError> {
        if new_name.eq_ignore_ascii_case(current_name) {
            return Ok(new_name);
        }
        self.unique_name(parent_path, &new_name).await
    }

    fn reject(&mut self, err: RemoteError) -> EditorError {
        warn!(%err, "remote authority rejected the request");
        self.view.report_error(&err.to_string());
        EditorError::Remote(err)
    }
}
