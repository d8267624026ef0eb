//! Title, VFS reference and property edits.

use crate::commit::{CommitKind, CommitRequest, CommitResponse, EntryCommit};
use crate::view::SitemapView;
use serde::{Deserialize, Serialize};
use sitemap_model::{EditStatus, Entry, EntryId, ModelError, PropertyValue, SitemapState};
use std::collections::BTreeMap;
use tracing::warn;

use super::ChangeError;

/// Which override layer a property modification targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PropertyTarget {
    #[default]
    Own,
    DefaultFile,
}

/// Set (`Some`) or remove (`None`) one property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyModification {
    pub name: String,
    pub value: Option<PropertyValue>,
    #[serde(default)]
    pub target: PropertyTarget,
}

impl PropertyModification {
    pub fn set(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(PropertyValue::new(value)),
            target: PropertyTarget::Own,
        }
    }

    pub fn remove(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            target: PropertyTarget::Own,
        }
    }

    pub fn on_default_file(mut self) -> Self {
        self.target = PropertyTarget::DefaultFile;
        self
    }
}

/// Requested edit of one entry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryEdit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub vfs_path: Option<String>,
    #[serde(default)]
    pub properties: Vec<PropertyModification>,
}

impl EntryEdit {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn property(modification: PropertyModification) -> Self {
        Self {
            properties: vec![modification],
            ..Self::default()
        }
    }

    pub fn with_property(mut self, modification: PropertyModification) -> Self {
        self.properties.push(modification);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
struct EditSnapshot {
    title: String,
    vfs_path: Option<String>,
    properties: BTreeMap<String, PropertyValue>,
    default_file_properties: BTreeMap<String, PropertyValue>,
    edit_status: EditStatus,
}

impl EditSnapshot {
    fn of(entry: &Entry) -> Self {
        Self {
            title: entry.title.clone(),
            vfs_path: entry.vfs_path.clone(),
            properties: entry.properties.clone(),
            default_file_properties: entry.default_file_properties.clone(),
            edit_status: entry.edit_status,
        }
    }

    fn write_to(&self, entry: &mut Entry) {
        entry.title = self.title.clone();
        entry.vfs_path = self.vfs_path.clone();
        entry.properties = self.properties.clone();
        entry.default_file_properties = self.default_file_properties.clone();
        entry.edit_status = self.edit_status;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditChange {
    entry_id: EntryId,
    site_path: String,
    before: EditSnapshot,
    after: EditSnapshot,
}

impl EditChange {
    pub fn new(state: &SitemapState, entry_id: EntryId, edit: &EntryEdit) -> Option<Self> {
        let Some(entry) = state.tree.entry_by_id(entry_id) else {
            warn!(%entry_id, "edit of unknown entry abandoned");
            return None;
        };

        let before = EditSnapshot::of(entry);
        let mut after = before.clone();
        if let Some(title) = &edit.title {
            after.title = title.clone();
        }
        if edit.vfs_path.is_some() {
            after.vfs_path = edit.vfs_path.clone();
        }
        for modification in &edit.properties {
            let layer = match modification.target {
                PropertyTarget::Own => &mut after.properties,
                PropertyTarget::DefaultFile => &mut after.default_file_properties,
            };
            match &modification.value {
                Some(value) => {
                    layer.insert(modification.name.clone(), value.clone());
                }
                None => {
                    layer.remove(&modification.name);
                }
            }
        }

        // New entries stay new; property-only edits keep the status
        let touches_entry = after.title != before.title || after.vfs_path != before.vfs_path;
        if before.edit_status != EditStatus::New && touches_entry {
            after.edit_status = EditStatus::Edited;
        }

        Some(Self {
            entry_id,
            site_path: entry.site_path.clone(),
            before,
            after,
        })
    }

    pub fn entry_id(&self) -> EntryId {
        self.entry_id
    }

    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }

    /// Status the entry has after the edit
    pub fn target_status(&self) -> EditStatus {
        self.after.edit_status
    }

    pub(crate) fn commit_request(&self) -> Option<CommitRequest> {
        if self.is_noop() {
            return None;
        }
        let mut commit = EntryCommit::new(CommitKind::Edit, self.entry_id, self.site_path.clone());
        commit.title = Some(self.after.title.clone());
        commit.vfs_path = self.after.vfs_path.clone();
        commit.properties = Some(self.after.properties.clone());
        commit.default_file_properties = Some(self.after.default_file_properties.clone());
        commit.is_new = self.after.edit_status == EditStatus::New;
        Some(CommitRequest::single(commit))
    }

    pub(crate) fn fold_response(&mut self, response: &CommitResponse) {
        if let Some(remote) = response.entry(self.entry_id) {
            if remote.vfs_path.is_some() {
                self.after.vfs_path = remote.vfs_path.clone();
            }
        }
    }

    pub(crate) fn apply(&self, state: &mut SitemapState) -> Result<(), ChangeError> {
        if self.is_noop() {
            return Ok(());
        }
        let entry = state
            .tree
            .entry_by_id_mut(self.entry_id)
            .ok_or(ModelError::IdNotFound(self.entry_id))?;
        self.after.write_to(entry);
        let entry = entry.clone();
        state.clipboard.add_modified(&entry);
        Ok(())
    }

    pub(crate) fn apply_to_view(&self, view: &mut dyn SitemapView, state: &SitemapState) {
        if let Some(entry) = state.tree.entry_by_id(self.entry_id) {
            view.entry_changed(entry);
        }
    }

    pub fn invert(&self) -> EditChange {
        EditChange {
            entry_id: self.entry_id,
            site_path: self.site_path.clone(),
            before: self.after.clone(),
            after: self.before.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitemap_model::SitemapTree;

    fn state() -> SitemapState {
        SitemapState::new(SitemapTree::new(Entry::root("/").with_children(vec![
            Entry::page("a.html").with_property("keywords", "one"),
        ])))
    }

    #[test]
    fn test_identical_edit_is_noop() {
        let state = state();
        let id = state.tree.lookup("/a.html").unwrap().id;
        let change = EditChange::new(
            &state,
            id,
            &EntryEdit::property(PropertyModification::set("keywords", "one")),
        )
        .unwrap();
        assert!(change.is_noop());
        assert!(change.commit_request().is_none());
    }

    #[test]
    fn test_property_edit_keeps_status() {
        let mut state = state();
        let id = state.tree.lookup("/a.html").unwrap().id;
        let change = EditChange::new(
            &state,
            id,
            &EntryEdit::property(PropertyModification::set("keywords", "two")),
        )
        .unwrap();
        change.apply(&mut state).unwrap();
        let entry = state.tree.lookup("/a.html").unwrap();
        assert_eq!(entry.properties["keywords"].value, "two");
        assert_eq!(entry.edit_status, EditStatus::Unmodified);
        assert!(state.clipboard.is_modified(id));
    }

    #[test]
    fn test_title_edit_marks_edited_but_new_stays_new() {
        let mut state = state();
        let id = state.tree.lookup("/a.html").unwrap().id;
        let change = EditChange::new(&state, id, &EntryEdit::title("A")).unwrap();
        assert_eq!(change.target_status(), EditStatus::Edited);

        state.tree.lookup_mut("/a.html").unwrap().edit_status = EditStatus::New;
        let change = EditChange::new(&state, id, &EntryEdit::title("A")).unwrap();
        assert_eq!(change.target_status(), EditStatus::New);
        let request = change.commit_request().unwrap();
        assert!(request.operations[0].is_new);
    }

    #[test]
    fn test_invert_restores_properties() {
        let mut state = state();
        let id = state.tree.lookup("/a.html").unwrap().id;
        let before = state.tree.lookup("/a.html").unwrap().clone();
        let change = EditChange::new(
            &state,
            id,
            &EntryEdit::title("A").with_property(PropertyModification::remove("keywords")),
        )
        .unwrap();
        change.apply(&mut state).unwrap();
        change.invert().apply(&mut state).unwrap();
        assert_eq!(state.tree.lookup("/a.html").unwrap(), &before);
    }

    #[test]
    fn test_unknown_entry_yields_no_change() {
        let state = state();
        assert!(EditChange::new(&state, EntryId::new(), &EntryEdit::title("x")).is_none());
    }
}
