//! # Commit Requests
//!
//! Wire types exchanged with the remote authority. A change serializes its
//! effect into a [`CommitRequest`]; the authority answers with the entries
//! it touched so the change can pick up server-assigned data.

use serde::{Deserialize, Serialize};
use sitemap_model::{Clipboard, DetailPageTable, Entry, EntryId, EntryKind, PropertyValue};
use std::collections::BTreeMap;

/// What happens to one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommitKind {
    Create,
    Edit,
    Move,
    Delete,
    Undelete,
}

/// Per-entry part of a commit, keyed by entry id and site path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryCommit {
    pub kind: CommitKind,
    pub entry_id: EntryId,
    pub site_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vfs_path: Option<String>,
    /// Full replacement of the own properties, not a delta
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, PropertyValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_file_properties: Option<BTreeMap<String, PropertyValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_file_id: Option<EntryId>,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_navigation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_kind: Option<EntryKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_page_type: Option<String>,
}

impl EntryCommit {
    pub fn new(kind: CommitKind, entry_id: EntryId, site_path: impl Into<String>) -> Self {
        Self {
            kind,
            entry_id,
            site_path: site_path.into(),
            parent_id: None,
            name: None,
            position: None,
            title: None,
            vfs_path: None,
            properties: None,
            default_file_properties: None,
            default_file_id: None,
            is_new: false,
            in_navigation: None,
            entry_kind: None,
            detail_page_type: None,
        }
    }

    /// Commit carrying every field of `entry`
    pub fn from_entry(kind: CommitKind, entry: &Entry) -> Self {
        Self {
            name: Some(entry.name.clone()),
            position: Some(entry.position),
            title: Some(entry.title.clone()),
            vfs_path: entry.vfs_path.clone(),
            properties: Some(entry.properties.clone()),
            default_file_properties: Some(entry.default_file_properties.clone()),
            default_file_id: entry.default_file_id,
            is_new: entry.is_new(),
            in_navigation: Some(entry.in_navigation),
            entry_kind: Some(entry.kind),
            detail_page_type: entry.detail_page_type.clone(),
            ..Self::new(kind, entry.id, entry.site_path.clone())
        }
    }
}

/// One clipboard list item as sent to the authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardItem {
    pub id: EntryId,
    pub site_path: String,
}

/// Scrubbed clipboard: ids and paths only
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardSnapshot {
    pub modified: Vec<ClipboardItem>,
    pub deleted: Vec<ClipboardItem>,
}

impl From<&Clipboard> for ClipboardSnapshot {
    fn from(clipboard: &Clipboard) -> Self {
        let scrub = |entries: &[Entry]| {
            entries
                .iter()
                .map(|e| ClipboardItem {
                    id: e.id,
                    site_path: e.site_path.clone(),
                })
                .collect()
        };
        Self {
            modified: scrub(clipboard.modified()),
            deleted: scrub(clipboard.deleted()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub operations: Vec<EntryCommit>,
    /// Detail-page table after the change, when it changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_pages: Option<DetailPageTable>,
    /// Clipboard after the change, for clipboard-only changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clipboard: Option<ClipboardSnapshot>,
}

impl CommitRequest {
    pub fn single(operation: EntryCommit) -> Self {
        Self {
            operations: vec![operation],
            ..Self::default()
        }
    }

    pub fn with_detail_pages(mut self, detail_pages: Option<DetailPageTable>) -> Self {
        self.detail_pages = detail_pages;
        self
    }

    /// Append `other`; later snapshots replace earlier ones
    pub fn append(&mut self, other: CommitRequest) {
        self.operations.extend(other.operations);
        if other.detail_pages.is_some() {
            self.detail_pages = other.detail_pages;
        }
        if other.clipboard.is_some() {
            self.clipboard = other.clipboard;
        }
    }
}

/// Entries the authority touched while committing
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    pub entries: Vec<Entry>,
}

impl CommitResponse {
    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entry_at(&self, site_path: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.site_path == site_path)
    }
}
