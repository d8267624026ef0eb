//! # View Notifications
//!
//! The rendered tree is an external collaborator. Changes push minimal
//! updates through [`SitemapView`]; nothing here re-renders the whole tree.

use sitemap_model::{Clipboard, DetailPageTable, Entry};

pub trait SitemapView {
    /// Show or hide the busy indicator while a remote call is outstanding
    fn set_busy(&mut self, busy: bool);

    fn entry_changed(&mut self, entry: &Entry);

    fn entry_inserted(&mut self, parent_path: &str, position: usize, entry: &Entry);

    fn entry_removed(&mut self, site_path: &str);

    fn subtree_replaced(&mut self, entry: &Entry);

    fn detail_pages_changed(&mut self, table: &DetailPageTable);

    fn clipboard_changed(&mut self, _clipboard: &Clipboard) {}

    /// Generic notification fired after every applied change
    fn sitemap_changed(&mut self) {}

    fn report_error(&mut self, _message: &str) {}
}

/// View that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NullView;

impl SitemapView for NullView {
    fn set_busy(&mut self, _busy: bool) {}
    fn entry_changed(&mut self, _entry: &Entry) {}
    fn entry_inserted(&mut self, _parent_path: &str, _position: usize, _entry: &Entry) {}
    fn entry_removed(&mut self, _site_path: &str) {}
    fn subtree_replaced(&mut self, _entry: &Entry) {}
    fn detail_pages_changed(&mut self, _table: &DetailPageTable) {}
}

/// Notification as recorded by [`RecordingView`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Busy(bool),
    Changed(String),
    Inserted {
        parent_path: String,
        position: usize,
        site_path: String,
    },
    Removed(String),
    SubtreeReplaced(String),
    DetailPagesChanged,
    ClipboardChanged,
    SitemapChanged,
    Error(String),
}

/// View that records every notification, for tests and headless runs
#[derive(Debug, Default, Clone)]
pub struct RecordingView {
    pub events: Vec<ViewEvent>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events without busy toggles and generic change notifications
    pub fn structural_events(&self) -> Vec<&ViewEvent> {
        self.events
            .iter()
            .filter(|e| !matches!(e, ViewEvent::Busy(_) | ViewEvent::SitemapChanged))
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl SitemapView for RecordingView {
    fn set_busy(&mut self, busy: bool) {
        self.events.push(ViewEvent::Busy(busy));
    }

    fn entry_changed(&mut self, entry: &Entry) {
        self.events.push(ViewEvent::Changed(entry.site_path.clone()));
    }

    fn entry_inserted(&mut self, parent_path: &str, position: usize, entry: &Entry) {
        self.events.push(ViewEvent::Inserted {
            parent_path: parent_path.to_string(),
            position,
            site_path: entry.site_path.clone(),
        });
    }

    fn entry_removed(&mut self, site_path: &str) {
        self.events.push(ViewEvent::Removed(site_path.to_string()));
    }

    fn subtree_replaced(&mut self, entry: &Entry) {
        self.events
            .push(ViewEvent::SubtreeReplaced(entry.site_path.clone()));
    }

    fn detail_pages_changed(&mut self, _table: &DetailPageTable) {
        self.events.push(ViewEvent::DetailPagesChanged);
    }

    fn clipboard_changed(&mut self, _clipboard: &Clipboard) {
        self.events.push(ViewEvent::ClipboardChanged);
    }

    fn sitemap_changed(&mut self) {
        self.events.push(ViewEvent::SitemapChanged);
    }

    fn report_error(&mut self, message: &str) {
        self.events.push(ViewEvent::Error(message.to_string()));
    }
}
