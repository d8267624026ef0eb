//! # Sitemap Editor
//!
//! Editing core for a hierarchical content tree ("sitemap").
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ UI layer: rendered tree, drag and drop      │
//! └─────────────────────────────────────────────┘
//!            ↓ ReorderAdapter        ↑ SitemapView
//! ┌─────────────────────────────────────────────┐
//! │ editor: SitemapController                   │
//! │  - Construct changes against the model      │
//! │  - Commit remotely, then apply locally      │
//! │  - Undo/redo through inverse changes        │
//! └─────────────────────────────────────────────┘
//!            ↓ RemoteAuthority
//! ┌─────────────────────────────────────────────┐
//! │ remote store: final arbiter of every edit   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Server authority**: nothing local changes before the commit is accepted
//! 2. **No partial application**: a change applies completely or not at all
//! 3. **Minimal view updates**: each change notifies only what it touched
//! 4. **Invertible edits**: every change except sub-sitemap folding can be undone
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sitemap_editor::{EditorConfig, InMemoryAuthority, MoveTarget, NullView, SitemapController};
//!
//! let authority = InMemoryAuthority::new(tree.clone(), "alice");
//! let mut controller = SitemapController::new(authority, NullView, tree, EditorConfig::default());
//!
//! let id = controller.lookup("/news/a.html").unwrap().id;
//! controller.move_entry(id, MoveTarget::new("/archive/", 0)).await?;
//! controller.undo().await?;
//! ```

pub mod changes;
mod commit;
mod config;
mod controller;
mod errors;
mod memory;
mod remote;
mod reorder;
mod undo_stack;
mod view;

pub use changes::{
    BumpDetailPageChange, Change, ChangeError, ClipboardChange, CompositeChange, DeleteChange,
    EditChange, EntryEdit, MoveChange, MoveTarget, NewChange, PropertyModification,
    PropertyTarget, SubSitemapChange, UndeleteChange, UndoBumpDetailPageChange,
    SUB_SITEMAP_PROPERTY,
};
pub use commit::{
    ClipboardItem, ClipboardSnapshot, CommitKind, CommitRequest, CommitResponse, EntryCommit,
};
pub use config::{EditorConfig, DEFAULT_CONFIG_NAME};
pub use controller::{BusyFlag, BusyGuard, NewEntryRequest, SitemapController};
pub use errors::EditorError;
pub use memory::InMemoryAuthority;
pub use remote::{RemoteAuthority, RemoteError, SubSitemapResult};
pub use reorder::{DragSource, DropAction, DropTarget, ReorderAdapter};
pub use undo_stack::{HistoryEntry, UndoStack};
pub use view::{NullView, RecordingView, SitemapView, ViewEvent};

// Re-export model types for convenience
pub use sitemap_model;
