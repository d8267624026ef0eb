//! # Sitemap Model
//!
//! In-memory model of a hierarchical content tree ("sitemap").
//!
//! ```text
//! SitemapState
//!  ├─ SitemapTree       entries addressed by path and by id
//!  ├─ Clipboard         modified / deleted lists
//!  └─ DetailPageTable   ordered detail-page bindings
//! ```
//!
//! The model has no notion of remote storage or undo; those live in
//! `sitemap-editor`. Everything here is plain data with invariant-keeping
//! mutators.

mod clipboard;
mod detail_pages;
mod entry;
mod error;
pub mod path;
mod property;
mod state;
mod tree;

pub use clipboard::{Clipboard, DEFAULT_MAX_MODIFIED};
pub use detail_pages::{DetailPageInfo, DetailPageTable};
pub use entry::{EditStatus, Entry, EntryId, EntryKind, LockInfo};
pub use error::{ModelError, ModelResult};
pub use property::{
    EffectiveProperties, InheritedProperty, PropertyLayer, PropertyResolver, PropertyValue,
    ResolvedProperty,
};
pub use state::{collect_detail_pages, SitemapState};
pub use tree::SitemapTree;
