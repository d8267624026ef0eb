//! # Property Resolution
//!
//! Computes the effective value of a named property at an entry by walking
//! the override layers in a fixed order:
//!
//! 1. the default-file (index file) property of a folder entry
//! 2. the entry's own property
//! 3. the own property of the nearest ancestor that defines it
//! 4. the property inherited from above the tree root (parent sitemap)
//!
//! An explicitly empty override stops resolution at layers 2 and 3 but is
//! skipped at layers 1 and 4.

use crate::entry::{Entry, EntryId};
use crate::path;
use crate::tree::SitemapTree;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Stored override: a value plus an optional explicit default
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyValue {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl PropertyValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            default: None,
        }
    }

    /// Explicitly unset marker
    pub fn empty() -> Self {
        Self::new("")
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Value if set, otherwise the explicit default
    pub fn effective(&self) -> Option<&str> {
        if !self.value.is_empty() {
            return Some(&self.value);
        }
        self.default.as_deref().filter(|d| !d.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.effective().is_none()
    }
}

/// A property supplied by the embedding sitemap, with its absolute origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InheritedProperty {
    pub value: String,
    pub origin: String,
}

/// Layer a resolved value was found at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyLayer {
    DefaultFile,
    Own,
    Ancestor,
    ParentSitemap,
}

/// Effective property value tagged with where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedProperty {
    /// Empty when an explicit empty override stopped resolution
    pub value: String,
    pub origin: String,
    pub layer: PropertyLayer,
}

impl ResolvedProperty {
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Effective properties of every loaded entry, keyed by entry id
pub type EffectiveProperties = HashMap<EntryId, BTreeMap<String, ResolvedProperty>>;

/// Resolver over one tree
pub struct PropertyResolver<'a> {
    tree: &'a SitemapTree,
}

impl<'a> PropertyResolver<'a> {
    pub fn new(tree: &'a SitemapTree) -> Self {
        Self { tree }
    }

    /// Resolve `name` at the entry with the given site path.
    pub fn resolve(&self, site_path: &str, name: &str) -> Option<ResolvedProperty> {
        let entry = self.tree.lookup(site_path)?;
        self.resolve_at(entry, name)
    }

    /// Resolve `name` at an entry of this tree.
    pub fn resolve_at(&self, entry: &Entry, name: &str) -> Option<ResolvedProperty> {
        if entry.is_container() {
            if let Some(value) = entry.default_file_properties.get(name).and_then(|p| p.effective()) {
                return Some(ResolvedProperty {
                    value: value.to_string(),
                    origin: entry.site_path.clone(),
                    layer: PropertyLayer::DefaultFile,
                });
            }
        }

        if let Some(resolved) = own_layer(entry, name, PropertyLayer::Own) {
            return Some(resolved);
        }

        let mut current = path::parent_path(&entry.site_path);
        while let Some(parent_path) = current {
            let Some(ancestor) = self.tree.lookup(&parent_path) else {
                break;
            };
            if let Some(resolved) = own_layer(ancestor, name, PropertyLayer::Ancestor) {
                return Some(resolved);
            }
            if parent_path == self.tree.root().site_path {
                break;
            }
            current = path::parent_path(&parent_path);
        }

        self.tree
            .parent_properties()
            .get(name)
            .filter(|inherited| !inherited.value.is_empty())
            .map(|inherited| ResolvedProperty {
                value: inherited.value.clone(),
                origin: self.tree.relative_origin(&inherited.origin),
                layer: PropertyLayer::ParentSitemap,
            })
    }

    /// Resolve every known property name at one entry
    pub fn resolve_all_at(&self, entry: &Entry) -> BTreeMap<String, ResolvedProperty> {
        self.property_names()
            .into_iter()
            .filter_map(|name| {
                self.resolve_at(entry, &name)
                    .map(|resolved| (name, resolved))
            })
            .collect()
    }

    /// Recompute the effective properties of every loaded entry.
    pub fn compute_all(&self) -> EffectiveProperties {
        let names = self.property_names();
        let mut result = EffectiveProperties::new();
        self.tree.root().walk(&mut |entry| {
            let resolved = names
                .iter()
                .filter_map(|name| {
                    self.resolve_at(entry, name)
                        .map(|r| (name.clone(), r))
                })
                .collect();
            result.insert(entry.id, resolved);
        });
        result
    }

    fn property_names(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self.tree.parent_properties().keys().cloned().collect();
        self.tree.root().walk(&mut |entry| {
            names.extend(entry.properties.keys().cloned());
            names.extend(entry.default_file_properties.keys().cloned());
        });
        names
    }
}

fn own_layer(entry: &Entry, name: &str, layer: PropertyLayer) -> Option<ResolvedProperty> {
    entry.properties.get(name).map(|property| ResolvedProperty {
        value: property.effective().unwrap_or_default().to_string(),
        origin: entry.site_path.clone(),
        layer,
    })
}
