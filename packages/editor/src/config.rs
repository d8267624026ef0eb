use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "sitemap-editor.config.json";

/// Editor configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Undo levels kept by the controller (0 = unlimited)
    #[serde(default = "default_max_undo_levels")]
    pub max_undo_levels: usize,

    /// Cap of the clipboard's modified list
    #[serde(default = "default_max_modified_entries")]
    pub max_modified_entries: usize,

    /// Depth requested from the lazy-load endpoint
    #[serde(default = "default_lazy_load_depth")]
    pub lazy_load_depth: u32,

    /// Property holding the navigation title
    #[serde(default = "default_navigation_title_property")]
    pub navigation_title_property: String,

    /// Property holding the page title
    #[serde(default = "default_title_property")]
    pub title_property: String,
}

fn default_max_undo_levels() -> usize {
    100
}

fn default_max_modified_entries() -> usize {
    sitemap_model::DEFAULT_MAX_MODIFIED
}

fn default_lazy_load_depth() -> u32 {
    1
}

fn default_navigation_title_property() -> String {
    "NavText".to_string()
}

fn default_title_property() -> String {
    "Title".to_string()
}

impl EditorConfig {
    /// Load config from a directory
    pub fn load(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: EditorConfig = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(EditorConfig::default())
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_undo_levels: default_max_undo_levels(),
            max_modified_entries: default_max_modified_entries(),
            lazy_load_depth: default_lazy_load_depth(),
            navigation_title_property: default_navigation_title_property(),
            title_property: default_title_property(),
        }
    }
}
