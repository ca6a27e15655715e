//! # Configuration
//!
//! Records configuration is managed by [`clapfig`], which handles layered
//! loading from TOML files and environment variables.
//!
//! ## Storage Hierarchy
//!
//! Configuration is resolved in priority order:
//! 1. **Environment variables**: `JAMF_RECORDS__REFRESH_AFTER_SAVE`, etc.
//! 2. **Project Config**: `records.toml` in the directory passed to [`RecordsConfig::load`].
//! 3. **Global Config**: OS-appropriate config directory (via `directories` crate).
//! 4. **Compiled Defaults**: Built-in fallbacks via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `case_sensitive_types` | `true` | Type names must match exactly (`Computers`, not `computers`) |
//! | `refresh_after_save` | `true` | Re-read a record after create/update to pick up server-side changes |
//! | `array_paths` | none | Extra always-list paths per type, e.g. `Computers = ["hardware/mapped_printers/printer"]` |

use crate::error::{JamfError, Result};
use clapfig::{Clapfig, SearchMode, SearchPath};
use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "records.toml";

/// Configuration for the records layer, stored in `records.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RecordsConfig {
    /// Match type names exactly. When false, `computers` finds `Computers`.
    #[config(default = true)]
    pub case_sensitive_types: bool,

    /// Fetch the canonical copy after create and update.
    #[config(default = true)]
    pub refresh_after_save: bool,

    /// Paths (per type name) whose value is always normalized to a list,
    /// on top of the built-in ones.
    pub array_paths: Option<HashMap<String, Vec<String>>>,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            case_sensitive_types: true,
            refresh_after_save: true,
            array_paths: None,
        }
    }
}

impl RecordsConfig {
    /// Configured array paths, by type name.
    pub fn array_paths(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.array_paths.iter().flatten()
    }

    /// Load from the global config dir, then `project_dir`, then the
    /// environment.
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut paths: Vec<SearchPath> = default_config_dir()
            .into_iter()
            .map(SearchPath::Path)
            .collect();
        if let Some(dir) = project_dir {
            paths.push(SearchPath::Path(dir.to_path_buf()));
        }

        Clapfig::builder()
            .app_name("jamf-records")
            .file_name(CONFIG_FILE)
            .search_paths(paths)
            .search_mode(SearchMode::Merge)
            .load()
            .map_err(|e| JamfError::Config(e.to_string()))
    }

    /// Load only from `dirs` (later ones override earlier ones), ignoring the
    /// environment.
    pub fn load_from(dirs: &[PathBuf]) -> Result<Self> {
        Clapfig::builder()
            .app_name("jamf-records")
            .file_name(CONFIG_FILE)
            .search_paths(dirs.iter().cloned().map(SearchPath::Path).collect())
            .search_mode(SearchMode::Merge)
            .no_env()
            .load()
            .map_err(|e| JamfError::Config(e.to_string()))
    }
}

/// Global config directory, when the platform has one.
pub fn default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "jamf-records", "jamf-records").map(|dirs| dirs.config_dir().to_path_buf())
}
