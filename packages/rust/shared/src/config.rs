//! Application configuration for kbport.
//!
//! User config lives at `~/.kbport/kbport.toml`. Caller-supplied values
//! override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{KbportError, Result};
use crate::types::{Behavior, FolderBehaviorMap};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "kbport.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".kbport";

// ---------------------------------------------------------------------------
// Config structs (matching kbport.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Merge conflict policies.
    #[serde(default)]
    pub merge: MergeConfig,

    /// Ingestion settings.
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// `[merge]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Behavior applied when no folder-specific entry matches.
    #[serde(default = "default_behavior")]
    pub default_behavior: Behavior,

    /// Per-folder behavior overrides, keyed by relative path.
    #[serde(default)]
    pub folder_behaviors: BTreeMap<String, Behavior>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            default_behavior: default_behavior(),
            folder_behaviors: BTreeMap::new(),
        }
    }
}

impl MergeConfig {
    /// Build the normalized behavior map consulted during merges.
    pub fn behavior_map(&self) -> FolderBehaviorMap {
        self.folder_behaviors
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}

fn default_behavior() -> Behavior {
    Behavior::Add
}

/// `[ingest]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Dataset root directory — the boundary no write may escape.
    #[serde(default = "default_dataset_root")]
    pub dataset_root: String,

    /// Root under which per-invocation staging directories are created.
    /// Must sit inside the dataset root; unset means
    /// `<dataset_root>/.staging`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_root: Option<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            dataset_root: default_dataset_root(),
            staging_root: None,
        }
    }
}

fn default_dataset_root() -> String {
    "~/kbport-data".into()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Resolve the config directory (`~/.kbport`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| KbportError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Resolve the config file path (`~/.kbport/kbport.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load config from the default location, falling back to defaults when
/// the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(AppConfig::default());
    }
    load_config_from(&path)
}

/// Load config from an explicit path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content =
        std::fs::read_to_string(path).map_err(|e| KbportError::io(path, e))?;
    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| KbportError::config(format!("invalid {}: {e}", path.display())))?;
    debug!(path = %path.display(), "config loaded");
    Ok(config)
}

/// Write a default config file if none exists yet. Returns the path.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| KbportError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        let default = toml::to_string_pretty(&AppConfig::default())
            .map_err(|e| KbportError::config(format!("serialize default config: {e}")))?;
        std::fs::write(&path, default).map_err(|e| KbportError::io(&path, e))?;
        debug!(path = %path.display(), "wrote default config");
    }
    Ok(path)
}
