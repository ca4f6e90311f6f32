//! Core domain types for kbport knowledge-base ingestion.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::KbportError;

// ---------------------------------------------------------------------------
// Behavior
// ---------------------------------------------------------------------------

/// Per-path conflict policy applied when merging a source entry into a
/// destination tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Behavior {
    /// Write the source entry, replacing any existing destination content.
    Overwrite,
    /// Write the source entry only if the destination does not exist yet.
    Add,
    /// Leave both source and destination untouched.
    Skip,
}

impl std::fmt::Display for Behavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Behavior::Overwrite => "overwrite",
            Behavior::Add => "add",
            Behavior::Skip => "skip",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Behavior {
    type Err = KbportError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "overwrite" => Ok(Behavior::Overwrite),
            "add" => Ok(Behavior::Add),
            "skip" => Ok(Behavior::Skip),
            other => Err(KbportError::validation(format!(
                "unknown behavior '{other}' (expected overwrite, add, or skip)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// FolderBehaviorMap
// ---------------------------------------------------------------------------

/// Normalize a relative-path key: forward slashes only, no leading `./`,
/// no leading or trailing slash.
pub fn normalize_key(key: &str) -> String {
    let mut k = key.replace('\\', "/");
    while let Some(stripped) = k.strip_prefix("./") {
        k = stripped.to_string();
    }
    k.trim_matches('/').to_string()
}

/// Mapping of normalized relative-path keys to conflict behaviors,
/// consulted before a default behavior. Read-only during a merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderBehaviorMap(BTreeMap<String, Behavior>);

impl FolderBehaviorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a behavior under a key, normalizing the key first.
    pub fn insert(&mut self, key: &str, behavior: Behavior) {
        self.0.insert(normalize_key(key), behavior);
    }

    /// Exact lookup of a (normalized) key.
    pub fn get(&self, key: &str) -> Option<Behavior> {
        self.0.get(&normalize_key(key)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Behavior)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, Behavior>> for FolderBehaviorMap {
    fn from(map: BTreeMap<String, Behavior>) -> Self {
        let mut out = Self::new();
        for (k, v) in map {
            out.insert(&k, v);
        }
        out
    }
}

impl FromIterator<(String, Behavior)> for FolderBehaviorMap {
    fn from_iter<I: IntoIterator<Item = (String, Behavior)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (k, v) in iter {
            out.insert(&k, v);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Filesystem surface types
// ---------------------------------------------------------------------------

/// A single directory entry as reported by the filesystem capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name (no path separators).
    pub name: String,
    /// Whether the entry is a directory.
    pub is_directory: bool,
}

/// Result of a stat call on a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStat {
    pub exists: bool,
    pub is_file: bool,
    pub is_directory: bool,
}

impl PathStat {
    /// Stat value for a path that does not exist.
    pub fn missing() -> Self {
        Self {
            exists: false,
            is_file: false,
            is_directory: false,
        }
    }

    pub fn file() -> Self {
        Self {
            exists: true,
            is_file: true,
            is_directory: false,
        }
    }

    pub fn directory() -> Self {
        Self {
            exists: true,
            is_file: false,
            is_directory: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization outcome
// ---------------------------------------------------------------------------

/// Terminal result of knowledge-base layout normalization.
///
/// `NotFound` covers both "no candidate layout" and "multiple equally
/// valid candidates" — ambiguity surfaces as absence, never as a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeOutcome {
    /// The root already held a valid knowledge base; nothing was touched.
    AlreadyValid,
    /// A nested knowledge base was relocated to the root.
    Relocated,
    /// No valid knowledge-base layout could be located.
    NotFound,
}

impl NormalizeOutcome {
    /// Whether the root holds a valid knowledge base after normalization.
    pub fn is_valid(self) -> bool {
        matches!(self, Self::AlreadyValid | Self::Relocated)
    }
}

// ---------------------------------------------------------------------------
// Ingest report
// ---------------------------------------------------------------------------

/// Result of a completed archive ingestion.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Destination directory the knowledge base was merged into.
    pub kb_path: PathBuf,
    /// SHA-256 of the ingested archive file.
    pub archive_sha256: String,
    /// Layout normalization outcome for the staged archive contents.
    pub outcome: NormalizeOutcome,
    /// Number of files written into the destination.
    pub files_merged: usize,
    /// When the ingestion completed.
    pub completed_at: DateTime<Utc>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behavior_roundtrip() {
        for b in [Behavior::Overwrite, Behavior::Add, Behavior::Skip] {
            let parsed: Behavior = b.to_string().parse().expect("parse behavior");
            assert_eq!(parsed, b);
        }
    }

    #[test]
    fn behavior_rejects_unknown() {
        let err = "merge".parse::<Behavior>().unwrap_err();
        assert!(err.to_string().contains("unknown behavior"));
    }

    #[test]
    fn behavior_serde_lowercase() {
        let json = serde_json::to_string(&Behavior::Overwrite).expect("serialize");
        assert_eq!(json, "\"overwrite\"");
        let parsed: Behavior = serde_json::from_str("\"skip\"").expect("deserialize");
        assert_eq!(parsed, Behavior::Skip);
    }

    #[test]
    fn normalize_key_strips_decorations() {
        assert_eq!(normalize_key("./docs/guide/"), "docs/guide");
        assert_eq!(normalize_key("docs\\guide"), "docs/guide");
        assert_eq!(normalize_key("././a"), "a");
        assert_eq!(normalize_key("/"), "");
    }

    #[test]
    fn folder_behavior_map_normalizes_keys() {
        let mut map = FolderBehaviorMap::new();
        map.insert("./docs/", Behavior::Skip);
        assert_eq!(map.get("docs"), Some(Behavior::Skip));
        assert_eq!(map.get("./docs"), Some(Behavior::Skip));
        assert_eq!(map.get("other"), None);
    }

    #[test]
    fn outcome_validity() {
        assert!(NormalizeOutcome::AlreadyValid.is_valid());
        assert!(NormalizeOutcome::Relocated.is_valid());
        assert!(!NormalizeOutcome::NotFound.is_valid());
    }
}
