//! Structural recognition of knowledge-base directory layouts.
//!
//! Detection is presence-based only: it looks at entry names and kinds,
//! never at file contents (content validation is out of scope here).

use std::path::{Path, PathBuf};

use tracing::debug;

use kbport_fs::FileSystem;

/// Hidden configuration directory marking a knowledge base.
pub const SENTINEL_DIR_NAME: &str = ".kbport";
/// Root agents file marking a knowledge base.
pub const AGENTS_FILE_NAME: &str = "AGENTS.md";
/// Manifest file; alone it never marks a knowledge base.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";
/// Fixed staging folder name some exporter archives nest their KB under.
pub const STAGING_DIR_NAME: &str = ".zip-temp";

/// Whether `dir` directly holds a recognizable knowledge base.
///
/// True when the directory contains the sentinel config directory, or
/// the root agents file, or the manifest file accompanied by at least
/// one other non-hidden entry. A missing or empty directory is simply
/// not a knowledge base — false, not an error.
pub fn is_valid_kb(fs: &dyn FileSystem, dir: &Path) -> bool {
    let Ok(entries) = fs.read_dir(dir) else {
        return false;
    };

    let mut has_manifest = false;
    let mut non_hidden_siblings = 0usize;

    for entry in &entries {
        if entry.is_directory && entry.name == SENTINEL_DIR_NAME {
            return true;
        }
        if !entry.is_directory && entry.name == AGENTS_FILE_NAME {
            return true;
        }
        if !entry.is_directory && entry.name == MANIFEST_FILE_NAME {
            has_manifest = true;
        } else if !entry.name.starts_with('.') {
            non_hidden_siblings += 1;
        }
    }

    has_manifest && non_hidden_siblings > 0
}

/// Locate a knowledge base nested one level below `dir`.
///
/// The fixed-name staging subdirectory wins when its contents qualify.
/// Otherwise a single non-hidden subdirectory qualifies on its own.
/// Anything ambiguous — two or more sibling subdirectories — comes back
/// as `None`: ambiguity surfaces as absence, never as a guess.
pub fn find_nested_kb(fs: &dyn FileSystem, dir: &Path) -> Option<PathBuf> {
    let entries = fs.read_dir(dir).ok()?;

    if let Some(staging) = entries
        .iter()
        .find(|e| e.is_directory && e.name == STAGING_DIR_NAME)
    {
        let candidate = dir.join(&staging.name);
        if is_valid_kb(fs, &candidate) {
            debug!(path = %candidate.display(), "KB found under staging folder");
            return Some(candidate);
        }
    }

    let non_hidden_dirs: Vec<_> = entries
        .iter()
        .filter(|e| e.is_directory && !e.name.starts_with('.'))
        .collect();
    if let [only] = non_hidden_dirs.as_slice() {
        let candidate = dir.join(&only.name);
        if is_valid_kb(fs, &candidate) {
            debug!(path = %candidate.display(), "KB found in single nested folder");
            return Some(candidate);
        }
    }

    None
}
