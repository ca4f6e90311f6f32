//! The filesystem capability kbport cores depend on.
//!
//! All tree-walking code takes a [`FileSystem`] rather than calling
//! `std::fs` directly, so the production backend ([`OsFileSystem`]) and
//! the in-memory substitute ([`MemoryFileSystem`]) are interchangeable.
//! Production logic never branches on which implementation is injected —
//! simulation lives solely inside `MemoryFileSystem`.

mod memory;

use std::path::Path;

use tracing::{debug, trace};

use kbport_shared::{DirEntry, KbportError, PathStat, Result};

pub use memory::MemoryFileSystem;

/// Capability surface over a filesystem tree.
pub trait FileSystem: Send + Sync {
    /// List the direct entries of a directory.
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;

    /// Read the full content of a file.
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write full content to a file, replacing any existing content.
    /// The parent directory must already exist.
    fn write_file(&self, path: &Path, content: &[u8]) -> Result<()>;

    /// Create a directory and all missing ancestors.
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Remove a path recursively. A missing path is not an error.
    fn remove(&self, path: &Path) -> Result<()>;

    /// Remove a single file.
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Rename a file or directory.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Stat a path. Never fails: a missing path stats as not existing.
    fn stat(&self, path: &Path) -> PathStat;
}

// ---------------------------------------------------------------------------
// OsFileSystem
// ---------------------------------------------------------------------------

/// Production [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl OsFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for OsFileSystem {
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        let iter = std::fs::read_dir(path).map_err(|e| KbportError::io(path, e))?;
        for entry in iter {
            let entry = entry.map_err(|e| KbportError::io(path, e))?;
            let file_type = entry.file_type().map_err(|e| KbportError::io(entry.path(), e))?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_directory: file_type.is_dir(),
            });
        }
        // Stable order keeps walks deterministic across platforms.
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        trace!(path = %path.display(), entries = entries.len(), "read_dir");
        Ok(entries)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| KbportError::io(path, e))
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        std::fs::write(path, content).map_err(|e| KbportError::io(path, e))?;
        trace!(path = %path.display(), bytes = content.len(), "write_file");
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path).map_err(|e| KbportError::io(path, e))
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let meta = match std::fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(KbportError::io(path, e)),
        };
        let result = if meta.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        result.map_err(|e| KbportError::io(path, e))?;
        debug!(path = %path.display(), "removed");
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path).map_err(|e| KbportError::io(path, e))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        std::fs::rename(from, to).map_err(|e| KbportError::io(from, e))?;
        debug!(from = %from.display(), to = %to.display(), "renamed");
        Ok(())
    }

    fn stat(&self, path: &Path) -> PathStat {
        match std::fs::metadata(path) {
            Ok(meta) => PathStat {
                exists: true,
                is_file: meta.is_file(),
                is_directory: meta.is_dir(),
            },
            Err(_) => PathStat::missing(),
        }
    }
}
