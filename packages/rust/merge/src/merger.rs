//! Recursive copy and move of directory trees.
//!
//! `copy_dir` consults the per-path behavior policy and the containment
//! validator; `move_dir` drains a source tree into a target via
//! copy-then-delete so it stays correct across device boundaries.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, trace};

use kbport_fs::FileSystem;
use kbport_shared::{Behavior, FolderBehaviorMap, Result};

use crate::policy::resolve_behavior;
use crate::validate::{PathValidationContext, relative_to_root, validate_paths};

/// Immutable parameters for one merge invocation. Recursion derives
/// children differing only in `source_dir`/`dest_dir`.
#[derive(Debug, Clone)]
pub struct CopyContext<'a> {
    /// Directory being copied from.
    pub source_dir: PathBuf,
    /// Directory being copied into.
    pub dest_dir: PathBuf,
    /// Per-folder behavior overrides. Read-only during the merge.
    pub behaviors: &'a FolderBehaviorMap,
    /// Behavior applied when no override matches.
    pub default_behavior: Behavior,
    /// The boundary no write may escape.
    pub dataset_root: &'a Path,
}

impl<'a> CopyContext<'a> {
    /// Derive the context for one subdirectory level down.
    fn child(&self, source_dir: PathBuf, dest_dir: PathBuf) -> CopyContext<'a> {
        CopyContext {
            source_dir,
            dest_dir,
            behaviors: self.behaviors,
            default_behavior: self.default_behavior,
            dataset_root: self.dataset_root,
        }
    }
}

/// Forward-slash key of `path` relative to `root`, if contained.
fn relative_key(path: &Path, root: &Path) -> Option<String> {
    let rel = relative_to_root(path, root)?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Merge `source_dir` into `dest_dir` under the context's behavior map.
///
/// Per entry, the behavior resolved for its dataset-root-relative key
/// decides: `skip` leaves the entry untouched, `add` leaves an existing
/// destination (file or directory) untouched, otherwise directories
/// recurse and files are copied. The source is never deleted. Returns
/// the number of files written.
///
/// The add-existence probe is a stat followed by a write and is not
/// atomic; a single writer per destination tree is assumed.
#[instrument(skip_all, fields(source = %ctx.source_dir.display(), dest = %ctx.dest_dir.display()))]
pub fn copy_dir(fs: &dyn FileSystem, ctx: &CopyContext<'_>) -> Result<usize> {
    validate_paths(&PathValidationContext {
        source: &ctx.source_dir,
        target: &ctx.dest_dir,
        resolved_source: &ctx.source_dir,
        resolved_target: &ctx.dest_dir,
        dataset_root: ctx.dataset_root,
    })?;

    fs.create_dir_all(&ctx.dest_dir)?;

    // A missing source directory propagates the backend's error.
    let entries = fs.read_dir(&ctx.source_dir)?;

    let mut files_written = 0usize;
    for entry in entries {
        let source_path = ctx.source_dir.join(&entry.name);
        let dest_path = ctx.dest_dir.join(&entry.name);

        let behavior = match relative_key(&dest_path, ctx.dataset_root) {
            Some(key) => resolve_behavior(&key, ctx.behaviors, ctx.default_behavior),
            // Outside the root: the validator below rejects it with the
            // full pair of offending paths.
            None => ctx.default_behavior,
        };

        if behavior == Behavior::Skip {
            trace!(entry = %entry.name, "skip");
            continue;
        }
        if behavior == Behavior::Add && fs.stat(&dest_path).exists {
            trace!(entry = %entry.name, "add: destination exists, untouched");
            continue;
        }

        if entry.is_directory {
            files_written += copy_dir(fs, &ctx.child(source_path, dest_path))?;
            continue;
        }

        validate_paths(&PathValidationContext {
            source: &source_path,
            target: &dest_path,
            resolved_source: &source_path,
            resolved_target: &dest_path,
            dataset_root: ctx.dataset_root,
        })?;

        let content = fs.read_file(&source_path)?;
        if let Some(parent) = dest_path.parent() {
            fs.create_dir_all(parent)?;
        }
        fs.write_file(&dest_path, &content)?;
        debug!(entry = %entry.name, bytes = content.len(), "copied");
        files_written += 1;
    }

    Ok(files_written)
}

/// Drain `source_dir` into `target_dir`: every file is read, written to
/// the target, then deleted at the source; emptied subdirectories are
/// removed on the way back up. Copy-then-delete, never an atomic rename,
/// so crossing filesystem or device boundaries is fine.
///
/// A read or write failure aborts the remaining walk without partial
/// repair; retry and cleanup policy belong to the caller.
#[instrument(skip_all, fields(source = %source_dir.display(), target = %target_dir.display()))]
pub fn move_dir(fs: &dyn FileSystem, source_dir: &Path, target_dir: &Path) -> Result<()> {
    fs.create_dir_all(target_dir)?;

    for entry in fs.read_dir(source_dir)? {
        let source_path = source_dir.join(&entry.name);
        let target_path = target_dir.join(&entry.name);

        if entry.is_directory {
            fs.create_dir_all(&target_path)?;
            move_dir(fs, &source_path, &target_path)?;
            fs.remove(&source_path)?;
        } else {
            let content = fs.read_file(&source_path)?;
            fs.write_file(&target_path, &content)?;
            fs.remove_file(&source_path)?;
            debug!(entry = %entry.name, "moved");
        }
    }

    Ok(())
}
