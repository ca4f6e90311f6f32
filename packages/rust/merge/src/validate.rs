//! Dataset-root containment checks.
//!
//! Every write fed by caller-controlled relative paths is validated
//! against the dataset root before the write happens, never after. The
//! checks are lexical (`.` dropped, `..` popped), so they hold for both
//! the OS backend and the in-memory substitute.

use std::path::{Component, Path, PathBuf};

use kbport_fs::FileSystem;
use kbport_shared::{KbportError, Result};

/// Everything needed to decide whether one source→target write is
/// allowed to proceed.
#[derive(Debug, Clone, Copy)]
pub struct PathValidationContext<'a> {
    /// Caller-supplied source path (as given).
    pub source: &'a Path,
    /// Caller-supplied target path (as given).
    pub target: &'a Path,
    /// Fully resolved source path.
    pub resolved_source: &'a Path,
    /// Fully resolved target path.
    pub resolved_target: &'a Path,
    /// The boundary no write may escape.
    pub dataset_root: &'a Path,
}

/// Lexically resolve a path: drop `.`, pop on `..`, keep the root.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::RootDir | Component::Prefix(_) => out.push(component.as_os_str()),
            Component::Normal(c) => out.push(c),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
        }
    }
    out
}

/// The path's position relative to `root`, or None when it resolves
/// outside of it.
pub fn relative_to_root(path: &Path, root: &Path) -> Option<PathBuf> {
    let path = lexical_normalize(path);
    let root = lexical_normalize(root);
    path.strip_prefix(&root).ok().map(Path::to_path_buf)
}

/// Validate that a source→target pair stays inside the dataset root.
///
/// An identical source and target is a legitimate idempotent self-copy
/// and passes without further checks. Otherwise both resolved paths must
/// sit under the dataset root; any escape fails with
/// [`KbportError::PathEscape`] naming both paths.
pub fn validate_paths(ctx: &PathValidationContext<'_>) -> Result<()> {
    if ctx.source == ctx.target {
        return Ok(());
    }

    let source_ok = relative_to_root(ctx.resolved_source, ctx.dataset_root).is_some();
    let target_ok = relative_to_root(ctx.resolved_target, ctx.dataset_root).is_some();
    if !source_ok || !target_ok {
        return Err(KbportError::path_escape(ctx.source, ctx.target));
    }
    Ok(())
}

/// Validate that a required source path exists: one stat, no retry.
pub fn validate_source_exists(fs: &dyn FileSystem, path: &Path) -> Result<()> {
    if !fs.stat(path).exists {
        return Err(KbportError::source_not_exists(path));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbport_fs::MemoryFileSystem;

    fn ctx<'a>(
        source: &'a Path,
        target: &'a Path,
        dataset_root: &'a Path,
    ) -> PathValidationContext<'a> {
        PathValidationContext {
            source,
            target,
            resolved_source: source,
            resolved_target: target,
            dataset_root,
        }
    }

    #[test]
    fn identical_paths_pass() {
        let p = Path::new("/outside/same.md");
        // Even a path outside the root: a self-copy touches nothing new.
        assert!(validate_paths(&ctx(p, p, Path::new("/dataset"))).is_ok());
    }

    #[test]
    fn inside_root_passes() {
        let source = Path::new("/dataset/staging/a.md");
        let target = Path::new("/dataset/kb/a.md");
        assert!(validate_paths(&ctx(source, target, Path::new("/dataset"))).is_ok());
    }

    #[test]
    fn target_traversal_fails() {
        let source = Path::new("/dataset/staging/a.md");
        let target = Path::new("/dataset/../outside.md");
        let err = validate_paths(&ctx(source, target, Path::new("/dataset"))).unwrap_err();
        assert!(matches!(err, KbportError::PathEscape { .. }));
        let msg = err.to_string();
        assert!(msg.contains("staging/a.md"));
        assert!(msg.contains("outside.md"));
    }

    #[test]
    fn source_outside_root_fails() {
        let source = Path::new("/elsewhere/a.md");
        let target = Path::new("/dataset/a.md");
        let err = validate_paths(&ctx(source, target, Path::new("/dataset"))).unwrap_err();
        assert!(matches!(err, KbportError::PathEscape { .. }));
    }

    #[test]
    fn dotted_but_contained_path_passes() {
        let source = Path::new("/dataset/staging/sub/../a.md");
        let target = Path::new("/dataset/kb/./a.md");
        assert!(validate_paths(&ctx(source, target, Path::new("/dataset"))).is_ok());
    }

    #[test]
    fn relative_to_root_reports_position() {
        assert_eq!(
            relative_to_root(Path::new("/d/kb/a.md"), Path::new("/d")),
            Some(PathBuf::from("kb/a.md"))
        );
        assert_eq!(relative_to_root(Path::new("/d/../x"), Path::new("/d")), None);
    }

    #[test]
    fn source_exists_check() {
        let fs = MemoryFileSystem::new();
        fs.create_dir_all(Path::new("/data")).unwrap();
        fs.write_file(Path::new("/data/kb.zip"), b"zip").unwrap();

        assert!(validate_source_exists(&fs, Path::new("/data/kb.zip")).is_ok());

        let err = validate_source_exists(&fs, Path::new("/data/other.zip")).unwrap_err();
        assert!(matches!(err, KbportError::SourceNotExists { .. }));
        assert!(err.to_string().contains("other.zip"));
    }
}
