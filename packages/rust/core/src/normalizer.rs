//! Knowledge-base layout normalization.
//!
//! Takes a freshly extracted directory and ensures a recognizable
//! knowledge base sits at its root, hoisting a nested or staged layout
//! up one level when needed.

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use kbport_fs::FileSystem;
use kbport_merge::move_dir;
use kbport_shared::{NormalizeOutcome, Result};

use crate::detector::{find_nested_kb, is_valid_kb};

/// Normalize the layout under `root` so a valid knowledge base sits
/// directly at `root`.
///
/// 1. An already valid root terminates immediately with zero mutation,
///    which also makes a second invocation a no-op.
/// 2. A nested KB (staging folder or single nested folder) is drained up
///    into `root` and the emptied folder removed; the root is then
///    re-checked, and that re-check is the authoritative answer — move
///    side effects are not assumed correct by construction.
/// 3. Anything else is `NotFound`, an ordinary outcome the caller
///    branches on, not an error.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn normalize_kb(fs: &dyn FileSystem, root: &Path) -> Result<NormalizeOutcome> {
    if is_valid_kb(fs, root) {
        debug!("root already holds a valid KB");
        return Ok(NormalizeOutcome::AlreadyValid);
    }

    let Some(nested) = find_nested_kb(fs, root) else {
        debug!("no KB layout located");
        return Ok(NormalizeOutcome::NotFound);
    };

    info!(nested = %nested.display(), "relocating nested KB to root");
    move_dir(fs, &nested, root)?;
    fs.remove(&nested)?;

    if is_valid_kb(fs, root) {
        Ok(NormalizeOutcome::Relocated)
    } else {
        warn!("root still not a valid KB after relocation");
        Ok(NormalizeOutcome::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbport_fs::MemoryFileSystem;

    fn seed(fs: &MemoryFileSystem, path: &str, content: &str) {
        let p = Path::new(path);
        fs.create_dir_all(p.parent().unwrap()).unwrap();
        fs.write_file(p, content.as_bytes()).unwrap();
    }

    fn snapshot(fs: &MemoryFileSystem, dir: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack = vec![Path::new(dir).to_path_buf()];
        while let Some(d) = stack.pop() {
            for entry in fs.read_dir(&d).unwrap() {
                let p = d.join(&entry.name);
                out.push(format!("{}{}", p.display(), if entry.is_directory { "/" } else { "" }));
                if entry.is_directory {
                    stack.push(p);
                }
            }
        }
        out.sort();
        out
    }

    #[test]
    fn valid_root_untouched() {
        let fs = MemoryFileSystem::new();
        seed(&fs, "/cache/.kbport/config.md", "c");

        let before = snapshot(&fs, "/cache");
        let outcome = normalize_kb(&fs, Path::new("/cache")).unwrap();
        assert_eq!(outcome, NormalizeOutcome::AlreadyValid);
        assert_eq!(snapshot(&fs, "/cache"), before);
    }

    #[test]
    fn nested_kb_is_hoisted() {
        let fs = MemoryFileSystem::new();
        seed(&fs, "/cache/nested/.kbport/c.md", "c");
        seed(&fs, "/cache/nested/docs/a.md", "a");

        let outcome = normalize_kb(&fs, Path::new("/cache")).unwrap();
        assert_eq!(outcome, NormalizeOutcome::Relocated);

        assert!(fs.stat(Path::new("/cache/.kbport/c.md")).is_file);
        assert!(fs.stat(Path::new("/cache/docs/a.md")).is_file);
        // The emptied nested folder is gone.
        assert!(!fs.stat(Path::new("/cache/nested")).exists);
    }

    #[test]
    fn staged_kb_is_hoisted() {
        let fs = MemoryFileSystem::new();
        seed(&fs, "/cache/.zip-temp/AGENTS.md", "a");
        seed(&fs, "/cache/.zip-temp/docs/g.md", "g");

        let outcome = normalize_kb(&fs, Path::new("/cache")).unwrap();
        assert_eq!(outcome, NormalizeOutcome::Relocated);
        assert!(fs.stat(Path::new("/cache/AGENTS.md")).is_file);
        assert!(!fs.stat(Path::new("/cache/.zip-temp")).exists);
    }

    #[test]
    fn ambiguous_candidates_not_found() {
        let fs = MemoryFileSystem::new();
        seed(&fs, "/cache/dir1/.kbport/c.md", "c");
        seed(&fs, "/cache/dir2/.kbport/c.md", "c");

        let before = snapshot(&fs, "/cache");
        let outcome = normalize_kb(&fs, Path::new("/cache")).unwrap();
        assert_eq!(outcome, NormalizeOutcome::NotFound);
        // Ambiguity is never resolved by guessing: nothing moved.
        assert_eq!(snapshot(&fs, "/cache"), before);
    }

    #[test]
    fn empty_root_not_found() {
        let fs = MemoryFileSystem::new();
        fs.create_dir_all(Path::new("/cache")).unwrap();
        let outcome = normalize_kb(&fs, Path::new("/cache")).unwrap();
        assert_eq!(outcome, NormalizeOutcome::NotFound);
    }

    #[test]
    fn normalize_twice_is_idempotent() {
        let fs = MemoryFileSystem::new();
        seed(&fs, "/cache/nested/AGENTS.md", "a");
        seed(&fs, "/cache/nested/docs/g.md", "g");

        let first = normalize_kb(&fs, Path::new("/cache")).unwrap();
        assert_eq!(first, NormalizeOutcome::Relocated);

        let after_first = snapshot(&fs, "/cache");
        let second = normalize_kb(&fs, Path::new("/cache")).unwrap();
        assert_eq!(second, NormalizeOutcome::AlreadyValid);
        // Zero additional mutation on the second run.
        assert_eq!(snapshot(&fs, "/cache"), after_first);
    }
}
