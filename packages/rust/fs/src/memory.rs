//! In-memory [`FileSystem`] used as a drop-in substitute in tests.
//!
//! Semantics track [`OsFileSystem`](crate::OsFileSystem): reading a
//! missing directory errors, writes require an existing parent, removal
//! is recursive and forceful. Paths are resolved lexically, so `.` and
//! `..` components behave the way the merge layer expects.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use kbport_shared::{DirEntry, KbportError, PathStat, Result};

use crate::FileSystem;

#[derive(Debug, Default)]
struct State {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, Vec<u8>>,
}

/// An in-memory filesystem tree behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    state: Mutex<State>,
}

/// Lexically resolve a path: drop `.`, pop on `..`, keep the root.
fn normalize(path: &Path) -> PathBuf {
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

fn io_error(path: &Path, kind: io::ErrorKind, msg: &str) -> KbportError {
    KbportError::io(path, io::Error::new(kind, msg.to_string()))
}

impl MemoryFileSystem {
    /// Create an empty filesystem containing only the root directory.
    pub fn new() -> Self {
        let mut state = State::default();
        state.dirs.insert(PathBuf::from("/"));
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let path = normalize(path);
        let state = self.lock();
        if !state.dirs.contains(&path) {
            return Err(io_error(&path, io::ErrorKind::NotFound, "directory not found"));
        }

        let mut entries: Vec<DirEntry> = state
            .dirs
            .iter()
            .filter(|d| d.parent() == Some(path.as_path()))
            .map(|d| DirEntry {
                name: d.file_name().unwrap_or_default().to_string_lossy().into_owned(),
                is_directory: true,
            })
            .chain(
                state
                    .files
                    .keys()
                    .filter(|f| f.parent() == Some(path.as_path()))
                    .map(|f| DirEntry {
                        name: f.file_name().unwrap_or_default().to_string_lossy().into_owned(),
                        is_directory: false,
                    }),
            )
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let path = normalize(path);
        let state = self.lock();
        state
            .files
            .get(&path)
            .cloned()
            .ok_or_else(|| io_error(&path, io::ErrorKind::NotFound, "file not found"))
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        let path = normalize(path);
        let mut state = self.lock();
        if state.dirs.contains(&path) {
            return Err(io_error(&path, io::ErrorKind::IsADirectory, "is a directory"));
        }
        if let Some(parent) = path.parent() {
            if !state.dirs.contains(parent) {
                return Err(io_error(&path, io::ErrorKind::NotFound, "parent directory not found"));
            }
        }
        state.files.insert(path, content.to_vec());
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let path = normalize(path);
        let mut state = self.lock();

        let mut ancestors: Vec<PathBuf> = path.ancestors().map(Path::to_path_buf).collect();
        ancestors.reverse();
        for dir in ancestors {
            if dir.as_os_str().is_empty() {
                continue;
            }
            if state.files.contains_key(&dir) {
                return Err(io_error(&dir, io::ErrorKind::AlreadyExists, "a file exists here"));
            }
            state.dirs.insert(dir);
        }
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let path = normalize(path);
        let mut state = self.lock();
        state.files.retain(|f, _| f != &path && !f.starts_with(&path));
        state.dirs.retain(|d| d != &path && !d.starts_with(&path));
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let path = normalize(path);
        let mut state = self.lock();
        if state.files.remove(&path).is_none() {
            return Err(io_error(&path, io::ErrorKind::NotFound, "file not found"));
        }
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from = normalize(from);
        let to = normalize(to);
        let mut state = self.lock();

        if let Some(parent) = to.parent() {
            if !state.dirs.contains(parent) {
                return Err(io_error(&to, io::ErrorKind::NotFound, "parent directory not found"));
            }
        }

        if state.files.contains_key(&from) {
            if state.dirs.contains(&to) {
                return Err(io_error(&to, io::ErrorKind::IsADirectory, "is a directory"));
            }
            let content = state.files.remove(&from).unwrap_or_default();
            state.files.insert(to, content);
            return Ok(());
        }

        if state.dirs.contains(&from) {
            if state.dirs.contains(&to) || state.files.contains_key(&to) {
                return Err(io_error(&to, io::ErrorKind::AlreadyExists, "target exists"));
            }
            let moved_dirs: Vec<PathBuf> = state
                .dirs
                .iter()
                .filter(|d| d.starts_with(&from))
                .cloned()
                .collect();
            for dir in moved_dirs {
                state.dirs.remove(&dir);
                let rel = dir.strip_prefix(&from).unwrap_or(Path::new("")).to_path_buf();
                state.dirs.insert(to.join(rel));
            }
            let moved_files: Vec<(PathBuf, Vec<u8>)> = state
                .files
                .iter()
                .filter(|(f, _)| f.starts_with(&from))
                .map(|(f, c)| (f.clone(), c.clone()))
                .collect();
            for (file, content) in moved_files {
                state.files.remove(&file);
                let rel = file.strip_prefix(&from).unwrap_or(&file).to_path_buf();
                state.files.insert(to.join(rel), content);
            }
            return Ok(());
        }

        Err(io_error(&from, io::ErrorKind::NotFound, "path not found"))
    }

    fn stat(&self, path: &Path) -> PathStat {
        let path = normalize(path);
        let state = self.lock();
        if state.dirs.contains(&path) {
            PathStat::directory()
        } else if state.files.contains_key(&path) {
            PathStat::file()
        } else {
            PathStat::missing()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_only_root() {
        let fs = MemoryFileSystem::new();
        assert!(fs.stat(Path::new("/")).is_directory);
        assert!(fs.read_dir(Path::new("/")).unwrap().is_empty());
    }

    #[test]
    fn write_requires_parent() {
        let fs = MemoryFileSystem::new();
        let err = fs.write_file(Path::new("/a/b.md"), b"x").unwrap_err();
        assert!(matches!(err, KbportError::Io { .. }));

        fs.create_dir_all(Path::new("/a")).unwrap();
        fs.write_file(Path::new("/a/b.md"), b"x").unwrap();
        assert_eq!(fs.read_file(Path::new("/a/b.md")).unwrap(), b"x");
    }

    #[test]
    fn read_dir_missing_is_error() {
        let fs = MemoryFileSystem::new();
        assert!(fs.read_dir(Path::new("/nope")).is_err());
    }

    #[test]
    fn read_dir_lists_direct_children_only() {
        let fs = MemoryFileSystem::new();
        fs.create_dir_all(Path::new("/a/b")).unwrap();
        fs.write_file(Path::new("/a/f.md"), b"f").unwrap();
        fs.write_file(Path::new("/a/b/g.md"), b"g").unwrap();

        let names: Vec<String> = fs
            .read_dir(Path::new("/a"))
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["b".to_string(), "f.md".to_string()]);
    }

    #[test]
    fn remove_is_recursive_and_forceful() {
        let fs = MemoryFileSystem::new();
        fs.create_dir_all(Path::new("/a/b/c")).unwrap();
        fs.write_file(Path::new("/a/b/c/f.md"), b"x").unwrap();

        fs.remove(Path::new("/a/b")).unwrap();
        assert!(!fs.stat(Path::new("/a/b")).exists);
        assert!(fs.stat(Path::new("/a")).is_directory);

        // Missing path is fine.
        fs.remove(Path::new("/ghost")).unwrap();
    }

    #[test]
    fn rename_moves_subtree() {
        let fs = MemoryFileSystem::new();
        fs.create_dir_all(Path::new("/src/inner")).unwrap();
        fs.write_file(Path::new("/src/inner/f.md"), b"x").unwrap();

        fs.rename(Path::new("/src"), Path::new("/dst")).unwrap();
        assert!(!fs.stat(Path::new("/src")).exists);
        assert_eq!(fs.read_file(Path::new("/dst/inner/f.md")).unwrap(), b"x");
    }

    #[test]
    fn lexical_dot_dot_resolution() {
        let fs = MemoryFileSystem::new();
        fs.create_dir_all(Path::new("/a/b")).unwrap();
        fs.write_file(Path::new("/a/b/../top.md"), b"t").unwrap();
        assert!(fs.stat(Path::new("/a/top.md")).is_file);
    }
}
