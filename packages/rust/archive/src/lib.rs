//! Archive extraction capability with zip-slip and zip-bomb protections.
//!
//! [`ZipExtractor`] reads the archive through the injected [`FileSystem`]
//! and writes every entry back through it, so the same code path serves
//! the OS backend and the in-memory test substitute. All entries are
//! validated before anything is written.

use std::io::Read;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, instrument};

use kbport_fs::FileSystem;
use kbport_shared::{KbportError, Result};

/// Maximum size for a zip archive file (100 MB).
const MAX_ARCHIVE_SIZE: u64 = 100 * 1024 * 1024;
/// Maximum uncompressed size for any single zip entry (100 MB).
const MAX_ENTRY_SIZE: u64 = 100 * 1024 * 1024;
/// Maximum total uncompressed size across all entries (500 MB).
const MAX_TOTAL_SIZE: u64 = 500 * 1024 * 1024;
/// Maximum compression ratio; honest files rarely exceed 20:1.
const MAX_COMPRESSION_RATIO: f64 = 100.0;

/// Capability for unpacking an archive into a target directory.
pub trait ArchiveExtractor: Send + Sync {
    /// Extract `archive_path` into `target_dir`, creating it if needed.
    /// Fails with [`KbportError::Extraction`] on a missing or malformed
    /// archive; partial output must not be treated as usable.
    fn extract(
        &self,
        fs: &dyn FileSystem,
        archive_path: &Path,
        target_dir: &Path,
    ) -> Result<()>;
}

/// Production extractor for `.zip` archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl ZipExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveExtractor for ZipExtractor {
    #[instrument(skip_all, fields(archive = %archive_path.display(), target = %target_dir.display()))]
    fn extract(
        &self,
        fs: &dyn FileSystem,
        archive_path: &Path,
        target_dir: &Path,
    ) -> Result<()> {
        let bytes = fs.read_file(archive_path).map_err(|e| {
            KbportError::extraction(format!(
                "cannot read archive {}: {e}",
                archive_path.display()
            ))
        })?;
        if bytes.len() as u64 > MAX_ARCHIVE_SIZE {
            return Err(KbportError::extraction(format!(
                "archive {} exceeds {MAX_ARCHIVE_SIZE} bytes",
                archive_path.display()
            )));
        }

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(&bytes))
            .map_err(|e| KbportError::extraction(format!("malformed zip archive: {e}")))?;

        // Validate every entry before any write.
        let mut total_size: u64 = 0;
        for i in 0..archive.len() {
            let entry = archive
                .by_index(i)
                .map_err(|e| KbportError::extraction(format!("unreadable zip entry: {e}")))?;
            validate_entry_size(entry.name(), entry.size(), entry.compressed_size())?;

            total_size = total_size
                .checked_add(entry.size())
                .filter(|t| *t <= MAX_TOTAL_SIZE)
                .ok_or_else(|| {
                    KbportError::extraction(format!(
                        "total uncompressed size exceeds {MAX_TOTAL_SIZE} bytes"
                    ))
                })?;

            if let Some(name) = entry_name(&entry)? {
                safe_entry_path(target_dir, &name)?;
            }
        }

        fs.create_dir_all(target_dir)?;

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| KbportError::extraction(format!("unreadable zip entry: {e}")))?;

            let Some(name) = entry_name(&entry)? else {
                continue;
            };
            let out_path = safe_entry_path(target_dir, &name)?;

            if entry.is_dir() {
                fs.create_dir_all(&out_path)?;
                continue;
            }

            if let Some(parent) = out_path.parent() {
                fs.create_dir_all(parent)?;
            }

            // Cap the read as well: headers lying about the uncompressed
            // size must still hit the limit during decompression.
            let mut content = Vec::new();
            let read = entry
                .by_ref()
                .take(MAX_ENTRY_SIZE + 1)
                .read_to_end(&mut content)
                .map_err(|e| {
                    KbportError::extraction(format!("failed to decompress '{name}': {e}"))
                })?;
            if read as u64 > MAX_ENTRY_SIZE {
                return Err(KbportError::extraction(format!(
                    "entry '{name}' exceeds {MAX_ENTRY_SIZE} bytes during decompression"
                )));
            }

            fs.write_file(&out_path, &content)?;
            debug!(entry = %name, bytes = content.len(), "extracted");
        }

        Ok(())
    }
}

/// Safe entry name via `enclosed_name`. Empty names (root directory
/// entries) come back as `Ok(None)`; a name `enclosed_name` cannot
/// contain — traversal or absolute — is a hard extraction failure, not
/// something to silently rename.
fn entry_name<R: Read>(entry: &zip::read::ZipFile<'_, R>) -> Result<Option<String>> {
    let raw = entry.name();
    if raw.is_empty() {
        return Ok(None);
    }
    let Some(enclosed) = entry.enclosed_name() else {
        return Err(KbportError::extraction(format!(
            "zip slip detected: unsafe entry path '{raw}'"
        )));
    };
    let name = enclosed.to_string_lossy().into_owned();
    if name.is_empty() { Ok(None) } else { Ok(Some(name)) }
}

/// Reject zip bombs by absolute size and compression ratio.
fn validate_entry_size(name: &str, uncompressed: u64, compressed: u64) -> Result<()> {
    if uncompressed > MAX_ENTRY_SIZE {
        return Err(KbportError::extraction(format!(
            "entry '{name}' too large: {uncompressed} bytes (max {MAX_ENTRY_SIZE})"
        )));
    }
    if compressed > 0 {
        let ratio = uncompressed as f64 / compressed as f64;
        if ratio > MAX_COMPRESSION_RATIO {
            return Err(KbportError::extraction(format!(
                "suspicious compression ratio in '{name}': {ratio:.1}x (max {MAX_COMPRESSION_RATIO:.1}x)"
            )));
        }
    }
    Ok(())
}

/// Resolve an entry name strictly inside `target_dir`.
///
/// Rejects absolute entries and any parent-traversal component. The
/// check is lexical: the filesystem behind the capability may not exist
/// on disk, so canonicalization is not available here.
fn safe_entry_path(target_dir: &Path, entry_name: &str) -> Result<PathBuf> {
    let entry_path = Path::new(entry_name);
    if entry_path.is_absolute() || entry_name.starts_with('/') || entry_name.starts_with('\\') {
        return Err(KbportError::extraction(format!(
            "zip slip detected: absolute path in archive - '{entry_name}'"
        )));
    }

    let mut resolved = target_dir.to_path_buf();
    for component in entry_path.components() {
        match component {
            Component::Normal(c) => resolved.push(c),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(KbportError::extraction(format!(
                    "zip slip detected: parent traversal in '{entry_name}'"
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(KbportError::extraction(format!(
                    "zip slip detected: absolute component in '{entry_name}'"
                )));
            }
        }
    }

    if !resolved.starts_with(target_dir) {
        return Err(KbportError::extraction(format!(
            "zip slip detected: '{entry_name}' escapes the target directory"
        )));
    }

    Ok(resolved)
}
