//! End-to-end archive ingestion: archive → staging → normalize → merge.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use kbport_archive::ArchiveExtractor;
use kbport_fs::FileSystem;
use kbport_merge::{CopyContext, copy_dir, validate_source_exists};
use kbport_shared::{Behavior, FolderBehaviorMap, IngestReport, NormalizeOutcome, Result};

use crate::normalizer::normalize_kb;

/// Configuration for one archive ingestion.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Archive file to ingest.
    pub archive_path: PathBuf,
    /// Dataset root — the boundary no write may escape.
    pub dataset_root: PathBuf,
    /// Destination directory for the merged KB. Must sit inside the
    /// dataset root; the merge validator rejects anything else.
    pub dest_dir: PathBuf,
    /// Per-folder conflict overrides.
    pub behaviors: FolderBehaviorMap,
    /// Behavior applied when no override matches.
    pub default_behavior: Behavior,
    /// Root under which the per-invocation staging directory is created.
    /// Must sit inside the dataset root. `None` means
    /// `<dataset_root>/.staging`.
    pub staging_root: Option<PathBuf>,
}

/// Ingest a knowledge-base archive into the dataset.
///
/// 1. Check the archive exists and hash it
/// 2. Extract into a fresh, privately owned staging directory
/// 3. Normalize the staged layout (nested/staged KBs hoisted to the top)
/// 4. Merge the staged tree into the destination under the behavior map
///
/// An archive holding no recognizable KB is a normal input, reported as
/// `NormalizeOutcome::NotFound` with nothing merged. The staging
/// directory is removed on every exit path, best-effort.
#[instrument(skip_all, fields(archive = %options.archive_path.display(), dest = %options.dest_dir.display()))]
pub fn ingest_archive(
    fs: &dyn FileSystem,
    extractor: &dyn ArchiveExtractor,
    options: &IngestOptions,
) -> Result<IngestReport> {
    let start = Instant::now();

    validate_source_exists(fs, &options.archive_path)?;
    let archive_sha256 = hash_file(fs, &options.archive_path)?;
    debug!(sha256 = %archive_sha256, "archive hashed");

    let staging_root = options
        .staging_root
        .clone()
        .unwrap_or_else(|| options.dataset_root.join(".staging"));
    let staging = staging_root.join(format!("kbport-ingest-{}", Uuid::now_v7()));
    fs.create_dir_all(&staging)?;
    debug!(staging = %staging.display(), "staging directory created");

    let result = stage_and_merge(fs, extractor, options, &staging);

    if let Err(e) = fs.remove(&staging) {
        warn!(staging = %staging.display(), error = %e, "staging cleanup failed");
    }

    let (outcome, files_merged) = result?;

    let report = IngestReport {
        kb_path: options.dest_dir.clone(),
        archive_sha256,
        outcome,
        files_merged,
        completed_at: Utc::now(),
        elapsed: start.elapsed(),
    };
    info!(
        outcome = ?report.outcome,
        files = report.files_merged,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "ingestion complete"
    );
    Ok(report)
}

/// Extract, normalize, and merge; the caller owns staging cleanup.
fn stage_and_merge(
    fs: &dyn FileSystem,
    extractor: &dyn ArchiveExtractor,
    options: &IngestOptions,
    staging: &Path,
) -> Result<(NormalizeOutcome, usize)> {
    extractor.extract(fs, &options.archive_path, staging)?;

    let outcome = normalize_kb(fs, staging)?;
    if !outcome.is_valid() {
        info!("no valid KB layout in archive, nothing merged");
        return Ok((NormalizeOutcome::NotFound, 0));
    }

    let files_merged = copy_dir(
        fs,
        &CopyContext {
            source_dir: staging.to_path_buf(),
            dest_dir: options.dest_dir.clone(),
            behaviors: &options.behaviors,
            default_behavior: options.default_behavior,
            dataset_root: &options.dataset_root,
        },
    )?;

    Ok((outcome, files_merged))
}

/// SHA-256 of a file's content, lowercase hex.
fn hash_file(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let content = fs.read_file(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(format!("{:x}", hasher.finalize()))
}
