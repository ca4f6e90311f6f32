//! Shared types, error model, and configuration for kbport.
//!
//! This crate is the foundation depended on by all other kbport crates.
//! It provides:
//! - [`KbportError`] — the unified error type
//! - Domain types ([`Behavior`], [`FolderBehaviorMap`], [`NormalizeOutcome`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, IngestConfig, MergeConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{KbportError, Result};
pub use types::{
    Behavior, DirEntry, FolderBehaviorMap, IngestReport, NormalizeOutcome, PathStat,
    normalize_key,
};
