//! Knowledge-base layout detection, normalization, and archive ingestion.
//!
//! This crate ties the capability crates together into end-to-end
//! workflows: recognize a KB layout ([`detector`]), hoist a nested one
//! to the root ([`normalizer`]), and ingest a downloaded archive into a
//! dataset ([`ingest`]).

pub mod detector;
pub mod ingest;
pub mod normalizer;

pub use detector::{
    AGENTS_FILE_NAME, MANIFEST_FILE_NAME, SENTINEL_DIR_NAME, STAGING_DIR_NAME, find_nested_kb,
    is_valid_kb,
};
pub use ingest::{IngestOptions, ingest_archive};
pub use normalizer::normalize_kb;
