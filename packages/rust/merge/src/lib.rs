//! Directory-tree merging under per-path conflict policies.
//!
//! - [`policy`] resolves a relative path to a conflict [`Behavior`]
//! - [`validate`] enforces dataset-root containment before every write
//! - [`merger`] copies and moves trees through the [`FileSystem`] capability
//!
//! [`Behavior`]: kbport_shared::Behavior
//! [`FileSystem`]: kbport_fs::FileSystem

pub mod merger;
pub mod policy;
pub mod validate;

pub use merger::{CopyContext, copy_dir, move_dir};
pub use policy::resolve_behavior;
pub use validate::{
    PathValidationContext, lexical_normalize, relative_to_root, validate_paths,
    validate_source_exists,
};
