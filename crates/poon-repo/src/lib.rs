//! Repository engine for Poon.
//!
//! Combines the content store and version manager into a file repository:
//! path reads at any version, directory snapshots, and unified-diff patches
//! committed through copy-on-write tree rewrites.

pub mod config;
pub mod error;
pub mod history;
pub mod ingest;
pub mod path;
pub mod repository;
mod tree;
pub mod verify;

pub use config::{BackendConfig, DefaultsConfig, IngestConfig, PatchConfig, RepositoryConfig};
pub use error::{RepoError, RepoResult};
pub use history::{ChangeKind, FileChange};
pub use ingest::IngestStats;
pub use path::{split_path, validate_path};
pub use repository::Repository;
pub use verify::VerifyReport;

// Re-export key types
pub use poon_store::{CommitObject, TreeEntry};
pub use poon_types::{ObjectHash, ObjectType};
pub use poon_version::VersionInfo;
