//! Error types for version operations.

use poon_store::StoreError;
use poon_types::ObjectHash;
use thiserror::Error;

/// Errors that can occur during version operations.
#[derive(Debug, Error)]
pub enum VersionError {
    /// No info record exists for this version.
    #[error("version not found: {0}")]
    VersionNotFound(i64),

    /// No version maps to this commit.
    #[error("no version for commit {0}")]
    CommitNotFound(ObjectHash),

    /// The repository has no versions yet.
    #[error("no versions exist")]
    NoVersions,

    /// A stored record cannot be decoded.
    #[error("corrupt version record {key}: {reason}")]
    CorruptRecord { key: String, reason: String },

    /// Underlying storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience type alias for version operations.
pub type VersionResult<T> = std::result::Result<T, VersionError>;
