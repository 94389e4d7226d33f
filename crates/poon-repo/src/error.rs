use std::path::PathBuf;

use poon_patch::PatchError;
use poon_store::StoreError;
use poon_version::VersionError;
use thiserror::Error;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("version not found: {0}")]
    VersionNotFound(i64),

    #[error("directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// A read path is empty or otherwise unusable.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// A path contains `..` or is absolute.
    #[error("path escapes the repository root: {path:?}")]
    PathTraversal { path: String },

    #[error("cannot apply patch to empty repository")]
    EmptyRepository,

    #[error("invalid patch target path {path:?}: {reason}")]
    InvalidTargetPath { path: String, reason: String },

    /// A patch would place a file where a directory is, or the reverse.
    #[error("path conflict at {path}: {reason}")]
    PathConflict { path: String, reason: String },

    #[error("failed to parse patch: {0}")]
    PatchParse(#[source] PatchError),

    #[error("patch does not apply to {path}: {source}")]
    PatchConflict {
        path: String,
        #[source]
        source: PatchError,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("version error: {0}")]
    Version(VersionError),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<VersionError> for RepoError {
    fn from(err: VersionError) -> Self {
        match err {
            VersionError::VersionNotFound(version) => Self::VersionNotFound(version),
            VersionError::Store(store) => Self::Store(store),
            other => Self::Version(other),
        }
    }
}

pub type RepoResult<T> = Result<T, RepoError>;
