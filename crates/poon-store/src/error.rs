use poon_types::{ObjectHash, ObjectType, TypeError};

/// Errors from storage and object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend has no value under this key.
    #[error("key not found: {key}")]
    NotFound { key: String },

    /// The requested object was not found.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectHash),

    /// A hash string was malformed.
    #[error(transparent)]
    InvalidHash(#[from] TypeError),

    /// Stored bytes do not hash to their address (data corruption).
    #[error("integrity error for {hash}: content hashes to {computed}")]
    Integrity {
        hash: ObjectHash,
        computed: ObjectHash,
    },

    /// The object exists but is not of the requested type.
    #[error("type mismatch for {hash}: expected {expected}, found {actual}")]
    TypeMismatch {
        hash: ObjectHash,
        expected: ObjectType,
        actual: ObjectType,
    },

    /// The stored envelope or payload cannot be decoded.
    #[error("corrupt object {hash}: {reason}")]
    CorruptObject { hash: ObjectHash, reason: String },

    /// A tree was submitted with two entries sharing a name.
    #[error("duplicate tree entry name: {name:?}")]
    DuplicateEntryName { name: String },

    /// A tree entry is not storable (bad name or type).
    #[error("invalid tree entry {name:?}: {reason}")]
    InvalidTreeEntry { name: String, reason: String },

    /// A backend key cannot be mapped safely.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend has been closed.
    #[error("storage backend is closed")]
    Closed,

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns `true` for "key or object absent" errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::ObjectNotFound(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
