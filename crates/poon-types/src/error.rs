use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hash {value:?}: {reason}")]
    InvalidHash { value: String, reason: String },

    #[error("unknown object type: {0:?}")]
    UnknownObjectType(String),
}
