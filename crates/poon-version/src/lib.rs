//! Version bookkeeping for Poon.
//!
//! A version is a monotonically increasing integer alias for a commit. This
//! crate keeps the mapping in the same [`StorageBackend`](poon_store::StorageBackend)
//! that holds the objects, under three key families:
//!
//! - `version/current` -- decimal number of the highest allocated version
//! - `version/info/<n>` -- JSON-encoded [`VersionInfo`]
//! - `version/hash/<commit>` -- decimal version number, for reverse lookup
//!
//! Version 0 means "no commits exist" and is never stored.
//!
//! # Modules
//!
//! - [`error`] -- Error types for version operations
//! - [`types`] -- [`VersionInfo`]
//! - [`manager`] -- [`VersionManager`]

pub mod error;
pub mod manager;
pub mod types;

pub use error::{VersionError, VersionResult};
pub use manager::VersionManager;
pub use types::VersionInfo;
