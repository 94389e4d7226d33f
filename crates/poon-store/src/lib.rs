//! Content-addressed object storage for Poon.
//!
//! This crate implements a hash-keyed object store analogous to git's
//! `.git/objects/` directory. Files, directories and snapshots are stored as
//! immutable objects identified by the SHA-256 of their header-prefixed
//! content.
//!
//! # Object Types
//!
//! - [`BlobObject`] -- raw file contents
//! - [`TreeObject`] -- directory listing of [`TreeEntry`] values
//! - [`CommitObject`] -- root tree plus provenance
//!
//! # Storage Backends
//!
//! The [`ContentStore`] sits on top of any [`StorageBackend`], an opaque
//! string-keyed byte store:
//!
//! - [`MemoryBackend`] -- `HashMap`-based store for tests and embedding
//! - [`DiskBackend`] -- one file per key under a root directory
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Every read re-verifies the object against its hash before returning it.
//! 3. Concurrent reads are always safe (objects are immutable).
//! 4. Backends never interpret the bytes they hold.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod backend;
pub mod content;
pub mod disk;
pub mod error;
pub mod memory;
pub mod object;

pub use backend::StorageBackend;
pub use content::{ContentStore, OBJECT_PREFIX};
pub use disk::DiskBackend;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryBackend;
pub use object::{
    BlobObject, CommitObject, StoredObject, TreeEntry, TreeObject, DEFAULT_DIR_MODE,
    DEFAULT_FILE_MODE,
};
