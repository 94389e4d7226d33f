//! Hashing primitives for the Poon object store.
//!
//! Objects are addressed by the SHA-256 digest of a git-style header
//! (`"<type> <len>\0"`) followed by the raw content. The header makes hashes
//! type- and size-aware: a blob and a tree with identical bytes never share
//! an address.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod hasher;
pub mod reader;

pub use hasher::{ContentHasher, HasherError};
pub use reader::VerifyingReader;
