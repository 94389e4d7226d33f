//! Foundation types for the Poon object store.
//!
//! Every other Poon crate depends on `poon-types`.
//!
//! # Key Types
//!
//! - [`ObjectHash`] -- validated SHA-256 content address, rendered as 64 lowercase hex characters
//! - [`ObjectType`] -- the kind of a stored object (`blob`, `tree`, `commit`)

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::{ObjectHash, ObjectType, HASH_HEX_LEN};
