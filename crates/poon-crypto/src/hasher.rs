use poon_types::{ObjectHash, ObjectType, TypeError};
use sha2::{Digest, Sha256};

/// Typed SHA-256 content hasher.
///
/// Every object hash is computed over `"<type> <len>\0" || content`. This
/// prevents cross-type collisions: a blob and a commit with identical bytes
/// produce different hashes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContentHasher;

impl ContentHasher {
    /// Create a hasher.
    pub const fn new() -> Self {
        Self
    }

    /// SHA-256 of raw bytes, no header.
    pub fn compute_hash(&self, data: &[u8]) -> ObjectHash {
        ObjectHash::from_digest(Sha256::digest(data).into())
    }

    /// The object header prepended to content before hashing.
    pub fn object_header(object_type: ObjectType, len: u64) -> String {
        format!("{object_type} {len}\0")
    }

    /// SHA-256 over the object header followed by `content`.
    pub fn compute_object_hash(&self, object_type: ObjectType, content: &[u8]) -> ObjectHash {
        let mut hasher = Sha256::new();
        hasher.update(Self::object_header(object_type, content.len() as u64).as_bytes());
        hasher.update(content);
        ObjectHash::from_digest(hasher.finalize().into())
    }

    /// Check that `hash` is 64 hex characters.
    pub fn validate_hash(&self, hash: &str) -> Result<(), TypeError> {
        ObjectHash::validate(hash)
    }

    /// Recompute the hash of `(object_type, content)` and compare it with
    /// `expected`.
    pub fn verify_object(
        &self,
        object_type: ObjectType,
        content: &[u8],
        expected: &ObjectHash,
    ) -> Result<(), HasherError> {
        let computed = self.compute_object_hash(object_type, content);
        if computed != *expected {
            return Err(HasherError::Mismatch {
                expected: *expected,
                computed,
            });
        }
        Ok(())
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("object hash mismatch: expected {expected}, computed {computed}")]
    Mismatch {
        expected: ObjectHash,
        computed: ObjectHash,
    },
}
