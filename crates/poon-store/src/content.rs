use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;

use poon_crypto::{ContentHasher, VerifyingReader};
use poon_types::{ObjectHash, ObjectType};
use tracing::{debug, warn};

use crate::backend::StorageBackend;
use crate::error::{StoreError, StoreResult};
use crate::object::{parse_header, BlobObject, CommitObject, StoredObject, TreeObject, MAX_HEADER_LEN};

/// Key prefix under which objects are persisted.
pub const OBJECT_PREFIX: &str = "objects/";

/// Typed object store over an arbitrary [`StorageBackend`].
///
/// Every write computes the object's hash from its content, and every read
/// re-verifies the stored bytes against the hash they were fetched by.
#[derive(Clone)]
pub struct ContentStore {
    backend: Arc<dyn StorageBackend>,
    hasher: ContentHasher,
}

impl ContentStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            hasher: ContentHasher::new(),
        }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// The hasher used for addressing.
    pub fn hasher(&self) -> &ContentHasher {
        &self.hasher
    }

    fn key(hash: &ObjectHash) -> String {
        format!("{OBJECT_PREFIX}{hash}")
    }

    /// Persist `obj` under its hash. Storing the same content again
    /// overwrites with identical bytes.
    pub fn store(&self, obj: &StoredObject) -> StoreResult<ObjectHash> {
        obj.verify()?;
        self.backend.put(&Self::key(&obj.hash), &obj.encode())?;
        debug!(hash = %obj.hash.short_hex(), kind = %obj.object_type, size = obj.size, "stored object");
        Ok(obj.hash)
    }

    /// Fetch and verify the object stored under `hash`.
    pub fn get(&self, hash: &ObjectHash) -> StoreResult<StoredObject> {
        let bytes = self.backend.get(&Self::key(hash)).map_err(|e| match e {
            StoreError::NotFound { .. } => StoreError::ObjectNotFound(*hash),
            other => other,
        })?;
        StoredObject::decode(*hash, &bytes)
    }

    fn get_typed(&self, hash: &ObjectHash, expected: ObjectType) -> StoreResult<StoredObject> {
        let obj = self.get(hash)?;
        if obj.object_type != expected {
            return Err(StoreError::TypeMismatch {
                hash: *hash,
                expected,
                actual: obj.object_type,
            });
        }
        Ok(obj)
    }

    pub fn exists(&self, hash: &ObjectHash) -> StoreResult<bool> {
        self.backend.exists(&Self::key(hash))
    }

    pub fn delete(&self, hash: &ObjectHash) -> StoreResult<()> {
        self.backend.delete(&Self::key(hash)).map_err(|e| match e {
            StoreError::NotFound { .. } => StoreError::ObjectNotFound(*hash),
            other => other,
        })
    }

    /// Hashes of every stored object, sorted. Keys under the object prefix
    /// that are not valid hashes are skipped.
    pub fn list(&self) -> StoreResult<Vec<ObjectHash>> {
        let keys = self.backend.list(OBJECT_PREFIX)?;
        let mut hashes = Vec::with_capacity(keys.len());
        for key in keys {
            let suffix = &key[OBJECT_PREFIX.len()..];
            match ObjectHash::from_hex(suffix) {
                Ok(hash) => hashes.push(hash),
                Err(e) => warn!(key = %key, error = %e, "skipping malformed object key"),
            }
        }
        Ok(hashes)
    }

    // -- Blob ---------------------------------------------------------------

    pub fn store_blob(&self, content: &[u8]) -> StoreResult<ObjectHash> {
        self.store(&StoredObject::new(ObjectType::Blob, content.to_vec()))
    }

    pub fn get_blob(&self, hash: &ObjectHash) -> StoreResult<BlobObject> {
        let obj = self.get_typed(hash, ObjectType::Blob)?;
        Ok(BlobObject::new(obj.content))
    }

    /// Open a blob for streaming.
    ///
    /// The returned reader hashes the content as it is consumed and fails
    /// with `InvalidData` at EOF if it does not match `hash`.
    pub fn open_blob(&self, hash: &ObjectHash) -> StoreResult<Box<dyn Read + Send>> {
        let stream = self.backend.stream(&Self::key(hash)).map_err(|e| match e {
            StoreError::NotFound { .. } => StoreError::ObjectNotFound(*hash),
            other => other,
        })?;
        let mut reader = BufReader::new(stream);
        let mut header = Vec::with_capacity(MAX_HEADER_LEN);
        (&mut reader)
            .take(MAX_HEADER_LEN as u64)
            .read_until(0, &mut header)?;
        let (object_type, size, _) = parse_header(*hash, &header)?;
        if object_type != ObjectType::Blob {
            return Err(StoreError::TypeMismatch {
                hash: *hash,
                expected: ObjectType::Blob,
                actual: object_type,
            });
        }
        Ok(Box::new(VerifyingReader::new(reader, object_type, size, *hash)))
    }

    // -- Tree ---------------------------------------------------------------

    /// Store a tree in canonical form.
    ///
    /// Entries are sorted by name; duplicate or malformed names are rejected.
    pub fn store_tree(&self, tree: &TreeObject) -> StoreResult<ObjectHash> {
        let canonical = tree.canonicalize()?;
        self.store(&StoredObject::new(ObjectType::Tree, canonical.to_bytes()?))
    }

    pub fn get_tree(&self, hash: &ObjectHash) -> StoreResult<TreeObject> {
        let obj = self.get_typed(hash, ObjectType::Tree)?;
        TreeObject::from_bytes(*hash, &obj.content)
    }

    // -- Commit -------------------------------------------------------------

    pub fn store_commit(&self, commit: &CommitObject) -> StoreResult<ObjectHash> {
        self.store(&StoredObject::new(ObjectType::Commit, commit.to_bytes()?))
    }

    pub fn get_commit(&self, hash: &ObjectHash) -> StoreResult<CommitObject> {
        let obj = self.get_typed(hash, ObjectType::Commit)?;
        CommitObject::from_bytes(*hash, &obj.content)
    }
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore").finish_non_exhaustive()
    }
}
