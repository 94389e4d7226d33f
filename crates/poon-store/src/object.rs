use chrono::{DateTime, Utc};
use poon_crypto::{ContentHasher, HasherError};
use poon_types::{ObjectHash, ObjectType};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Permission bits given to regular files when no better source exists.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Permission bits given to directories when no better source exists.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// A stored object: type tag + raw content + its address.
///
/// `StoredObject` is the unit of storage. It is persisted as the same
/// `"<type> <size>\0"` header that feeds the hash, followed by the content,
/// so a stored value can be re-verified without any side metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// Content address.
    pub hash: ObjectHash,
    /// The type of this object.
    pub object_type: ObjectType,
    /// Length of `content` in bytes.
    pub size: u64,
    /// The raw content (serialized JSON for trees and commits).
    pub content: Vec<u8>,
}

impl StoredObject {
    /// Build an object and compute its hash.
    pub fn new(object_type: ObjectType, content: Vec<u8>) -> Self {
        let hash = ContentHasher::new().compute_object_hash(object_type, &content);
        Self {
            hash,
            object_type,
            size: content.len() as u64,
            content,
        }
    }

    /// Recompute the hash and compare it with `self.hash`.
    pub fn verify(&self) -> StoreResult<()> {
        ContentHasher::new()
            .verify_object(self.object_type, &self.content, &self.hash)
            .map_err(|e| match e {
                HasherError::Mismatch { expected, computed } => StoreError::Integrity {
                    hash: expected,
                    computed,
                },
            })
    }

    /// Encode as `header || content` for the backend.
    pub fn encode(&self) -> Vec<u8> {
        let header = ContentHasher::object_header(self.object_type, self.size);
        let mut out = Vec::with_capacity(header.len() + self.content.len());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&self.content);
        out
    }

    /// Decode bytes read from under `objects/<hash>` and verify them.
    ///
    /// The stored bytes are the hash preimage, so any altered, truncated or
    /// extended envelope fails with `Integrity` before the header is parsed.
    /// `CorruptObject` is left for bytes that hash correctly but do not parse.
    pub fn decode(hash: ObjectHash, bytes: &[u8]) -> StoreResult<Self> {
        let computed = ContentHasher::new().compute_hash(bytes);
        if computed != hash {
            return Err(StoreError::Integrity { hash, computed });
        }
        let (object_type, size, header_len) = parse_header(hash, bytes)?;
        let content = bytes[header_len..].to_vec();
        if content.len() as u64 != size {
            return Err(StoreError::CorruptObject {
                hash,
                reason: format!(
                    "header declares {size} bytes but {} follow",
                    content.len()
                ),
            });
        }
        let obj = Self {
            hash,
            object_type,
            size,
            content,
        };
        obj.verify()?;
        Ok(obj)
    }
}

/// Longest header we accept: "commit " + 20 digits + NUL.
pub(crate) const MAX_HEADER_LEN: usize = 32;

/// Parse `"<type> <size>\0"` from the front of `bytes`.
///
/// Returns the type, declared size, and header length including the NUL.
pub(crate) fn parse_header(hash: ObjectHash, bytes: &[u8]) -> StoreResult<(ObjectType, u64, usize)> {
    let corrupt = |reason: &str| StoreError::CorruptObject {
        hash,
        reason: reason.to_string(),
    };
    let window = &bytes[..bytes.len().min(MAX_HEADER_LEN)];
    let nul = window
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| corrupt("missing object header terminator"))?;
    let header = std::str::from_utf8(&bytes[..nul]).map_err(|_| corrupt("header is not UTF-8"))?;
    let (ty, size) = header
        .split_once(' ')
        .ok_or_else(|| corrupt("malformed object header"))?;
    let object_type: ObjectType = ty.parse().map_err(|_| corrupt("unknown object type"))?;
    let size: u64 = size.parse().map_err(|_| corrupt("invalid object size"))?;
    Ok((object_type, size, nul + 1))
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// Raw file content, stored byte-for-byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobObject {
    pub content: Vec<u8>,
}

impl BlobObject {
    pub fn new(content: Vec<u8>) -> Self {
        Self { content }
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// A single entry in a tree object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Entry name (file or directory name, no separators).
    pub name: String,
    /// Address of the referenced blob or tree.
    pub hash: ObjectHash,
    /// `Blob` for files, `Tree` for directories.
    #[serde(rename = "type")]
    pub entry_type: ObjectType,
    /// Permission bits.
    pub mode: u32,
    /// Content size for blobs; 0 for trees.
    pub size: u64,
    /// Modification time, seconds since the Unix epoch.
    pub mod_time: i64,
}

impl TreeEntry {
    /// A file entry.
    pub fn blob(name: impl Into<String>, hash: ObjectHash, size: u64, mode: u32, mod_time: i64) -> Self {
        Self {
            name: name.into(),
            hash,
            entry_type: ObjectType::Blob,
            mode,
            size,
            mod_time,
        }
    }

    /// A directory entry.
    pub fn tree(name: impl Into<String>, hash: ObjectHash, mode: u32, mod_time: i64) -> Self {
        Self {
            name: name.into(),
            hash,
            entry_type: ObjectType::Tree,
            mode,
            size: 0,
            mod_time,
        }
    }

    pub fn is_tree(&self) -> bool {
        self.entry_type == ObjectType::Tree
    }

    pub fn is_blob(&self) -> bool {
        self.entry_type == ObjectType::Blob
    }
}

/// Directory listing object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeObject {
    /// Entries sorted by name.
    pub entries: Vec<TreeEntry>,
}

impl TreeObject {
    /// Create a tree with the given entries.
    ///
    /// Entries are sorted by name for deterministic hashing.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Self { entries }
    }

    /// Create an empty tree.
    pub fn empty() -> Self {
        Self::default()
    }

    /// First entry named `name`.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// First entry named `name` with the given type.
    pub fn find(&self, name: &str, entry_type: ObjectType) -> Option<&TreeEntry> {
        self.entries
            .iter()
            .find(|e| e.name == name && e.entry_type == entry_type)
    }

    /// Replace the entry with the same name, or insert it in sorted position.
    pub fn upsert(&mut self, entry: TreeEntry) {
        match self.entries.binary_search_by(|e| e.name.as_str().cmp(&entry.name)) {
            Ok(idx) => self.entries[idx] = entry,
            Err(idx) => self.entries.insert(idx, entry),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check entry names and types, returning the sorted canonical form.
    ///
    /// Rejects duplicate names, names that are empty, contain `/` or are
    /// `.`/`..`, and entries that point at commits.
    pub fn canonicalize(&self) -> StoreResult<Self> {
        for entry in &self.entries {
            validate_entry(entry)?;
        }
        let canonical = Self::new(self.entries.clone());
        if let Some(pair) = canonical.entries.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(StoreError::DuplicateEntryName {
                name: pair[0].name.clone(),
            });
        }
        Ok(canonical)
    }

    /// Canonical JSON bytes for hashing and storage.
    pub fn to_bytes(&self) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Decode the content of a stored tree.
    pub fn from_bytes(hash: ObjectHash, bytes: &[u8]) -> StoreResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::CorruptObject {
            hash,
            reason: format!("tree decode failed: {e}"),
        })
    }
}

fn validate_entry(entry: &TreeEntry) -> StoreResult<()> {
    let invalid = |reason: &str| StoreError::InvalidTreeEntry {
        name: entry.name.clone(),
        reason: reason.to_string(),
    };
    if entry.name.is_empty() {
        return Err(invalid("empty name"));
    }
    if entry.name == "." || entry.name == ".." {
        return Err(invalid("reserved name"));
    }
    if entry.name.contains('/') || entry.name.contains('\0') {
        return Err(invalid("name contains a separator or NUL"));
    }
    if entry.entry_type == ObjectType::Commit {
        return Err(invalid("entries must reference blobs or trees"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// One immutable snapshot: a root tree plus provenance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitObject {
    pub root_tree: ObjectHash,
    /// `None` only for the first commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ObjectHash>,
    pub author: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// The version this commit was created for.
    pub version: i64,
}

impl CommitObject {
    /// Canonical JSON bytes for hashing and storage.
    pub fn to_bytes(&self) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Decode the content of a stored commit.
    pub fn from_bytes(hash: ObjectHash, bytes: &[u8]) -> StoreResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::CorruptObject {
            hash,
            reason: format!("commit decode failed: {e}"),
        })
    }
}
