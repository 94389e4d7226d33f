//! Tree navigation and copy-on-write rewriting.
//!
//! Nothing here mutates a stored object. A rewrite loads each tree on the
//! path, edits the in-memory copy, and stores it as a new object; siblings
//! off the path keep their hashes.

use poon_store::{ContentStore, TreeEntry, TreeObject};
use poon_types::{ObjectHash, ObjectType};

use crate::config::DefaultsConfig;
use crate::error::{RepoError, RepoResult};

/// Walk `segments` from `root` through directory entries and return the
/// final tree. Fails with `DirectoryNotFound` naming the first missing
/// prefix.
pub(crate) fn resolve_dir(store: &ContentStore, root: &ObjectHash, segments: &[String]) -> RepoResult<TreeObject> {
    let mut tree = store.get_tree(root)?;
    for (depth, segment) in segments.iter().enumerate() {
        let next = tree
            .find(segment, ObjectType::Tree)
            .map(|e| e.hash)
            .ok_or_else(|| RepoError::DirectoryNotFound {
                path: segments[..=depth].join("/"),
            })?;
        tree = store.get_tree(&next)?;
    }
    Ok(tree)
}

/// The blob entry at `segments`, or `None` if any part of the path is
/// missing.
pub(crate) fn find_blob(store: &ContentStore, root: &ObjectHash, segments: &[String]) -> RepoResult<Option<TreeEntry>> {
    let Some((name, dirs)) = segments.split_last() else {
        return Ok(None);
    };
    match resolve_dir(store, root, dirs) {
        Ok(tree) => Ok(tree.find(name, ObjectType::Blob).cloned()),
        Err(RepoError::DirectoryNotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// A new leaf for [`write_blob`].
pub(crate) struct Leaf {
    pub blob: ObjectHash,
    pub size: u64,
    pub mod_time: i64,
}

/// Store new trees for every directory from the root down to `segments`,
/// pointing the last segment at `leaf`. Returns the new root hash.
///
/// An existing file keeps its mode; a new one gets the default file mode.
/// Existing directories on the path keep their mode and modification time;
/// missing ones are created with the default directory mode.
pub(crate) fn write_blob(
    store: &ContentStore,
    root: &ObjectHash,
    segments: &[String],
    leaf: &Leaf,
    defaults: &DefaultsConfig,
) -> RepoResult<ObjectHash> {
    let tree = store.get_tree(root)?;
    rewrite(store, tree, segments, 0, leaf, defaults)
}

fn rewrite(
    store: &ContentStore,
    mut tree: TreeObject,
    segments: &[String],
    depth: usize,
    leaf: &Leaf,
    defaults: &DefaultsConfig,
) -> RepoResult<ObjectHash> {
    let name = &segments[depth];
    let conflict = |reason: &str| RepoError::PathConflict {
        path: segments[..=depth].join("/"),
        reason: reason.to_string(),
    };

    if depth + 1 == segments.len() {
        let mode = match tree.get(name) {
            Some(existing) if existing.is_blob() => existing.mode,
            Some(_) => return Err(conflict("a directory exists at this path")),
            None => defaults.file_mode,
        };
        tree.upsert(TreeEntry::blob(name.clone(), leaf.blob, leaf.size, mode, leaf.mod_time));
    } else {
        let (subtree, mode, mod_time) = match tree.get(name) {
            Some(existing) if existing.is_tree() => {
                (store.get_tree(&existing.hash)?, existing.mode, existing.mod_time)
            }
            Some(_) => return Err(conflict("a file exists at this path")),
            None => (TreeObject::empty(), defaults.dir_mode, leaf.mod_time),
        };
        let child = rewrite(store, subtree, segments, depth + 1, leaf, defaults)?;
        tree.upsert(TreeEntry::tree(name.clone(), child, mode, mod_time));
    }
    Ok(store.store_tree(&tree)?)
}
