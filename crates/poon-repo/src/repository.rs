use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use poon_patch::{apply_patch, apply_patch_verified, parse_patch_set, ParsedPatch, PatchError};
use poon_store::{
    CommitObject, ContentStore, DiskBackend, MemoryBackend, StorageBackend, StoreError, TreeEntry,
};
use poon_types::ObjectHash;
use poon_version::{VersionInfo, VersionManager};
use tracing::{debug, info};

use crate::config::{BackendConfig, RepositoryConfig};
use crate::error::{RepoError, RepoResult};
use crate::ingest::{snapshot_dir, IngestStats};
use crate::path::{split_path, validate_path};
use crate::tree::{find_blob, resolve_dir, write_blob, Leaf};

/// A versioned, content-addressed file repository.
///
/// `Repository` combines a [`ContentStore`] and a [`VersionManager`] over one
/// backend. Reads go straight to immutable objects and may run concurrently
/// with anything. Operations that allocate a version hold an internal
/// write lock from the moment they read the current version until the new
/// version is recorded, so concurrent writers are applied one after the
/// other instead of producing sibling commits.
pub struct Repository {
    store: ContentStore,
    versions: VersionManager,
    config: RepositoryConfig,
    write_lock: Mutex<()>,
}

impl Repository {
    /// Repository over an existing backend with default settings.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_config(backend, RepositoryConfig::default())
    }

    /// Repository over an existing backend. `config.backend` is ignored.
    pub fn with_config(backend: Arc<dyn StorageBackend>, config: RepositoryConfig) -> Self {
        Self {
            store: ContentStore::new(Arc::clone(&backend)),
            versions: VersionManager::new(backend),
            config,
            write_lock: Mutex::new(()),
        }
    }

    /// Build the backend described by `config.backend` and open a
    /// repository on it.
    pub fn open(config: &RepositoryConfig) -> RepoResult<Self> {
        let backend: Arc<dyn StorageBackend> = match &config.backend {
            BackendConfig::Memory => Arc::new(MemoryBackend::new()),
            BackendConfig::Disk { root } => Arc::new(DiskBackend::open(root)?),
        };
        info!(backend = ?config.backend, "opened repository");
        Ok(Self::with_config(backend, config.clone()))
    }

    /// Fresh in-memory repository.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn versions(&self) -> &VersionManager {
        &self.versions
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")).into())
    }

    // ---- Versions ----

    /// Highest allocated version; 0 for an empty repository.
    pub fn current_version(&self) -> RepoResult<i64> {
        Ok(self.versions.get_current_version()?)
    }

    pub fn version_info(&self, version: i64) -> RepoResult<VersionInfo> {
        Ok(self.versions.get_version_info(version)?)
    }

    /// Versions newest-first; `limit` 0 means all.
    pub fn list_versions(&self, limit: usize) -> RepoResult<Vec<VersionInfo>> {
        Ok(self.versions.list_versions(limit)?)
    }

    /// The commit recorded for `version`.
    pub fn commit_at(&self, version: i64) -> RepoResult<CommitObject> {
        let info = self.versions.get_version_info(version)?;
        Ok(self.store.get_commit(&info.commit_hash)?)
    }

    /// Drop the current version; the previous one becomes current.
    ///
    /// Objects are kept. Returns the new current version.
    pub fn rollback(&self) -> RepoResult<i64> {
        let _guard = self.lock()?;
        let current = self.versions.get_current_version()?;
        if current == 0 {
            return Err(RepoError::EmptyRepository);
        }
        self.versions.delete_version(current)?;
        let now = self.versions.get_current_version()?;
        info!(from = current, to = now, "rolled back");
        Ok(now)
    }

    // ---- Reads ----

    /// Contents of the file at `path` in `version`.
    pub fn read_file(&self, version: i64, path: &str) -> RepoResult<Vec<u8>> {
        let segments = split_path(path)?;
        let Some((name, dirs)) = segments.split_last() else {
            return Err(RepoError::InvalidPath {
                path: path.to_string(),
                reason: "a file path needs at least one segment".to_string(),
            });
        };
        let commit = self.commit_at(version)?;
        let tree = resolve_dir(&self.store, &commit.root_tree, dirs)?;
        let entry = tree
            .find(name, poon_types::ObjectType::Blob)
            .ok_or_else(|| RepoError::FileNotFound {
                path: segments.join("/"),
            })?;
        debug!(version, path, hash = %entry.hash.short_hex(), "read file");
        Ok(self.store.get_blob(&entry.hash)?.content)
    }

    /// Entries of the directory at `path` in `version`. An empty path, `.`
    /// or `/` names the root.
    pub fn read_directory(&self, version: i64, path: &str) -> RepoResult<Vec<TreeEntry>> {
        let segments = split_path(path)?;
        let commit = self.commit_at(version)?;
        Ok(resolve_dir(&self.store, &commit.root_tree, &segments)?.entries)
    }

    // ---- Writes ----

    /// Snapshot the directory at `root` as a new version.
    pub fn create_commit_from_filesystem(
        &self,
        root: impl AsRef<Path>,
        author: &str,
        message: &str,
    ) -> RepoResult<VersionInfo> {
        let root = root.as_ref();
        let _guard = self.lock()?;
        let mut stats = IngestStats::default();
        let tree = snapshot_dir(&self.store, root, &self.config, &mut stats)?;
        info!(
            root = %root.display(),
            files = stats.files,
            directories = stats.directories,
            bytes = stats.bytes,
            skipped = stats.skipped,
            "snapshotted directory"
        );
        self.commit_tree(tree, author, message)
    }

    /// Apply a unified diff to the current version and record the result as
    /// a new version.
    ///
    /// Every file section of the diff is applied in one commit. All target
    /// paths are validated before anything is written. Files that do not
    /// exist yet are patched from empty content.
    pub fn apply_patch(&self, patch: &[u8], author: &str, message: &str) -> RepoResult<VersionInfo> {
        let sections = parse_patch_set(patch).map_err(|e| match e {
            PatchError::NonUtf8FileName { line } => RepoError::InvalidTargetPath {
                path: String::from_utf8_lossy(patch.split(|&b| b == b'\n').nth(line - 1).unwrap_or_default())
                    .into_owned(),
                reason: "file name is not valid UTF-8".to_string(),
            },
            other => RepoError::PatchParse(other),
        })?;

        let _guard = self.lock()?;
        let current = self.versions.get_current_version()?;
        if current == 0 {
            return Err(RepoError::EmptyRepository);
        }

        let targets = sections
            .iter()
            .map(target_segments)
            .collect::<RepoResult<Vec<_>>>()?;
        if targets.is_empty() {
            return Err(RepoError::InvalidTargetPath {
                path: String::new(),
                reason: "patch does not name a target file".to_string(),
            });
        }

        let mut root = self.commit_at(current)?.root_tree;
        for (section, segments) in sections.iter().zip(&targets) {
            root = self.apply_section(&root, section, segments)?;
        }
        self.commit_tree(root, author, message)
    }

    fn apply_section(&self, root: &ObjectHash, section: &ParsedPatch, segments: &[String]) -> RepoResult<ObjectHash> {
        let path = segments.join("/");
        let original = match find_blob(&self.store, root, segments)? {
            Some(entry) => self.store.get_blob(&entry.hash)?.content,
            None => Vec::new(),
        };
        let patched = if self.config.patch.verify_context {
            apply_patch_verified(&original, section).map_err(|source| RepoError::PatchConflict {
                path: path.clone(),
                source,
            })?
        } else {
            apply_patch(&original, section)
        };

        let leaf = Leaf {
            blob: self.store.store_blob(&patched)?,
            size: patched.len() as u64,
            mod_time: Utc::now().timestamp(),
        };
        let new_root = write_blob(&self.store, root, segments, &leaf, &self.config.defaults)?;
        debug!(path = %path, hunks = section.hunks.len(), size = leaf.size, "patched file");
        Ok(new_root)
    }

    /// Store a commit for `root_tree` on top of the current version and
    /// allocate the next version. Callers hold the write lock.
    fn commit_tree(&self, root_tree: ObjectHash, author: &str, message: &str) -> RepoResult<VersionInfo> {
        let current = self.versions.get_current_version()?;
        let parent = match current {
            0 => None,
            n => Some(self.versions.get_version_info(n)?.commit_hash),
        };
        let commit = CommitObject {
            root_tree,
            parent,
            author: author.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
            version: current + 1,
        };
        let hash = self.store.store_commit(&commit)?;
        let info = self.versions.create_version(hash, message)?;
        info!(
            version = info.version,
            commit = %hash.short_hex(),
            root = %root_tree.short_hex(),
            author,
            "committed"
        );
        Ok(info)
    }

    /// Close the backend. Later operations fail.
    pub fn close(&self) -> RepoResult<()> {
        self.store.backend().close()?;
        Ok(())
    }
}

/// Validated path segments for a patch section's target file.
fn target_segments(section: &ParsedPatch) -> RepoResult<Vec<String>> {
    let invalid = |path: &str, reason: &str| RepoError::InvalidTargetPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };
    let path = section
        .target_path()
        .ok_or_else(|| invalid("", "patch does not name a target file"))?;
    if validate_path(path).is_err() {
        return Err(invalid(path, "path must be relative and stay within the repository"));
    }
    let segments = split_path(path).map_err(|_| invalid(path, "path traversal"))?;
    if segments.is_empty() {
        return Err(invalid(path, "path names the repository root"));
    }
    Ok(segments)
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
