use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use poon_store::{StorageBackend, StoreError};
use poon_types::ObjectHash;
use tracing::{debug, info, warn};

use crate::error::{VersionError, VersionResult};
use crate::types::VersionInfo;

const CURRENT_KEY: &str = "version/current";
const INFO_PREFIX: &str = "version/info/";
const HASH_PREFIX: &str = "version/hash/";

fn info_key(version: i64) -> String {
    format!("{INFO_PREFIX}{version}")
}

fn hash_key(commit: &ObjectHash) -> String {
    format!("{HASH_PREFIX}{commit}")
}

/// Maps version numbers to commits on top of a [`StorageBackend`].
///
/// Allocation and deletion are serialized by an internal lock, and the
/// three records of a new version are written with a single
/// [`put_batch`](StorageBackend::put_batch) so backends that support atomic
/// batches never expose a half-written version.
pub struct VersionManager {
    backend: Arc<dyn StorageBackend>,
    write_lock: Mutex<()>,
}

impl VersionManager {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> VersionResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")).into())
    }

    fn parse_number(key: &str, data: &[u8]) -> VersionResult<i64> {
        std::str::from_utf8(data)
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .ok_or_else(|| VersionError::CorruptRecord {
                key: key.to_string(),
                reason: "not a decimal version number".to_string(),
            })
    }

    /// Highest allocated version, or 0 for an empty repository.
    pub fn get_current_version(&self) -> VersionResult<i64> {
        match self.backend.get(CURRENT_KEY) {
            Ok(data) => Self::parse_number(CURRENT_KEY, &data),
            Err(StoreError::NotFound { .. }) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_version_info(&self, version: i64) -> VersionResult<VersionInfo> {
        let key = info_key(version);
        let data = self.backend.get(&key).map_err(|e| match e {
            StoreError::NotFound { .. } => VersionError::VersionNotFound(version),
            other => other.into(),
        })?;
        serde_json::from_slice(&data).map_err(|e| VersionError::CorruptRecord {
            key,
            reason: e.to_string(),
        })
    }

    /// Info for the current version. Fails with `NoVersions` when empty.
    pub fn get_latest_version_info(&self) -> VersionResult<VersionInfo> {
        match self.get_current_version()? {
            0 => Err(VersionError::NoVersions),
            current => self.get_version_info(current),
        }
    }

    /// Allocate the next version for `commit_hash`.
    pub fn create_version(&self, commit_hash: ObjectHash, message: &str) -> VersionResult<VersionInfo> {
        let _guard = self.lock()?;
        let next = self.get_current_version()? + 1;
        let info = VersionInfo {
            version: next,
            commit_hash,
            timestamp: Utc::now(),
            message: message.to_string(),
        };
        let encoded = serde_json::to_vec(&info).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let number = next.to_string().into_bytes();

        self.backend.put_batch(&[
            (info_key(next), encoded),
            (CURRENT_KEY.to_string(), number.clone()),
            (hash_key(&commit_hash), number),
        ])?;

        info!(version = next, commit = %commit_hash.short_hex(), "created version");
        Ok(info)
    }

    /// Versions newest-first. A `limit` of 0 returns all of them.
    ///
    /// Records that cannot be decoded are skipped.
    pub fn list_versions(&self, limit: usize) -> VersionResult<Vec<VersionInfo>> {
        let mut versions: Vec<i64> = self
            .backend
            .list(INFO_PREFIX)?
            .iter()
            .filter_map(|key| key[INFO_PREFIX.len()..].parse::<i64>().ok())
            .collect();
        versions.sort_unstable_by(|a, b| b.cmp(a));
        if limit > 0 {
            versions.truncate(limit);
        }

        let mut result = Vec::with_capacity(versions.len());
        for version in versions {
            match self.get_version_info(version) {
                Ok(info) => result.push(info),
                Err(e) => warn!(version, error = %e, "skipping unreadable version record"),
            }
        }
        Ok(result)
    }

    /// Version number allocated for `commit_hash`.
    pub fn get_version_by_commit(&self, commit_hash: &ObjectHash) -> VersionResult<i64> {
        let key = hash_key(commit_hash);
        let data = self.backend.get(&key).map_err(|e| match e {
            StoreError::NotFound { .. } => VersionError::CommitNotFound(*commit_hash),
            other => other.into(),
        })?;
        Self::parse_number(&key, &data)
    }

    /// Remove a version's records.
    ///
    /// If `version` is the current one, current moves back to `version - 1`.
    /// The commit objects themselves are left in place.
    pub fn delete_version(&self, version: i64) -> VersionResult<()> {
        let _guard = self.lock()?;
        let info = self.get_version_info(version)?;

        self.backend.delete(&info_key(version))?;
        match self.backend.delete(&hash_key(&info.commit_hash)) {
            Ok(()) | Err(StoreError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }

        if self.get_current_version()? == version {
            let previous = (version - 1).max(0);
            self.backend.put(CURRENT_KEY, previous.to_string().as_bytes())?;
            debug!(from = version, to = previous, "rolled back current version");
        }
        info!(version, commit = %info.commit_hash.short_hex(), "deleted version");
        Ok(())
    }
}

impl std::fmt::Debug for VersionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionManager").finish_non_exhaustive()
    }
}
