use chrono::{DateTime, Utc};
use poon_types::ObjectHash;

use crate::error::RepoResult;
use crate::path::split_path;
use crate::repository::Repository;
use crate::tree::find_blob;

/// How a file changed at a version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Modified => write!(f, "modified"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

/// One version at which a file's content changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileChange {
    pub version: i64,
    pub commit_hash: ObjectHash,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub kind: ChangeKind,
    /// Blob after the change; `None` when the file was removed.
    pub blob: Option<ObjectHash>,
}

impl Repository {
    /// Versions at which the file at `path` was added, modified, or
    /// removed, newest first. A `limit` of 0 returns every change.
    ///
    /// Each version is compared with the next older surviving version, so
    /// versions removed by rollback are not part of the history.
    pub fn file_history(&self, path: &str, limit: usize) -> RepoResult<Vec<FileChange>> {
        let segments = split_path(path)?;
        let versions = self.list_versions(0)?;

        let mut states = Vec::with_capacity(versions.len());
        for info in &versions {
            let commit = self.store().get_commit(&info.commit_hash)?;
            let blob = find_blob(self.store(), &commit.root_tree, &segments)?.map(|e| e.hash);
            states.push(blob);
        }

        let mut changes = Vec::new();
        for (idx, info) in versions.iter().enumerate() {
            let current = states[idx];
            let older = states.get(idx + 1).copied().flatten();
            let kind = match (older, current) {
                (None, Some(_)) => ChangeKind::Added,
                (Some(_), None) => ChangeKind::Removed,
                (Some(a), Some(b)) if a != b => ChangeKind::Modified,
                _ => continue,
            };
            changes.push(FileChange {
                version: info.version,
                commit_hash: info.commit_hash,
                timestamp: info.timestamp,
                message: info.message.clone(),
                kind,
                blob: current,
            });
            if limit > 0 && changes.len() == limit {
                break;
            }
        }
        Ok(changes)
    }
}
