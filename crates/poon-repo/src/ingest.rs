//! Snapshotting an external directory into trees and blobs.

use std::fs::{self, Metadata};
use std::path::Path;

use chrono::{DateTime, Utc};
use poon_store::{ContentStore, TreeEntry, TreeObject};
use poon_types::ObjectHash;
use tracing::{debug, warn};

use crate::config::RepositoryConfig;
use crate::error::{RepoError, RepoResult};

/// Counters gathered while snapshotting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
    pub skipped: usize,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> RepoError + '_ {
    move |source| RepoError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(unix)]
fn mode_of(meta: &Metadata, _fallback: u32) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn mode_of(_meta: &Metadata, fallback: u32) -> u32 {
    fallback
}

fn mod_time_of(meta: &Metadata) -> i64 {
    meta.modified()
        .map(|t| DateTime::<Utc>::from(t).timestamp())
        .unwrap_or(0)
}

/// Store every file under `dir` as a blob and every directory as a tree,
/// bottom-up. Returns the hash of the tree for `dir` itself.
///
/// Children are visited in name order. Names listed in
/// `config.ingest.skip_names`, names that are not valid UTF-8, symbolic
/// links, and special files are skipped.
pub(crate) fn snapshot_dir(
    store: &ContentStore,
    dir: &Path,
    config: &RepositoryConfig,
    stats: &mut IngestStats,
) -> RepoResult<ObjectHash> {
    let mut children = fs::read_dir(dir)
        .map_err(io_err(dir))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err(dir))?;
    children.sort_by_key(|child| child.file_name());

    let mut entries = Vec::with_capacity(children.len());
    for child in children {
        let path = child.path();
        let Ok(name) = child.file_name().into_string() else {
            warn!(path = %path.display(), "skipping entry with non UTF-8 name");
            stats.skipped += 1;
            continue;
        };
        if config.ingest.skip_names.iter().any(|skip| *skip == name) {
            debug!(path = %path.display(), "skipping configured name");
            stats.skipped += 1;
            continue;
        }

        let file_type = child.file_type().map_err(io_err(&path))?;
        if file_type.is_symlink() {
            warn!(path = %path.display(), "skipping symbolic link");
            stats.skipped += 1;
            continue;
        }
        let meta = child.metadata().map_err(io_err(&path))?;

        if meta.is_dir() {
            let subtree = snapshot_dir(store, &path, config, stats)?;
            stats.directories += 1;
            entries.push(TreeEntry::tree(
                name,
                subtree,
                mode_of(&meta, config.defaults.dir_mode),
                mod_time_of(&meta),
            ));
        } else if meta.is_file() {
            let content = fs::read(&path).map_err(io_err(&path))?;
            let blob = store.store_blob(&content)?;
            stats.files += 1;
            stats.bytes += content.len() as u64;
            entries.push(TreeEntry::blob(
                name,
                blob,
                content.len() as u64,
                mode_of(&meta, config.defaults.file_mode),
                mod_time_of(&meta),
            ));
        } else {
            warn!(path = %path.display(), "skipping special file");
            stats.skipped += 1;
        }
    }

    Ok(store.store_tree(&TreeObject::new(entries))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use poon_store::MemoryBackend;
    use poon_types::ObjectType;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store() -> ContentStore {
        ContentStore::new(Arc::new(MemoryBackend::new()))
    }

    #[test]
    fn snapshots_nested_directories() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("README.md"), "hello\n").unwrap();
        fs::create_dir_all(dir.path().join("src/bin")).unwrap();
        fs::write(dir.path().join("src/lib.rs"), "pub fn f() {}\n").unwrap();
        fs::write(dir.path().join("src/bin/main.rs"), "fn main() {}\n").unwrap();

        let store = store();
        let mut stats = IngestStats::default();
        let root = snapshot_dir(&store, dir.path(), &RepositoryConfig::default(), &mut stats).unwrap();

        assert_eq!(stats.files, 3);
        assert_eq!(stats.directories, 2);
        let tree = store.get_tree(&root).unwrap();
        let names: Vec<_> = tree.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["README.md", "src"]);
        let readme = tree.get("README.md").unwrap();
        assert_eq!(readme.entry_type, ObjectType::Blob);
        assert_eq!(readme.size, 6);
        assert_eq!(store.get_blob(&readme.hash).unwrap().content, b"hello\n");
        assert!(tree.get("src").unwrap().is_tree());
    }

    #[test]
    fn skips_configured_names() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
        fs::write(dir.path().join("kept.txt"), "x").unwrap();

        let store = store();
        let mut stats = IngestStats::default();
        let root = snapshot_dir(&store, dir.path(), &RepositoryConfig::default(), &mut stats).unwrap();
        let tree = store.get_tree(&root).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn empty_directory_is_empty_tree() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        let store = store();
        let mut stats = IngestStats::default();
        let root = snapshot_dir(&store, dir.path(), &RepositoryConfig::default(), &mut stats).unwrap();
        let empty = store.get_tree(&root).unwrap().get("empty").cloned().unwrap();
        assert!(store.get_tree(&empty.hash).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn records_permission_bits() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("run.sh");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let store = store();
        let mut stats = IngestStats::default();
        let root = snapshot_dir(&store, dir.path(), &RepositoryConfig::default(), &mut stats).unwrap();
        assert_eq!(store.get_tree(&root).unwrap().get("run.sh").unwrap().mode, 0o755);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let store = store();
        let mut stats = IngestStats::default();
        let err = snapshot_dir(&store, &dir.path().join("absent"), &RepositoryConfig::default(), &mut stats)
            .unwrap_err();
        assert!(matches!(err, RepoError::Io { .. }));
    }
}
