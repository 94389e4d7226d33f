use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;
use walkdir::WalkDir;

use crate::backend::StorageBackend;
use crate::error::{StoreError, StoreResult};

const TEMP_PREFIX: &str = ".poon-tmp";

/// Filesystem-backed storage: one file per key under a root directory.
///
/// Key segments separated by `/` become nested directories, so
/// `objects/ab12...` is written to `<root>/objects/ab12...`. Writes go to a
/// temporary file in the destination directory and are renamed into place,
/// which keeps every individual `put` atomic on POSIX filesystems.
#[derive(Debug)]
pub struct DiskBackend {
    root: PathBuf,
    closed: AtomicBool,
}

impl DiskBackend {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "opened disk backend");
        Ok(Self {
            root,
            closed: AtomicBool::new(false),
        })
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Map a key to a path under the root, refusing anything that could
    /// escape it.
    fn key_path(&self, key: &str) -> StoreResult<PathBuf> {
        let invalid = |reason: &str| StoreError::InvalidKey {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        if key.is_empty() {
            return Err(invalid("empty key"));
        }
        if key.starts_with('/') {
            return Err(invalid("absolute key"));
        }
        if key.contains('\\') || key.contains('\0') {
            return Err(invalid("backslash or NUL in key"));
        }
        let mut path = self.root.clone();
        for segment in key.split('/') {
            match segment {
                "" | "." | ".." => return Err(invalid("empty or relative segment")),
                s if s.starts_with(TEMP_PREFIX) => return Err(invalid("reserved segment")),
                s => path.push(s),
            }
        }
        Ok(path)
    }

    fn not_found(key: &str, err: io::Error) -> StoreError {
        if err.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound {
                key: key.to_string(),
            }
        } else {
            StoreError::Io(err)
        }
    }

    fn relative_key(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
        Some(parts?.join("/"))
    }
}

impl StorageBackend for DiskBackend {
    fn put(&self, key: &str, data: &[u8]) -> StoreResult<()> {
        self.ensure_open()?;
        let path = self.key_path(key)?;
        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(parent)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        self.ensure_open()?;
        let path = self.key_path(key)?;
        fs::read(&path).map_err(|e| Self::not_found(key, e))
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        self.ensure_open()?;
        Ok(self.key_path(key)?.is_file())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.ensure_open()?;
        let path = self.key_path(key)?;
        fs::remove_file(&path).map_err(|e| Self::not_found(key, e))
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        self.ensure_open()?;
        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1) {
            let entry = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
                continue;
            }
            if let Some(key) = self.relative_key(entry.path()) {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn stream(&self, key: &str) -> StoreResult<Box<dyn Read + Send>> {
        self.ensure_open()?;
        let path = self.key_path(key)?;
        let file = File::open(&path).map_err(|e| Self::not_found(key, e))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        debug!(root = %self.root.display(), "closed disk backend");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn backend() -> (TempDir, DiskBackend) {
        let dir = TempDir::new().unwrap();
        let backend = DiskBackend::open(dir.path().join("store")).unwrap();
        (dir, backend)
    }

    #[test]
    fn put_get_nested_key() {
        let (_dir, backend) = backend();
        backend.put("objects/abc", b"content").unwrap();
        assert_eq!(backend.get("objects/abc").unwrap(), b"content");
        assert!(backend.root().join("objects").join("abc").is_file());
    }

    #[test]
    fn overwrite_replaces_value() {
        let (_dir, backend) = backend();
        backend.put("version/current", b"1").unwrap();
        backend.put("version/current", b"2").unwrap();
        assert_eq!(backend.get("version/current").unwrap(), b"2");
    }

    #[test]
    fn missing_key_is_not_found() {
        let (_dir, backend) = backend();
        assert!(backend.get("nope").unwrap_err().is_not_found());
        assert!(backend.delete("nope").unwrap_err().is_not_found());
        assert!(backend.stream("nope").is_err());
        assert!(!backend.exists("nope").unwrap());
    }

    #[test]
    fn rejects_escaping_keys() {
        let (_dir, backend) = backend();
        for key in ["", "/etc/passwd", "../x", "a/../../b", "a//b", "a\\b", "objects/.poon-tmp1"] {
            assert!(
                matches!(backend.put(key, b"x"), Err(StoreError::InvalidKey { .. })),
                "key {key:?} should be rejected"
            );
        }
    }

    #[test]
    fn list_by_prefix_sorted() {
        let (_dir, backend) = backend();
        backend.put("version/info/2", b"b").unwrap();
        backend.put("version/info/1", b"a").unwrap();
        backend.put("objects/ff", b"c").unwrap();
        assert_eq!(
            backend.list("version/info/").unwrap(),
            vec!["version/info/1", "version/info/2"]
        );
        assert_eq!(backend.list("").unwrap().len(), 3);
    }

    #[test]
    fn delete_removes_file() {
        let (_dir, backend) = backend();
        backend.put("k", b"v").unwrap();
        backend.delete("k").unwrap();
        assert!(!backend.exists("k").unwrap());
    }

    #[test]
    fn stream_reads_file() {
        let (_dir, backend) = backend();
        let data = vec![3u8; 100_000];
        backend.put("blob", &data).unwrap();
        let mut out = Vec::new();
        backend.stream("blob").unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn data_survives_reopen() {
        let (dir, backend) = backend();
        backend.put("objects/1", b"persisted").unwrap();
        drop(backend);
        let reopened = DiskBackend::open(dir.path().join("store")).unwrap();
        assert_eq!(reopened.get("objects/1").unwrap(), b"persisted");
    }

    #[test]
    fn closed_backend_rejects_calls() {
        let (_dir, backend) = backend();
        backend.close().unwrap();
        assert!(matches!(backend.put("k", b"v"), Err(StoreError::Closed)));
        assert!(matches!(backend.list(""), Err(StoreError::Closed)));
    }
}
