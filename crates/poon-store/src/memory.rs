use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::backend::StorageBackend;
use crate::error::{StoreError, StoreResult};

/// In-memory, HashMap-based storage backend.
///
/// Intended for tests and embedding. All values are held behind a single
/// `RwLock`; each operation takes the lock once, so individual operations
/// are atomic but sequences of them are not. Values are copied on both
/// `put` and `get`.
pub struct MemoryBackend {
    data: RwLock<HashMap<String, Vec<u8>>>,
    closed: AtomicBool,
}

impl MemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.read_map().map(|map| map.len()).unwrap_or(0)
    }

    /// Returns `true` if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes across all stored values.
    pub fn total_bytes(&self) -> u64 {
        self.read_map()
            .map(|map| map.values().map(|v| v.len() as u64).sum())
            .unwrap_or(0)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn read_map(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<String, Vec<u8>>>> {
        self.data
            .read()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    fn write_map(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<String, Vec<u8>>>> {
        self.data
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for MemoryBackend {
    fn put(&self, key: &str, data: &[u8]) -> StoreResult<()> {
        self.ensure_open()?;
        self.write_map()?.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        self.ensure_open()?;
        self.read_map()?
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        self.ensure_open()?;
        Ok(self.read_map()?.contains_key(key))
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.ensure_open()?;
        match self.write_map()?.remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                key: key.to_string(),
            }),
        }
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        self.ensure_open()?;
        let map = self.read_map()?;
        let mut keys: Vec<String> = map
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn stream(&self, key: &str) -> StoreResult<Box<dyn Read + Send>> {
        let data = self.get(key)?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        self.write_map()?.clear();
        Ok(())
    }

    /// Applies the whole batch under one write lock.
    fn put_batch(&self, entries: &[(String, Vec<u8>)]) -> StoreResult<()> {
        self.ensure_open()?;
        let mut map = self.write_map()?;
        for (key, data) in entries {
            map.insert(key.clone(), data.clone());
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("key_count", &self.len())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn put_and_get() {
        let backend = MemoryBackend::new();
        backend.put("test-key", b"test data").unwrap();
        assert_eq!(backend.get("test-key").unwrap(), b"test data");
    }

    #[test]
    fn get_missing_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend.get("missing").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { ref key } if key == "missing"));
    }

    #[test]
    fn put_overwrites() {
        let backend = MemoryBackend::new();
        backend.put("k", b"one").unwrap();
        backend.put("k", b"two").unwrap();
        assert_eq!(backend.get("k").unwrap(), b"two");
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn returned_bytes_do_not_alias_storage() {
        let backend = MemoryBackend::new();
        let mut input = b"original".to_vec();
        backend.put("k", &input).unwrap();
        input[0] = b'X';

        let mut out = backend.get("k").unwrap();
        out[1] = b'Y';
        assert_eq!(backend.get("k").unwrap(), b"original");
    }

    #[test]
    fn exists_tracks_lifecycle() {
        let backend = MemoryBackend::new();
        assert!(!backend.exists("k").unwrap());
        backend.put("k", b"v").unwrap();
        assert!(backend.exists("k").unwrap());
        backend.delete("k").unwrap();
        assert!(!backend.exists("k").unwrap());
    }

    #[test]
    fn delete_missing_is_not_found() {
        let backend = MemoryBackend::new();
        assert!(backend.delete("never-written").unwrap_err().is_not_found());
    }

    #[test]
    fn list_filters_by_prefix_and_sorts() {
        let backend = MemoryBackend::new();
        for key in ["list-test/key3", "list-test/key1", "other-key", "list-test/key2"] {
            backend.put(key, b"data").unwrap();
        }
        assert_eq!(
            backend.list("list-test/").unwrap(),
            vec!["list-test/key1", "list-test/key2", "list-test/key3"]
        );
        assert_eq!(backend.list("").unwrap().len(), 4);
    }

    #[test]
    fn stream_reads_value() {
        let backend = MemoryBackend::new();
        backend.put("big", &vec![7u8; 10_000]).unwrap();
        let mut out = Vec::new();
        backend.stream("big").unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(out.len(), 10_000);
        assert!(backend.stream("absent").is_err());
    }

    #[test]
    fn put_batch_writes_everything() {
        let backend = MemoryBackend::new();
        backend
            .put_batch(&[
                ("a".to_string(), b"1".to_vec()),
                ("b".to_string(), b"2".to_vec()),
            ])
            .unwrap();
        assert_eq!(backend.get("a").unwrap(), b"1");
        assert_eq!(backend.get("b").unwrap(), b"2");
    }

    #[test]
    fn close_clears_and_rejects_further_use() {
        let backend = MemoryBackend::new();
        backend.put("k", b"v").unwrap();
        backend.close().unwrap();
        assert!(backend.is_empty());
        assert!(matches!(backend.get("k"), Err(StoreError::Closed)));
        assert!(matches!(backend.put("k", b"v"), Err(StoreError::Closed)));
    }

    #[test]
    fn total_bytes_sums_values() {
        let backend = MemoryBackend::new();
        backend.put("a", b"12345").unwrap();
        backend.put("b", b"123456789").unwrap();
        assert_eq!(backend.total_bytes(), 14);
    }

    #[test]
    fn concurrent_writers_and_readers() {
        let backend = Arc::new(MemoryBackend::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let backend = Arc::clone(&backend);
                thread::spawn(move || {
                    let key = format!("key-{i}");
                    backend.put(&key, key.as_bytes()).unwrap();
                    assert_eq!(backend.get(&key).unwrap(), key.as_bytes());
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
        assert_eq!(backend.len(), 8);
    }

    #[test]
    fn debug_format() {
        let backend = MemoryBackend::new();
        backend.put("x", b"y").unwrap();
        let debug = format!("{backend:?}");
        assert!(debug.contains("MemoryBackend"));
        assert!(debug.contains("key_count"));
    }
}
