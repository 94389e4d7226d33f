use std::io::Read;

use crate::error::StoreResult;

/// Low-level key/value persistence.
///
/// Keys are opaque strings; the content store and version manager impose the
/// only structure (`objects/<hash>`, `version/current`, `version/info/<n>`,
/// `version/hash/<hash>`). All implementations must satisfy these rules:
/// - Each individual operation is atomic with respect to concurrent callers.
/// - Bytes are copied in and out; callers can never alias stored state.
/// - A missing key is reported as [`StoreError::NotFound`](crate::StoreError::NotFound).
pub trait StorageBackend: Send + Sync {
    /// Store `data` under `key`, replacing any previous value.
    fn put(&self, key: &str, data: &[u8]) -> StoreResult<()>;

    /// Read the value under `key`.
    fn get(&self, key: &str) -> StoreResult<Vec<u8>>;

    /// Check whether `key` holds a value.
    fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Remove `key`. Fails with `NotFound` if it was absent.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// All keys starting with `prefix`, sorted.
    fn list(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Open a reader over the value under `key`, for values too large to
    /// buffer comfortably.
    fn stream(&self, key: &str) -> StoreResult<Box<dyn Read + Send>>;

    /// Release resources. Later operations fail with `Closed`.
    fn close(&self) -> StoreResult<()>;

    /// Store several values.
    ///
    /// Default implementation calls `put()` for each entry and is therefore
    /// not atomic. Backends that can apply the whole batch at once override
    /// this.
    fn put_batch(&self, entries: &[(String, Vec<u8>)]) -> StoreResult<()> {
        entries.iter().try_for_each(|(key, data)| self.put(key, data))
    }
}
