use crate::error::StoreError;

/// Ascending `(key, raw value)` pairs produced by [`StorageEngine::scan`].
pub type ScanIter<'a> =
    Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>), StoreError>> + Send + 'a>;

/// A local ordered key-value store.
///
/// Calls are blocking. Async callers go through `tokio::task::spawn_blocking`.
/// Implementations must be safe under concurrent point operations without
/// any external locking.
pub trait StorageEngine: Send + Sync + 'static {
    /// Raw bytes stored under `key`, `None` if the key was never written or
    /// has been physically removed.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Insert or overwrite.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Physical removal. The replicated path never calls this; it writes
    /// tombstones through [`StorageEngine::put`] instead.
    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// Keys in `[from, to)` in ascending unsigned byte order; `to == None`
    /// scans to the end. Values are returned exactly as stored, with no
    /// tombstone filtering.
    fn scan<'a>(&'a self, from: &[u8], to: Option<&[u8]>) -> Result<ScanIter<'a>, StoreError>;
}
