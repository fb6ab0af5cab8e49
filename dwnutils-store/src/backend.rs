use std::future::Future;

use bytes::Bytes;

use crate::StoreResult;

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// `BlockBackend` is the raw persistence capability a [`BlockStore`][crate::BlockStore]
/// delegates to.
///
/// A backend knows nothing about content addressing. It stores opaque bytes under string keys,
/// which are the canonical string forms of the block identifiers. Hash checks, not-found mapping
/// and cancellation are handled by the store on top of it.
///
/// ## Important
///
/// Like the stores built on them, backends are expected to implement `Clone` with inexpensive
/// cloning semantics, i.e. clones share the same underlying handle. Implementations must be safe
/// to call concurrently for different keys.
pub trait BlockBackend: Clone + Send + Sync {
    /// Establishes the connection and makes sure the storage structure exists.
    ///
    /// Must be idempotent.
    ///
    /// # Errors
    ///
    /// `StoreError::Connection` if the backing store cannot be reached and
    /// `StoreError::Provisioning` if the storage structure cannot be created.
    fn open(&self) -> impl Future<Output = StoreResult<()>> + Send;

    /// Releases held resources. Must be safe to call after a failed `open` and more than once.
    fn close(&self) -> impl Future<Output = StoreResult<()>> + Send;

    /// Writes `bytes` under `key`, replacing any previous value.
    fn put(&self, key: &str, bytes: Bytes) -> impl Future<Output = StoreResult<()>> + Send;

    /// Reads the bytes stored under `key`, `None` if there are none.
    fn get(&self, key: &str) -> impl Future<Output = StoreResult<Option<Bytes>>> + Send;

    /// Checks whether `key` is present without transferring its bytes.
    fn has(&self, key: &str) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Removes `key`. Removing an absent key succeeds.
    fn delete(&self, key: &str) -> impl Future<Output = StoreResult<()>> + Send;

    /// Removes every key.
    fn clear(&self) -> impl Future<Output = StoreResult<()>> + Send;
}
