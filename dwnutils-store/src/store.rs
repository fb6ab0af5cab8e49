use std::{
    future::Future,
    pin::pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_stream::stream;
use bytes::Bytes;
use dwnutils_config::store::{Hasher, IntegrityConfig};
use futures::{stream::BoxStream, Stream, StreamExt};
use libipld::Cid;
use tokio_util::sync::CancellationToken;

use crate::{utils, Block, BlockBackend, StoreError, StoreResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// `BlockStore` is a content-addressed store of immutable blocks over a pluggable
/// [`BlockBackend`].
///
/// Blocks are addressed by their [`CID`s (Content Identifier)][cid], the fingerprint of their
/// bytes. The canonical string form of a `Cid` is the key the bytes are stored under in the
/// backend.
///
/// The store is cheap to clone and clones share the same backend and open state. It does not
/// serialize access to the backend; concurrent writes to the same `Cid` are last-write-wins.
///
/// A store must be [`open`](Self::open)ed before use. Operations on a store that is not open fail
/// with `StoreError::NotOpen`.
///
/// [cid]: https://docs.ipfs.tech/concepts/content-addressing/
#[derive(Debug, Clone)]
pub struct BlockStore<B>
where
    B: BlockBackend,
{
    /// The backend the bytes are stored in.
    backend: B,

    /// Whether the store is open. Shared between clones.
    open: Arc<AtomicBool>,

    /// The hash function used to derive new identifiers.
    hasher: Hasher,

    /// Whether bytes are hashed and checked against their identifier on `put`.
    verify_on_put: bool,

    /// Cancels in-flight backend calls when fired.
    cancel: Option<CancellationToken>,
}

/// A single operation of an atomic batch.
#[derive(Debug, Clone)]
pub enum BatchOp {
    /// Store a block.
    Put(Block),

    /// Delete the block with the given identifier.
    Delete(Cid),
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<B> BlockStore<B>
where
    B: BlockBackend,
{
    /// Creates a new `BlockStore` over `backend` with the default integrity settings.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, &IntegrityConfig::default())
    }

    /// Creates a new `BlockStore` over `backend` with the given integrity settings.
    pub fn with_config(backend: B, config: &IntegrityConfig) -> Self {
        Self {
            backend,
            open: Arc::new(AtomicBool::new(false)),
            hasher: config.hasher,
            verify_on_put: config.verify_on_put,
            cancel: None,
        }
    }

    /// Returns a clone of the store whose operations are aborted with `StoreError::Cancelled` once
    /// `token` is cancelled.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            cancel: Some(token),
            ..self.clone()
        }
    }

    /// Gets the backend of the store.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets the hash function used to derive new identifiers.
    pub fn hasher(&self) -> Hasher {
        self.hasher
    }

    /// Whether the store is open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Opens the backend and makes sure its storage structure exists.
    ///
    /// Opening an already open store is fine.
    pub async fn open(&self) -> StoreResult<()> {
        self.guard(self.backend.open()).await?;
        self.open.store(true, Ordering::Release);
        tracing::debug!("block store opened");
        Ok(())
    }

    /// Closes the backend.
    ///
    /// This is safe to call after a failed `open` and closing twice is a no-op.
    pub async fn close(&self) -> StoreResult<()> {
        let was_open = self.open.swap(false, Ordering::AcqRel);
        self.backend.close().await?;
        tracing::debug!(was_open, "block store closed");
        Ok(())
    }

    /// Stores `data` under `cid`.
    ///
    /// Writing the same bytes under the same `Cid` twice is a no-op.
    ///
    /// # Errors
    ///
    /// `StoreError::Integrity` if `data` does not hash to `cid` (when verification is on), or if
    /// different bytes are already stored under `cid`.
    pub async fn put(&self, cid: &Cid, data: impl Into<Bytes>) -> StoreResult<()> {
        self.ensure_open()?;
        let data = data.into();

        if self.verify_on_put {
            if let Err(e) = utils::verify_cid(cid, &data) {
                tracing::warn!(%cid, "rejected block whose bytes do not match its cid");
                return Err(e);
            }
        }

        let key = utils::cid_to_key(cid);
        if self.guard(self.backend.has(&key)).await? {
            let existing = self.guard(self.backend.get(&key)).await?;
            match existing {
                Some(existing) if existing == data => {
                    tracing::trace!(%cid, "block already stored");
                    return Ok(());
                }
                Some(existing) => {
                    tracing::warn!(%cid, "refusing to overwrite block with different bytes");
                    return Err(StoreError::Integrity {
                        expected: *cid,
                        actual: conflicting_cid(cid, &data, &existing),
                    });
                }
                // Deleted between the two calls.
                None => {}
            }
        }

        self.guard(self.backend.put(&key, data)).await?;
        tracing::trace!(%cid, "put block");

        Ok(())
    }

    /// Stores `block`.
    pub async fn put_block(&self, block: &Block) -> StoreResult<()> {
        self.put(block.cid(), block.data().clone()).await
    }

    /// Hashes `data` with the store's hash function, stores it as a raw block and returns its
    /// `Cid`.
    pub async fn put_raw(&self, data: impl Into<Bytes>) -> StoreResult<Cid> {
        let block = Block::new(crate::Codec::Raw, self.hasher, data);
        self.put_block(&block).await?;
        Ok(*block.cid())
    }

    /// Gets the bytes stored under `cid`.
    ///
    /// # Errors
    ///
    /// `StoreError::BlockNotFound` if nothing is stored under `cid`.
    pub async fn get(&self, cid: &Cid) -> StoreResult<Bytes> {
        self.ensure_open()?;
        let key = utils::cid_to_key(cid);

        let data = self
            .guard(self.backend.get(&key))
            .await?
            .ok_or(StoreError::BlockNotFound(*cid))?;

        tracing::trace!(%cid, len = data.len(), "got block");
        Ok(data)
    }

    /// Gets the block stored under `cid` and checks its bytes still hash to `cid`.
    pub async fn get_block(&self, cid: &Cid) -> StoreResult<Block> {
        let data = self.get(cid).await?;
        Block::from_parts(*cid, data)
    }

    /// Checks if a block is stored under `cid`, without transferring its bytes.
    pub async fn has(&self, cid: &Cid) -> StoreResult<bool> {
        self.ensure_open()?;
        let key = utils::cid_to_key(cid);
        self.guard(self.backend.has(&key)).await
    }

    /// Deletes the block stored under `cid`. Deleting an absent block succeeds.
    pub async fn delete(&self, cid: &Cid) -> StoreResult<()> {
        self.ensure_open()?;
        let key = utils::cid_to_key(cid);
        self.guard(self.backend.delete(&key)).await?;
        tracing::trace!(%cid, "deleted block");
        Ok(())
    }

    /// Deletes every block in the store. This cannot be undone.
    pub async fn clear(&self) -> StoreResult<()> {
        self.ensure_open()?;
        self.guard(self.backend.clear()).await?;
        tracing::debug!("cleared block store");
        Ok(())
    }

    /// Stores every `(Cid, Bytes)` pair of `source`, yielding one result per pair in input order.
    ///
    /// A failed pair does not stop the stream; its error is yielded in its place.
    pub fn put_many<'a, S>(&'a self, source: S) -> BoxStream<'a, StoreResult<(Cid, Bytes)>>
    where
        S: Stream<Item = (Cid, Bytes)> + Send + 'a,
    {
        let s = stream! {
            let mut source = pin!(source);
            while let Some((cid, data)) = source.next().await {
                yield self.put(&cid, data.clone()).await.map(|_| (cid, data));
            }
        };

        Box::pin(s)
    }

    /// Gets the bytes for every `Cid` of `source`, yielding one result per `Cid` in input order.
    ///
    /// A failed lookup does not stop the stream; its error is yielded in its place.
    pub fn get_many<'a, S>(&'a self, source: S) -> BoxStream<'a, StoreResult<Bytes>>
    where
        S: Stream<Item = Cid> + Send + 'a,
    {
        let s = stream! {
            let mut source = pin!(source);
            while let Some(cid) = source.next().await {
                yield self.get(&cid).await;
            }
        };

        Box::pin(s)
    }

    /// Deletes the block for every `Cid` of `source`, yielding one result per `Cid` in input order.
    ///
    /// A failed deletion does not stop the stream; its error is yielded in its place.
    pub fn delete_many<'a, S>(&'a self, source: S) -> BoxStream<'a, StoreResult<Cid>>
    where
        S: Stream<Item = Cid> + Send + 'a,
    {
        let s = stream! {
            let mut source = pin!(source);
            while let Some(cid) = source.next().await {
                yield self.delete(&cid).await.map(|_| cid);
            }
        };

        Box::pin(s)
    }

    /// Applies `ops` atomically.
    ///
    /// Not supported: always fails with `StoreError::NotImplemented`.
    pub async fn batch(&self, _ops: Vec<BatchOp>) -> StoreResult<()> {
        Err(StoreError::NotImplemented("batch"))
    }

    /// Streams the blocks whose keys start with `prefix`.
    ///
    /// Not supported: always fails with `StoreError::NotImplemented`.
    pub async fn query(&self, _prefix: &str) -> StoreResult<BoxStream<'_, StoreResult<Block>>> {
        Err(StoreError::NotImplemented("query"))
    }

    /// Streams the identifiers whose keys start with `prefix`.
    ///
    /// Not supported: always fails with `StoreError::NotImplemented`.
    pub async fn query_keys(&self, _prefix: &str) -> StoreResult<BoxStream<'_, StoreResult<Cid>>> {
        Err(StoreError::NotImplemented("query_keys"))
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if !self.is_open() {
            return Err(StoreError::NotOpen);
        }

        Ok(())
    }

    /// Runs a backend call, racing it against the cancellation token if there is one.
    async fn guard<T>(&self, fut: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        let Some(token) = &self.cancel else {
            return fut.await;
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(StoreError::Cancelled),
            result = fut => result,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Picks the identifier that disagrees with `cid`: the one of `data` if it does not hash to `cid`,
/// otherwise the one of the bytes already stored.
fn conflicting_cid(cid: &Cid, data: &[u8], existing: &[u8]) -> Cid {
    match utils::verify_cid(cid, data) {
        Err(StoreError::Integrity { actual, .. }) => actual,
        Err(_) => *cid,
        Ok(()) => match utils::verify_cid(cid, existing) {
            Err(StoreError::Integrity { actual, .. }) => actual,
            _ => *cid,
        },
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::stream;

    use crate::{Codec, MemoryBackend};

    use super::{fixtures::*, *};

    #[test_log::test(tokio::test)]
    async fn test_block_store_conformance() -> anyhow::Result<()> {
        conformance(MemoryBackend::default()).await
    }

    #[tokio::test]
    async fn test_block_store_requires_open() -> anyhow::Result<()> {
        let store = BlockStore::new(MemoryBackend::default());
        let cid = utils::raw_cid(b"hello");

        assert_eq!(store.get(&cid).await, Err(StoreError::NotOpen));
        assert_eq!(store.put(&cid, "hello").await, Err(StoreError::NotOpen));

        store.open().await?;
        store.open().await?;
        store.put(&cid, "hello").await?;

        store.close().await?;
        store.close().await?;
        assert!(!store.is_open());
        assert_eq!(store.has(&cid).await, Err(StoreError::NotOpen));

        Ok(())
    }

    #[tokio::test]
    async fn test_block_store_close_after_failed_open() -> anyhow::Result<()> {
        let store = BlockStore::new(FaultyBackend::unreachable());

        assert!(matches!(
            store.open().await,
            Err(StoreError::Connection(_))
        ));
        assert!(!store.is_open());

        store.close().await?;
        store.close().await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_block_store_rejects_mismatched_bytes() -> anyhow::Result<()> {
        let store = BlockStore::new(MemoryBackend::default());
        store.open().await?;

        let cid = utils::raw_cid(b"hello");
        let result = store.put(&cid, "goodbye").await;

        assert_eq!(
            result,
            Err(StoreError::Integrity {
                expected: cid,
                actual: utils::raw_cid(b"goodbye"),
            })
        );
        assert!(!store.has(&cid).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_block_store_detects_overwrite_without_verification() -> anyhow::Result<()> {
        let config = IntegrityConfig::builder().verify_on_put(false).build();
        let store = BlockStore::with_config(MemoryBackend::default(), &config);
        store.open().await?;

        let cid = utils::raw_cid(b"hello");
        store.put(&cid, "hello").await?;

        assert!(matches!(
            store.put(&cid, "goodbye").await,
            Err(StoreError::Integrity { expected, actual })
                if expected == cid && actual == utils::raw_cid(b"goodbye")
        ));
        assert_eq!(store.get(&cid).await?, Bytes::from("hello"));

        Ok(())
    }

    #[tokio::test]
    async fn test_block_store_get_block_detects_corruption() -> anyhow::Result<()> {
        let backend = MemoryBackend::default();
        let store = BlockStore::new(backend.clone());
        store.open().await?;

        let cid = store.put_raw("hello").await?;
        backend
            .put(&utils::cid_to_key(&cid), Bytes::from("tampered"))
            .await?;

        assert!(matches!(
            store.get_block(&cid).await,
            Err(StoreError::Integrity { .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_block_store_put_raw_uses_configured_hasher() -> anyhow::Result<()> {
        let config = IntegrityConfig::builder().hasher(Hasher::Sha2_256).build();
        let store = BlockStore::with_config(MemoryBackend::default(), &config);
        store.open().await?;

        let cid = store.put_raw("hello").await?;

        assert_eq!(cid, utils::make_cid(Codec::Raw, Hasher::Sha2_256, b"hello"));
        assert_eq!(store.get_block(&cid).await?.data(), &Bytes::from("hello"));

        Ok(())
    }

    #[tokio::test]
    async fn test_block_store_put_many_reports_each_failure() -> anyhow::Result<()> {
        let store = BlockStore::new(FaultyBackend::failing_puts_for(b"bad"));
        store.open().await?;

        let blocks = [Block::raw("one"), Block::raw("bad"), Block::raw("three")];
        let mut input: Vec<(Cid, Bytes)> =
            blocks.iter().cloned().map(Block::into_parts).collect();
        // Misfiled: bytes do not match the cid.
        input.push((*blocks[0].cid(), Bytes::from("four")));

        let results: Vec<_> = store.put_many(stream::iter(input)).collect().await;

        assert_eq!(results.len(), 4);
        assert_eq!(results[0], Ok(blocks[0].clone().into_parts()));
        assert!(matches!(results[1], Err(StoreError::Backend(_))));
        assert_eq!(results[2], Ok(blocks[2].clone().into_parts()));
        assert!(matches!(results[3], Err(StoreError::Integrity { .. })));

        assert!(store.has(blocks[0].cid()).await?);
        assert!(!store.has(blocks[1].cid()).await?);
        assert!(store.has(blocks[2].cid()).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_block_store_get_many_and_delete_many() -> anyhow::Result<()> {
        let store = BlockStore::new(MemoryBackend::default());
        store.open().await?;

        let a = store.put_raw("a").await?;
        let b = store.put_raw("b").await?;
        let missing = utils::raw_cid(b"missing");

        let got: Vec<_> = store
            .get_many(stream::iter([b, missing, a]))
            .collect()
            .await;

        assert_eq!(
            got,
            vec![
                Ok(Bytes::from("b")),
                Err(StoreError::BlockNotFound(missing)),
                Ok(Bytes::from("a")),
            ]
        );

        let deleted: Vec<_> = store
            .delete_many(stream::iter([a, missing, b]))
            .collect()
            .await;

        assert_eq!(deleted, vec![Ok(a), Ok(missing), Ok(b)]);
        assert!(!store.has(&a).await?);
        assert!(!store.has(&b).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_block_store_cancellation() -> anyhow::Result<()> {
        let store = BlockStore::new(FaultyBackend::hanging());
        store.open().await?;

        let token = CancellationToken::new();
        let cancellable = store.with_cancellation(token.clone());
        let cid = utils::raw_cid(b"hello");

        let handle = tokio::spawn({
            let cancellable = cancellable.clone();
            async move { cancellable.get(&cid).await }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        assert_eq!(handle.await?, Err(StoreError::Cancelled));

        // Every remaining item reports the cancellation.
        let results: Vec<_> = cancellable
            .get_many(stream::iter([cid, cid, cid]))
            .collect()
            .await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r == &Err(StoreError::Cancelled)));

        Ok(())
    }

    #[tokio::test]
    async fn test_block_store_unsupported_operations() -> anyhow::Result<()> {
        let store = BlockStore::new(MemoryBackend::default());
        store.open().await?;

        assert_eq!(
            store.batch(vec![BatchOp::Put(Block::raw("x"))]).await,
            Err(StoreError::NotImplemented("batch"))
        );
        assert!(matches!(
            store.query("").await,
            Err(StoreError::NotImplemented("query"))
        ));
        assert!(matches!(
            store.query_keys("").await,
            Err(StoreError::NotImplemented("query_keys"))
        ));

        Ok(())
    }

    #[test]
    fn test_error_retryability() {
        assert!(StoreError::backend(anyhow::anyhow!("timeout")).is_retryable());
        assert!(StoreError::connection(anyhow::anyhow!("refused")).is_retryable());
        assert!(!StoreError::Cancelled.is_retryable());
        assert!(!StoreError::BlockNotFound(utils::raw_cid(b"x")).is_retryable());
    }
}
