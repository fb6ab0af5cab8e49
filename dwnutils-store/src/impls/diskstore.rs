use std::{
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use bytes::Bytes;
use dwnutils_config::store::DiskConfig;
use tokio::{fs, task};

use crate::{BlockBackend, StoreError, StoreResult};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The number of trailing key characters used to name the shard directory of a block.
const SHARD_LEN: usize = 2;

/// The suffix of the temporary files a block is written to before it is moved into place.
const TMP_SUFFIX: &str = ".tmp";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A backend that stores each block as a file on disk.
///
/// Blocks are laid out as `<base_dir>/<namespace>/<shard>/<key>`, where `shard` is made of the
/// last characters of the key. Writes land in a temporary file that is then renamed into place,
/// so a reader never sees a partially written block.
#[derive(Debug, Clone)]
pub struct DiskBackend {
    inner: Arc<DiskBackendInner>,
}

#[derive(Debug)]
struct DiskBackendInner {
    /// The directory under which the namespace directory is created.
    base_dir: PathBuf,

    /// The directory the blocks are stored in.
    blocks_dir: PathBuf,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl DiskBackend {
    /// Creates a new `DiskBackend` storing blocks in `base_dir/namespace`.
    pub fn new(base_dir: impl Into<PathBuf>, namespace: impl AsRef<Path>) -> Self {
        let base_dir = base_dir.into();
        let blocks_dir = base_dir.join(namespace);
        Self {
            inner: Arc::new(DiskBackendInner {
                base_dir,
                blocks_dir,
            }),
        }
    }

    /// Creates a new `DiskBackend` from its configuration.
    pub fn from_config(config: &DiskConfig) -> Self {
        Self::new(&config.base_dir, &config.namespace)
    }

    /// Gets the directory the blocks are stored in.
    pub fn blocks_dir(&self) -> &Path {
        &self.inner.blocks_dir
    }

    fn shard_dir(&self, key: &str) -> StoreResult<PathBuf> {
        if key.len() < SHARD_LEN || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(StoreError::backend(anyhow::anyhow!(
                "invalid block key: {key:?}"
            )));
        }

        Ok(self.inner.blocks_dir.join(&key[key.len() - SHARD_LEN..]))
    }

    fn block_path(&self, key: &str) -> StoreResult<PathBuf> {
        Ok(self.shard_dir(key)?.join(key))
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl BlockBackend for DiskBackend {
    async fn open(&self) -> StoreResult<()> {
        match fs::metadata(&self.inner.base_dir).await {
            Ok(metadata) if !metadata.is_dir() => {
                return Err(StoreError::connection(anyhow::anyhow!(
                    "not a directory: {}",
                    self.inner.base_dir.display()
                )));
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::connection(e)),
        }

        fs::create_dir_all(&self.inner.blocks_dir)
            .await
            .map_err(StoreError::provisioning)?;

        tracing::debug!(dir = %self.inner.blocks_dir.display(), "opened disk backend");
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        // Files are opened per operation, nothing is held between calls.
        Ok(())
    }

    async fn put(&self, key: &str, bytes: Bytes) -> StoreResult<()> {
        let shard_dir = self.shard_dir(key)?;
        fs::create_dir_all(&shard_dir)
            .await
            .map_err(StoreError::backend)?;

        let prefix = format!(".{key}.");
        let path = shard_dir.join(key);

        // The write runs to completion even when the caller stops waiting for it. The temporary
        // file is removed when it is dropped without having been persisted.
        task::spawn_blocking(move || {
            let mut file = tempfile::Builder::new()
                .prefix(&prefix)
                .suffix(TMP_SUFFIX)
                .tempfile_in(&shard_dir)?;
            file.write_all(&bytes)?;
            file.persist(&path)?;
            Ok::<_, std::io::Error>(())
        })
        .await
        .map_err(StoreError::backend)?
        .map_err(StoreError::backend)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        match fs::read(self.block_path(key)?).await {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::backend(e)),
        }
    }

    async fn has(&self, key: &str) -> StoreResult<bool> {
        match fs::metadata(self.block_path(key)?).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::backend(e)),
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.block_path(key)?).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(StoreError::backend(e)),
            _ => Ok(()),
        }
    }

    async fn clear(&self) -> StoreResult<()> {
        match fs::remove_dir_all(&self.inner.blocks_dir).await {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(StoreError::backend(e)),
            _ => {}
        }

        fs::create_dir_all(&self.inner.blocks_dir)
            .await
            .map_err(StoreError::backend)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
