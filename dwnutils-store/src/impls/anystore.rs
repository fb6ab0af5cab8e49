use bytes::Bytes;
use dwnutils_config::store::{BackendConfig, StoreConfig};

use crate::{
    BlockBackend, BlockStore, DiskBackend, MemoryBackend, StoreError, StoreResult, TableBackend,
    TableClient,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A backend chosen from a [`BackendConfig`] when the store is constructed.
#[derive(Debug, Clone)]
pub enum AnyBackend<C>
where
    C: TableClient,
{
    /// See [`MemoryBackend`].
    Memory(MemoryBackend),

    /// See [`DiskBackend`].
    Disk(DiskBackend),

    /// See [`TableBackend`].
    Table(TableBackend<C>),
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<C> AnyBackend<C>
where
    C: TableClient,
{
    /// Creates the backend described by `config`.
    ///
    /// A table backend needs a `client`; `None` is fine for the other kinds.
    pub fn from_config(config: &BackendConfig, client: Option<C>) -> StoreResult<Self> {
        Ok(match config {
            BackendConfig::Memory => AnyBackend::Memory(MemoryBackend::new()),
            BackendConfig::Disk(config) => AnyBackend::Disk(DiskBackend::from_config(config)),
            BackendConfig::Table(config) => {
                let client = client.ok_or_else(|| {
                    StoreError::custom(anyhow::anyhow!(
                        "a table backend is configured but no table client was given"
                    ))
                })?;

                AnyBackend::Table(TableBackend::from_config(client, config))
            }
        })
    }
}

impl<C> BlockStore<AnyBackend<C>>
where
    C: TableClient,
{
    /// Creates a store over the backend and with the integrity settings described by `config`.
    pub fn from_config(config: &StoreConfig, client: Option<C>) -> StoreResult<Self> {
        let backend = AnyBackend::from_config(&config.backend, client)?;
        Ok(Self::with_config(backend, &config.integrity))
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl<C> BlockBackend for AnyBackend<C>
where
    C: TableClient,
{
    async fn open(&self) -> StoreResult<()> {
        match self {
            AnyBackend::Memory(b) => b.open().await,
            AnyBackend::Disk(b) => b.open().await,
            AnyBackend::Table(b) => b.open().await,
        }
    }

    async fn close(&self) -> StoreResult<()> {
        match self {
            AnyBackend::Memory(b) => b.close().await,
            AnyBackend::Disk(b) => b.close().await,
            AnyBackend::Table(b) => b.close().await,
        }
    }

    async fn put(&self, key: &str, bytes: Bytes) -> StoreResult<()> {
        match self {
            AnyBackend::Memory(b) => b.put(key, bytes).await,
            AnyBackend::Disk(b) => b.put(key, bytes).await,
            AnyBackend::Table(b) => b.put(key, bytes).await,
        }
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        match self {
            AnyBackend::Memory(b) => b.get(key).await,
            AnyBackend::Disk(b) => b.get(key).await,
            AnyBackend::Table(b) => b.get(key).await,
        }
    }

    async fn has(&self, key: &str) -> StoreResult<bool> {
        match self {
            AnyBackend::Memory(b) => b.has(key).await,
            AnyBackend::Disk(b) => b.has(key).await,
            AnyBackend::Table(b) => b.has(key).await,
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        match self {
            AnyBackend::Memory(b) => b.delete(key).await,
            AnyBackend::Disk(b) => b.delete(key).await,
            AnyBackend::Table(b) => b.delete(key).await,
        }
    }

    async fn clear(&self) -> StoreResult<()> {
        match self {
            AnyBackend::Memory(b) => b.clear().await,
            AnyBackend::Disk(b) => b.clear().await,
            AnyBackend::Table(b) => b.clear().await,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use dwnutils_config::MainConfig;

    use crate::{store::fixtures, Item, TableSpec};

    use super::*;

    /// A client type for stores that never use a table.
    #[derive(Debug, Clone)]
    struct NoTable;

    impl TableClient for NoTable {
        async fn list_tables(&self) -> anyhow::Result<Vec<String>> {
            unreachable!()
        }

        async fn create_table(&self, _: &TableSpec) -> anyhow::Result<()> {
            unreachable!()
        }

        async fn put_item(&self, _: &str, _: Item) -> anyhow::Result<()> {
            unreachable!()
        }

        async fn get_item(&self, _: &str, _: &str, _: &str) -> anyhow::Result<Option<Item>> {
            unreachable!()
        }

        async fn delete_item(&self, _: &str, _: &str, _: &str) -> anyhow::Result<()> {
            unreachable!()
        }

        async fn scan_keys(&self, _: &str, _: &str) -> anyhow::Result<Vec<String>> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_any_backend_from_memory_config() -> anyhow::Result<()> {
        let config = StoreConfig::from_string("")?;
        let store = BlockStore::<AnyBackend<NoTable>>::from_config(&config, None)?;

        assert!(matches!(store.backend(), AnyBackend::Memory(_)));
        fixtures::conformance(store.backend().clone()).await
    }

    #[tokio::test]
    async fn test_any_backend_from_disk_config() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let toml = format!(
            "[integrity]\nhasher = \"sha2-256\"\n\n[backend]\nkind = \"disk\"\nbase_dir = {:?}\n",
            dir.path().display().to_string()
        );

        let config = StoreConfig::from_string(toml)?;
        let store = BlockStore::<AnyBackend<NoTable>>::from_config(&config, None)?;
        store.open().await?;

        let cid = store.put_raw("on disk").await?;
        assert_eq!(cid.hash().code(), 0x12);
        assert!(dir.path().join("blocks").is_dir());

        fixtures::conformance(store.backend().clone()).await
    }

    #[test]
    fn test_any_backend_table_needs_client() {
        let config = BackendConfig::Table(Default::default());

        assert!(matches!(
            AnyBackend::<NoTable>::from_config(&config, None),
            Err(StoreError::Custom(_))
        ));
    }
}
