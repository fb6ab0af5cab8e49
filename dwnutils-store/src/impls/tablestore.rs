use std::{collections::HashMap, future::Future, sync::Arc};

use bytes::Bytes;
use dwnutils_config::store::TableConfig;

use crate::{BlockBackend, StoreError, StoreResult};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The attribute holding the block bytes in a table item.
pub const DATA_ATTRIBUTE: &str = "data";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A value of a table item attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// A string.
    S(String),

    /// Binary data.
    B(Bytes),
}

/// A table item, i.e. a map of attribute names to values.
pub type Item = HashMap<String, AttributeValue>;

/// Describes the table blocks are stored in and how to create it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    /// The name of the table.
    pub name: String,

    /// The string attribute the table is hash-keyed on.
    pub partition_key: String,

    /// The provisioned read capacity.
    pub read_capacity: u64,

    /// The provisioned write capacity.
    pub write_capacity: u64,
}

/// A backend that stores blocks as items of a managed key-value table.
///
/// Each block is one item: the partition key attribute holds the canonical `Cid` string and
/// [`DATA_ATTRIBUTE`] holds the bytes. The table is created on `open` if it does not exist.
#[derive(Debug, Clone)]
pub struct TableBackend<C>
where
    C: TableClient,
{
    client: C,
    spec: Arc<TableSpec>,
}

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// The subset of a managed table service client the [`TableBackend`] relies on.
///
/// Implement this over the SDK of the service in use. Errors are reported as `anyhow::Error` and
/// classified by the backend depending on the call that failed.
pub trait TableClient: Clone + Send + Sync {
    /// Lists the names of the existing tables.
    fn list_tables(&self) -> impl Future<Output = anyhow::Result<Vec<String>>> + Send;

    /// Creates a table. Must only return once the table accepts reads and writes.
    fn create_table(&self, spec: &TableSpec) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Writes `item`, replacing any item with the same key.
    fn put_item(&self, table: &str, item: Item) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Reads the item whose `key_attribute` equals `key`.
    fn get_item(
        &self,
        table: &str,
        key_attribute: &str,
        key: &str,
    ) -> impl Future<Output = anyhow::Result<Option<Item>>> + Send;

    /// Checks whether an item exists.
    ///
    /// The default implementation fetches the whole item; clients should override it with a
    /// key-only projection.
    fn item_exists(
        &self,
        table: &str,
        key_attribute: &str,
        key: &str,
    ) -> impl Future<Output = anyhow::Result<bool>> + Send {
        async move { Ok(self.get_item(table, key_attribute, key).await?.is_some()) }
    }

    /// Deletes the item whose `key_attribute` equals `key`. Deleting an absent item succeeds.
    fn delete_item(
        &self,
        table: &str,
        key_attribute: &str,
        key: &str,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Returns the `key_attribute` of every item in the table.
    fn scan_keys(
        &self,
        table: &str,
        key_attribute: &str,
    ) -> impl Future<Output = anyhow::Result<Vec<String>>> + Send;

    /// Releases the client's connections.
    fn close(&self) -> impl Future<Output = anyhow::Result<()>> + Send {
        async { Ok(()) }
    }
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<C> TableBackend<C>
where
    C: TableClient,
{
    /// Creates a new `TableBackend` storing blocks in the table described by `spec`.
    pub fn new(client: C, spec: TableSpec) -> Self {
        Self {
            client,
            spec: Arc::new(spec),
        }
    }

    /// Creates a new `TableBackend` from its configuration.
    pub fn from_config(client: C, config: &TableConfig) -> Self {
        Self::new(client, TableSpec::from(config))
    }

    /// Gets the description of the table.
    pub fn spec(&self) -> &TableSpec {
        &self.spec
    }

    /// Gets the client.
    pub fn client(&self) -> &C {
        &self.client
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl<C> BlockBackend for TableBackend<C>
where
    C: TableClient,
{
    async fn open(&self) -> StoreResult<()> {
        let tables = self
            .client
            .list_tables()
            .await
            .map_err(StoreError::connection)?;

        if tables.iter().any(|t| t == &self.spec.name) {
            tracing::debug!(table = %self.spec.name, "table exists");
            return Ok(());
        }

        self.client
            .create_table(&self.spec)
            .await
            .map_err(StoreError::provisioning)?;

        tracing::debug!(
            table = %self.spec.name,
            read_capacity = self.spec.read_capacity,
            write_capacity = self.spec.write_capacity,
            "created table"
        );

        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        self.client.close().await.map_err(StoreError::backend)
    }

    async fn put(&self, key: &str, bytes: Bytes) -> StoreResult<()> {
        let item = Item::from([
            (
                self.spec.partition_key.clone(),
                AttributeValue::S(key.to_string()),
            ),
            (DATA_ATTRIBUTE.to_string(), AttributeValue::B(bytes)),
        ]);

        self.client
            .put_item(&self.spec.name, item)
            .await
            .map_err(StoreError::backend)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        let item = self
            .client
            .get_item(&self.spec.name, &self.spec.partition_key, key)
            .await
            .map_err(StoreError::backend)?;

        let Some(mut item) = item else {
            return Ok(None);
        };

        match item.remove(DATA_ATTRIBUTE) {
            Some(AttributeValue::B(bytes)) => Ok(Some(bytes)),
            _ => Err(StoreError::backend(anyhow::anyhow!(
                "item {key} has no binary `{DATA_ATTRIBUTE}` attribute"
            ))),
        }
    }

    async fn has(&self, key: &str) -> StoreResult<bool> {
        self.client
            .item_exists(&self.spec.name, &self.spec.partition_key, key)
            .await
            .map_err(StoreError::backend)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.client
            .delete_item(&self.spec.name, &self.spec.partition_key, key)
            .await
            .map_err(StoreError::backend)
    }

    async fn clear(&self) -> StoreResult<()> {
        // The table itself is kept, only its items are removed.
        let keys = self
            .client
            .scan_keys(&self.spec.name, &self.spec.partition_key)
            .await
            .map_err(StoreError::backend)?;

        tracing::debug!(table = %self.spec.name, count = keys.len(), "clearing table");

        for key in keys {
            self.delete(&key).await?;
        }

        Ok(())
    }
}

impl From<&TableConfig> for TableSpec {
    fn from(config: &TableConfig) -> Self {
        Self {
            name: config.name.clone(),
            partition_key: config.partition_key.clone(),
            read_capacity: config.read_capacity,
            write_capacity: config.write_capacity,
        }
    }
}

impl Default for TableSpec {
    fn default() -> Self {
        Self::from(&TableConfig::default())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------


#[cfg(test)]
mod fixture {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{anyhow, bail};
    use tokio::sync::RwLock;

    use super::*;

    //--------------------------------------------------------------------------------------------------
    // Types
    //--------------------------------------------------------------------------------------------------

    /// An in-process stand-in for a managed table service.
    #[derive(Debug, Clone, Default)]
    pub(super) struct LocalTableClient {
        tables: Arc<RwLock<HashMap<String, HashMap<String, Item>>>>,
        pub(super) specs: Arc<RwLock<Vec<TableSpec>>>,
        pub(super) created: Arc<AtomicUsize>,
        pub(super) gets: Arc<AtomicUsize>,
        unreachable: bool,
        failing_create: bool,
    }

    //--------------------------------------------------------------------------------------------------
    // Methods
    //--------------------------------------------------------------------------------------------------

    impl LocalTableClient {
        pub(super) fn unreachable() -> Self {
            Self {
                unreachable: true,
                ..Default::default()
            }
        }

        pub(super) fn failing_create() -> Self {
            Self {
                failing_create: true,
                ..Default::default()
            }
        }
    }

    //--------------------------------------------------------------------------------------------------
    // Trait Implementations
    //--------------------------------------------------------------------------------------------------

    impl TableClient for LocalTableClient {
        async fn list_tables(&self) -> anyhow::Result<Vec<String>> {
            if self.unreachable {
                bail!("could not resolve endpoint");
            }

            Ok(self.tables.read().await.keys().cloned().collect())
        }

        async fn create_table(&self, spec: &TableSpec) -> anyhow::Result<()> {
            if self.failing_create {
                bail!("limit exceeded");
            }

            self.tables
                .write()
                .await
                .insert(spec.name.clone(), HashMap::new());
            self.specs.write().await.push(spec.clone());
            self.created.fetch_add(1, Ordering::SeqCst);

            Ok(())
        }

        async fn put_item(&self, table: &str, item: Item) -> anyhow::Result<()> {
            let key = match item.get("cid") {
                Some(AttributeValue::S(key)) => key.clone(),
                _ => bail!("missing key attribute"),
            };

            self.tables
                .write()
                .await
                .get_mut(table)
                .ok_or_else(|| anyhow!("no such table: {table}"))?
                .insert(key, item);

            Ok(())
        }

        async fn get_item(
            &self,
            table: &str,
            _key_attribute: &str,
            key: &str,
        ) -> anyhow::Result<Option<Item>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            let tables = self.tables.read().await;
            let table = tables
                .get(table)
                .ok_or_else(|| anyhow!("no such table: {table}"))?;

            Ok(table.get(key).cloned())
        }

        async fn item_exists(
            &self,
            table: &str,
            _key_attribute: &str,
            key: &str,
        ) -> anyhow::Result<bool> {
            let tables = self.tables.read().await;
            let table = tables
                .get(table)
                .ok_or_else(|| anyhow!("no such table: {table}"))?;

            Ok(table.contains_key(key))
        }

        async fn delete_item(
            &self,
            table: &str,
            _key_attribute: &str,
            key: &str,
        ) -> anyhow::Result<()> {
            self.tables
                .write()
                .await
                .get_mut(table)
                .ok_or_else(|| anyhow!("no such table: {table}"))?
                .remove(key);

            Ok(())
        }

        async fn scan_keys(
            &self,
            table: &str,
            _key_attribute: &str,
        ) -> anyhow::Result<Vec<String>> {
            let tables = self.tables.read().await;
            let table = tables
                .get(table)
                .ok_or_else(|| anyhow!("no such table: {table}"))?;

            Ok(table.keys().cloned().collect())
        }
    }
}
