use std::{collections::HashMap, sync::Arc};

use bytes::Bytes;
use tokio::sync::RwLock;

use crate::{BlockBackend, StoreResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// An in-memory backend.
///
/// Blocks live in a shared map for as long as any clone of the backend is alive. Opening and
/// closing have nothing to set up or release.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    /// Represents the blocks stored in the backend, keyed by their canonical `Cid` string.
    blocks: Arc<RwLock<HashMap<String, Bytes>>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl MemoryBackend {
    /// Creates a new empty `MemoryBackend`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of blocks held.
    pub async fn len(&self) -> usize {
        self.blocks.read().await.len()
    }

    /// Returns `true` if no blocks are held.
    pub async fn is_empty(&self) -> bool {
        self.blocks.read().await.is_empty()
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl BlockBackend for MemoryBackend {
    async fn open(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn put(&self, key: &str, bytes: Bytes) -> StoreResult<()> {
        self.blocks.write().await.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        Ok(self.blocks.read().await.get(key).cloned())
    }

    #[inline]
    async fn has(&self, key: &str) -> StoreResult<bool> {
        Ok(self.blocks.read().await.contains_key(key))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.blocks.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> StoreResult<()> {
        self.blocks.write().await.clear();
        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
