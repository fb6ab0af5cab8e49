//! The block store configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use structstruck::strike;
use typed_builder::TypedBuilder;

use crate::{ConfigError, ConfigResult, MainConfig};

use super::default::{
    DEFAULT_NAMESPACE, DEFAULT_PARTITION_KEY, DEFAULT_READ_CAPACITY, DEFAULT_VERIFY_ON_PUT,
    DEFAULT_WRITE_CAPACITY,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

strike! {
    #[strikethrough[derive(Debug, Clone, PartialEq, Deserialize, Serialize, TypedBuilder)]]
    /// The configuration of a block store.
    pub struct StoreConfig {
        /// How block contents are checked against their identifiers.
        #[serde(default)]
        #[builder(default)]
        pub integrity:
            /// How block contents are checked against their identifiers.
            pub struct IntegrityConfig {
                /// Whether the bytes of a block are hashed and compared to its identifier on `put`.
                #[serde(default = "super::default::default_verify_on_put")]
                #[builder(default = super::default::default_verify_on_put())]
                pub verify_on_put: bool,

                /// The hash function used to derive new identifiers.
                #[serde(default)]
                #[builder(default)]
                pub hasher: Hasher,
            },

        /// The backend the blocks are stored in.
        #[serde(default)]
        #[builder(default)]
        pub backend: BackendConfig,
    }
}

/// The hash function used to derive content identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Hasher {
    /// BLAKE3 with a 256-bit digest.
    #[default]
    #[serde(rename = "blake3-256")]
    Blake3_256,

    /// SHA2 with a 256-bit digest.
    #[serde(rename = "sha2-256")]
    Sha2_256,
}

/// Selects the backend a block store delegates to.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Blocks are kept in process memory.
    #[default]
    Memory,

    /// Blocks are kept as files on local disk.
    Disk(DiskConfig),

    /// Blocks are kept in a managed key-value table.
    Table(TableConfig),
}

/// The configuration of a disk backend.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, TypedBuilder)]
pub struct DiskConfig {
    /// The directory under which the namespace directory is created.
    #[serde(default = "super::default::default_base_dir")]
    #[builder(default = super::default::default_base_dir(), setter(into))]
    pub base_dir: PathBuf,

    /// The name of the directory holding the blocks.
    #[serde(default = "super::default::default_namespace")]
    #[builder(default = super::default::default_namespace(), setter(into))]
    pub namespace: String,
}

/// The configuration of a managed table backend.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, TypedBuilder)]
pub struct TableConfig {
    /// The name of the table.
    #[serde(default = "super::default::default_namespace")]
    #[builder(default = super::default::default_namespace(), setter(into))]
    pub name: String,

    /// The string attribute the table is keyed on.
    #[serde(default = "super::default::default_partition_key")]
    #[builder(default = super::default::default_partition_key(), setter(into))]
    pub partition_key: String,

    /// The provisioned read capacity used when the table is created.
    #[serde(default = "super::default::default_read_capacity")]
    #[builder(default = super::default::default_read_capacity())]
    pub read_capacity: u64,

    /// The provisioned write capacity used when the table is created.
    #[serde(default = "super::default::default_write_capacity")]
    #[builder(default = super::default::default_write_capacity())]
    pub write_capacity: u64,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl DiskConfig {
    /// Gets the directory the blocks are stored in.
    pub fn blocks_dir(&self) -> PathBuf {
        self.base_dir.join(&self.namespace)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.namespace.is_empty() {
            return Err(ConfigError::EmptyField("backend.namespace"));
        }

        Ok(())
    }
}

impl TableConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyField("backend.name"));
        }

        if self.partition_key.is_empty() {
            return Err(ConfigError::EmptyField("backend.partition_key"));
        }

        if self.read_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("backend.read_capacity"));
        }

        if self.write_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("backend.write_capacity"));
        }

        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl MainConfig for StoreConfig {
    fn validate(&self) -> ConfigResult<()> {
        match &self.backend {
            BackendConfig::Memory => Ok(()),
            BackendConfig::Disk(config) => config.validate(),
            BackendConfig::Table(config) => config.validate(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            integrity: Default::default(),
            backend: Default::default(),
        }
    }
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            verify_on_put: DEFAULT_VERIFY_ON_PUT,
            hasher: Hasher::default(),
        }
    }
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            base_dir: super::default::default_base_dir(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAMESPACE.to_string(),
            partition_key: DEFAULT_PARTITION_KEY.to_string(),
            read_capacity: DEFAULT_READ_CAPACITY,
            write_capacity: DEFAULT_WRITE_CAPACITY,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
