//! Default configuration values.

use std::path::PathBuf;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The default base directory where a disk backend keeps its blocks.
pub const DEFAULT_BASE_DIR: &str = ".dwn";

/// The default namespace, i.e. the directory or table the blocks live in.
pub const DEFAULT_NAMESPACE: &str = "blocks";

/// The default name of the attribute that holds the block key in a table.
pub const DEFAULT_PARTITION_KEY: &str = "cid";

/// The default provisioned read capacity of a block table.
pub const DEFAULT_READ_CAPACITY: u64 = 5;

/// The default provisioned write capacity of a block table.
pub const DEFAULT_WRITE_CAPACITY: u64 = 5;

/// Whether blocks are hashed and checked against their identifier before being written.
pub const DEFAULT_VERIFY_ON_PUT: bool = true;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

pub(crate) fn default_base_dir() -> PathBuf {
    PathBuf::from(DEFAULT_BASE_DIR)
}

pub(crate) fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

pub(crate) fn default_partition_key() -> String {
    DEFAULT_PARTITION_KEY.to_string()
}

pub(crate) const fn default_read_capacity() -> u64 {
    DEFAULT_READ_CAPACITY
}

pub(crate) const fn default_write_capacity() -> u64 {
    DEFAULT_WRITE_CAPACITY
}

pub(crate) const fn default_verify_on_put() -> bool {
    DEFAULT_VERIFY_ON_PUT
}
