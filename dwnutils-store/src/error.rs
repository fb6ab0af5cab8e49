use std::{error::Error, fmt::Display};

use libipld::Cid;
use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a block store operation.
pub type StoreResult<T> = Result<T, StoreError>;

/// An error that occurred during a block store operation.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("Cannot connect to backing store: {0}")]
    Connection(AnyError),

    /// The storage structure (table, directory, namespace) could not be created.
    #[error("Cannot provision backing store: {0}")]
    Provisioning(AnyError),

    /// The block was not found.
    #[error("Block not found: {0}")]
    BlockNotFound(Cid),

    /// The bytes of a block do not hash to its identifier, or differ from the bytes already
    /// stored under it.
    #[error("Integrity error: expected {expected} got {actual}")]
    Integrity {
        /// The identifier the block was stored or requested under.
        expected: Cid,

        /// The identifier derived from the offending bytes.
        actual: Cid,
    },

    /// The backing store failed to carry out the operation.
    #[error("Backend error: {0}")]
    Backend(AnyError),

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// The operation is not supported by this store.
    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    /// The store has not been opened or has already been closed.
    #[error("Store is not open")]
    NotOpen,

    /// Codec not supported.
    #[error("Unsupported Codec: {0}")]
    UnsupportedCodec(u64),

    /// Multihash code not supported.
    #[error("Unsupported hash: {0:#x}")]
    UnsupportedHash(u64),

    /// A string could not be parsed as a content identifier.
    #[error("Invalid cid {0:?}: {1}")]
    InvalidCid(String, String),

    /// Custom error.
    #[error("Custom error: {0}")]
    Custom(#[from] AnyError),
}

/// An error that can represent any error.
#[derive(Debug)]
pub struct AnyError {
    error: anyhow::Error,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl StoreError {
    /// Creates a new `Err` result.
    pub fn custom(error: impl Into<anyhow::Error>) -> StoreError {
        StoreError::Custom(AnyError::new(error))
    }

    /// Creates a `Connection` error from any error.
    pub fn connection(error: impl Into<anyhow::Error>) -> StoreError {
        StoreError::Connection(AnyError::new(error))
    }

    /// Creates a `Provisioning` error from any error.
    pub fn provisioning(error: impl Into<anyhow::Error>) -> StoreError {
        StoreError::Provisioning(AnyError::new(error))
    }

    /// Creates a `Backend` error from any error.
    pub fn backend(error: impl Into<anyhow::Error>) -> StoreError {
        StoreError::Backend(AnyError::new(error))
    }

    /// Whether retrying the same operation later may succeed.
    ///
    /// The store never retries on its own; this only helps callers decide.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Backend(_) | StoreError::Connection(_))
    }
}

impl AnyError {
    fn new(error: impl Into<anyhow::Error>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Creates an `Ok` `StoreResult`.
#[allow(non_snake_case)]
pub fn Ok<T>(value: T) -> StoreResult<T> {
    Result::Ok(value)
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl PartialEq for AnyError {
    fn eq(&self, other: &Self) -> bool {
        self.error.to_string() == other.error.to_string()
    }
}

impl Display for AnyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.error)
    }
}

impl Error for AnyError {}
