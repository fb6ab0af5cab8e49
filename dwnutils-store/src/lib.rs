//! Content-addressed block storage.
//!
//! A [`BlockStore`] keeps immutable blocks of bytes addressed by the [`Cid`][libipld::Cid] derived
//! from their contents. Where the bytes actually live is decided by the [`BlockBackend`] it is
//! constructed with: [`MemoryBackend`], [`DiskBackend`] or [`TableBackend`] over a managed table
//! service client.

#![warn(missing_docs)]
#![allow(clippy::module_inception)]

mod backend;
mod block;
mod codec;
mod error;
mod impls;
mod store;
pub mod utils;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use backend::*;
pub use block::*;
pub use codec::*;
pub use error::*;
pub use impls::*;
pub use store::*;

//--------------------------------------------------------------------------------------------------
// Re-Exports
//--------------------------------------------------------------------------------------------------

pub use dwnutils_config::store::{
    BackendConfig, DiskConfig, Hasher, IntegrityConfig, StoreConfig, TableConfig,
};

/// Re-exports of the `libipld` crate.
pub mod ipld {
    pub use libipld::{cid, multihash, Cid};
}
