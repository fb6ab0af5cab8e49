//! # Dwnutils Config
//!
//! This crate provides the configuration values used to select and set up a block store backend.

#![warn(missing_docs)]
#![allow(clippy::module_inception)]

mod error;
mod traits;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub mod default;
pub mod store;

pub use error::*;
pub use traits::*;
