mod anystore;
mod diskstore;
mod memstore;
mod tablestore;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use anystore::*;
pub use diskstore::*;
pub use memstore::*;
pub use tablestore::*;
