use std::fmt;

use bytes::Bytes;
use dwnutils_config::store::Hasher;
use libipld::Cid;

use crate::{utils, Codec, StoreResult};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The number of leading bytes shown when a block is debug-printed.
const DEBUG_PREVIEW_LEN: usize = 16;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// An immutable pair of a content identifier and the bytes it was derived from.
///
/// A `Block` can only be constructed from bytes that hash to its `Cid`, so holding one is proof
/// that the pair is consistent.
#[derive(Clone, PartialEq, Eq)]
pub struct Block {
    cid: Cid,
    data: Bytes,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Block {
    /// Creates a block by hashing `data` with `hasher` and tagging the identifier with `codec`.
    pub fn new(codec: Codec, hasher: Hasher, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let cid = utils::make_cid(codec, hasher, &data);
        Self { cid, data }
    }

    /// Creates a raw block hashed with the default hash function.
    pub fn raw(data: impl Into<Bytes>) -> Self {
        Self::new(Codec::Raw, Hasher::default(), data)
    }

    /// Pairs an existing `cid` with `data`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Integrity` if `data` does not hash to `cid`.
    pub fn from_parts(cid: Cid, data: impl Into<Bytes>) -> StoreResult<Self> {
        let data = data.into();
        utils::verify_cid(&cid, &data)?;
        Ok(Self { cid, data })
    }

    /// Gets the identifier of the block.
    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    /// Gets the bytes of the block.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Re-derives the identifier from the bytes and checks it still matches.
    pub fn verify(&self) -> StoreResult<()> {
        utils::verify_cid(&self.cid, &self.data)
    }

    /// Splits the block into its identifier and bytes.
    pub fn into_parts(self) -> (Cid, Bytes) {
        (self.cid, self.data)
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview = &self.data[..self.data.len().min(DEBUG_PREVIEW_LEN)];
        f.debug_struct("Block")
            .field("cid", &self.cid.to_string())
            .field("len", &self.data.len())
            .field("data", &hex::encode(preview))
            .finish()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::StoreError;

    use super::*;

    #[test]
    fn test_block_from_parts() -> anyhow::Result<()> {
        let block = Block::raw("hello");
        let (cid, data) = block.clone().into_parts();

        assert_eq!(Block::from_parts(cid, data)?, block);
        assert!(matches!(
            Block::from_parts(cid, "goodbye"),
            Err(StoreError::Integrity { expected, .. }) if expected == cid
        ));

        Ok(())
    }

    #[test]
    fn test_block_verify() -> anyhow::Result<()> {
        let block = Block::new(Codec::DagCbor, Hasher::Sha2_256, vec![0xa0]);
        block.verify()?;

        assert_eq!(block.cid().codec(), u64::from(Codec::DagCbor));
        assert_eq!(block.data().as_ref(), &[0xa0]);

        Ok(())
    }

    #[test]
    fn test_block_debug_is_truncated() {
        let block = Block::raw(vec![0xff; 64]);
        let debug = format!("{block:?}");

        assert!(debug.contains("len: 64"));
        assert!(debug.contains(&"ff".repeat(DEBUG_PREVIEW_LEN)));
        assert!(!debug.contains(&"ff".repeat(DEBUG_PREVIEW_LEN + 1)));
    }
}
