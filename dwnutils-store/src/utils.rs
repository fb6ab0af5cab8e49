//! Helpers for deriving, encoding and checking content identifiers.

use std::str::FromStr;

use dwnutils_config::store::Hasher;
use libipld::{
    multihash::{Code, Multihash, MultihashDigest},
    Cid,
};

use crate::{Codec, StoreError, StoreResult};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Hashes `data` with the given `hasher` and returns a new version 1 [`Cid`] tagged with `codec`.
///
/// Bit-identical inputs always produce the same `Cid`.
pub fn make_cid(codec: Codec, hasher: Hasher, data: &[u8]) -> Cid {
    let digest = hash_code(hasher).digest(data);
    Cid::new_v1(codec.into(), digest)
}

/// Hashes raw bytes with [Blake3-256][blake] and returns a new [`Cid`] to it.
///
/// [blake]: https://en.wikipedia.org/wiki/BLAKE_(hash_function)
pub fn raw_cid(data: &[u8]) -> Cid {
    make_cid(Codec::Raw, Hasher::Blake3_256, data)
}

/// Returns the canonical string form of `cid`. This is the key blocks are stored under.
pub fn cid_to_key(cid: &Cid) -> String {
    cid.to_string()
}

/// Reconstructs a [`Cid`] from its canonical string form.
pub fn parse_cid(key: &str) -> StoreResult<Cid> {
    Cid::from_str(key).map_err(|e| StoreError::InvalidCid(key.to_string(), e.to_string()))
}

/// Re-derives the identifier of `data` with the codec and hash function embedded in `cid` and
/// checks that it matches.
///
/// # Errors
///
/// Returns `StoreError::Integrity` when the digests differ and `StoreError::UnsupportedHash` when
/// the multihash of `cid` uses a hash function this crate cannot compute, or declares an empty
/// digest or one longer than the hash function produces.
pub fn verify_cid(cid: &Cid, data: &[u8]) -> StoreResult<()> {
    let hash_code = cid.hash().code();
    let code = Code::try_from(hash_code).map_err(|_| StoreError::UnsupportedHash(hash_code))?;

    // A truncated multihash is checked against the same prefix of the full digest.
    let expected = cid.hash().digest();
    let digest = code.digest(data);
    let actual = match digest.digest().get(..expected.len()) {
        Some(actual) if !expected.is_empty() => actual,
        _ => return Err(StoreError::UnsupportedHash(hash_code)),
    };

    if actual != expected {
        let actual = Multihash::wrap(hash_code, actual).map_err(StoreError::custom)?;
        return Err(StoreError::Integrity {
            expected: *cid,
            actual: Cid::new_v1(cid.codec(), actual),
        });
    }

    Ok(())
}

fn hash_code(hasher: Hasher) -> Code {
    match hasher {
        Hasher::Blake3_256 => Code::Blake3_256,
        Hasher::Sha2_256 => Code::Sha2_256,
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
