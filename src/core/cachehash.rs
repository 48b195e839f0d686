//! Content hashing
//!
//! SHA-256 digests used for dirty checks, config hashes, plugin hashes and
//! cache file names.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of raw bytes
pub fn bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Hex-encoded SHA-256 of the JSON serialization of `value`.
///
/// Maps must be ordered (`BTreeMap`) for the result to be independent of
/// insertion order.
pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let encoded = serde_json::to_vec(value)?;
    Ok(bytes(&encoded))
}
