//! Canonical JSON hashing.
//!
//! `serde_json::Map` is backed by a `BTreeMap` unless the `preserve_order`
//! feature is enabled (it is not, anywhere in this workspace), so
//! `serde_json::to_string` already emits object keys in sorted order with no
//! insignificant whitespace. That is the single source of truth the hash is
//! computed over — freezing this as the canonicalization spec resolves
//! Open Question 1 of spec.md §9: a different canonicalization would make
//! cross-version replay caches diverge.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Serialize `value` to its canonical (sorted-key, whitespace-free) JSON
/// form and return its lowercase hex sha256 digest.
pub fn canonical_sha256(value: &impl Serialize) -> String {
    let json = serde_json::to_string(value).expect("canonical value must serialize");
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    hex::encode(hasher.finalize())
}

/// sha256 of two hex-encoded hashes concatenated as bytes of their hex
/// strings: `sha256(contentHash || previousHash)`.
pub fn chain_link(content_hash: &str, previous_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content_hash.as_bytes());
    hasher.update(previous_hash.as_bytes());
    hex::encode(hasher.finalize())
}
