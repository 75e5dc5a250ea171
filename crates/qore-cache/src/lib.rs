//! LRU+TTL caches, content fingerprinting, and similarity (spec.md §4.4).

pub mod cache;
pub mod error;
pub mod fingerprint;

pub use cache::{CacheStats, TtlLru};
pub use error::FingerprintError;
pub use fingerprint::{compute_fingerprint, guard_path, Fingerprinter};
