//! `ContentFingerprint` — the key for the fingerprint cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of leading bytes read from a file to compute its
/// fingerprint hash. The whole file is never read.
pub const MAX_HASH_BYTES: usize = 200 * 1024;

/// sha256 over the first [`MAX_HASH_BYTES`] of a file, plus its full size
/// and extension. Used as the similarity/novelty substrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFingerprint {
    pub hash: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub file_type: String,
    pub path: String,
    pub timestamp: DateTime<Utc>,
}

impl ContentFingerprint {
    /// Similarity between two fingerprints:
    /// equal hash -> 1.0; same extension -> 0.8;
    /// size ratio > 0.8 -> 0.5; else 0.0.
    pub fn similarity(&self, other: &ContentFingerprint) -> f64 {
        if self.hash == other.hash {
            return 1.0;
        }
        if self.file_type == other.file_type {
            return 0.8;
        }
        let (min, max) = if self.size <= other.size {
            (self.size, other.size)
        } else {
            (other.size, self.size)
        };
        if max > 0 && (min as f64 / max as f64) > 0.8 {
            return 0.5;
        }
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(hash: &str, size: u64, ty: &str) -> ContentFingerprint {
        ContentFingerprint {
            hash: hash.into(),
            size,
            file_type: ty.into(),
            path: "/w/x".into(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn equal_hash_is_one() {
        let a = fp("abc", 100, "rs");
        let b = fp("abc", 999, "ts");
        assert_eq!(a.similarity(&b), 1.0);
    }

    #[test]
    fn same_extension_is_point_eight() {
        let a = fp("abc", 100, "rs");
        let b = fp("def", 5000, "rs");
        assert_eq!(a.similarity(&b), 0.8);
    }

    #[test]
    fn close_size_is_point_five() {
        let a = fp("abc", 900, "rs");
        let b = fp("def", 1000, "ts");
        assert_eq!(a.similarity(&b), 0.5);
    }

    #[test]
    fn dissimilar_is_zero() {
        let a = fp("abc", 100, "rs");
        let b = fp("def", 10_000, "ts");
        assert_eq!(a.similarity(&b), 0.0);
    }
}
