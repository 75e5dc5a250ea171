//! Content fingerprinting (spec.md §4.4).
//!
//! Reads only the first [`qore_types::fingerprint::MAX_HASH_BYTES`] of a
//! file through a fixed-size buffer — the whole file is never read, however
//! large. A path containing `..` or that is not absolute is rejected before
//! any I/O happens (path-traversal guard); if a workspace root is
//! configured, the path must additionally resolve inside it.

use std::path::{Path, PathBuf};

use chrono::Utc;
use qore_types::fingerprint::MAX_HASH_BYTES;
use qore_types::ContentFingerprint;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::{FingerprintError, Result};

/// Validate `path` against the traversal guard and optional workspace scope.
pub fn guard_path(path: &Path, workspace_root: Option<&Path>) -> Result<()> {
    if !path.is_absolute() {
        return Err(FingerprintError::NotAbsolute(path.display().to_string()));
    }
    if path.components().any(|c| c.as_os_str() == "..") {
        return Err(FingerprintError::PathTraversal(path.display().to_string()));
    }
    if let Some(root) = workspace_root {
        if !path.starts_with(root) {
            return Err(FingerprintError::OutsideWorkspace(path.display().to_string()));
        }
    }
    Ok(())
}

/// Compute a [`ContentFingerprint`] for `path`, optionally scoped to
/// `workspace_root`.
pub async fn compute_fingerprint(
    path: impl AsRef<Path>,
    workspace_root: Option<&Path>,
) -> Result<ContentFingerprint> {
    let path = path.as_ref();
    guard_path(path, workspace_root)?;

    let mut file = File::open(path).await.map_err(|e| FingerprintError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let metadata = file.metadata().await.map_err(|e| FingerprintError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut buf = vec![0u8; MAX_HASH_BYTES];
    let mut total_read = 0usize;
    loop {
        let n = file
            .read(&mut buf[total_read..])
            .await
            .map_err(|e| FingerprintError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
        if n == 0 || total_read + n >= MAX_HASH_BYTES {
            total_read += n;
            break;
        }
        total_read += n;
    }

    let mut hasher = Sha256::new();
    hasher.update(&buf[..total_read]);
    let hash = hex::encode(hasher.finalize());

    let file_type = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_string();

    Ok(ContentFingerprint {
        hash,
        size: metadata.len(),
        file_type,
        path: path.display().to_string(),
        timestamp: Utc::now(),
    })
}

/// Owning helper bundling a workspace-root scope for repeated lookups.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    workspace_root: Option<PathBuf>,
}

impl Fingerprinter {
    pub fn new(workspace_root: Option<PathBuf>) -> Self {
        Self { workspace_root }
    }

    pub async fn fingerprint(&self, path: impl AsRef<Path>) -> Result<ContentFingerprint> {
        compute_fingerprint(path, self.workspace_root.as_deref()).await
    }
}
