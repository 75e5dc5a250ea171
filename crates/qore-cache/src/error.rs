//! Cache and fingerprinting errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("path must be absolute: {0}")]
    NotAbsolute(String),

    #[error("path traversal rejected: {0}")]
    PathTraversal(String),

    #[error("path escapes configured workspace root: {0}")]
    OutsideWorkspace(String),

    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, FingerprintError>;
