//! Policy engine and config-loading errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("io error loading policy file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed policy file {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, PolicyError>;
