//! Ledger-specific errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger not initialized")]
    NotInitialized,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("chain verification failed at entry {0}")]
    ChainBroken(u64),

    #[error("ledger append rejected: chain is not valid, operator acknowledgement required")]
    ChainInvalidated,
}

pub type Result<T> = std::result::Result<T, LedgerError>;
