//! Errors surfaced by the evaluation pipeline. Variant names line up with the
//! HTTP error taxonomy so `qore-daemon` can map them 1:1.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime not initialized")]
    NotInitialized,

    #[error("validation error: {0:?}")]
    Validation(Vec<String>),

    #[error("replay conflict for actor {actor_id} request {request_id}")]
    ReplayConflict { actor_id: String, request_id: String },

    #[error("ledger error: {0}")]
    Ledger(#[from] qore_ledger::LedgerError),

    #[error("policy error: {0}")]
    Policy(#[from] qore_policy::PolicyError),

    #[error("approval request {0} not found")]
    ApprovalNotFound(String),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
