//! The error taxonomy shared by every crate in the workspace (spec §7).
//!
//! Each crate still defines its own `thiserror` enum for its internal
//! failure modes; `ErrorKind` is the flattened vocabulary those enums map
//! onto at the HTTP boundary in `qore-daemon`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotInitialized,
    AuthRequired,
    ValidationError,
    BadJson,
    PayloadTooLarge,
    RateLimitExceeded,
    ReplayConflict,
    ModelRequired,
    ModelNotAllowed,
    PolicyInvalid,
    EvaluationFailed,
    UpstreamTimeout,
    UpstreamRejected,
    GovernanceDeny,
    InternalError,
}

/// A generic error carrying its taxonomy kind plus a human-readable message.
/// Used where a crate needs to surface one of the shared kinds without
/// owning a bespoke enum variant for it.
#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct QoreError {
    pub kind: ErrorKind,
    pub message: String,
}

impl QoreError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
