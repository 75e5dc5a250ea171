//! Shared wire types for the Qore governance runtime.

pub mod decision;
pub mod error;
pub mod fingerprint;
pub mod l3;
pub mod ledger;
pub mod replay;
pub mod request;
pub mod triage;

pub use decision::{Decision, DecisionResponse, RiskGrade};
pub use error::{ErrorKind, QoreError};
pub use fingerprint::ContentFingerprint;
pub use l3::{L3ApprovalRequest, L3State};
pub use ledger::{EventType, LedgerEntry, PartialLedgerEntry};
pub use replay::ReplayCacheEntry;
pub use request::{Action, DecisionRequest};
pub use triage::{Confidence, Novelty, Risk};
