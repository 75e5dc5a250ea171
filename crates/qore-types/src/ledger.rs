//! Ledger entry types, shared between `qore-ledger` (which appends and
//! verifies them) and every crate that records an event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::RiskGrade;

/// The genesis constant used as `previous_hash` for the ledger's first entry.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000000000000000";

/// Ledger event kinds. `writeLedger` is looked up by evaluation tier
/// (defaults: tiers 0-2 off, tier 3 on) and only `EVALUATION_ROUTED` plus
/// the audit/L3/system kinds ever reach the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    EvaluationRouted,
    AuditPass,
    AuditFail,
    L3Queued,
    L3Approved,
    L3Rejected,
    SystemEvent,
    PromptBuildStarted,
    PromptBuildCompleted,
    PromptDispatched,
    PromptDispatchBlocked,
}

/// Fields an appender supplies for a new entry; `id`, `content_hash`,
/// `previous_hash`, `chain_hash` and `timestamp` are assigned by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialLedgerEntry {
    pub event_type: EventType,
    pub agent_did: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_trust_at_action: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_grade: Option<RiskGrade>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overseer_did: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overseer_decision: Option<String>,
    pub payload: serde_json::Value,
}

/// A fully hash-chained, persisted ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: u64,
    pub event_type: EventType,
    pub agent_did: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_trust_at_action: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_grade: Option<RiskGrade>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overseer_did: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overseer_decision: Option<String>,
    pub payload: serde_json::Value,
    pub content_hash: String,
    pub previous_hash: String,
    pub chain_hash: String,
    pub timestamp: DateTime<Utc>,
}
