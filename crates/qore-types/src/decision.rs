//! `DecisionResponse` and the verdict/grade vocabulary it carries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Final verdict returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Allow,
    Deny,
    Escalate,
}

/// Policy-engine risk classification, distinct from the router's lexical
/// `Risk` bucket: `L1` is low, `L3` always requires human-in-the-loop
/// approval before any action proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskGrade {
    L1,
    L2,
    L3,
}

/// The response returned from `POST /evaluate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    pub request_id: String,
    pub decision_id: String,
    pub audit_event_id: u64,
    pub decision: Decision,
    pub risk_grade: RiskGrade,
    pub evaluation_tier: u8,
    pub reasons: Vec<String>,
    pub required_actions: Vec<String>,
    pub policy_version: String,
    pub evaluated_at: DateTime<Utc>,
}
