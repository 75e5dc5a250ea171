//! `L3ApprovalRequest` — the human-in-the-loop approval queue entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::RiskGrade;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum L3State {
    Queued,
    Approved,
    Rejected,
    ApprovedWithConditions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L3ApprovalRequest {
    pub id: String,
    pub agent_did: String,
    pub agent_trust: f64,
    pub file_path: String,
    pub risk_grade: RiskGrade,
    pub sentinel_summary: String,
    pub flags: Vec<String>,
    pub state: L3State,
    pub queued_at: DateTime<Utc>,
    pub sla_deadline: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overseer_did: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overseer_decision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<String>>,
}
