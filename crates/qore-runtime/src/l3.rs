//! L3 human-in-the-loop approval queue (spec.md §4.6).

use std::collections::HashMap;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use qore_types::{L3ApprovalRequest, L3State, RiskGrade};
use tracing::info;

use crate::error::{Result, RuntimeError};
use crate::trust::TrustEngine;

/// Default time an overseer has to act on a queued tier-3 decision before
/// its SLA lapses. Not otherwise specified; chosen as a conservative
/// business-hours window.
pub const L3_SLA_SECONDS: i64 = 4 * 60 * 60;

/// Outcome of [`ApprovalQueue::process_decision`], carrying the values a
/// caller needs to append `L3_APPROVED`/`L3_REJECTED` to the ledger.
#[derive(Debug, Clone)]
pub struct L3Outcome {
    pub request: L3ApprovalRequest,
    pub new_trust: f64,
}

/// The in-memory key/value store backing the queue (spec.md §4.6 "State
/// persists through a small key/value store").
pub struct ApprovalQueue {
    requests: RwLock<HashMap<String, L3ApprovalRequest>>,
}

impl ApprovalQueue {
    pub fn new() -> Self {
        Self { requests: RwLock::new(HashMap::new()) }
    }

    /// Enqueue a newly tier-3 decision. `request_id` is used as the
    /// approval request's `id` so operators can reference the original
    /// evaluation request directly.
    pub fn enqueue(
        &self,
        request_id: String,
        agent_did: String,
        agent_trust: f64,
        file_path: String,
        risk_grade: RiskGrade,
        sentinel_summary: String,
        flags: Vec<String>,
    ) -> L3ApprovalRequest {
        let now = Utc::now();
        let entry = L3ApprovalRequest {
            id: request_id,
            agent_did,
            agent_trust,
            file_path,
            risk_grade,
            sentinel_summary,
            flags,
            state: L3State::Queued,
            queued_at: now,
            sla_deadline: now + ChronoDuration::seconds(L3_SLA_SECONDS),
            overseer_did: None,
            overseer_decision: None,
            conditions: None,
        };
        self.requests.write().insert(entry.id.clone(), entry.clone());
        info!(id = %entry.id, sla_deadline = %entry.sla_deadline, "l3 approval queued");
        entry
    }

    pub fn get(&self, request_id: &str) -> Option<L3ApprovalRequest> {
        self.requests.read().get(request_id).cloned()
    }

    pub fn list_queued(&self) -> Vec<L3ApprovalRequest> {
        self.requests
            .read()
            .values()
            .filter(|r| r.state == L3State::Queued)
            .cloned()
            .collect()
    }

    /// Record an operator's decision: update state, nudge trust, and remove
    /// the entry from the queue.
    pub fn process_decision(
        &self,
        trust: &TrustEngine,
        request_id: &str,
        decision: L3State,
        overseer_did: String,
        conditions: Option<Vec<String>>,
    ) -> Result<L3Outcome> {
        let mut requests = self.requests.write();
        let mut request = requests
            .remove(request_id)
            .ok_or_else(|| RuntimeError::ApprovalNotFound(request_id.to_string()))?;

        let final_state = match (decision, &conditions) {
            (L3State::Approved, Some(_)) => L3State::ApprovedWithConditions,
            (other, _) => other,
        };

        request.state = final_state;
        request.overseer_did = Some(overseer_did);
        request.overseer_decision = Some(final_state);
        request.conditions = conditions;

        let new_trust = match final_state {
            L3State::Rejected => trust.nudge_on_reject(&request.agent_did),
            L3State::Approved | L3State::ApprovedWithConditions => trust.nudge_on_approve(&request.agent_did),
            L3State::Queued => trust.trust_of(&request.agent_did),
        };

        Ok(L3Outcome { request, new_trust })
    }

    pub fn is_overdue(&self, request_id: &str, now: DateTime<Utc>) -> bool {
        self.requests
            .read()
            .get(request_id)
            .map(|r| r.state == L3State::Queued && now > r.sla_deadline)
            .unwrap_or(false)
    }
}

impl Default for ApprovalQueue {
    fn default() -> Self {
        Self::new()
    }
}
