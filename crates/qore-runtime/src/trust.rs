//! Actor trust scores, nudged by L3 approval outcomes (spec.md §4.6).

use std::collections::HashMap;

use parking_lot::RwLock;

const STARTING_TRUST: f64 = 0.5;
const APPROVE_NUDGE: f64 = 0.05;
const REJECT_NUDGE: f64 = -0.10;

/// Per-actor trust, starting at 0.5 and clamped to `[0, 1]` on every nudge.
pub struct TrustEngine {
    scores: RwLock<HashMap<String, f64>>,
}

impl TrustEngine {
    pub fn new() -> Self {
        Self { scores: RwLock::new(HashMap::new()) }
    }

    pub fn trust_of(&self, agent_did: &str) -> f64 {
        *self.scores.read().get(agent_did).unwrap_or(&STARTING_TRUST)
    }

    pub fn nudge_on_approve(&self, agent_did: &str) -> f64 {
        self.nudge(agent_did, APPROVE_NUDGE)
    }

    pub fn nudge_on_reject(&self, agent_did: &str) -> f64 {
        self.nudge(agent_did, REJECT_NUDGE)
    }

    fn nudge(&self, agent_did: &str, delta: f64) -> f64 {
        let mut scores = self.scores.write();
        let current = *scores.get(agent_did).unwrap_or(&STARTING_TRUST);
        let updated = (current + delta).clamp(0.0, 1.0);
        scores.insert(agent_did.to_string(), updated);
        updated
    }
}

impl Default for TrustEngine {
    fn default() -> Self {
        Self::new()
    }
}
