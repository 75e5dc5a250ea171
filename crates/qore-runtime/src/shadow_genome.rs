//! Shadow genome: failure archive fed by external Sentinel verdicts
//! (spec.md §4.6).
//!
//! The Sentinel itself is an external collaborator (spec.md §1); this module
//! only owns the archive it writes into and the queries built on top of it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Verdict a Sentinel posts back for an evaluated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentinelVerdict {
    Pass,
    Warn,
    Block,
    Escalate,
    Quarantine,
}

/// Failure mode derived from a non-`PASS` verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureMode {
    TrustViolation,
    SpecViolation,
    HighComplexity,
    LogicError,
    Other,
}

impl SentinelVerdict {
    /// `QUARANTINE->TRUST_VIOLATION, BLOCK->SPEC_VIOLATION,
    /// ESCALATE->HIGH_COMPLEXITY, WARN->LOGIC_ERROR, else OTHER`.
    pub fn failure_mode(self) -> Option<FailureMode> {
        match self {
            SentinelVerdict::Pass => None,
            SentinelVerdict::Quarantine => Some(FailureMode::TrustViolation),
            SentinelVerdict::Block => Some(FailureMode::SpecViolation),
            SentinelVerdict::Escalate => Some(FailureMode::HighComplexity),
            SentinelVerdict::Warn => Some(FailureMode::LogicError),
        }
    }
}

/// The current schema version stamped on every archived entry.
pub const SCHEMA_VERSION: u32 = 1;

/// One archived failure, keyed by a generated id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowGenomeEntry {
    pub schema_version: u32,
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub agent_did: String,
    pub input_vector: serde_json::Value,
    pub failure_mode: FailureMode,
    pub causal_vector: serde_json::Value,
    pub remediation_status: String,
}

/// Aggregate count of archived entries sharing a failure mode.
#[derive(Debug, Clone, Copy)]
pub struct FailurePatternCount {
    pub failure_mode: FailureMode,
    pub count: u64,
}

/// Append-only archive of sub-PASS Sentinel verdicts, queryable by agent.
#[derive(Default)]
pub struct ShadowGenome {
    entries: RwLock<Vec<ShadowGenomeEntry>>,
}

impl ShadowGenome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Archive a verdict. Returns `None` (and archives nothing) for `PASS`.
    pub fn archive(
        &self,
        agent_did: impl Into<String>,
        verdict: SentinelVerdict,
        input_vector: serde_json::Value,
        causal_vector: serde_json::Value,
    ) -> Option<ShadowGenomeEntry> {
        let failure_mode = verdict.failure_mode()?;
        let entry = ShadowGenomeEntry {
            schema_version: SCHEMA_VERSION,
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            agent_did: agent_did.into(),
            input_vector,
            failure_mode,
            causal_vector,
            remediation_status: "UNRESOLVED".to_string(),
        };
        self.entries.write().push(entry.clone());
        Some(entry)
    }

    pub fn entries_by_agent(&self, agent_did: &str) -> Vec<ShadowGenomeEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.agent_did == agent_did)
            .cloned()
            .collect()
    }

    /// The most recent `causalVector`s archived for `agent_did`, newest first.
    pub fn negative_constraints(&self, agent_did: &str, limit: usize) -> Vec<serde_json::Value> {
        let mut entries = self.entries_by_agent(agent_did);
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.into_iter().take(limit).map(|e| e.causal_vector).collect()
    }

    pub fn failure_pattern_aggregates(&self) -> Vec<FailurePatternCount> {
        let mut counts: HashMap<FailureMode, u64> = HashMap::new();
        for entry in self.entries.read().iter() {
            *counts.entry(entry.failure_mode).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .map(|(failure_mode, count)| FailurePatternCount { failure_mode, count })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
