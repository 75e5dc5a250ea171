//! The `(risk, novelty, confidence)` triage triple that drives tier selection.

use serde::{Deserialize, Serialize};

/// Path-based lexical risk grade. Ordered `R0 < R1 < R2 < R3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Risk {
    R0,
    R1,
    R2,
    R3,
}

/// Novelty bucket. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Novelty {
    Low,
    Medium,
    High,
}

/// Confidence bucket. Ordered `High < Medium < Low` — "less confident" sorts
/// larger, matching the tier table's `confidence <= low` phrasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Map a numeric sentinel confidence score to a bucket:
    /// `high >= 0.8`, `medium >= 0.5`, else `low`.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Confidence::High
        } else if score >= 0.5 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    /// Mean-confidence mapping used by router metrics: `high=1.0, medium=0.5, low=0.0`.
    pub fn as_score(self) -> f64 {
        match self {
            Confidence::High => 1.0,
            Confidence::Medium => 0.5,
            Confidence::Low => 0.0,
        }
    }
}
