//! Evaluation router: multi-signal risk/novelty/confidence triage and tier
//! selection (spec.md §4.1).

use std::time::Duration;

use dashmap::DashMap;
use qore_cache::{CacheStats, Fingerprinter, TtlLru};
use qore_types::{Confidence, ContentFingerprint, Novelty, Risk};
use tracing::debug;

use crate::metrics::RouterMetrics;
use crate::risk::classify_path;

const NOVELTY_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
const FINGERPRINT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Category a [`CortexEvent`] was synthesized from. Drives the default
/// confidence bucket before any sentinel override is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    System,
    Sentinel,
    Standard,
}

/// A synthetic event derived from a `DecisionRequest`, the router's only
/// input.
#[derive(Debug, Clone)]
pub struct CortexEvent {
    pub id: String,
    pub category: EventCategory,
    pub target_path: Option<String>,
}

impl CortexEvent {
    pub fn new(id: impl Into<String>, category: EventCategory, target_path: Option<String>) -> Self {
        Self { id: id.into(), category, target_path }
    }
}

/// Evaluation tier, integer `0..3`; higher means more scrutiny.
pub type Tier = u8;

/// Output of [`Router::route`].
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    pub tier: Tier,
    pub risk: Risk,
    pub novelty: Novelty,
    pub confidence: Confidence,
    pub invoke_qore_logic: bool,
    pub write_ledger: bool,
    pub enforce_sentinel: bool,
    pub required_actions: Vec<String>,
}

/// Per-tier ledger-write configuration. Defaults: tiers 0-2 off, tier 3 on.
#[derive(Debug, Clone, Copy)]
pub struct WriteLedgerByTier(pub [bool; 4]);

impl Default for WriteLedgerByTier {
    fn default() -> Self {
        Self([false, false, false, true])
    }
}

/// The evaluation router (spec.md §4.1).
pub struct Router {
    novelty_cache: TtlLru<String, Novelty>,
    fingerprint_cache: TtlLru<String, ContentFingerprint>,
    fingerprinter: Fingerprinter,
    confidence_overrides: DashMap<String, f64>,
    write_ledger_by_tier: WriteLedgerByTier,
    metrics: RouterMetrics,
}

impl Router {
    pub fn new(fingerprinter: Fingerprinter) -> Self {
        Self::with_config(fingerprinter, DEFAULT_CACHE_CAPACITY, WriteLedgerByTier::default())
    }

    pub fn with_config(fingerprinter: Fingerprinter, cache_capacity: usize, write_ledger_by_tier: WriteLedgerByTier) -> Self {
        Self {
            novelty_cache: TtlLru::new(cache_capacity, NOVELTY_CACHE_TTL),
            fingerprint_cache: TtlLru::new(cache_capacity, FINGERPRINT_CACHE_TTL),
            fingerprinter,
            confidence_overrides: DashMap::new(),
            write_ledger_by_tier,
            metrics: RouterMetrics::new(),
        }
    }

    /// Record a `sentinel.confidence` side-channel update for `event_id`,
    /// taking precedence over the category-based default the next time this
    /// event (or one sharing its id) is routed.
    pub fn post_sentinel_confidence(&self, event_id: &str, score: f64) {
        self.confidence_overrides.insert(event_id.to_string(), score);
    }

    pub fn compute_risk(&self, event: &CortexEvent) -> Risk {
        match &event.target_path {
            Some(path) => classify_path(path).as_risk(),
            None => Risk::R1,
        }
    }

    pub fn compute_confidence(&self, event: &CortexEvent) -> Confidence {
        if let Some((_, score)) = self.confidence_overrides.remove(&event.id) {
            return Confidence::from_score(score);
        }
        match event.category {
            EventCategory::System | EventCategory::Sentinel => Confidence::High,
            EventCategory::Standard => Confidence::Medium,
        }
    }

    /// Novelty algorithm (spec.md §4.1 "Novelty algorithm").
    pub async fn compute_novelty(&self, event: &CortexEvent, risk: Risk, confidence: Confidence) -> Novelty {
        let Some(target_path) = event.target_path.as_deref() else {
            return Novelty::Low;
        };

        if risk < Risk::R2 && confidence == Confidence::High {
            return Novelty::Low;
        }

        if let Some(cached) = self.novelty_cache.get(&target_path.to_string()) {
            return cached;
        }

        let fingerprint = match self.fingerprint_cache.get(&target_path.to_string()) {
            Some(fp) => Some(fp),
            None => match self.fingerprinter.fingerprint(target_path).await {
                Ok(fp) => {
                    self.fingerprint_cache.set_sized(target_path.to_string(), fp.clone(), fp.size);
                    Some(fp)
                }
                Err(e) => {
                    debug!(path = %target_path, error = %e, "fingerprinting failed, treating novelty as medium");
                    None
                }
            },
        };

        let Some(fingerprint) = fingerprint else {
            let novelty = Novelty::Medium;
            self.novelty_cache.set(target_path.to_string(), novelty);
            return novelty;
        };

        let max_similarity = self
            .fingerprint_cache
            .live_entries()
            .into_iter()
            .filter(|(path, _)| path != target_path)
            .map(|(_, candidate)| fingerprint.similarity(&candidate))
            .fold(0.0f64, f64::max);

        let novelty = if max_similarity >= 0.9 {
            Novelty::Low
        } else if max_similarity >= 0.5 {
            Novelty::Medium
        } else if max_similarity == 0.0 {
            let lower = target_path.to_lowercase();
            if lower.contains("test") || lower.contains("spec") {
                Novelty::Low
            } else if fingerprint.size < 1000 {
                Novelty::Low
            } else if fingerprint.size < 5000 {
                Novelty::Medium
            } else {
                Novelty::High
            }
        } else {
            Novelty::High
        };

        self.novelty_cache.set(target_path.to_string(), novelty);
        novelty
    }

    /// `determineTier(risk, novelty, confidence) -> 0..3`. Evaluation order
    /// is strict: T3, then T2, then T0/T1 — never reordered even though the
    /// T2 novelty/confidence clauses are then unreachable in practice.
    pub fn determine_tier(&self, risk: Risk, novelty: Novelty, confidence: Confidence) -> Tier {
        if risk >= Risk::R3 || novelty >= Novelty::High || confidence >= Confidence::Low {
            return 3;
        }
        if risk >= Risk::R2 || novelty >= Novelty::High || confidence >= Confidence::Low {
            return 2;
        }
        if risk == Risk::R0 {
            return 0;
        }
        1
    }

    pub async fn compute_triage(&self, event: &CortexEvent) -> (Risk, Novelty, Confidence) {
        let risk = self.compute_risk(event);
        let confidence = self.compute_confidence(event);
        let novelty = self.compute_novelty(event, risk, confidence).await;
        (risk, novelty, confidence)
    }

    pub async fn route(&self, event: &CortexEvent) -> RoutingDecision {
        let (risk, novelty, confidence) = self.compute_triage(event).await;
        let tier = self.determine_tier(risk, novelty, confidence);
        let invoke_qore_logic = tier >= 2;

        let mut required_actions = Vec::new();
        if invoke_qore_logic {
            required_actions.push("invoke_qorelogic_review".to_string());
        }

        let decision = RoutingDecision {
            tier,
            risk,
            novelty,
            confidence,
            invoke_qore_logic,
            write_ledger: self.write_ledger_by_tier.0[tier as usize],
            enforce_sentinel: true,
            required_actions,
        };

        self.metrics.record(
            novelty,
            confidence.as_score(),
            self.fingerprint_cache.stats(),
            self.novelty_cache.stats(),
        );

        decision
    }

    pub fn fingerprint_cache_stats(&self) -> CacheStats {
        self.fingerprint_cache.stats()
    }

    pub fn novelty_cache_stats(&self) -> CacheStats {
        self.novelty_cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        Router::new(Fingerprinter::new(None))
    }

    #[tokio::test]
    async fn low_risk_high_confidence_path_skips_disk() {
        let r = router();
        let event = CortexEvent::new("e1", EventCategory::System, Some("/nonexistent/nope.md".to_string()));
        let (risk, novelty, confidence) = r.compute_triage(&event).await;
        assert_eq!(risk, Risk::R1);
        assert_eq!(confidence, Confidence::High);
        assert_eq!(novelty, Novelty::Low);
    }

    #[tokio::test]
    async fn missing_target_path_is_low_novelty() {
        let r = router();
        let event = CortexEvent::new("e2", EventCategory::Standard, None);
        let novelty = r.compute_novelty(&event, Risk::R2, Confidence::Medium).await;
        assert_eq!(novelty, Novelty::Low);
    }

    #[tokio::test]
    async fn unfingerprintable_path_is_medium_novelty() {
        let r = router();
        let event = CortexEvent::new("e3", EventCategory::Standard, Some("/definitely/missing/file.ts".to_string()));
        let novelty = r.compute_novelty(&event, Risk::R2, Confidence::Medium).await;
        assert_eq!(novelty, Novelty::Medium);
    }

    #[test]
    fn sentinel_confidence_override_takes_precedence() {
        let r = router();
        r.post_sentinel_confidence("e4", 0.9);
        let event = CortexEvent::new("e4", EventCategory::Standard, None);
        assert_eq!(r.compute_confidence(&event), Confidence::High);
    }

    #[test]
    fn determine_tier_follows_strict_order() {
        let r = router();
        assert_eq!(r.determine_tier(Risk::R3, Novelty::Low, Confidence::High), 3);
        assert_eq!(r.determine_tier(Risk::R1, Novelty::High, Confidence::High), 3);
        assert_eq!(r.determine_tier(Risk::R1, Novelty::Low, Confidence::Low), 3);
        assert_eq!(r.determine_tier(Risk::R2, Novelty::Low, Confidence::High), 2);
        assert_eq!(r.determine_tier(Risk::R0, Novelty::Low, Confidence::High), 0);
        assert_eq!(r.determine_tier(Risk::R1, Novelty::Low, Confidence::High), 1);
    }

    #[tokio::test]
    async fn route_marks_tier3_for_ledger_write_by_default() {
        let r = router();
        let event = CortexEvent::new("e5", EventCategory::Standard, Some("/w/src/auth/login.ts".to_string()));
        let decision = r.route(&event).await;
        assert_eq!(decision.tier, 3);
        assert!(decision.write_ledger);
        assert!(decision.invoke_qore_logic);
        assert!(decision.required_actions.contains(&"invoke_qorelogic_review".to_string()));
    }

    #[tokio::test]
    async fn route_does_not_write_ledger_below_tier3() {
        let r = router();
        let event = CortexEvent::new("e6", EventCategory::System, Some("/w/docs/note.md".to_string()));
        let decision = r.route(&event).await;
        assert!(decision.tier < 3);
        assert!(!decision.write_ledger);
    }
}
