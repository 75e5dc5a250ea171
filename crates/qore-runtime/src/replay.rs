//! `(actorId, requestId)`-keyed idempotency cache (spec.md §4.3 step 3).

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use qore_types::{DecisionResponse, ReplayCacheEntry};
use sha2::{Digest, Sha256};

/// Outcome of looking a request up in the [`ReplayCache`].
#[derive(Debug, Clone)]
pub enum ReplayOutcome {
    /// No unexpired entry for this `(actorId, requestId)`.
    Fresh,
    /// Same fingerprint within TTL: return this response verbatim.
    Hit(DecisionResponse),
    /// Different fingerprint within TTL: `REPLAY_CONFLICT`.
    Conflict,
}

/// `fingerprint = sha256(canonical(actorId, action, targetPath, content, context))`.
pub fn compute_replay_fingerprint(
    actor_id: &str,
    action: &str,
    target_path: &str,
    content: Option<&str>,
    context: Option<&serde_json::Value>,
) -> String {
    let value = serde_json::json!({
        "actorId": actor_id,
        "action": action,
        "targetPath": target_path,
        "content": content,
        "context": context,
    });
    // `serde_json::Map` is BTreeMap-backed (no `preserve_order` anywhere in
    // this workspace), so `to_string` already yields sorted-key canonical JSON.
    let canonical = serde_json::to_string(&value).expect("json values always serialize");
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// In-memory idempotency cache keyed by `(actorId, requestId)`.
pub struct ReplayCache {
    ttl: Duration,
    entries: RwLock<HashMap<(String, String), ReplayCacheEntry>>,
}

impl ReplayCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: RwLock::new(HashMap::new()) }
    }

    /// Look up `(actor_id, request_id)`. Pruning of expired entries happens
    /// here rather than on a timer, per spec step 3 "Otherwise, prune
    /// expired entries."
    pub fn check(&self, actor_id: &str, request_id: &str, fingerprint: &str) -> ReplayOutcome {
        let now = Utc::now();
        let key = (actor_id.to_string(), request_id.to_string());

        let mut entries = self.entries.write();
        if let Some(entry) = entries.get(&key) {
            if entry.is_expired(now) {
                entries.remove(&key);
            } else if entry.fingerprint == fingerprint {
                return ReplayOutcome::Hit(entry.response.clone());
            } else {
                return ReplayOutcome::Conflict;
            }
        }
        entries.retain(|_, e| !e.is_expired(now));
        ReplayOutcome::Fresh
    }

    pub fn store(&self, actor_id: &str, request_id: &str, fingerprint: &str, response: DecisionResponse) {
        let now = Utc::now();
        let entry = ReplayCacheEntry {
            actor_id: actor_id.to_string(),
            request_id: request_id.to_string(),
            fingerprint: fingerprint.to_string(),
            response,
            stored_at: now,
            expires_at: now + chrono::Duration::from_std(self.ttl).unwrap_or_default(),
        };
        self.entries.write().insert((actor_id.to_string(), request_id.to_string()), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qore_types::{Decision, RiskGrade};

    fn response(request_id: &str) -> DecisionResponse {
        DecisionResponse {
            request_id: request_id.to_string(),
            decision_id: "d1".to_string(),
            audit_event_id: 1,
            decision: Decision::Allow,
            risk_grade: RiskGrade::L1,
            evaluation_tier: 0,
            reasons: vec![],
            required_actions: vec![],
            policy_version: "abc".to_string(),
            evaluated_at: Utc::now(),
        }
    }

    #[test]
    fn fresh_then_hit_on_same_fingerprint() {
        let cache = ReplayCache::new(Duration::from_secs(60));
        assert!(matches!(cache.check("A", "r1", "fp1"), ReplayOutcome::Fresh));
        cache.store("A", "r1", "fp1", response("r1"));
        assert!(matches!(cache.check("A", "r1", "fp1"), ReplayOutcome::Hit(_)));
    }

    #[test]
    fn different_fingerprint_is_a_conflict() {
        let cache = ReplayCache::new(Duration::from_secs(60));
        cache.store("A", "r2", "fp1", response("r2"));
        assert!(matches!(cache.check("A", "r2", "fp2"), ReplayOutcome::Conflict));
    }

    #[test]
    fn expired_entry_is_fresh_again() {
        let cache = ReplayCache::new(Duration::from_millis(0));
        cache.store("A", "r3", "fp1", response("r3"));
        std::thread::sleep(Duration::from_millis(5));
        assert!(matches!(cache.check("A", "r3", "fp2"), ReplayOutcome::Fresh));
    }

    #[test]
    fn fingerprint_is_order_independent_of_context_key_insertion() {
        let fp1 = compute_replay_fingerprint("A", "write", "/w/x", Some("hi"), None);
        let fp2 = compute_replay_fingerprint("A", "write", "/w/x", Some("hi"), None);
        assert_eq!(fp1, fp2);
    }
}
