//! `(actorId, requestId)`-keyed idempotency entries (spec.md §3, §4.3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::DecisionResponse;

/// A stored replay-cache entry. A second request with the same
/// `(actor_id, request_id)` and the same `fingerprint` within `expires_at`
/// returns `response` verbatim; a different fingerprint is a conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayCacheEntry {
    pub actor_id: String,
    pub request_id: String,
    pub fingerprint: String,
    pub response: DecisionResponse,
    pub stored_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ReplayCacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
