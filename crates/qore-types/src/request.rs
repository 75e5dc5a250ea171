//! `DecisionRequest` and the action vocabulary it carries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Action category of a request submitted for evaluation.
///
/// `write | execute | admin | network` are "mutating" per the fail-closed
/// invariant: an `ALLOW` must never be returned for these without the router
/// and policy engine both explicitly clearing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Write,
    Execute,
    Admin,
    Network,
}

impl Action {
    /// Mutating actions are fail-closed: an `ALLOW` base decision is coerced
    /// to `ESCALATE` unless a higher tier already denies or escalates.
    pub fn is_mutating(self) -> bool {
        matches!(self, Action::Write | Action::Execute | Action::Admin | Action::Network)
    }
}

/// A request submitted to the runtime for an ALLOW/DENY/ESCALATE verdict.
///
/// Immutable once accepted: the pipeline never mutates a `DecisionRequest`
/// after it passes schema validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    /// Client-supplied id, scoped per actor for replay/idempotency.
    pub request_id: String,
    /// Decentralized identifier string of the calling actor.
    pub actor_id: String,
    pub action: Action,
    /// Opaque logical path: a filesystem path or a synthetic name such as
    /// `zo/ask_prompt`.
    pub target_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<BTreeMap<String, serde_json::Value>>,
}
