//! Optional pre/post compliance hooks (spec.md §4.3 "Optional pre/post
//! hooks"), injected via config and gated by `QORE_AGENT_OS_ENABLED`.

use async_trait::async_trait;
use qore_types::{Decision, DecisionRequest};

/// A compliance collaborator consulted before and after the core decision.
///
/// A pre-hook returning `Some(decision)` short-circuits the pipeline (used
/// to implement an immediate "red flag" `DENY`). A post-hook may append
/// further `reasons` but must never change the ultimate decision — its
/// signature reflects that by returning only strings, not a `Decision`.
#[async_trait]
pub trait GovernanceHooks: Send + Sync {
    async fn pre_evaluate(&self, request: &DecisionRequest) -> Option<Decision>;
    async fn post_evaluate(&self, request: &DecisionRequest, decision: Decision) -> Vec<String>;
}

/// The no-op hook set used when `QORE_AGENT_OS_ENABLED=false` (the default).
pub struct NoopHooks;

#[async_trait]
impl GovernanceHooks for NoopHooks {
    async fn pre_evaluate(&self, _request: &DecisionRequest) -> Option<Decision> {
        None
    }

    async fn post_evaluate(&self, _request: &DecisionRequest, _decision: Decision) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qore_types::Action;

    fn request() -> DecisionRequest {
        DecisionRequest {
            request_id: "r1".into(),
            actor_id: "A".into(),
            action: Action::Read,
            target_path: "/w/docs/note.md".into(),
            content: None,
            context: None,
        }
    }

    #[tokio::test]
    async fn noop_hooks_never_short_circuit_or_add_reasons() {
        let hooks = NoopHooks;
        assert!(hooks.pre_evaluate(&request()).await.is_none());
        assert!(hooks.post_evaluate(&request(), Decision::Allow).await.is_empty());
    }
}
