//! The runtime evaluation pipeline: turns a validated `DecisionRequest` into
//! a ledgered `DecisionResponse` (spec.md §4.3).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use qore_ledger::Ledger;
use qore_policy::{CortexEvent, EventCategory, PolicyEngine, Router};
use qore_types::{
    Action, Decision, DecisionRequest, DecisionResponse, EventType, PartialLedgerEntry, RiskGrade,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Result, RuntimeError};
use crate::event_bus::EventBus;
use crate::hooks::{GovernanceHooks, NoopHooks};
use crate::l3::ApprovalQueue;
use crate::replay::{compute_replay_fingerprint, ReplayCache, ReplayOutcome};
use crate::shadow_genome::ShadowGenome;
use crate::trust::TrustEngine;

/// Default replay cache TTL (spec.md §3 "Lifecycles": "replay TTL (default 5 min)").
pub const REPLAY_TTL: Duration = Duration::from_secs(5 * 60);

fn action_str(action: Action) -> &'static str {
    match action {
        Action::Read => "read",
        Action::Write => "write",
        Action::Execute => "execute",
        Action::Admin => "admin",
        Action::Network => "network",
    }
}

/// Schema validation for a request beyond what serde already enforces
/// (non-empty identity fields). Returns the offending field paths.
fn validate_request(request: &DecisionRequest) -> std::result::Result<(), Vec<String>> {
    let mut issues = Vec::new();
    if request.request_id.trim().is_empty() {
        issues.push("requestId".to_string());
    }
    if request.actor_id.trim().is_empty() {
        issues.push("actorId".to_string());
    }
    if request.target_path.trim().is_empty() {
        issues.push("targetPath".to_string());
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Snapshot reported by `GET /health` (spec.md §4.3 "Health and policy version").
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub initialized: bool,
    pub policy_loaded: bool,
    pub ledger_available: bool,
    pub policy_version: String,
    pub timestamp: chrono::DateTime<Utc>,
}

/// The assembled runtime: ledger, policy engine, router, replay cache, L3
/// queue, trust engine, and shadow genome, wired together by `evaluate`.
pub struct Runtime {
    ledger: Arc<Ledger>,
    policy: Arc<PolicyEngine>,
    router: Arc<Router>,
    replay: ReplayCache,
    l3_queue: ApprovalQueue,
    trust: TrustEngine,
    shadow_genome: ShadowGenome,
    events: EventBus,
    hooks: Arc<dyn GovernanceHooks>,
    strict_mode: bool,
    initialized: AtomicBool,
}

impl Runtime {
    /// Assemble a runtime from its already-initialized leaf components.
    /// `initialize` must still be called before `evaluate` will accept
    /// requests (spec.md §4.3 step 1 "Initialization gate").
    pub fn new(ledger: Arc<Ledger>, policy: Arc<PolicyEngine>, router: Arc<Router>, strict_mode: bool) -> Self {
        Self::with_hooks(ledger, policy, router, strict_mode, Arc::new(NoopHooks))
    }

    pub fn with_hooks(
        ledger: Arc<Ledger>,
        policy: Arc<PolicyEngine>,
        router: Arc<Router>,
        strict_mode: bool,
        hooks: Arc<dyn GovernanceHooks>,
    ) -> Self {
        Self {
            ledger,
            policy,
            router,
            replay: ReplayCache::new(REPLAY_TTL),
            l3_queue: ApprovalQueue::new(),
            trust: TrustEngine::new(),
            shadow_genome: ShadowGenome::new(),
            events: EventBus::new(),
            hooks,
            strict_mode,
            initialized: AtomicBool::new(false),
        }
    }

    /// Mark the runtime ready to accept `evaluate` calls. Idempotent.
    pub fn initialize(&self) {
        self.initialized.store(true, Ordering::SeqCst);
        info!("runtime pipeline initialized");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn policy_version(&self) -> String {
        self.policy.policy_version().to_string()
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn l3_queue(&self) -> &ApprovalQueue {
        &self.l3_queue
    }

    pub fn trust(&self) -> &TrustEngine {
        &self.trust
    }

    pub fn shadow_genome(&self) -> &ShadowGenome {
        &self.shadow_genome
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub async fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok",
            initialized: self.is_initialized(),
            policy_loaded: true,
            ledger_available: true,
            policy_version: self.policy_version(),
            timestamp: Utc::now(),
        }
    }

    /// `evaluate(request)` — spec.md §4.3, steps 1 through 9.
    pub async fn evaluate(&self, request: DecisionRequest) -> Result<DecisionResponse> {
        if !self.is_initialized() {
            return Err(RuntimeError::NotInitialized);
        }

        validate_request(&request).map_err(RuntimeError::Validation)?;

        let context_value = request
            .context
            .as_ref()
            .map(|c| serde_json::to_value(c).unwrap_or(serde_json::Value::Null));
        let fingerprint = compute_replay_fingerprint(
            &request.actor_id,
            action_str(request.action),
            &request.target_path,
            request.content.as_deref(),
            context_value.as_ref(),
        );

        match self.replay.check(&request.actor_id, &request.request_id, &fingerprint) {
            ReplayOutcome::Hit(response) => return Ok(response),
            ReplayOutcome::Conflict => {
                return Err(RuntimeError::ReplayConflict {
                    actor_id: request.actor_id.clone(),
                    request_id: request.request_id.clone(),
                })
            }
            ReplayOutcome::Fresh => {}
        }

        if let Some(decision) = self.hooks.pre_evaluate(&request).await {
            return self
                .finalize(
                    &request,
                    decision,
                    RiskGrade::L3,
                    0,
                    vec!["governance_hook_red_flag".to_string()],
                    vec!["human_review_required".to_string()],
                    &fingerprint,
                )
                .await;
        }

        let policy_risk = self.policy.classify(&request.target_path, request.content.as_deref());

        let event = CortexEvent::new(
            request.request_id.clone(),
            EventCategory::Standard,
            Some(request.target_path.clone()),
        );
        let routing = self.router.route(&event).await;

        let mut reasons = vec![
            format!("policyRisk={:?}", policy_risk),
            format!("routerRisk={:?}", routing.risk),
            format!("novelty={:?}", routing.novelty),
            format!("confidence={:?}", routing.confidence),
        ];
        // The router's own `required_actions` (e.g. `invoke_qorelogic_review`)
        // is internal routing metadata, not part of the response contract —
        // spec.md §8 scenario 3 requires `requiredActions=[human_review_required]`
        // exactly for a tier-3 deny, so the response list is built fresh here
        // rather than seeded from `routing.required_actions`.
        let mut required_actions = Vec::new();

        let mut decision = if routing.tier >= 3 || policy_risk == RiskGrade::L3 {
            required_actions.push("human_review_required".to_string());
            Decision::Deny
        } else if routing.tier == 2 || self.strict_mode {
            required_actions.push("l3_approval".to_string());
            Decision::Escalate
        } else {
            Decision::Allow
        };

        if request.action.is_mutating() && decision == Decision::Allow {
            decision = Decision::Escalate;
            reasons.push("fail_closed_default_for_mutating_action".to_string());
            required_actions.push("mutating_action_requires_review".to_string());
        }

        reasons.extend(self.hooks.post_evaluate(&request, decision).await);

        let response = self
            .finalize(&request, decision, policy_risk, routing.tier, reasons, required_actions, &fingerprint)
            .await?;

        if routing.tier >= 3 {
            self.queue_l3(&request, policy_risk).await;
        }

        Ok(response)
    }

    /// Shared tail of `evaluate`: ledger append, response assembly, replay
    /// storage. Also used by the pre-hook short-circuit path.
    #[allow(clippy::too_many_arguments)]
    async fn finalize(
        &self,
        request: &DecisionRequest,
        decision: Decision,
        risk_grade: RiskGrade,
        tier: u8,
        reasons: Vec<String>,
        required_actions: Vec<String>,
        fingerprint: &str,
    ) -> Result<DecisionResponse> {
        let decision_id = Uuid::new_v4().to_string();
        let agent_trust = self.trust.trust_of(&request.actor_id);

        let payload = serde_json::json!({
            "requestId": request.request_id,
            "decisionId": decision_id,
            "decision": decision,
            "evaluationTier": tier,
            "reasons": reasons,
            "requiredActions": required_actions,
        });

        let entry = self
            .ledger
            .append_entry(PartialLedgerEntry {
                event_type: EventType::EvaluationRouted,
                agent_did: request.actor_id.clone(),
                agent_trust_at_action: Some(agent_trust),
                artifact_path: Some(request.target_path.clone()),
                risk_grade: Some(risk_grade),
                overseer_did: None,
                overseer_decision: None,
                payload,
            })
            .await?;

        self.events.publish(
            "ledger.appended",
            serde_json::json!({"id": entry.id, "eventType": "EVALUATION_ROUTED"}),
        );

        let response = DecisionResponse {
            request_id: request.request_id.clone(),
            decision_id,
            audit_event_id: entry.id,
            decision,
            risk_grade,
            evaluation_tier: tier,
            reasons,
            required_actions,
            policy_version: self.policy_version(),
            evaluated_at: Utc::now(),
        };

        self.replay
            .store(&request.actor_id, &request.request_id, fingerprint, response.clone());

        Ok(response)
    }

    /// Enqueue a tier-3 decision for human-in-the-loop approval and record
    /// `L3_QUEUED` (spec.md §4.6). Tier 3 always requires sign-off, whether
    /// the base decision was `DENY` or an escalation.
    async fn queue_l3(&self, request: &DecisionRequest, risk_grade: RiskGrade) {
        let agent_trust = self.trust.trust_of(&request.actor_id);
        let approval = self.l3_queue.enqueue(
            request.request_id.clone(),
            request.actor_id.clone(),
            agent_trust,
            request.target_path.clone(),
            risk_grade,
            format!("tier-3 evaluation for action {:?}", request.action),
            vec![format!("action:{}", action_str(request.action))],
        );

        let result = self
            .ledger
            .append_entry(PartialLedgerEntry {
                event_type: EventType::L3Queued,
                agent_did: request.actor_id.clone(),
                agent_trust_at_action: Some(agent_trust),
                artifact_path: Some(request.target_path.clone()),
                risk_grade: Some(risk_grade),
                overseer_did: None,
                overseer_decision: None,
                payload: serde_json::json!({
                    "approvalId": approval.id,
                    "slaDeadline": approval.sla_deadline,
                }),
            })
            .await;

        if let Err(e) = result {
            warn!(error = %e, "failed to record L3_QUEUED ledger entry");
        }
    }
}
