//! `POST /zo/ask` — the governed LLM proxy (spec.md §4.5 "Proxy flow").

use std::collections::BTreeMap;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use qore_types::{Decision, DecisionRequest, ErrorKind, EventType, PartialLedgerEntry};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::actor_proof::{body_hash, ActorProofHeaders, ProofError};
use crate::body::enforce_max_bytes;
use crate::error::{ApiError, ApiResult};
use crate::model_policy::{check_model, ModelCheck};
use crate::prompt_classifier::classify_prompt;
use crate::state::AppState;

/// Cap for `/zo/ask` bodies (spec.md §4.5 "Body limits").
pub const MAX_BODY_BYTES: usize = 128 * 1024;

/// Default upstream forwarding timeout (spec.md §5 "Cancellation and timeouts").
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(8);

fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> ApiResult<&'a str> {
    headers
        .get(name)
        .ok_or_else(|| ApiError::new(ErrorKind::AuthRequired, format!("missing header {name}")))?
        .to_str()
        .map_err(|_| ApiError::new(ErrorKind::AuthRequired, format!("header {name} is not valid UTF-8")))
}

fn proof_error_to_api(err: ProofError) -> ApiError {
    let message = match err {
        ProofError::MissingHeader(h) => format!("missing header {h}"),
        ProofError::UnknownKid => "unknown actor key id".to_string(),
        ProofError::NonceTooShort => "nonce must be at least 8 characters".to_string(),
        ProofError::ClockSkew => "timestamp outside the allowed clock skew".to_string(),
        ProofError::BadSignatureEncoding => "signature is not valid hex".to_string(),
        ProofError::SignatureMismatch => "signature does not match".to_string(),
    };
    ApiError::new(ErrorKind::AuthRequired, message)
}

pub async fn zo_ask(State(state): State<AppState>, headers: HeaderMap, bytes: Bytes) -> Response {
    match handle(state, headers, bytes).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn handle(state: AppState, headers: HeaderMap, bytes: Bytes) -> ApiResult<Response> {
    enforce_max_bytes(&bytes, MAX_BODY_BYTES)?;

    let actor_id = header_str(&headers, "x-actor-id")?;
    let kid = header_str(&headers, "x-actor-kid")?;
    let ts_str = header_str(&headers, "x-actor-ts")?;
    let nonce = header_str(&headers, "x-actor-nonce")?;
    let sig_hex = header_str(&headers, "x-actor-sig")?;
    let ts_millis: i64 = ts_str
        .parse()
        .map_err(|_| ApiError::new(ErrorKind::AuthRequired, "x-actor-ts is not a valid epoch millisecond value"))?;

    let proof = ActorProofHeaders { actor_id, kid, ts_millis, nonce, sig_hex };
    crate::actor_proof::verify(&state.actor_keyring, &proof, &bytes).map_err(proof_error_to_api)?;

    let claimed = state
        .replay_store
        .claim(actor_id, nonce, crate::actor_proof::NONCE_TTL)
        .await
        .map_err(|e| ApiError::new(ErrorKind::InternalError, e.to_string()))?;
    if !claimed {
        return Err(ApiError::new(ErrorKind::ReplayConflict, "actor nonce already used"));
    }

    let body: serde_json::Value = if bytes.is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_slice(&bytes).map_err(|e| ApiError::new(ErrorKind::BadJson, e.to_string()))?
    };

    let prompt = body.get("prompt").and_then(|v| v.as_str()).unwrap_or("").to_string();
    let model = body.get("model").and_then(|v| v.as_str());
    let target = body.get("target").and_then(|v| v.as_str()).unwrap_or("zo/ask_prompt").to_string();
    let profile = body.get("profile").and_then(|v| v.as_str()).unwrap_or("default").to_string();
    let surface = body.get("surface").and_then(|v| v.as_str()).unwrap_or("zo/ask").to_string();

    match check_model(model, &state.allowed_models) {
        ModelCheck::Missing => return Err(ApiError::new(ErrorKind::ModelRequired, "model is required")),
        ModelCheck::NotAllowed => return Err(ApiError::new(ErrorKind::ModelNotAllowed, "model is not on the allowlist")),
        ModelCheck::Allowed => {}
    }
    let model = model.unwrap().to_string();

    let trace_id = Uuid::new_v4().to_string();
    let prompt_hash = body_hash(prompt.as_bytes());

    let agent_trust = state.runtime.trust().trust_of(actor_id);

    let build_started = state
        .runtime
        .ledger()
        .append_entry(PartialLedgerEntry {
            event_type: EventType::PromptBuildStarted,
            agent_did: actor_id.to_string(),
            agent_trust_at_action: Some(agent_trust),
            artifact_path: Some(target.clone()),
            risk_grade: None,
            overseer_did: None,
            overseer_decision: None,
            payload: serde_json::json!({
                "promptFingerprint": prompt_hash,
                "promptLength": prompt.len(),
                "model": model,
                "target": target,
                "profile": profile,
                "surface": surface,
                "traceId": trace_id,
            }),
        })
        .await
        .map_err(|e| ApiError::new(ErrorKind::InternalError, e.to_string()))?;

    let mut context = BTreeMap::new();
    context.insert("model".to_string(), serde_json::json!(model));
    context.insert("profile".to_string(), serde_json::json!(profile));
    context.insert("surface".to_string(), serde_json::json!(surface));
    let context_hash = {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update(profile.as_bytes());
        hasher.update(surface.as_bytes());
        hex::encode(hasher.finalize())
    };

    let request_id = {
        let mut hasher = Sha256::new();
        hasher.update(actor_id.as_bytes());
        hasher.update(prompt.as_bytes());
        hasher.update(context_hash.as_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("zoask_{}", &digest[..24])
    };

    let decision_request = DecisionRequest {
        request_id,
        actor_id: actor_id.to_string(),
        action: classify_prompt(&prompt),
        target_path: target.clone(),
        content: Some(prompt.clone()),
        context: Some(context),
    };

    state
        .runtime
        .ledger()
        .append_entry(PartialLedgerEntry {
            event_type: EventType::PromptBuildCompleted,
            agent_did: actor_id.to_string(),
            agent_trust_at_action: Some(agent_trust),
            artifact_path: Some(target.clone()),
            risk_grade: None,
            overseer_did: None,
            overseer_decision: None,
            payload: serde_json::json!({
                "promptFingerprint": prompt_hash,
                "promptLength": prompt.len(),
                "buildStartedEventId": build_started.id,
                "traceId": trace_id,
            }),
        })
        .await
        .map_err(|e| ApiError::new(ErrorKind::InternalError, e.to_string()))?;

    let decision_response = state.runtime.evaluate(decision_request).await?;

    if decision_response.decision != Decision::Allow {
        state
            .runtime
            .ledger()
            .append_entry(PartialLedgerEntry {
                event_type: EventType::PromptDispatchBlocked,
                agent_did: actor_id.to_string(),
                agent_trust_at_action: Some(agent_trust),
                artifact_path: Some(target.clone()),
                risk_grade: Some(decision_response.risk_grade),
                overseer_did: None,
                overseer_decision: None,
                payload: serde_json::json!({"decisionId": decision_response.decision_id, "traceId": trace_id}),
            })
            .await
            .map_err(|e| ApiError::new(ErrorKind::InternalError, e.to_string()))?;

        state
            .runtime
            .ledger()
            .append_entry(PartialLedgerEntry {
                event_type: EventType::AuditFail,
                agent_did: actor_id.to_string(),
                agent_trust_at_action: Some(agent_trust),
                artifact_path: Some(target.clone()),
                risk_grade: Some(decision_response.risk_grade),
                overseer_did: None,
                overseer_decision: None,
                payload: serde_json::json!({"decisionId": decision_response.decision_id, "traceId": trace_id}),
            })
            .await
            .map_err(|e| ApiError::new(ErrorKind::InternalError, e.to_string()))?;

        warn!(decision_id = %decision_response.decision_id, actor = %actor_id, "proxy dispatch blocked by governance decision");
        return Err(ApiError::new(ErrorKind::GovernanceDeny, "governance denied this prompt dispatch")
            .with_details(serde_json::json!({"decisionId": decision_response.decision_id})));
    }

    state
        .runtime
        .ledger()
        .append_entry(PartialLedgerEntry {
            event_type: EventType::PromptDispatched,
            agent_did: actor_id.to_string(),
            agent_trust_at_action: Some(agent_trust),
            artifact_path: Some(target.clone()),
            risk_grade: Some(decision_response.risk_grade),
            overseer_did: None,
            overseer_decision: None,
            payload: serde_json::json!({"decisionId": decision_response.decision_id, "traceId": trace_id}),
        })
        .await
        .map_err(|e| ApiError::new(ErrorKind::InternalError, e.to_string()))?;

    if state.config.zo_upstream_url.is_empty() {
        return Err(ApiError::new(ErrorKind::InternalError, "zo upstream url is not configured"));
    }

    let upstream = state
        .http_client
        .post(&state.config.zo_upstream_url)
        .timeout(UPSTREAM_TIMEOUT)
        .header("content-type", "application/json")
        .body(bytes.clone())
        .send()
        .await;

    let upstream_response = match upstream {
        Ok(resp) => resp,
        Err(e) if e.is_timeout() => {
            return Err(ApiError::new(ErrorKind::UpstreamTimeout, "upstream model request timed out"))
        }
        Err(e) => return Err(ApiError::new(ErrorKind::UpstreamRejected, e.to_string())),
    };

    let status = upstream_response.status();
    if !status.is_success() {
        return Err(ApiError::new(
            ErrorKind::UpstreamRejected,
            format!("upstream responded with status {status}"),
        ));
    }

    let upstream_body = upstream_response
        .bytes()
        .await
        .map_err(|e| ApiError::new(ErrorKind::UpstreamRejected, e.to_string()))?;

    state
        .runtime
        .ledger()
        .append_entry(PartialLedgerEntry {
            event_type: EventType::AuditPass,
            agent_did: actor_id.to_string(),
            agent_trust_at_action: Some(agent_trust),
            artifact_path: Some(target.clone()),
            risk_grade: Some(decision_response.risk_grade),
            overseer_did: None,
            overseer_decision: None,
            payload: serde_json::json!({"decisionId": decision_response.decision_id, "traceId": trace_id}),
        })
        .await
        .map_err(|e| ApiError::new(ErrorKind::InternalError, e.to_string()))?;

    info!(actor = %actor_id, model = %model, "proxy dispatch completed");

    let status_code =
        StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::OK);
    Ok((status_code, Json(serde_json::from_slice::<serde_json::Value>(&upstream_body).unwrap_or(serde_json::Value::Null)))
        .into_response())
}
