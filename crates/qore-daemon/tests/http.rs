//! Integration tests for the governed HTTP surface (spec.md §8 "End-to-end
//! scenarios"), exercised directly against the `axum::Router` with
//! `tower::ServiceExt::oneshot` — no network socket involved.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use hmac::{Hmac, Mac};
use qore_cache::Fingerprinter;
use qore_daemon::actor_proof::Keyring;
use qore_daemon::rate_limit::RateLimiter;
use qore_daemon::replay_store::{ActorReplayStore, InMemoryReplayStore};
use qore_daemon::router::create_router;
use qore_daemon::state::AppState;
use qore_ledger::{Ledger, MemorySink};
use qore_policy::{PolicyEngine, QoreConfig, Router as EvalRouter};
use qore_runtime::Runtime;
use sha2::Sha256;
use tower::ServiceExt;

async fn test_state(config: QoreConfig) -> AppState {
    let ledger = Arc::new(Ledger::initialize(Arc::new(MemorySink::new())).await.unwrap());
    let policy = Arc::new(PolicyEngine::load(None).await.unwrap());
    let router = Arc::new(EvalRouter::new(Fingerprinter::new(None)));
    let runtime = Arc::new(Runtime::new(ledger, policy, router, false));
    runtime.initialize();

    let replay_store: Arc<dyn ActorReplayStore> = Arc::new(InMemoryReplayStore::new(1000));
    let keyring = Arc::new(Keyring::from_pairs(config.actor_key_pairs()));

    AppState::new(
        runtime,
        Arc::new(config),
        Arc::new(RateLimiter::new(100, std::time::Duration::from_secs(60))),
        keyring,
        replay_store,
        reqwest::Client::new(),
    )
}

fn evaluate_body(request_id: &str, action: &str, target_path: &str) -> String {
    format!(
        r#"{{"requestId":"{request_id}","actorId":"did:myth:user:A","action":"{action}","targetPath":"{target_path}"}}"#
    )
}

#[tokio::test]
async fn health_requires_api_key_by_default() {
    let config = QoreConfig { api_key: Some("s3cr3t".to_string()), ..Default::default() };
    let app = create_router(test_state(config).await);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_public_when_configured() {
    let config = QoreConfig { api_key: Some("s3cr3t".to_string()), api_public_health: true, ..Default::default() };
    let app = create_router(test_state(config).await);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn evaluate_requires_a_valid_api_key() {
    let config = QoreConfig { api_key: Some("s3cr3t".to_string()), ..Default::default() };
    let app = create_router(test_state(config).await);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/evaluate")
                .header("content-type", "application/json")
                .header("x-qore-api-key", "wrong-key")
                .body(Body::from(evaluate_body("r1", "read", "/w/docs/note.md")))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn evaluate_l1_read_is_allowed() {
    let config = QoreConfig { api_key: Some("s3cr3t".to_string()), ..Default::default() };
    let app = create_router(test_state(config).await);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/evaluate")
                .header("content-type", "application/json")
                .header("x-qore-api-key", "s3cr3t")
                .body(Body::from(evaluate_body("r1", "read", "/w/docs/note.md")))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["decision"], "ALLOW");
    assert_eq!(value["riskGrade"], "L1");
}

#[tokio::test]
async fn evaluate_body_over_the_cap_is_rejected() {
    let config = QoreConfig { api_key: Some("s3cr3t".to_string()), ..Default::default() };
    let app = create_router(test_state(config).await);

    let oversized = "x".repeat(70 * 1024);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/evaluate")
                .header("content-type", "application/json")
                .header("x-qore-api-key", "s3cr3t")
                .body(Body::from(oversized))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn evaluate_rate_limit_rejects_past_the_cap() {
    let config = QoreConfig { api_key: Some("s3cr3t".to_string()), ..Default::default() };
    let state = test_state(config).await;
    // Drop the default 100/60s limiter for a tiny one so the test doesn't
    // need 101 requests.
    let state = AppState { rate_limiter: Arc::new(RateLimiter::new(1, std::time::Duration::from_secs(60))), ..state };
    let app = create_router(state);

    let make_request = |id: &str| {
        Request::builder()
            .method("POST")
            .uri("/evaluate")
            .header("content-type", "application/json")
            .header("x-qore-api-key", "s3cr3t")
            .body(Body::from(evaluate_body(id, "read", "/w/docs/note.md")))
            .unwrap()
    };

    let first = app.clone().oneshot(make_request("ra")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.oneshot(make_request("rb")).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers().get("retry-after").is_some());
}

#[tokio::test]
async fn ql_validate_reports_an_untampered_chain() {
    let config = QoreConfig { api_key: Some("s3cr3t".to_string()), ..Default::default() };
    let app = create_router(test_state(config).await);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ql-validate")
                .header("x-qore-api-key", "s3cr3t")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["valid"], true);
}

fn sign_proxy_request(secret: &str, actor_id: &str, ts: i64, nonce: &str, body: &str) -> String {
    let body_hash = {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(body.as_bytes());
        hex::encode(hasher.finalize())
    };
    let input = format!("{actor_id}.{ts}.{nonce}.{body_hash}");
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(input.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[tokio::test]
async fn zo_ask_without_signed_headers_is_unauthorized() {
    let config = QoreConfig { proxy_api_key: Some("p4ss".to_string()), ..Default::default() };
    let app = create_router(test_state(config).await);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/zo/ask")
                .header("x-qore-api-key", "p4ss")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"prompt":"Summarize.","model":"gpt-4"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn zo_ask_replayed_nonce_is_rejected() {
    let config = QoreConfig {
        proxy_api_key: Some("p4ss".to_string()),
        actor_keys: "k1:topsecret".to_string(),
        zo_upstream_url: "http://127.0.0.1:9/unused".to_string(),
        ..Default::default()
    };
    let state = test_state(config).await;
    // Pre-claim the nonce to simulate a prior use, independent of routing.
    state.replay_store.claim("did:myth:user:A", "noncenonce", std::time::Duration::from_secs(60)).await.unwrap();
    let app = create_router(state);

    let body = r#"{"prompt":"Summarize.","model":"gpt-4"}"#;
    let ts = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as i64;
    let sig = sign_proxy_request("topsecret", "did:myth:user:A", ts, "noncenonce", body);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/zo/ask")
                .header("x-qore-api-key", "p4ss")
                .header("content-type", "application/json")
                .header("x-actor-id", "did:myth:user:A")
                .header("x-actor-kid", "k1")
                .header("x-actor-ts", ts.to_string())
                .header("x-actor-nonce", "noncenonce")
                .header("x-actor-sig", sig)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn zo_ask_missing_model_is_rejected_before_dispatch() {
    let config = QoreConfig {
        proxy_api_key: Some("p4ss".to_string()),
        actor_keys: "k1:topsecret".to_string(),
        ..Default::default()
    };
    let app = create_router(test_state(config).await);

    let body = r#"{"prompt":"Summarize."}"#;
    let ts = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as i64;
    let sig = sign_proxy_request("topsecret", "did:myth:user:A", ts, "noncenonce", body);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/zo/ask")
                .header("x-qore-api-key", "p4ss")
                .header("content-type", "application/json")
                .header("x-actor-id", "did:myth:user:A")
                .header("x-actor-kid", "k1")
                .header("x-actor-ts", ts.to_string())
                .header("x-actor-nonce", "noncenonce")
                .header("x-actor-sig", sig)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
