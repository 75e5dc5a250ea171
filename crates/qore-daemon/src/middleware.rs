//! Auth and rate-limit guards layered onto the governed routes (spec.md
//! §4.5 "Auth", "Rate limiting").

use axum::extract::{Request, State};
use axum::http::header::HeaderName;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use qore_types::ErrorKind;

use crate::error::ApiError;
use crate::state::AppState;

const API_KEY_HEADER: &str = "x-qore-api-key";
const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";
const RETRY_AFTER: &str = "retry-after";

fn header_str<'a>(req: &'a Request, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Enforce `X-Qore-Api-Key` against the governance-surface key.
pub async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let supplied = header_str(&req, API_KEY_HEADER);
    if !state.verify_api_key(supplied) {
        return ApiError::new(ErrorKind::AuthRequired, "missing or invalid API key").into_response();
    }
    next.run(req).await
}

/// `/health` is public when `QORE_API_PUBLIC_HEALTH=true`, otherwise it is
/// gated the same as every other governance route.
pub async fn health_guard(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if state.config.api_public_health {
        return next.run(req).await;
    }
    require_api_key(State(state), req, next).await
}

/// Enforce `X-Qore-Api-Key` against the proxy-specific key.
pub async fn require_proxy_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let supplied = header_str(&req, API_KEY_HEADER);
    if !state.verify_proxy_api_key(supplied) {
        return ApiError::new(ErrorKind::AuthRequired, "missing or invalid API key").into_response();
    }
    next.run(req).await
}

fn header_value(n: i64) -> axum::http::HeaderValue {
    axum::http::HeaderValue::from_str(&n.to_string()).expect("integers are valid header values")
}

/// Fixed-window rate limiting keyed by the caller's API key (spec.md §4.5
/// "Rate limiting"). Runs after the auth guard, so the key is already known
/// to be valid by the time this executes.
pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let key = header_str(&req, API_KEY_HEADER).unwrap_or("anonymous").to_string();
    let decision = state.rate_limiter.check(&key);

    if !decision.allowed {
        let mut response =
            ApiError::new(ErrorKind::RateLimitExceeded, "rate limit exceeded").into_response();
        let headers = response.headers_mut();
        headers.insert(HeaderName::from_static(RETRY_AFTER), header_value(decision.retry_after));
        headers.insert(HeaderName::from_static(RATE_LIMIT_LIMIT), header_value(decision.limit as i64));
        headers.insert(HeaderName::from_static(RATE_LIMIT_REMAINING), header_value(0));
        headers.insert(HeaderName::from_static(RATE_LIMIT_RESET), header_value(decision.reset_at));
        return response;
    }

    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(HeaderName::from_static(RATE_LIMIT_LIMIT), header_value(decision.limit as i64));
    headers.insert(HeaderName::from_static(RATE_LIMIT_REMAINING), header_value(decision.remaining as i64));
    headers.insert(HeaderName::from_static(RATE_LIMIT_RESET), header_value(decision.reset_at));
    response
}
