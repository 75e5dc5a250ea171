//! The HTTP error taxonomy (spec.md §4.5 "Error taxonomy", §7).
//!
//! Every boundary translates an internal error into one of these kinds;
//! clients only ever see the typed envelope `{error:{code,message,traceId,details?}}`
//! — no stack traces, no internal paths.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use qore_types::ErrorKind;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), details: None }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::AuthRequired => StatusCode::UNAUTHORIZED,
            ErrorKind::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::BadJson => StatusCode::BAD_REQUEST,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::ReplayConflict => StatusCode::CONFLICT,
            ErrorKind::ModelRequired => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::ModelNotAllowed => StatusCode::FORBIDDEN,
            ErrorKind::PolicyInvalid => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::EvaluationFailed => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::UpstreamRejected => StatusCode::BAD_GATEWAY,
            ErrorKind::GovernanceDeny => StatusCode::FORBIDDEN,
            ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: ErrorKind,
    message: String,
    trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorEnvelope {
            error: ErrorBody {
                code: self.kind,
                message: self.message,
                trace_id: Uuid::new_v4().to_string(),
                details: self.details,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<qore_runtime::RuntimeError> for ApiError {
    fn from(err: qore_runtime::RuntimeError) -> Self {
        use qore_runtime::RuntimeError::*;
        match err {
            NotInitialized => ApiError::new(ErrorKind::NotInitialized, "runtime not initialized"),
            Validation(issues) => ApiError::new(ErrorKind::ValidationError, "request failed schema validation")
                .with_details(serde_json::json!({"issues": issues})),
            ReplayConflict { actor_id, request_id } => ApiError::new(
                ErrorKind::ReplayConflict,
                format!("replayed request {request_id} for actor {actor_id} with a different payload"),
            ),
            Ledger(e) => ApiError::new(ErrorKind::InternalError, e.to_string()),
            Policy(e) => ApiError::new(ErrorKind::InternalError, e.to_string()),
            ApprovalNotFound(id) => ApiError::new(ErrorKind::InternalError, format!("approval {id} not found")),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
