//! `POST /evaluate` (spec.md §4.5).

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use qore_types::DecisionRequest;

use crate::body::read_json_capped;
use crate::error::ApiResult;
use crate::state::AppState;

/// Default cap for `/evaluate` bodies (spec.md §4.5 "Body limits").
pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub async fn evaluate(
    State(state): State<AppState>,
    bytes: Bytes,
) -> ApiResult<Json<qore_types::DecisionResponse>> {
    let request: DecisionRequest = read_json_capped(&bytes, MAX_BODY_BYTES)?;
    let response = state.runtime.evaluate(request).await?;
    Ok(Json(response))
}
