//! `GET /policy/version` (spec.md §4.5).

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyVersionResponse {
    pub policy_version: String,
}

pub async fn policy_version(State(state): State<AppState>) -> Json<PolicyVersionResponse> {
    Json(PolicyVersionResponse { policy_version: state.runtime.policy_version() })
}
