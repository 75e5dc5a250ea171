//! `GET /health` (spec.md §4.3 "Health and policy version").

use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    #[serde(flatten)]
    pub report: qore_runtime::HealthReport,
    /// Last-known health of registered external service-registry entries.
    /// No external services are registered in this deployment, so this is
    /// always empty.
    pub services: BTreeMap<String, serde_json::Value>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        report: state.runtime.health().await,
        services: BTreeMap::new(),
    })
}
