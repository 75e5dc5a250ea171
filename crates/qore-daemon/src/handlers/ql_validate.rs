//! `POST /ql-validate` — admin ledger-chain verification (SPEC_FULL.md §4.2
//! supplement; spec.md §4.2 mentions "the `/ql-validate` admin tool").

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QlValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_bad_id: Option<u64>,
    pub entry_count: u64,
}

pub async fn ql_validate(State(state): State<AppState>) -> Json<QlValidateResponse> {
    let result = state.runtime.ledger().verify_chain().await;
    match result {
        Ok(v) => Json(QlValidateResponse { valid: v.valid, first_bad_id: v.first_bad_id, entry_count: v.entry_count }),
        Err(_) => Json(QlValidateResponse { valid: false, first_bad_id: None, entry_count: 0 }),
    }
}
