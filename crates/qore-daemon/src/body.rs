//! Manual body-size enforcement and JSON parsing (spec.md §4.5 "Body limits").
//!
//! The router disables axum's built-in body-limit layer so every route can
//! enforce its own cap and report `413/PAYLOAD_TOO_LARGE` through the typed
//! error envelope instead of axum's default rejection body.

use axum::body::Bytes;
use qore_types::ErrorKind;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};

pub fn enforce_max_bytes(bytes: &Bytes, max_bytes: usize) -> ApiResult<()> {
    if bytes.len() > max_bytes {
        return Err(ApiError::new(
            ErrorKind::PayloadTooLarge,
            format!("body of {} bytes exceeds the {} byte limit", bytes.len(), max_bytes),
        ));
    }
    Ok(())
}

pub fn parse_json<T: DeserializeOwned>(bytes: &Bytes) -> ApiResult<T> {
    serde_json::from_slice(bytes).map_err(|e| ApiError::new(ErrorKind::BadJson, e.to_string()))
}

/// Enforce the size cap, then parse. Empty bodies parse as `{}`.
pub fn read_json_capped<T: DeserializeOwned>(bytes: &Bytes, max_bytes: usize) -> ApiResult<T> {
    enforce_max_bytes(bytes, max_bytes)?;
    if bytes.is_empty() {
        return parse_json(&Bytes::from_static(b"{}"));
    }
    parse_json(bytes)
}
