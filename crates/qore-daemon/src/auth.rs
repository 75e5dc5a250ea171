//! Constant-time API key auth for the governance surface (spec.md §4.5
//! "Authentication"). Separate from [`crate::actor_proof`], which signs the
//! proxy route only.

use subtle::ConstantTimeEq;

/// Compare a request's `X-Qore-Api-Key` header against the configured key in
/// constant time, regardless of length mismatch.
pub fn verify_api_key(configured: &str, supplied: &str) -> bool {
    if configured.is_empty() {
        return false;
    }
    let configured = configured.as_bytes();
    let supplied = supplied.as_bytes();

    if configured.len() != supplied.len() {
        // Still run a constant-time comparison against a same-length buffer
        // so key length is not observable via timing.
        let padded = vec![0u8; configured.len()];
        let _ = configured.ct_eq(&padded);
        return false;
    }

    configured.ct_eq(supplied).into()
}
