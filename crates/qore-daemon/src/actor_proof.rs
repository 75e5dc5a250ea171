//! Signed actor proof verification for the LLM proxy (spec.md §4.5
//! "Signed actor proof (proxy only)").

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Maximum allowed clock skew between the client-supplied `X-Actor-Ts` and
/// server time.
pub const CLOCK_SKEW: Duration = Duration::from_secs(5 * 60);

/// The same TTL the durable replay store and replay cache use for
/// `(actorId, nonce)` dedup.
pub const NONCE_TTL: Duration = Duration::from_secs(5 * 60);

pub const MIN_NONCE_LEN: usize = 8;

/// `kid -> hmac secret` keyring, parsed from `QORE_ACTOR_KEYS`.
#[derive(Debug, Clone, Default)]
pub struct Keyring {
    secrets: HashMap<String, String>,
}

impl Keyring {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self { secrets: pairs.into_iter().collect() }
    }

    pub fn secret_for(&self, kid: &str) -> Option<&str> {
        self.secrets.get(kid).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

/// The five headers a signed actor proof carries.
#[derive(Debug, Clone)]
pub struct ActorProofHeaders<'a> {
    pub actor_id: &'a str,
    pub kid: &'a str,
    pub ts_millis: i64,
    pub nonce: &'a str,
    pub sig_hex: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    MissingHeader(&'static str),
    UnknownKid,
    NonceTooShort,
    ClockSkew,
    BadSignatureEncoding,
    SignatureMismatch,
}

/// `sha256(rawBody)`, used both in the HMAC input and for fingerprinting
/// transparency-log entries.
pub fn body_hash(raw_body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_body);
    hex::encode(hasher.finalize())
}

fn signing_input(actor_id: &str, ts_millis: i64, nonce: &str, body_hash_hex: &str) -> String {
    format!("{actor_id}.{ts_millis}.{nonce}.{body_hash_hex}")
}

/// Verify `headers` against `keyring` and `raw_body`. Does **not** check the
/// replay store — callers claim the `(actor_id, nonce)` pair separately so
/// the store failure mode (fatal `INTERNAL_ERROR`) stays distinct from a bad
/// signature (`401`).
pub fn verify(keyring: &Keyring, headers: &ActorProofHeaders<'_>, raw_body: &[u8]) -> Result<(), ProofError> {
    if headers.nonce.len() < MIN_NONCE_LEN {
        return Err(ProofError::NonceTooShort);
    }

    let now_millis = Utc::now().timestamp_millis();
    let skew = (now_millis - headers.ts_millis).unsigned_abs();
    if skew > CLOCK_SKEW.as_millis() as u64 {
        return Err(ProofError::ClockSkew);
    }

    let secret = keyring.secret_for(headers.kid).ok_or(ProofError::UnknownKid)?;

    let hash = body_hash(raw_body);
    let input = signing_input(headers.actor_id, headers.ts_millis, headers.nonce, &hash);

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(input.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    let supplied = hex::decode(headers.sig_hex).map_err(|_| ProofError::BadSignatureEncoding)?;
    let expected_bytes = hex::decode(&expected).expect("hex::encode output is valid hex");

    if supplied.ct_eq(&expected_bytes).into() {
        Ok(())
    } else {
        Err(ProofError::SignatureMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyring() -> Keyring {
        Keyring::from_pairs(vec![("k1".to_string(), "topsecret".to_string())])
    }

    fn sign(secret: &str, actor_id: &str, ts: i64, nonce: &str, body: &[u8]) -> String {
        let hash = body_hash(body);
        let input = signing_input(actor_id, ts, nonce, &hash);
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(input.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_a_correctly_signed_request() {
        let now = Utc::now().timestamp_millis();
        let sig = sign("topsecret", "did:myth:user:A", now, "noncenonce", b"body");
        let headers = ActorProofHeaders {
            actor_id: "did:myth:user:A",
            kid: "k1",
            ts_millis: now,
            nonce: "noncenonce",
            sig_hex: &sig,
        };
        assert!(verify(&keyring(), &headers, b"body").is_ok());
    }

    #[test]
    fn rejects_unknown_kid() {
        let now = Utc::now().timestamp_millis();
        let headers = ActorProofHeaders {
            actor_id: "A",
            kid: "nope",
            ts_millis: now,
            nonce: "noncenonce",
            sig_hex: "00",
        };
        assert_eq!(verify(&keyring(), &headers, b"body"), Err(ProofError::UnknownKid));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let stale = Utc::now().timestamp_millis() - Duration::from_secs(600).as_millis() as i64;
        let sig = sign("topsecret", "A", stale, "noncenonce", b"body");
        let headers = ActorProofHeaders { actor_id: "A", kid: "k1", ts_millis: stale, nonce: "noncenonce", sig_hex: &sig };
        assert_eq!(verify(&keyring(), &headers, b"body"), Err(ProofError::ClockSkew));
    }

    #[test]
    fn rejects_short_nonce() {
        let now = Utc::now().timestamp_millis();
        let headers = ActorProofHeaders { actor_id: "A", kid: "k1", ts_millis: now, nonce: "short", sig_hex: "00" };
        assert_eq!(verify(&keyring(), &headers, b"body"), Err(ProofError::NonceTooShort));
    }

    #[test]
    fn rejects_tampered_body() {
        let now = Utc::now().timestamp_millis();
        let sig = sign("topsecret", "A", now, "noncenonce", b"original");
        let headers = ActorProofHeaders { actor_id: "A", kid: "k1", ts_millis: now, nonce: "noncenonce", sig_hex: &sig };
        assert_eq!(verify(&keyring(), &headers, b"tampered"), Err(ProofError::SignatureMismatch));
    }
}
