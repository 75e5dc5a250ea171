//! Merkle-chained append-only ledger (spec.md §4.2).
//!
//! For every entry `i > 1`: `chainHash_i = sha256(contentHash_i || chainHash_{i-1})`.
//! Entry 1's `previousHash` is [`qore_types::ledger::GENESIS_HASH`]. Entries
//! are never mutated, deleted, or reordered after append; operations are
//! serialized behind a single writer lock so "observed externally" can never
//! race ahead of "present in the ledger".

pub mod canonical;
pub mod error;
pub mod sink;

use std::sync::Arc;

use chrono::Utc;
use qore_types::ledger::GENESIS_HASH;
use qore_types::{EventType, LedgerEntry, PartialLedgerEntry};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

pub use error::{LedgerError, Result};
pub use sink::{FileSink, LedgerSink, MemorySink};

struct LedgerState {
    last_id: u64,
    previous_hash: String,
    chain_broken: bool,
}

/// Outcome of [`Ledger::verify_chain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainVerification {
    pub valid: bool,
    pub first_bad_id: Option<u64>,
    pub entry_count: u64,
}

/// The append-only, hash-chained ledger.
pub struct Ledger {
    sink: Arc<dyn LedgerSink>,
    state: Mutex<LedgerState>,
}

impl Ledger {
    /// Open the backing store, replay it to find the chain head, and
    /// recover from a torn trailing write if `sink` is a [`FileSink`].
    pub async fn initialize(sink: Arc<dyn LedgerSink>) -> Result<Self> {
        let entries = sink.read_all().await?;

        let (last_id, previous_hash) = match entries.last() {
            Some(entry) => (entry.id, entry.chain_hash.clone()),
            None => (0, GENESIS_HASH.to_string()),
        };

        info!(entry_count = entries.len(), "ledger initialized");

        Ok(Self {
            sink,
            state: Mutex::new(LedgerState {
                last_id,
                previous_hash,
                chain_broken: false,
            }),
        })
    }

    /// Open a file-backed ledger at `path`, recovering a torn tail and
    /// recording a `SYSTEM_EVENT` entry if one was truncated.
    pub async fn open_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let sink = FileSink::new(path).await?;
        let (entries, truncated) = sink.read_all_recovering().await?;

        let (last_id, previous_hash) = match entries.last() {
            Some(entry) => (entry.id, entry.chain_hash.clone()),
            None => (0, GENESIS_HASH.to_string()),
        };

        let ledger = Self {
            sink: Arc::new(sink),
            state: Mutex::new(LedgerState {
                last_id,
                previous_hash,
                chain_broken: false,
            }),
        };

        if truncated {
            warn!("ledger file had a torn trailing write; truncated and recorded");
            ledger
                .append_entry(PartialLedgerEntry {
                    event_type: EventType::SystemEvent,
                    agent_did: "system:qore-ledger".to_string(),
                    agent_trust_at_action: None,
                    artifact_path: None,
                    risk_grade: None,
                    overseer_did: None,
                    overseer_decision: None,
                    payload: serde_json::json!({"reason": "ledger_tail_truncated"}),
                })
                .await?;
        }

        Ok(ledger)
    }

    /// Append an entry, assigning `id`, computing `contentHash` and
    /// `chainHash`, persisting it, and advancing the chain head.
    ///
    /// Fatal to the pipeline on failure: callers must surface
    /// `INTERNAL_ERROR` and must not act as if the event was logged.
    pub async fn append_entry(&self, partial: PartialLedgerEntry) -> Result<LedgerEntry> {
        let mut state = self.state.lock().await;

        if state.chain_broken {
            return Err(LedgerError::ChainInvalidated);
        }

        let id = state.last_id + 1;
        let timestamp = Utc::now();

        let content_value = serde_json::json!({
            "id": id,
            "timestamp": timestamp.to_rfc3339(),
            "eventType": partial.event_type,
            "agentDid": partial.agent_did,
            "agentTrustAtAction": partial.agent_trust_at_action,
            "artifactPath": partial.artifact_path,
            "riskGrade": partial.risk_grade,
            "overseerDid": partial.overseer_did,
            "overseerDecision": partial.overseer_decision,
            "payload": partial.payload,
        });
        let content_hash = canonical::canonical_sha256(&content_value);
        let chain_hash = canonical::chain_link(&content_hash, &state.previous_hash);

        let entry = LedgerEntry {
            id,
            event_type: partial.event_type,
            agent_did: partial.agent_did,
            agent_trust_at_action: partial.agent_trust_at_action,
            artifact_path: partial.artifact_path,
            risk_grade: partial.risk_grade,
            overseer_did: partial.overseer_did,
            overseer_decision: partial.overseer_decision,
            payload: partial.payload,
            content_hash,
            previous_hash: state.previous_hash.clone(),
            chain_hash: chain_hash.clone(),
            timestamp,
        };

        if let Err(e) = self.sink.append(&entry).await {
            error!(error = %e, "ledger append failed");
            return Err(e);
        }

        state.last_id = id;
        state.previous_hash = chain_hash;

        Ok(entry)
    }

    pub async fn get_entry_count(&self) -> u64 {
        self.state.lock().await.last_id
    }

    /// Recompute every entry's `contentHash`/`chainHash` and confirm linkage.
    /// Does not auto-repair: a failing verification marks the ledger as
    /// broken, refusing further appends until [`Ledger::acknowledge_break`]
    /// is called by an operator.
    pub async fn verify_chain(&self) -> Result<ChainVerification> {
        let entries = self.sink.read_all().await?;
        let mut previous_hash = GENESIS_HASH.to_string();

        for entry in &entries {
            let content_value = serde_json::json!({
                "id": entry.id,
                "timestamp": entry.timestamp.to_rfc3339(),
                "eventType": entry.event_type,
                "agentDid": entry.agent_did,
                "agentTrustAtAction": entry.agent_trust_at_action,
                "artifactPath": entry.artifact_path,
                "riskGrade": entry.risk_grade,
                "overseerDid": entry.overseer_did,
                "overseerDecision": entry.overseer_decision,
                "payload": entry.payload,
            });
            let expected_content_hash = canonical::canonical_sha256(&content_value);
            let expected_chain_hash = canonical::chain_link(&expected_content_hash, &previous_hash);

            if expected_content_hash != entry.content_hash
                || entry.previous_hash != previous_hash
                || expected_chain_hash != entry.chain_hash
            {
                let mut state = self.state.lock().await;
                state.chain_broken = true;
                return Ok(ChainVerification {
                    valid: false,
                    first_bad_id: Some(entry.id),
                    entry_count: entries.len() as u64,
                });
            }

            previous_hash = entry.chain_hash.clone();
        }

        Ok(ChainVerification {
            valid: true,
            first_bad_id: None,
            entry_count: entries.len() as u64,
        })
    }

    /// Operator acknowledgement that a detected chain break has been
    /// investigated; clears the append-refusal flag.
    pub async fn acknowledge_break(&self) {
        self.state.lock().await.chain_broken = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qore_types::RiskGrade;

    fn partial(event_type: EventType) -> PartialLedgerEntry {
        PartialLedgerEntry {
            event_type,
            agent_did: "did:myth:user:A".into(),
            agent_trust_at_action: Some(0.5),
            artifact_path: Some("/w/docs/note.md".into()),
            risk_grade: Some(RiskGrade::L1),
            overseer_did: None,
            overseer_decision: None,
            payload: serde_json::json!({"note": "test"}),
        }
    }

    #[tokio::test]
    async fn first_entry_chains_to_genesis() {
        let ledger = Ledger::initialize(Arc::new(MemorySink::new())).await.unwrap();
        let entry = ledger.append_entry(partial(EventType::EvaluationRouted)).await.unwrap();
        assert_eq!(entry.id, 1);
        assert_eq!(entry.previous_hash, GENESIS_HASH);
    }

    #[tokio::test]
    async fn chain_links_sequential_entries() {
        let ledger = Ledger::initialize(Arc::new(MemorySink::new())).await.unwrap();
        let e1 = ledger.append_entry(partial(EventType::EvaluationRouted)).await.unwrap();
        let e2 = ledger.append_entry(partial(EventType::AuditPass)).await.unwrap();
        assert_eq!(e2.previous_hash, e1.chain_hash);
        assert_eq!(e2.id, 2);
    }

    #[tokio::test]
    async fn verify_chain_passes_for_untampered_ledger() {
        let ledger = Ledger::initialize(Arc::new(MemorySink::new())).await.unwrap();
        for _ in 0..5 {
            ledger.append_entry(partial(EventType::EvaluationRouted)).await.unwrap();
        }
        let result = ledger.verify_chain().await.unwrap();
        assert!(result.valid);
        assert_eq!(result.entry_count, 5);
    }

    #[tokio::test]
    async fn file_sink_round_trips_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.ledger");

        {
            let ledger = Ledger::open_file(&path).await.unwrap();
            ledger.append_entry(partial(EventType::EvaluationRouted)).await.unwrap();
            ledger.append_entry(partial(EventType::AuditPass)).await.unwrap();
        }

        let ledger = Ledger::open_file(&path).await.unwrap();
        assert_eq!(ledger.get_entry_count().await, 2);
        let result = ledger.verify_chain().await.unwrap();
        assert!(result.valid);

        let e3 = ledger.append_entry(partial(EventType::L3Queued)).await.unwrap();
        assert_eq!(e3.id, 3);
    }

    #[tokio::test]
    async fn torn_tail_is_truncated_and_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.ledger");

        {
            let ledger = Ledger::open_file(&path).await.unwrap();
            ledger.append_entry(partial(EventType::EvaluationRouted)).await.unwrap();
        }

        // Simulate a torn write: append a truncated, non-JSON line.
        use tokio::io::AsyncWriteExt;
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .await
            .unwrap();
        file.write_all(b"{\"id\":2,\"eventT").await.unwrap();
        file.flush().await.unwrap();

        let ledger = Ledger::open_file(&path).await.unwrap();
        // 1 recovered entry + 1 system event recording the truncation.
        assert_eq!(ledger.get_entry_count().await, 2);
        let result = ledger.verify_chain().await.unwrap();
        assert!(result.valid);
    }

    #[tokio::test]
    async fn detects_tampering() {
        let ledger = Ledger::initialize(Arc::new(MemorySink::new())).await.unwrap();
        ledger.append_entry(partial(EventType::EvaluationRouted)).await.unwrap();
        ledger.append_entry(partial(EventType::AuditPass)).await.unwrap();

        let mut entries = ledger.sink.read_all().await.unwrap();
        entries[0].payload = serde_json::json!({"note": "tampered"});
        let tampered_sink: Arc<dyn LedgerSink> = Arc::new(MemorySink::new());
        for e in &entries {
            tampered_sink.append(e).await.unwrap();
        }

        let tampered = Ledger::initialize(tampered_sink).await.unwrap();
        let result = tampered.verify_chain().await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.first_bad_id, Some(1));
    }

    #[tokio::test]
    async fn refuses_appends_after_detected_break_until_acknowledged() {
        let ledger = Ledger::initialize(Arc::new(MemorySink::new())).await.unwrap();
        ledger.append_entry(partial(EventType::EvaluationRouted)).await.unwrap();

        {
            let mut state = ledger.state.lock().await;
            state.chain_broken = true;
        }

        let err = ledger.append_entry(partial(EventType::AuditPass)).await;
        assert!(matches!(err, Err(LedgerError::ChainInvalidated)));

        ledger.acknowledge_break().await;
        let entry = ledger.append_entry(partial(EventType::AuditPass)).await.unwrap();
        assert_eq!(entry.id, 2);
    }
}
