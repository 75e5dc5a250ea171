//! The signed-actor-proof nonce replay store (spec.md §4.5 "Signed actor
//! proof", §3 `ReplayCacheEntry`).
//!
//! Two implementations share one trait: an in-memory bounded map for tests
//! and a fallback runtime, and a durable single-file SQLite table for
//! production, matching spec.md §3's "durable form persists
//! `(actor_id, nonce, expires_at)` in a relational table."

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, ReplayStoreError>;

/// Records `(actor_id, nonce)` pairs for the proxy's signed-actor proof.
/// A duplicate within the TTL must be rejected; replay-store errors are
/// fatal for the proxy (spec.md §7 "security-critical").
#[async_trait]
pub trait ActorReplayStore: Send + Sync {
    /// Attempt to claim `(actor_id, nonce)`. Returns `true` if this is the
    /// first claim within the TTL (accept), `false` if it was already
    /// claimed and unexpired (reject as a replay).
    async fn claim(&self, actor_id: &str, nonce: &str, ttl: Duration) -> Result<bool>;
}

/// Bounded in-memory map; evicts the oldest entry when `max_entries` is
/// exceeded. Used for tests and as a fallback when no durable path is
/// configured.
pub struct InMemoryReplayStore {
    max_entries: usize,
    entries: RwLock<HashMap<(String, String), i64>>,
    insertion_order: RwLock<Vec<(String, String)>>,
}

impl InMemoryReplayStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            entries: RwLock::new(HashMap::new()),
            insertion_order: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ActorReplayStore for InMemoryReplayStore {
    async fn claim(&self, actor_id: &str, nonce: &str, ttl: Duration) -> Result<bool> {
        let now = Utc::now().timestamp();
        let key = (actor_id.to_string(), nonce.to_string());

        let mut entries = self.entries.write();
        entries.retain(|_, expires_at| *expires_at > now);

        if entries.contains_key(&key) {
            return Ok(false);
        }

        entries.insert(key.clone(), now + ttl.as_secs() as i64);
        drop(entries);

        let mut order = self.insertion_order.write();
        order.push(key);
        if order.len() > self.max_entries {
            let evicted = order.remove(0);
            self.entries.write().remove(&evicted);
        }

        Ok(true)
    }
}

/// Durable, single-file SQLite-backed store:
/// `proxy_actor_replay(actor_id, nonce, expires_at, PRIMARY KEY(actor_id, nonce))`.
/// Expired rows are pruned opportunistically on every insert.
pub struct SqliteReplayStore {
    pool: SqlitePool,
}

impl SqliteReplayStore {
    pub async fn connect(path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                let _ = tokio::fs::create_dir_all(parent).await;
            }
        }

        let options = SqliteConnectOptions::new().filename(path).create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(1).connect_with(options).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS proxy_actor_replay (
                actor_id TEXT NOT NULL,
                nonce TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                PRIMARY KEY (actor_id, nonce)
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl ActorReplayStore for SqliteReplayStore {
    async fn claim(&self, actor_id: &str, nonce: &str, ttl: Duration) -> Result<bool> {
        let now = Utc::now().timestamp();
        let expires_at = now + ttl.as_secs() as i64;

        sqlx::query("DELETE FROM proxy_actor_replay WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        let result = sqlx::query(
            "INSERT INTO proxy_actor_replay (actor_id, nonce, expires_at) VALUES (?, ?, ?)
             ON CONFLICT(actor_id, nonce) DO NOTHING",
        )
        .bind(actor_id)
        .bind(nonce)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_rejects_duplicate_nonce() {
        let store = InMemoryReplayStore::new(100);
        assert!(store.claim("A", "n1", Duration::from_secs(60)).await.unwrap());
        assert!(!store.claim("A", "n1", Duration::from_secs(60)).await.unwrap());
        assert!(store.claim("A", "n2", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn in_memory_evicts_oldest_over_capacity() {
        let store = InMemoryReplayStore::new(1);
        assert!(store.claim("A", "n1", Duration::from_secs(60)).await.unwrap());
        assert!(store.claim("A", "n2", Duration::from_secs(60)).await.unwrap());
        // n1 was evicted, so it can be claimed again.
        assert!(store.claim("A", "n1", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn sqlite_store_rejects_duplicate_nonce() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.db");
        let store = SqliteReplayStore::connect(path.to_str().unwrap()).await.unwrap();

        assert!(store.claim("A", "n1", Duration::from_secs(60)).await.unwrap());
        assert!(!store.claim("A", "n1", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn sqlite_store_prunes_expired_rows_on_insert() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.db");
        let store = SqliteReplayStore::connect(path.to_str().unwrap()).await.unwrap();

        assert!(store.claim("A", "n1", Duration::from_secs(0)).await.unwrap());
        std::thread::sleep(Duration::from_millis(1100));
        // n1 has expired, a fresh claim of the same key should now succeed.
        assert!(store.claim("A", "n1", Duration::from_secs(60)).await.unwrap());
    }
}
