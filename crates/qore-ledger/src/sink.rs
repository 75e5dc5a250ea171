//! Durable storage backends for the ledger.
//!
//! An `AuditSink` trait split between an in-memory sink
//! (tests / diagnostics) and a file-backed, append-only sink used in
//! production: one JSON object per line, `fsync`'d before the write
//! returns so a crash can never leave a gap between "observed externally"
//! and "present in the ledger".

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use qore_types::LedgerEntry;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::error::Result;

/// Persisted sequence of ledger entries, read back in order at startup.
#[async_trait::async_trait]
pub trait LedgerSink: Send + Sync {
    async fn append(&self, entry: &LedgerEntry) -> Result<()>;
    async fn read_all(&self) -> Result<Vec<LedgerEntry>>;
}

/// In-memory sink; the ledger does not survive process restart.
#[derive(Default)]
pub struct MemorySink {
    entries: RwLock<Vec<LedgerEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl LedgerSink for MemorySink {
    async fn append(&self, entry: &LedgerEntry) -> Result<()> {
        self.entries.write().push(entry.clone());
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<LedgerEntry>> {
        Ok(self.entries.read().clone())
    }
}

/// Append-only file sink, one JSON object per line at `path`.
///
/// On load, if the last line is a torn write (fails to parse), it is
/// truncated off and the caller is expected to append a `SYSTEM_EVENT`
/// noting the truncation (spec.md §9 Open Question 3) once the ledger is
/// otherwise initialized.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all well-formed lines, truncating a torn trailing line if found.
    /// Returns `(entries, truncated)`.
    pub async fn read_all_recovering(&self) -> Result<(Vec<LedgerEntry>, bool)> {
        if !self.path.exists() {
            return Ok((Vec::new(), false));
        }

        let file = File::open(&self.path).await?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let mut raw_lines = Vec::new();
        while let Some(line) = lines.next_line().await? {
            if !line.trim().is_empty() {
                raw_lines.push(line);
            }
        }

        let mut truncated = false;
        let mut entries = Vec::with_capacity(raw_lines.len());
        for (i, line) in raw_lines.iter().enumerate() {
            match serde_json::from_str::<LedgerEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(_) if i == raw_lines.len() - 1 => {
                    // Torn tail: drop it and rewrite the file without it.
                    truncated = true;
                }
                Err(e) => return Err(e.into()),
            }
        }

        if truncated {
            let mut rewritten = String::new();
            for entry in &entries {
                rewritten.push_str(&serde_json::to_string(entry)?);
                rewritten.push('\n');
            }
            tokio::fs::write(&self.path, rewritten).await?;
        }

        Ok((entries, truncated))
    }
}

#[async_trait::async_trait]
impl LedgerSink for FileSink {
    async fn append(&self, entry: &LedgerEntry) -> Result<()> {
        let json = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(json.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<LedgerEntry>> {
        let (entries, _) = self.read_all_recovering().await?;
        Ok(entries)
    }
}
