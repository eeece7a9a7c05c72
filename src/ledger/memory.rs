use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::LedgerStore;
use super::repo_types::LedgerEntry;

/// Process-local store, used when no database is configured.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    entries: RwLock<Vec<LedgerEntry>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following insert and delete fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every following day listing fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("ledger store is read-only");
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert(&self, entry: &LedgerEntry) -> anyhow::Result<()> {
        self.check_writable()?;
        let mut entries = self.entries.write().await;
        if entries.iter().any(|e| e.id == entry.id) {
            anyhow::bail!("duplicate ledger entry {}", entry.id);
        }
        entries.push(entry.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        self.check_writable()?;
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| e.id != id);
        Ok(entries.len() != before)
    }

    async fn list_for_day(&self, day: &str) -> anyhow::Result<Vec<LedgerEntry>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            anyhow::bail!("ledger store is unreadable");
        }
        let entries = self.entries.read().await;
        let mut out: Vec<LedgerEntry> = entries.iter().filter(|e| e.day == day).cloned().collect();
        out.sort_by(|a, b| b.logged_at.cmp(&a.logged_at));
        Ok(out)
    }
}
