//! Shared idempotent writer used by pipeline handlers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{StoreError, TileRecord, TileStore, WriteOutcome};

/// Snapshot of writer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub inserted: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl WriterStats {
    pub fn attempted(&self) -> u64 {
        self.inserted + self.skipped + self.failed
    }
}

/// Wraps a [`TileStore`] for use by every in-flight handler.
///
/// Cheap to share behind an `Arc`; counters are lock-free.
pub struct TileWriter {
    store: Arc<dyn TileStore>,
    inserted: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

impl TileWriter {
    pub fn new(store: Arc<dyn TileStore>) -> Self {
        Self {
            store,
            inserted: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Makes sure the destination table exists.
    pub async fn prepare(&self) -> Result<(), StoreError> {
        self.store.ensure_schema().await
    }

    /// Persists a tile unless one already exists at its coordinate.
    pub async fn write(&self, record: TileRecord) -> Result<WriteOutcome, StoreError> {
        match self.store.insert_if_absent(record).await {
            Ok(WriteOutcome::Inserted) => {
                self.inserted.fetch_add(1, Ordering::Relaxed);
                Ok(WriteOutcome::Inserted)
            }
            Ok(WriteOutcome::AlreadyPresent) => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                Ok(WriteOutcome::AlreadyPresent)
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> WriterStats {
        WriterStats {
            inserted: self.inserted.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    pub fn store(&self) -> &Arc<dyn TileStore> {
        &self.store
    }
}

impl std::fmt::Debug for TileWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileWriter")
            .field("store", &self.store.describe())
            .field("stats", &self.stats())
            .finish()
    }
}
