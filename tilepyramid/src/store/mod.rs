//! Tile persistence.
//!
//! The pipeline writes through the [`TileStore`] trait so the batch job can
//! target either the in-memory store (tests, dry runs) or an on-disk SQLite
//! database. Both guarantee the same contract: `(z, x, y)` is unique and a
//! write to an existing key is silently ignored.
//!
//! [`TileWriter`] wraps a store for sharing across concurrent handlers and
//! keeps inserted/skipped counters.

mod memory;
mod sqlite;
mod writer;

pub use memory::MemoryTileStore;
pub use sqlite::{validate_table_name, SqliteTileStore, DEFAULT_TABLE};
pub use writer::{TileWriter, WriterStats};

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::coord::TileCoord;

/// Boxed future returned by [`TileStore`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A tile ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRecord {
    pub coord: TileCoord,
    pub payload: Vec<u8>,
}

impl TileRecord {
    pub fn new(coord: TileCoord, payload: Vec<u8>) -> Self {
        Self { coord, payload }
    }
}

/// Result of an insert-or-ignore write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The record was stored
    Inserted,
    /// A record with the same key already existed and was left untouched
    AlreadyPresent,
}

/// Errors from tile storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid table name '{0}': expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidTableName(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("storage task panicked: {0}")]
    TaskPanicked(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed tile storage with an atomic insert-or-ignore primitive.
pub trait TileStore: Send + Sync {
    /// Declares the tile table with `(z, x, y)` as its unique key.
    ///
    /// Safe to call on an existing store.
    fn ensure_schema(&self) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Stores `record` unless a record with the same coordinate exists.
    fn insert_if_absent(&self, record: TileRecord) -> BoxFuture<'_, Result<WriteOutcome, StoreError>>;

    /// Number of stored tiles.
    fn count(&self) -> BoxFuture<'_, Result<u64, StoreError>>;

    /// Payload stored at `coord`, if any.
    fn get(&self, coord: TileCoord) -> BoxFuture<'_, Result<Option<Vec<u8>>, StoreError>>;

    /// Short backend description for log output.
    fn describe(&self) -> String;
}
