//! In-memory tile store backed by `DashMap`.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{BoxFuture, StoreError, TileRecord, TileStore, WriteOutcome};
use crate::coord::TileCoord;

/// Sharded in-memory store. The entry API makes insert-or-ignore atomic
/// per key.
#[derive(Debug, Default)]
pub struct MemoryTileStore {
    tiles: DashMap<TileCoord, Vec<u8>>,
}

impl MemoryTileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl TileStore for MemoryTileStore {
    fn ensure_schema(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async { Ok(()) })
    }

    fn insert_if_absent(&self, record: TileRecord) -> BoxFuture<'_, Result<WriteOutcome, StoreError>> {
        Box::pin(async move {
            match self.tiles.entry(record.coord) {
                Entry::Occupied(_) => Ok(WriteOutcome::AlreadyPresent),
                Entry::Vacant(slot) => {
                    slot.insert(record.payload);
                    Ok(WriteOutcome::Inserted)
                }
            }
        })
    }

    fn count(&self) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move { Ok(self.tiles.len() as u64) })
    }

    fn get(&self, coord: TileCoord) -> BoxFuture<'_, Result<Option<Vec<u8>>, StoreError>> {
        Box::pin(async move { Ok(self.tiles.get(&coord).map(|e| e.value().clone())) })
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
