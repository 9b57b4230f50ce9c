//! SQLite tile store.
//!
//! Tiles live in a single table keyed by `(z, x, y)`:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS tiles (
//!     z INTEGER NOT NULL,
//!     x INTEGER NOT NULL,
//!     y INTEGER NOT NULL,
//!     tile BLOB NOT NULL,
//!     PRIMARY KEY (z, x, y)
//! )
//! ```
//!
//! Writes use `ON CONFLICT (z, x, y) DO NOTHING`, so re-running a level
//! leaves existing rows alone. rusqlite is blocking; every statement runs on
//! the tokio blocking pool behind a single connection mutex.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::{BoxFuture, StoreError, TileRecord, TileStore, WriteOutcome};
use crate::coord::TileCoord;

/// Default table name.
pub const DEFAULT_TABLE: &str = "tiles";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Tile store backed by a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteTileStore {
    conn: Arc<Mutex<Connection>>,
    table: String,
    location: String,
}

impl SqliteTileStore {
    /// Opens (or creates) the database at `path`.
    ///
    /// The parent directory is created if missing. The table itself is only
    /// created by [`TileStore::ensure_schema`].
    pub fn open(path: impl AsRef<Path>, table: &str) -> Result<Self, StoreError> {
        validate_table_name(table)?;
        let path: PathBuf = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Unavailable(format!("{}: {}", parent.display(), e))
                })?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        info!(path = %path.display(), table = %table, "Opened SQLite tile store");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            table: table.to_string(),
            location: path.display().to_string(),
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory(table: &str) -> Result<Self, StoreError> {
        validate_table_name(table)?;
        let conn = Connection::open_in_memory()?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            table: table.to_string(),
            location: ":memory:".to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Runs `f` against the connection on the blocking pool.
    fn with_conn<T, F>(&self, f: F) -> BoxFuture<'_, Result<T, StoreError>>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &str) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let table = self.table.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let guard = conn.lock();
                f(&*guard, &table)
            })
            .await
            .map_err(|e| StoreError::TaskPanicked(e.to_string()))?
        })
    }
}

impl TileStore for SqliteTileStore {
    fn ensure_schema(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        self.with_conn(|conn, table| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    z INTEGER NOT NULL,
                    x INTEGER NOT NULL,
                    y INTEGER NOT NULL,
                    tile BLOB NOT NULL,
                    PRIMARY KEY (z, x, y)
                )"
            ))?;
            debug!(table = %table, "Tile table ready");
            Ok(())
        })
    }

    fn insert_if_absent(&self, record: TileRecord) -> BoxFuture<'_, Result<WriteOutcome, StoreError>> {
        self.with_conn(move |conn, table| {
            let mut stmt = conn.prepare_cached(&format!(
                "INSERT INTO {table} (z, x, y, tile) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (z, x, y) DO NOTHING"
            ))?;
            let changed = stmt.execute(params![
                record.coord.zoom,
                record.coord.x,
                record.coord.y,
                record.payload
            ])?;
            Ok(if changed == 0 {
                WriteOutcome::AlreadyPresent
            } else {
                WriteOutcome::Inserted
            })
        })
    }

    fn count(&self) -> BoxFuture<'_, Result<u64, StoreError>> {
        self.with_conn(|conn, table| {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
    }

    fn get(&self, coord: TileCoord) -> BoxFuture<'_, Result<Option<Vec<u8>>, StoreError>> {
        self.with_conn(move |conn, table| {
            let tile = conn
                .query_row(
                    &format!("SELECT tile FROM {table} WHERE z = ?1 AND x = ?2 AND y = ?3"),
                    params![coord.zoom, coord.x, coord.y],
                    |row| row.get::<_, Vec<u8>>(0),
                )
                .optional()?;
            Ok(tile)
        })
    }

    fn describe(&self) -> String {
        format!("sqlite {} (table {})", self.location, self.table)
    }
}

/// Table names are interpolated into SQL, so only plain identifiers are
/// accepted.
pub fn validate_table_name(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidTableName(name.to_string()))
    }
}
