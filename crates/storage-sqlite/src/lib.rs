//! SQLite-backed implementation of [`studypath_core::store::KeyValueStore`].
//!
//! A single `kv_entries` table holds every persisted key. Values are stored
//! as opaque text; callers serialize through the helpers in
//! `studypath_core::store`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

use studypath_core::errors::{Error, Result};
use studypath_core::store::KeyValueStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS kv_entries (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// Key-value store persisted to a local SQLite database.
///
/// All statement execution happens on the blocking thread pool; the
/// connection is shared behind a mutex since every operation is a single
/// short statement.
pub struct SqliteKeyValueStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKeyValueStore {
    /// Open (or create) the database at `path` and run the schema.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| Error::storage(format!("Failed to open database: {}", e)))?;
        Self::from_connection(conn)
    }

    /// In-memory database, used by tests and previews.
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::storage(format!("Failed to open in-memory database: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::storage(format!("Failed to initialize schema: {}", e)))?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| Error::storage("Database lock poisoned"))?;
            op(&guard).map_err(|e| Error::storage(e.to_string()))
        })
        .await
        .map_err(|e| Error::storage(format!("Database worker failed: {}", e)))?
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        let updated_at = Utc::now().to_rfc3339();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = excluded.updated_at",
                params![key, value, updated_at],
            )
            .map(|_| ())
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let removed = conn.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])?;
            if removed > 0 {
                debug!("Removed key '{}'", key);
            }
            Ok(())
        })
        .await
    }
}
