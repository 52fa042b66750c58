use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::errors::{NewsError, NewsResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    cache_key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    expires_at INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_expires_at ON cache_entries(expires_at);
"#;

#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> NewsResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> NewsResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>, NewsError> {
        self.conn
            .lock()
            .map_err(|_| NewsError::Cache("SQLite connection lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_in_memory_storage() {
        let storage = SqliteStorage::in_memory().unwrap();
        let conn = storage.connection().unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='cache_entries'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_file_storage_reopens() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cache.db");

        {
            let storage = SqliteStorage::new(&path).unwrap();
            storage
                .connection()
                .unwrap()
                .execute(
                    "INSERT INTO cache_entries (cache_key, value, expires_at) VALUES ('k', 'v', 0)",
                    [],
                )
                .unwrap();
        }

        let storage = SqliteStorage::new(&path).unwrap();
        let value: String = storage
            .connection()
            .unwrap()
            .query_row(
                "SELECT value FROM cache_entries WHERE cache_key = 'k'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(value, "v");
    }
}
