use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::OptionalExtension;

use crate::errors::{NewsError, NewsResult};
use crate::storage::sqlite::SqliteStorage;
use crate::storage::traits::CacheStore;

/// Local cache for running without Redis. Expired rows are ignored on read
/// and removed by `purge_expired`.
#[derive(Clone)]
pub struct SqliteCacheStore {
    storage: SqliteStorage,
}

impl SqliteCacheStore {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }

    fn get_sync(&self, key: &str) -> NewsResult<Option<String>> {
        let conn = self.storage.connection()?;
        let now = Utc::now().timestamp();
        let value = conn
            .query_row(
                "SELECT value FROM cache_entries WHERE cache_key = ?1 AND expires_at > ?2",
                (key, now),
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_sync(&self, key: &str, value: &str, ttl: Duration) -> NewsResult<()> {
        let conn = self.storage.connection()?;
        let expires_at = Utc::now().timestamp() + ttl.as_secs() as i64;
        conn.execute(
            "INSERT INTO cache_entries (cache_key, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(cache_key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
            (key, value, expires_at),
        )?;
        Ok(())
    }

    fn delete_sync(&self, key: &str) -> NewsResult<bool> {
        let conn = self.storage.connection()?;
        let removed = conn.execute("DELETE FROM cache_entries WHERE cache_key = ?1", [key])?;
        Ok(removed > 0)
    }

    /// Remove every expired row, returning how many were dropped
    pub fn purge_expired(&self) -> NewsResult<usize> {
        let conn = self.storage.connection()?;
        let removed = conn.execute(
            "DELETE FROM cache_entries WHERE expires_at <= ?1",
            [Utc::now().timestamp()],
        )?;
        Ok(removed)
    }

    async fn blocking<T, F>(&self, op: F) -> NewsResult<T>
    where
        T: Send + 'static,
        F: FnOnce(SqliteCacheStore) -> NewsResult<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(store))
            .await
            .map_err(|e| NewsError::Cache(format!("SQLite task failed: {}", e)))?
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &str) -> NewsResult<Option<String>> {
        let key = key.to_string();
        self.blocking(move |store| store.get_sync(&key)).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> NewsResult<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.blocking(move |store| store.set_sync(&key, &value, ttl))
            .await
    }

    async fn delete(&self, key: &str) -> NewsResult<bool> {
        let key = key.to_string();
        self.blocking(move |store| store.delete_sync(&key)).await
    }
}
