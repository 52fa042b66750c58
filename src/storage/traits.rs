use std::time::Duration;

use async_trait::async_trait;

use crate::errors::NewsResult;

/// Key-value store with per-entry expiry
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> NewsResult<Option<String>>;
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> NewsResult<()>;
    async fn delete(&self, key: &str) -> NewsResult<bool>;

    /// False for stores that keep nothing
    fn is_persistent(&self) -> bool {
        true
    }
}
