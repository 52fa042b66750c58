use std::time::Duration;

use async_trait::async_trait;

use crate::errors::NewsResult;
use crate::storage::traits::CacheStore;

/// Stands in when no cache backend is reachable: every read misses.
#[derive(Debug, Clone, Default)]
pub struct NoopStore;

#[async_trait]
impl CacheStore for NoopStore {
    async fn get(&self, _key: &str) -> NewsResult<Option<String>> {
        Ok(None)
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> NewsResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> NewsResult<bool> {
        Ok(false)
    }

    fn is_persistent(&self) -> bool {
        false
    }
}
