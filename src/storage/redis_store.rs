use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::{debug, info};

use crate::errors::NewsResult;
use crate::storage::traits::CacheStore;

/// Redis-backed cache. `ConnectionManager` reconnects on its own, so clones
/// are cheap handles onto one multiplexed connection.
#[derive(Clone)]
pub struct RedisStore {
    conn_manager: ConnectionManager,
    redis_url: String,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("redis_url", &self.redis_url)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> NewsResult<Self> {
        info!(redis_url, "Connecting to Redis");
        let client = redis::Client::open(redis_url)?;
        let conn_manager = ConnectionManager::new(client).await?;

        Ok(Self {
            conn_manager,
            redis_url: redis_url.to_string(),
        })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> NewsResult<Option<String>> {
        let mut conn = self.conn_manager.clone();
        let value: Option<String> = conn.get(key).await?;
        debug!(key, hit = value.is_some(), "Redis GET");
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> NewsResult<()> {
        let mut conn = self.conn_manager.clone();
        // SETEX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds).await?;
        debug!(key, ttl_secs = seconds, "Redis SETEX");
        Ok(())
    }

    async fn delete(&self, key: &str) -> NewsResult<bool> {
        let mut conn = self.conn_manager.clone();
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }
}
