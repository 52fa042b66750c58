pub mod enrichment_cache;
pub mod noop;
pub mod redis_store;
pub mod sqlite;
pub mod traits;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{CacheBackend, Config};
use crate::errors::NewsResult;

pub use enrichment_cache::EnrichmentCache;
pub use noop::NoopStore;
pub use redis_store::RedisStore;
pub use sqlite::{SqliteCacheStore, SqliteStorage};
pub use traits::CacheStore;

/// Open the configured cache backend. An unreachable Redis disables caching
/// instead of failing startup.
pub async fn open_store(config: &Config) -> NewsResult<Arc<dyn CacheStore>> {
    match config.cache_backend {
        CacheBackend::Redis => match RedisStore::connect(&config.redis_url).await {
            Ok(store) => Ok(Arc::new(store)),
            Err(e) => {
                warn!(
                    redis_url = %config.redis_url,
                    error = %e,
                    "Could not connect to Redis, caching disabled"
                );
                Ok(Arc::new(NoopStore))
            }
        },
        CacheBackend::Sqlite => {
            info!(path = %config.cache_path, "Using SQLite cache");
            let store = SqliteCacheStore::new(SqliteStorage::new(&config.cache_path)?);
            let purged = store.purge_expired()?;
            if purged > 0 {
                info!(purged, "Removed expired cache entries");
            }
            Ok(Arc::new(store))
        }
        CacheBackend::Disabled => {
            info!("Caching disabled");
            Ok(Arc::new(NoopStore))
        }
    }
}

pub async fn open_cache(config: &Config) -> NewsResult<EnrichmentCache> {
    let store = open_store(config).await?;
    Ok(EnrichmentCache::new(store, config.cache_ttl))
}
