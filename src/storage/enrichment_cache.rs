use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::domain::{Article, RelatedArticle};
use crate::storage::traits::CacheStore;

const CATEGORIES_PREFIX: &str = "categories";
const RELATED_PREFIX: &str = "related";
const THUMB_PREFIX: &str = "thumb";
const RESPONSE_PREFIX: &str = "cache";
const OAUTH_STATE_PREFIX: &str = "oauth_state";

/// Typed access to the derived-field cache. Store failures are logged and
/// reported as misses so enrichment never fails a request.
///
/// Login states fall back to an in-process map when the store is disabled
/// or rejects the write.
#[derive(Clone)]
pub struct EnrichmentCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    oauth_states: Arc<DashMap<String, Instant>>,
}

impl EnrichmentCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            oauth_states: Arc::new(DashMap::new()),
        }
    }

    fn key(prefix: &str, suffix: &str) -> String {
        format!("{}:{}", prefix, suffix)
    }

    async fn get_raw(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Cache GET failed");
                None
            }
        }
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) {
        if let Err(e) = self.store.set_ex(key, value, ttl).await {
            warn!(key, error = %e, "Cache SET failed");
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_raw(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set_raw(key, &raw, ttl).await,
            Err(e) => warn!(key, error = %e, "Cache value not serializable"),
        }
    }

    pub async fn categories(&self, text: &str) -> Option<Vec<String>> {
        self.get_json(&Self::key(CATEGORIES_PREFIX, text)).await
    }

    pub async fn categories_for_article(&self, article: &Article) -> Option<Vec<String>> {
        self.categories(&article.categorization_text()).await
    }

    pub async fn set_categories(&self, text: &str, categories: &[String]) {
        self.set_json(&Self::key(CATEGORIES_PREFIX, text), categories, self.ttl)
            .await
    }

    pub async fn related(&self, article_id: &str) -> Option<Vec<RelatedArticle>> {
        self.get_json(&Self::key(RELATED_PREFIX, article_id)).await
    }

    pub async fn set_related(&self, article_id: &str, related: &[RelatedArticle]) {
        self.set_json(&Self::key(RELATED_PREFIX, article_id), related, self.ttl)
            .await
    }

    pub async fn thumbnail(&self, article_id: &str) -> Option<String> {
        self.get_raw(&Self::key(THUMB_PREFIX, article_id)).await
    }

    pub async fn set_thumbnail(&self, article_id: &str, data_uri: &str) {
        self.set_raw(&Self::key(THUMB_PREFIX, article_id), data_uri, self.ttl)
            .await
    }

    /// Key for a cached API response, hashed over the handler name and its
    /// sorted parameters.
    pub fn response_key(handler: &str, params: &[(&str, String)]) -> String {
        let mut sorted: Vec<(&str, &String)> = params.iter().map(|(k, v)| (*k, v)).collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let encoded = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        let digest = md5::compute(format!("{}:{}", handler, encoded));
        Self::key(RESPONSE_PREFIX, &format!("{:x}", digest))
    }

    /// Remember a login state. States the store cannot keep are held in
    /// process instead.
    pub async fn issue_oauth_state(&self, state: &str, ttl: Duration) {
        let key = Self::key(OAUTH_STATE_PREFIX, state);
        let stored = self.store.is_persistent()
            && match self.store.set_ex(&key, "1", ttl).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(key = %key, error = %e, "Cache SET failed, keeping login state in process");
                    false
                }
            };

        if !stored {
            let now = Instant::now();
            self.oauth_states.retain(|_, expires| *expires > now);
            self.oauth_states.insert(state.to_string(), now + ttl);
        }
    }

    /// Consume a login state. Returns false if it was never issued or expired.
    pub async fn take_oauth_state(&self, state: &str) -> bool {
        if let Some((_, expires)) = self.oauth_states.remove(state) {
            return expires > Instant::now();
        }

        let key = Self::key(OAUTH_STATE_PREFIX, state);
        if self.get_raw(&key).await.is_none() {
            return false;
        }
        match self.store.delete(&key).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache DEL failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::NewsError;
    use crate::storage::sqlite::{SqliteCacheStore, SqliteStorage};
    use crate::storage::traits::MockCacheStore;
    use crate::storage::NoopStore;

    fn setup() -> EnrichmentCache {
        let store = SqliteCacheStore::new(SqliteStorage::in_memory().unwrap());
        EnrichmentCache::new(Arc::new(store), Duration::from_secs(300))
    }

    #[tokio::test]
    async fn test_categories_roundtrip_by_text() {
        let cache = setup();
        let text = "Senate passes budget";

        assert!(cache.categories(text).await.is_none());
        cache
            .set_categories(text, &["Politics".to_string(), "US".to_string()])
            .await;
        assert_eq!(
            cache.categories(text).await,
            Some(vec!["Politics".to_string(), "US".to_string()])
        );
        assert!(cache.categories("Senate passes").await.is_none());
    }

    #[tokio::test]
    async fn test_related_and_thumbnail_keyed_by_id() {
        let cache = setup();
        let related = vec![RelatedArticle {
            id: "2".to_string(),
            title: "Other".to_string(),
            url: "https://example.com/2".to_string(),
            origin: "Feed".to_string(),
        }];

        cache.set_related("1", &related).await;
        cache.set_thumbnail("1", "data:image/webp;base64,AA").await;

        assert_eq!(cache.related("1").await, Some(related));
        assert!(cache.related("2").await.is_none());
        assert_eq!(
            cache.thumbnail("1").await.as_deref(),
            Some("data:image/webp;base64,AA")
        );
    }

    #[tokio::test]
    async fn test_store_errors_are_misses() {
        let mut store = MockCacheStore::new();
        store
            .expect_get()
            .returning(|_| Err(NewsError::Cache("connection refused".to_string())));
        store
            .expect_set_ex()
            .returning(|_, _, _| Err(NewsError::Cache("connection refused".to_string())));

        let cache = EnrichmentCache::new(Arc::new(store), Duration::from_secs(60));
        cache.set_thumbnail("1", "x").await;
        assert!(cache.thumbnail("1").await.is_none());
    }

    #[tokio::test]
    async fn test_garbage_json_is_a_miss() {
        let mut store = MockCacheStore::new();
        store
            .expect_get()
            .returning(|_| Ok(Some("not json".to_string())));

        let cache = EnrichmentCache::new(Arc::new(store), Duration::from_secs(60));
        assert!(cache.categories("anything").await.is_none());
    }

    #[test]
    fn test_response_key_ignores_param_order() {
        let a = EnrichmentCache::response_key(
            "list_articles",
            &[("skip", "0".to_string()), ("limit", "20".to_string())],
        );
        let b = EnrichmentCache::response_key(
            "list_articles",
            &[("limit", "20".to_string()), ("skip", "0".to_string())],
        );
        let c = EnrichmentCache::response_key("get_article", &[("limit", "20".to_string())]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("cache:"));
        assert_eq!(a.len(), "cache:".len() + 32);
    }

    #[tokio::test]
    async fn test_oauth_state_consumed_once() {
        let cache = setup();

        cache
            .issue_oauth_state("abc", Duration::from_secs(600))
            .await;
        assert!(cache.take_oauth_state("abc").await);
        assert!(!cache.take_oauth_state("abc").await);
        assert!(!cache.take_oauth_state("never-issued").await);
    }

    #[tokio::test]
    async fn test_oauth_state_survives_disabled_store() {
        let cache = EnrichmentCache::new(Arc::new(NoopStore), Duration::from_secs(60));

        cache.issue_oauth_state("s1", Duration::from_secs(600)).await;
        assert!(cache.take_oauth_state("s1").await);
        assert!(!cache.take_oauth_state("s1").await);
    }

    #[tokio::test]
    async fn test_oauth_state_expires_in_process() {
        let cache = EnrichmentCache::new(Arc::new(NoopStore), Duration::from_secs(60));

        cache.issue_oauth_state("s2", Duration::ZERO).await;
        assert!(!cache.take_oauth_state("s2").await);
    }

    #[tokio::test]
    async fn test_oauth_state_kept_when_store_write_fails() {
        let mut store = MockCacheStore::new();
        store.expect_is_persistent().return_const(true);
        store
            .expect_set_ex()
            .returning(|_, _, _| Err(NewsError::Cache("connection refused".to_string())));
        store.expect_get().times(0);

        let cache = EnrichmentCache::new(Arc::new(store), Duration::from_secs(60));
        cache.issue_oauth_state("s4", Duration::from_secs(600)).await;
        assert!(cache.take_oauth_state("s4").await);
    }

    #[tokio::test]
    async fn test_oauth_state_issued_by_another_process() {
        let store: Arc<dyn CacheStore> =
            Arc::new(SqliteCacheStore::new(SqliteStorage::in_memory().unwrap()));
        let issuer = EnrichmentCache::new(store.clone(), Duration::from_secs(60));
        let receiver = EnrichmentCache::new(store, Duration::from_secs(60));

        issuer.issue_oauth_state("s3", Duration::from_secs(600)).await;
        assert!(receiver.take_oauth_state("s3").await);
        assert!(!issuer.take_oauth_state("s3").await);
    }
}
