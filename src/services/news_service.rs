use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{normalize_feed, Article, RelatedArticle, Source};
use crate::errors::{NewsError, NewsResult};
use crate::services::related::related_map;
use crate::sources::ArticleSource;
use crate::storage::EnrichmentCache;
use crate::text::{favicon_url, html_to_text};

pub const READING_LIST_LIMIT: usize = 1000;
pub const SOURCE_ARTICLES_LIMIT: usize = 100;
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

const LIST_CACHE_TTL: Duration = Duration::from_secs(60);
const ARTICLE_CACHE_TTL: Duration = Duration::from_secs(300);
const CACHE_LOOKUP_CONCURRENCY: usize = 32;

/// Listing parameters for `/api/articles`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
    pub source: Option<String>,
    pub search: Option<String>,
}

impl ArticleQuery {
    fn page(&self) -> NewsResult<(usize, usize)> {
        let skip = self.skip.unwrap_or(0);
        if skip < 0 {
            return Err(NewsError::InvalidInput(
                "skip must be zero or greater".to_string(),
            ));
        }

        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(NewsError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        Ok((skip as usize, limit as usize))
    }

    fn filter(field: &Option<String>) -> Option<String> {
        field
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_lowercase)
    }

    fn matches(&self, article: &Article) -> bool {
        if let Some(category) = Self::filter(&self.category) {
            if !article
                .categories
                .iter()
                .any(|c| c.to_lowercase().contains(&category))
            {
                return false;
            }
        }

        if let Some(source) = Self::filter(&self.source) {
            let stream = article.origin.stream_id.as_deref().unwrap_or_default();
            let stream_matches = stream.eq_ignore_ascii_case(&source)
                || stream.strip_prefix("feed/") == Some(source.as_str());
            if !stream_matches && !article.origin.title.to_lowercase().contains(&source) {
                return false;
            }
        }

        if let Some(search) = Self::filter(&self.search) {
            if !article.title.to_lowercase().contains(&search)
                && !html_to_text(&article.summary.content)
                    .to_lowercase()
                    .contains(&search)
            {
                return false;
            }
        }

        true
    }

    fn cache_params(&self, skip: usize, limit: usize) -> Vec<(&'static str, String)> {
        vec![
            ("skip", skip.to_string()),
            ("limit", limit.to_string()),
            ("category", Self::filter(&self.category).unwrap_or_default()),
            ("source", Self::filter(&self.source).unwrap_or_default()),
            ("search", Self::filter(&self.search).unwrap_or_default()),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticlePage {
    pub articles: Vec<Article>,
    pub total: usize,
    pub skip: usize,
    pub limit: usize,
}

/// Reads articles from the source and decorates them with whatever
/// enrichment is already cached. Never computes categories itself.
pub struct NewsService {
    source: Arc<dyn ArticleSource>,
    cache: EnrichmentCache,
}

impl NewsService {
    pub fn new(source: Arc<dyn ArticleSource>, cache: EnrichmentCache) -> Self {
        Self { source, cache }
    }

    /// Reading list, sorted newest first and deduplicated
    pub async fn normalized_feed(&self) -> NewsResult<Vec<Article>> {
        let articles = self.source.reading_list(READING_LIST_LIMIT).await?;
        let fetched = articles.len();
        let articles = normalize_feed(articles);
        debug!(fetched, kept = articles.len(), "Normalized reading list");
        Ok(articles)
    }

    /// The full feed with related articles freshly computed
    pub async fn feed(&self) -> NewsResult<Vec<Article>> {
        let articles = self.normalized_feed().await?;
        let related = related_map(&articles);
        Ok(self.decorate(articles, Some(related)).await)
    }

    pub async fn list_articles(&self, query: &ArticleQuery) -> NewsResult<ArticlePage> {
        let (skip, limit) = query.page()?;
        let key = EnrichmentCache::response_key("articles", &query.cache_params(skip, limit));

        if let Some(page) = self.cache.get_json::<ArticlePage>(&key).await {
            debug!("Article list served from cache");
            return Ok(page);
        }

        let matching: Vec<Article> = self
            .feed()
            .await?
            .into_iter()
            .filter(|article| query.matches(article))
            .collect();

        let page = ArticlePage {
            total: matching.len(),
            articles: matching.into_iter().skip(skip).take(limit).collect(),
            skip,
            limit,
        };

        self.cache.set_json(&key, &page, LIST_CACHE_TTL).await;
        Ok(page)
    }

    pub async fn article(&self, id: &str) -> NewsResult<Article> {
        let key = EnrichmentCache::response_key("article", &[("id", id.to_string())]);
        if let Some(article) = self.cache.get_json::<Article>(&key).await {
            return Ok(article);
        }

        let article = self
            .source
            .article(id)
            .await?
            .ok_or_else(|| NewsError::NotFound("Article not found".to_string()))?;

        let article = self
            .decorate(vec![article], None)
            .await
            .into_iter()
            .next()
            .ok_or_else(|| NewsError::NotFound("Article not found".to_string()))?;

        self.cache.set_json(&key, &article, ARTICLE_CACHE_TTL).await;
        Ok(article)
    }

    pub async fn source_articles(&self, source_id: &str) -> NewsResult<Vec<Article>> {
        let articles = self
            .source
            .source_articles(source_id, SOURCE_ARTICLES_LIMIT)
            .await?;
        let articles = normalize_feed(articles);
        let related = related_map(&articles);
        Ok(self.decorate(articles, Some(related)).await)
    }

    pub async fn sources(&self) -> NewsResult<Vec<Source>> {
        let mut sources = self.source.sources().await?;
        sources.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        Ok(sources)
    }

    /// Attach cached categories and thumbnails. Related comes from `related`
    /// when given, else from the cache.
    async fn decorate(
        &self,
        articles: Vec<Article>,
        mut related: Option<HashMap<String, Vec<RelatedArticle>>>,
    ) -> Vec<Article> {
        let with_related: Vec<(Article, Option<Vec<RelatedArticle>>)> = articles
            .into_iter()
            .map(|article| {
                let computed = related.as_mut().and_then(|map| map.remove(&article.id));
                (article, computed)
            })
            .collect();

        stream::iter(with_related)
            .map(|(article, computed)| self.decorate_one(article, computed))
            .buffered(CACHE_LOOKUP_CONCURRENCY)
            .collect()
            .await
    }

    async fn decorate_one(
        &self,
        mut article: Article,
        computed: Option<Vec<RelatedArticle>>,
    ) -> Article {
        article.categories = self
            .cache
            .categories(&article.categorization_text())
            .await
            .unwrap_or_default();

        article.related = match computed {
            Some(related) => related,
            None => self.cache.related(&article.id).await.unwrap_or_default(),
        };

        article.thumbnail_url = match self.cache.thumbnail(&article.id).await {
            Some(thumb) => Some(thumb),
            None => article
                .image_url
                .clone()
                .or_else(|| article.origin.html_url.as_deref().map(favicon_url)),
        };

        article
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Origin;
    use crate::sources::traits::MockArticleSource;
    use crate::storage::sqlite::{SqliteCacheStore, SqliteStorage};
    use crate::storage::NoopStore;

    fn origin(title: &str, stream: &str) -> Origin {
        Origin {
            title: title.to_string(),
            html_url: Some(format!("https://{}.example.com/", stream.replace('/', ""))),
            stream_id: Some(stream.to_string()),
        }
    }

    fn sample_feed() -> Vec<Article> {
        vec![
            Article::new("a".to_string(), "Storm hits coast".to_string())
                .with_published(100)
                .with_origin(origin("Weather Desk", "feed/1")),
            Article::new("b".to_string(), "Storm hits coast again".to_string())
                .with_published(300)
                .with_origin(origin("Daily News", "feed/2"))
                .with_image_url(Some("https://img.example.com/storm.jpg".to_string())),
            Article::new("dup".to_string(), "Storm hits coast".to_string())
                .with_published(100)
                .with_origin(origin("Weather Desk", "feed/1")),
            Article::new("c".to_string(), "Markets rally on rate cut".to_string())
                .with_published(200)
                .with_summary("<p>Stocks <b>climb</b> worldwide</p>")
                .with_origin(origin("Daily News", "feed/2")),
        ]
    }

    fn sqlite_cache() -> EnrichmentCache {
        let store = SqliteCacheStore::new(SqliteStorage::in_memory().unwrap());
        EnrichmentCache::new(Arc::new(store), Duration::from_secs(3600))
    }

    fn service_with(cache: EnrichmentCache, times: usize) -> NewsService {
        let mut source = MockArticleSource::new();
        source
            .expect_reading_list()
            .times(times)
            .returning(|_| Ok(sample_feed()));
        NewsService::new(Arc::new(source), cache)
    }

    #[tokio::test]
    async fn test_feed_normalized_with_related() {
        let cache = EnrichmentCache::new(Arc::new(NoopStore), Duration::from_secs(60));
        let service = service_with(cache, 1);

        let feed = service.feed().await.unwrap();
        let ids: Vec<&str> = feed.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        assert_eq!(feed[0].related[0].id, "a");
        assert_eq!(feed[2].related[0].id, "b");
        assert!(feed[1].related.is_empty());
    }

    #[tokio::test]
    async fn test_feed_thumbnail_fallbacks() {
        let cache = sqlite_cache();
        cache.set_thumbnail("c", "data:image/webp;base64,AAAA").await;
        let service = service_with(cache, 1);

        let feed = service.feed().await.unwrap();
        assert_eq!(
            feed[0].thumbnail_url.as_deref(),
            Some("https://img.example.com/storm.jpg")
        );
        assert_eq!(
            feed[1].thumbnail_url.as_deref(),
            Some("data:image/webp;base64,AAAA")
        );
        assert!(feed[2]
            .thumbnail_url
            .as_deref()
            .unwrap()
            .starts_with("https://t2.gstatic.com/faviconV2"));
    }

    #[tokio::test]
    async fn test_feed_attaches_cached_categories() {
        let cache = sqlite_cache();
        let markets = &sample_feed()[3];
        cache
            .set_categories(&markets.categorization_text(), &["Business".to_string()])
            .await;
        let service = service_with(cache, 1);

        let feed = service.feed().await.unwrap();
        assert_eq!(feed[1].categories, vec!["Business"]);
        assert!(feed[0].categories.is_empty());
    }

    #[tokio::test]
    async fn test_list_articles_paginates() {
        let cache = EnrichmentCache::new(Arc::new(NoopStore), Duration::from_secs(60));
        let service = service_with(cache, 1);

        let page = service
            .list_articles(&ArticleQuery {
                skip: Some(1),
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.skip, 1);
        assert_eq!(page.limit, 1);
        assert_eq!(page.articles.len(), 1);
        assert_eq!(page.articles[0].id, "c");
    }

    #[tokio::test]
    async fn test_list_articles_filters() {
        let cache = EnrichmentCache::new(Arc::new(NoopStore), Duration::from_secs(60));
        let service = service_with(cache, 3);

        let by_source = service
            .list_articles(&ArticleQuery {
                source: Some("2".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_source.total, 2);

        let by_search = service
            .list_articles(&ArticleQuery {
                search: Some("CLIMB".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_search.total, 1);
        assert_eq!(by_search.articles[0].id, "c");

        let by_category = service
            .list_articles(&ArticleQuery {
                category: Some("Sports".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_category.total, 0);
    }

    #[tokio::test]
    async fn test_search_reaches_past_summary_cut() {
        let filler = vec!["word"; 60].join(" ");
        let mut source = MockArticleSource::new();
        source.expect_reading_list().returning(move |_| {
            Ok(vec![Article::new("v".to_string(), "Island report".to_string())
                .with_summary(format!("<p>{} volcano</p>", filler))])
        });
        let cache = EnrichmentCache::new(Arc::new(NoopStore), Duration::from_secs(60));
        let service = NewsService::new(Arc::new(source), cache);

        let page = service
            .list_articles(&ArticleQuery {
                search: Some("volcano".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_category_and_source_match_substrings() {
        let cache = sqlite_cache();
        let markets = &sample_feed()[3];
        cache
            .set_categories(&markets.categorization_text(), &["Technology".to_string()])
            .await;
        let service = service_with(cache, 2);

        let by_category = service
            .list_articles(&ArticleQuery {
                category: Some("tech".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_category.total, 1);
        assert_eq!(by_category.articles[0].id, "c");

        let by_title = service
            .list_articles(&ArticleQuery {
                source: Some("daily".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_title.total, 2);
    }

    #[tokio::test]
    async fn test_list_articles_validates_page() {
        let cache = EnrichmentCache::new(Arc::new(NoopStore), Duration::from_secs(60));
        let service = service_with(cache, 0);

        for query in [
            ArticleQuery { skip: Some(-1), ..Default::default() },
            ArticleQuery { limit: Some(0), ..Default::default() },
            ArticleQuery { limit: Some(101), ..Default::default() },
        ] {
            let err = service.list_articles(&query).await.unwrap_err();
            assert!(matches!(err, NewsError::InvalidInput(_)));
        }
    }

    #[tokio::test]
    async fn test_list_articles_cached() {
        let service = service_with(sqlite_cache(), 1);
        let query = ArticleQuery::default();

        let first = service.list_articles(&query).await.unwrap();
        let second = service.list_articles(&query).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_article_not_found() {
        let mut source = MockArticleSource::new();
        source.expect_article().returning(|_| Ok(None));
        let cache = EnrichmentCache::new(Arc::new(NoopStore), Duration::from_secs(60));
        let service = NewsService::new(Arc::new(source), cache);

        let err = service.article("missing").await.unwrap_err();
        assert!(matches!(err, NewsError::NotFound(_)));
        assert_eq!(err.to_string(), "Not found: Article not found");
    }

    #[tokio::test]
    async fn test_article_uses_cached_related() {
        let cache = sqlite_cache();
        let related = vec![RelatedArticle::from(&sample_feed()[1])];
        cache.set_related("a", &related).await;

        let mut source = MockArticleSource::new();
        source
            .expect_article()
            .times(1)
            .returning(|_| Ok(Some(sample_feed().remove(0))));
        let service = NewsService::new(Arc::new(source), cache);

        let article = service.article("a").await.unwrap();
        assert_eq!(article.related, related);
        // second lookup comes from the response cache
        service.article("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_sources_sorted_by_title() {
        let mut source = MockArticleSource::new();
        source.expect_sources().returning(|| {
            Ok(vec![
                Source::new("2".to_string(), "zeta".to_string(), "https://z/feed".to_string()),
                Source::new("1".to_string(), "Alpha".to_string(), "https://a/feed".to_string()),
            ])
        });
        let cache = EnrichmentCache::new(Arc::new(NoopStore), Duration::from_secs(60));
        let service = NewsService::new(Arc::new(source), cache);

        let sources = service.sources().await.unwrap();
        assert_eq!(sources[0].title, "Alpha");
    }
}
