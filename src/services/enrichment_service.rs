use std::sync::Arc;

use dashmap::DashSet;
use futures::{future, stream, StreamExt};
use tracing::{debug, info, warn};

use crate::categorizer::Categorizer;
use crate::domain::{Article, RelatedArticle};
use crate::errors::NewsResult;
use crate::services::related::find_related;
use crate::services::thumbnail_service::{extract_thumbnail_url, ThumbnailService};
use crate::storage::EnrichmentCache;

/// Derived fields produced for one article
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub categories: Option<Vec<String>>,
    pub related: Option<Vec<RelatedArticle>>,
    pub thumbnail: Option<String>,
}

/// Removes an article id from the in-flight set when processing ends
struct InFlight<'a> {
    set: &'a DashSet<String>,
    id: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.id);
    }
}

pub struct EnrichmentService {
    categorizer: Arc<dyn Categorizer>,
    cache: EnrichmentCache,
    thumbnails: ThumbnailService,
    in_flight: DashSet<String>,
    concurrency: usize,
}

impl EnrichmentService {
    pub fn new(
        categorizer: Arc<dyn Categorizer>,
        cache: EnrichmentCache,
        thumbnails: ThumbnailService,
        concurrency: usize,
    ) -> Self {
        Self {
            categorizer,
            cache,
            thumbnails,
            in_flight: DashSet::new(),
            concurrency: concurrency.max(1),
        }
    }

    pub fn cache(&self) -> &EnrichmentCache {
        &self.cache
    }

    /// Categories for a piece of text, served from cache when possible
    pub async fn categorize_text(&self, text: &str) -> NewsResult<Vec<String>> {
        if let Some(categories) = self.cache.categories(text).await {
            debug!("Categories cache hit");
            return Ok(categories);
        }

        let categories = self.categorizer.categorize(text).await?;
        self.cache.set_categories(text, &categories).await;
        Ok(categories)
    }

    async fn categories_for(&self, article: &Article) -> Option<Vec<String>> {
        match self.categorize_text(&article.categorization_text()).await {
            Ok(categories) => Some(categories),
            Err(e) => {
                warn!(article_id = %article.id, error = %e, "Categorization failed");
                None
            }
        }
    }

    async fn related_for(&self, article: &Article, all: &[Article]) -> Vec<RelatedArticle> {
        if let Some(related) = self.cache.related(&article.id).await {
            return related;
        }

        let related = find_related(article, all);
        self.cache.set_related(&article.id, &related).await;
        related
    }

    async fn thumbnail_for(&self, article: &Article) -> Option<String> {
        if let Some(thumb) = self.cache.thumbnail(&article.id).await {
            return Some(thumb);
        }

        let url = extract_thumbnail_url(article)?;
        let thumb = self.thumbnails.fetch_thumbnail(&url).await?;
        self.cache.set_thumbnail(&article.id, &thumb).await;
        Some(thumb)
    }

    /// Fill the cache for one article. Returns `None` when the article is
    /// already being processed elsewhere.
    pub async fn process_article(&self, article: &Article, all: &[Article]) -> Option<Enrichment> {
        if !self.in_flight.insert(article.id.clone()) {
            debug!(article_id = %article.id, "Already enriching, skipped");
            return None;
        }
        let _guard = InFlight {
            set: &self.in_flight,
            id: article.id.clone(),
        };

        let categories = self.categories_for(article).await;
        let related = self.related_for(article, all).await;
        let thumbnail = self.thumbnail_for(article).await;

        Some(Enrichment {
            categories,
            related: Some(related),
            thumbnail,
        })
    }

    /// Enrich every article with bounded concurrency. Returns how many were
    /// processed.
    pub async fn process_all(&self, articles: &[Article]) -> usize {
        // Indices keep the stream item free of borrowed lifetimes so the
        // future stays `Send` inside `tokio::spawn`
        let processed = stream::iter(0..articles.len())
            .map(|i| self.process_article(&articles[i], articles))
            .buffer_unordered(self.concurrency)
            .filter(|result| future::ready(result.is_some()))
            .count()
            .await;

        info!(processed, total = articles.len(), "Enrichment pass complete");
        processed
    }

    /// Detached one-shot enrichment
    pub fn spawn_background(self: &Arc<Self>, articles: Vec<Article>) {
        if articles.is_empty() {
            return;
        }

        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.process_all(&articles).await;
        });
    }
}
