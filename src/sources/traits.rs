use async_trait::async_trait;

use crate::domain::{Article, Source};
use crate::errors::NewsResult;

/// Where articles and subscriptions come from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Most recent articles across every subscription, as delivered
    async fn reading_list(&self, limit: usize) -> NewsResult<Vec<Article>>;

    /// Articles of a single subscription
    async fn source_articles(&self, source_id: &str, limit: usize) -> NewsResult<Vec<Article>>;

    /// Look up one article by id
    async fn article(&self, id: &str) -> NewsResult<Option<Article>>;

    /// All subscriptions
    async fn sources(&self) -> NewsResult<Vec<Source>>;
}
