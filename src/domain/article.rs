use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::text;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Origin {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
}

/// Article summary HTML. Accepts either `{"content": "..."}` or a bare string
/// so batch requests may send a plain `description`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SummaryRepr")]
pub struct Summary {
    pub content: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SummaryRepr {
    Text(String),
    Object {
        #[serde(default)]
        content: String,
    },
}

impl From<SummaryRepr> for Summary {
    fn from(repr: SummaryRepr) -> Self {
        match repr {
            SummaryRepr::Text(content) | SummaryRepr::Object { content } => Summary { content },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedArticle {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub origin: String,
}

impl From<&Article> for RelatedArticle {
    fn from(article: &Article) -> Self {
        Self {
            id: article.id.clone(),
            title: article.title.clone(),
            url: article.url.clone(),
            origin: article.origin.title.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Article {
    pub id: String,
    pub title: String,
    #[serde(alias = "description")]
    pub summary: Summary,
    pub url: String,
    pub published: i64,
    pub origin: Origin,
    pub categories: Vec<String>,
    pub related: Vec<RelatedArticle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Article {
    pub fn new(id: String, title: String) -> Self {
        Self {
            id,
            title,
            ..Default::default()
        }
    }

    pub fn with_summary(mut self, content: impl Into<String>) -> Self {
        self.summary = Summary {
            content: content.into(),
        };
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_published(mut self, published: i64) -> Self {
        self.published = published;
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }

    /// Key used to spot the same story syndicated twice
    pub fn dedupe_key(&self) -> String {
        format!("{}|{}|{}", self.title, self.origin.title, self.published)
    }

    /// Text handed to the categorizer, also the categories cache key
    pub fn categorization_text(&self) -> String {
        format!("{} {}", self.title, text::html_to_text(&self.summary.content))
    }

    /// Short plain-text summary for listings
    pub fn summary_text(&self) -> String {
        text::strip_html_and_truncate(&self.summary.content, text::DEFAULT_SUMMARY_WORDS)
    }
}

/// Keep the first article for each dedupe key, preserving order
pub fn dedupe_articles(articles: Vec<Article>) -> Vec<Article> {
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter(|article| seen.insert(article.dedupe_key()))
        .collect()
}

/// Stable sort, newest first
pub fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by(|a, b| b.published.cmp(&a.published));
}

/// Sort newest first then drop duplicates
pub fn normalize_feed(mut articles: Vec<Article>) -> Vec<Article> {
    sort_newest_first(&mut articles);
    dedupe_articles(articles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: &str, title: &str, origin: &str, published: i64) -> Article {
        Article::new(id.to_string(), title.to_string())
            .with_published(published)
            .with_origin(Origin {
                title: origin.to_string(),
                ..Default::default()
            })
    }

    #[test]
    fn test_dedupe_key_format() {
        let a = article("1", "Rust 1.75", "Rust Blog", 1703721600);
        assert_eq!(a.dedupe_key(), "Rust 1.75|Rust Blog|1703721600");
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let articles = vec![
            article("1", "Same", "Feed", 10),
            article("2", "Other", "Feed", 10),
            article("3", "Same", "Feed", 10),
        ];

        let deduped = dedupe_articles(articles);
        let ids: Vec<&str> = deduped.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_dedupe_distinguishes_origin_and_time() {
        let articles = vec![
            article("1", "Same", "Feed A", 10),
            article("2", "Same", "Feed B", 10),
            article("3", "Same", "Feed A", 11),
        ];
        assert_eq!(dedupe_articles(articles).len(), 3);
    }

    #[test]
    fn test_normalize_sorts_then_dedupes() {
        let articles = vec![
            article("old", "Old", "Feed", 1),
            article("new", "New", "Feed", 3),
            article("dup", "New", "Feed", 3),
            article("mid", "Mid", "Feed", 2),
        ];

        let normalized = normalize_feed(articles);
        let ids: Vec<&str> = normalized.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_categorization_text_strips_html() {
        let a = Article::new("1".to_string(), "Title".to_string())
            .with_summary("<p>Some <b>bold</b> text</p>");
        assert_eq!(a.categorization_text(), "Title Some bold text");
    }

    #[test]
    fn test_article_accepts_description_string() {
        let a: Article =
            serde_json::from_str(r#"{"id":"42","title":"T","description":"plain words"}"#)
                .unwrap();
        assert_eq!(a.summary.content, "plain words");
        assert!(a.categories.is_empty());
    }

    #[test]
    fn test_article_accepts_summary_object() {
        let a: Article = serde_json::from_str(
            r#"{"id":"42","title":"T","summary":{"content":"<p>x</p>"},"origin":{"title":"Feed","htmlUrl":"https://example.com"}}"#,
        )
        .unwrap();
        assert_eq!(a.summary.content, "<p>x</p>");
        assert_eq!(a.origin.html_url.as_deref(), Some("https://example.com"));
    }
}
