//! Google Reader API payloads as served by FreshRSS.

use serde::Deserialize;

use crate::domain::{Article, Origin, Source};

#[derive(Debug, Clone, Deserialize)]
pub struct StreamContents {
    #[serde(default)]
    pub items: Vec<StreamItem>,
    #[serde(default)]
    pub continuation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOrigin {
    #[serde(default)]
    pub stream_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamItem {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub published: Option<i64>,
    #[serde(default)]
    pub summary: Option<Content>,
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub alternate: Vec<Link>,
    #[serde(default)]
    pub canonical: Vec<Link>,
    #[serde(default)]
    pub enclosure: Vec<Link>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub origin: Option<ItemOrigin>,
}

impl StreamItem {
    fn image_url(&self) -> Option<String> {
        if let Some(image) = self.image.as_ref().filter(|i| i.starts_with("http")) {
            return Some(image.clone());
        }

        self.enclosure
            .iter()
            .filter(|e| e.kind.as_deref().map_or(true, |kind| kind.starts_with("image/")))
            .filter_map(|e| e.href.as_ref())
            .find(|href| href.starts_with("http"))
            .cloned()
    }

    pub fn into_article(self) -> Article {
        let image_url = self.image_url();

        let title = self
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".to_string());

        let summary = self
            .summary
            .or(self.content)
            .map(|c| c.content)
            .unwrap_or_default();

        let url = self
            .alternate
            .into_iter()
            .chain(self.canonical)
            .filter_map(|l| l.href)
            .find(|href| !href.is_empty())
            .unwrap_or_default();

        let origin = self
            .origin
            .map(|o| Origin {
                title: o.title.unwrap_or_default(),
                html_url: o.html_url,
                stream_id: o.stream_id,
            })
            .unwrap_or_default();

        Article::new(self.id, title)
            .with_summary(summary)
            .with_url(url)
            .with_published(self.published.unwrap_or(0))
            .with_origin(origin)
            .with_image_url(image_url)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionList {
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub categories: Vec<Label>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub icon_url: Option<String>,
}

impl Subscription {
    pub fn into_source(self) -> Source {
        let category = self
            .categories
            .into_iter()
            .map(|c| c.label)
            .find(|label| !label.is_empty())
            .unwrap_or_default();

        let id = self
            .id
            .strip_prefix("feed/")
            .unwrap_or(&self.id)
            .to_string();

        let mut source = Source::new(id, self.title, self.url)
            .with_url(self.html_url)
            .with_category(category);
        source.icon_url = self.icon_url.filter(|u| !u.is_empty());
        source
    }
}
