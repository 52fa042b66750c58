use serde::{Deserialize, Serialize};

/// A FreshRSS subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub title: String,
    pub url: String,
    pub feed_url: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

impl Source {
    pub fn new(id: String, title: String, feed_url: String) -> Self {
        Self {
            id,
            title,
            url: String::new(),
            feed_url,
            category: String::new(),
            icon_url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}
