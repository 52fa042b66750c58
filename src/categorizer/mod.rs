pub mod keywords;
pub mod ollama;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{CategorizerKind, Config};
use crate::errors::NewsResult;

pub use keywords::KeywordCategorizer;
pub use ollama::OllamaCategorizer;

/// Categories an article may be assigned, in display order
pub const CATEGORIES: &[&str] = &[
    "Politics",
    "US",
    "World",
    "Sports",
    "Technology",
    "Entertainment",
    "Science",
    "Health",
    "Business",
];

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Categorizer: Send + Sync {
    /// Assign zero or more of `CATEGORIES` to the article text
    async fn categorize(&self, text: &str) -> NewsResult<Vec<String>>;
}

/// Map free-form names onto the canonical category list, dropping unknown
/// names and duplicates.
pub fn canonicalize<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .filter_map(|name| {
            let name = name.as_ref().trim();
            CATEGORIES
                .iter()
                .find(|known| known.eq_ignore_ascii_case(name))
        })
        .filter(|known| seen.insert(**known))
        .map(|known| known.to_string())
        .collect()
}

pub fn from_config(config: &Config) -> NewsResult<Arc<dyn Categorizer>> {
    match config.categorizer {
        CategorizerKind::Ollama => Ok(Arc::new(OllamaCategorizer::new(
            &config.ollama_url,
            &config.ollama_model,
        )?)),
        CategorizerKind::Keywords => Ok(Arc::new(KeywordCategorizer::new())),
    }
}
