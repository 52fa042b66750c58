use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::categorizer::{canonicalize, Categorizer, CATEGORIES};
use crate::errors::{NewsError, NewsResult};

// Greedy and single-line: first '[' to the last ']' on that line
static JSON_ARRAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[.*\]").unwrap());

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

pub struct OllamaCategorizer {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaCategorizer {
    pub fn new(endpoint: &str, model: &str) -> NewsResult<Self> {
        if endpoint.is_empty() {
            return Err(NewsError::Config("Ollama endpoint cannot be empty".to_string()));
        }

        let client = Client::builder()
            // Local models can be slow
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn build_prompt(text: &str) -> String {
        format!(
            "Given the following news article, assign all relevant categories from this list: {}. Return only a JSON array of category names.\n\nArticle:\n{}\n\nCategories:",
            CATEGORIES.join(", "),
            text
        )
    }

    /// Pull the category array out of a free-form completion. Anything that
    /// does not parse yields no categories.
    pub fn parse_categories(response: &str) -> Vec<String> {
        let Some(found) = JSON_ARRAY.find(response) else {
            return Vec::new();
        };

        match serde_json::from_str::<Vec<serde_json::Value>>(found.as_str()) {
            Ok(values) => {
                let names: Vec<&str> = values.iter().filter_map(|v| v.as_str()).collect();
                canonicalize(&names)
            }
            Err(e) => {
                debug!(error = %e, "Completion contained no valid JSON array");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Categorizer for OllamaCategorizer {
    async fn categorize(&self, text: &str) -> NewsResult<Vec<String>> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: Self::build_prompt(text),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Ollama generate failed");
            return Err(NewsError::Llm(format!("Ollama returned {}: {}", status, body)));
        }

        let body: GenerateResponse = response.json().await?;
        Ok(Self::parse_categories(&body.response))
    }
}
