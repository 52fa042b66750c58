use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use reqwest::{header::AUTHORIZATION, Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::FreshRssConfig;
use crate::domain::{Article, Source};
use crate::errors::{NewsError, NewsResult};
use crate::sources::freshrss::greader::{StreamContents, SubscriptionList};
use crate::sources::traits::ArticleSource;

const API_PREFIX: &str = "/api/greader.php";
const READING_LIST: &str = "user/-/state/com.google/reading-list";

static AUTH_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Auth=(.+)").unwrap());

/// Pull the session token out of a ClientLogin response body
pub fn parse_auth_token(body: &str) -> Option<String> {
    AUTH_TOKEN
        .captures(body)
        .map(|caps| caps[1].trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Accept both `12` and `feed/12`
fn feed_stream_id(source_id: &str) -> String {
    if source_id.starts_with("feed/") {
        source_id.to_string()
    } else {
        format!("feed/{}", source_id)
    }
}

pub struct FreshRssClient {
    client: Client,
    base_url: String,
    user: String,
    password: String,
    token: RwLock<Option<String>>,
}

impl FreshRssClient {
    pub fn new(config: &FreshRssConfig) -> NewsResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            user: config.user.clone(),
            password: config.password.clone(),
            token: RwLock::new(None),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    async fn login(&self) -> NewsResult<String> {
        info!(user = %self.user, "Logging in to FreshRSS");

        let response = self
            .client
            .get(self.api_url("/accounts/ClientLogin"))
            .query(&[("Email", self.user.as_str()), ("Passwd", self.password.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(NewsError::FreshRss(format!(
                "Failed to login to FreshRSS ({}): {}",
                status, body
            )));
        }

        let token = parse_auth_token(&body).ok_or_else(|| {
            NewsError::FreshRss("Failed to parse Auth token from FreshRSS".to_string())
        })?;

        *self.token.write().await = Some(token.clone());
        Ok(token)
    }

    async fn token(&self) -> NewsResult<String> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }
        self.login().await
    }

    async fn send_authorized(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: &str,
    ) -> NewsResult<reqwest::Response> {
        let response = self
            .client
            .get(self.api_url(path))
            .query(query)
            .header(AUTHORIZATION, format!("GoogleLogin auth={}", token))
            .send()
            .await?;
        Ok(response)
    }

    /// GET a JSON endpoint, logging in again once if the session expired
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> NewsResult<T> {
        let token = self.token().await?;
        let mut response = self.send_authorized(path, query, &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(path, "FreshRSS session rejected, logging in again");
            *self.token.write().await = None;
            let token = self.login().await?;
            response = self.send_authorized(path, query, &token).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NewsError::FreshRss(format!(
                "Failed to fetch {} from FreshRSS ({}): {}",
                path, status, body
            )));
        }

        debug!(path, "FreshRSS request succeeded");
        Ok(response.json().await?)
    }

    pub async fn reading_list_contents(&self, limit: usize) -> NewsResult<StreamContents> {
        self.get_json(
            &format!("/reader/api/0/stream/contents/{}", READING_LIST),
            &[
                ("output", "json".to_string()),
                ("n", limit.to_string()),
                // cache buster
                ("ck", Utc::now().timestamp_millis().to_string()),
            ],
        )
        .await
    }

    pub async fn feed_contents(&self, source_id: &str, limit: usize) -> NewsResult<StreamContents> {
        self.get_json(
            &format!("/reader/api/0/stream/contents/{}", feed_stream_id(source_id)),
            &[("output", "json".to_string()), ("n", limit.to_string())],
        )
        .await
    }

    pub async fn item_contents(&self, id: &str) -> NewsResult<StreamContents> {
        self.get_json(
            "/reader/api/0/stream/items/contents",
            &[("output", "json".to_string()), ("i", id.to_string())],
        )
        .await
    }

    pub async fn subscription_list(&self) -> NewsResult<SubscriptionList> {
        self.get_json(
            "/reader/api/0/subscription/list",
            &[("output", "json".to_string())],
        )
        .await
    }

    #[cfg(test)]
    async fn set_token(&self, token: &str) {
        *self.token.write().await = Some(token.to_string());
    }
}

#[async_trait]
impl ArticleSource for FreshRssClient {
    async fn reading_list(&self, limit: usize) -> NewsResult<Vec<Article>> {
        let contents = self.reading_list_contents(limit).await?;
        Ok(contents.items.into_iter().map(|i| i.into_article()).collect())
    }

    async fn source_articles(&self, source_id: &str, limit: usize) -> NewsResult<Vec<Article>> {
        let contents = self.feed_contents(source_id, limit).await?;
        Ok(contents.items.into_iter().map(|i| i.into_article()).collect())
    }

    async fn article(&self, id: &str) -> NewsResult<Option<Article>> {
        let contents = self.item_contents(id).await?;
        Ok(contents.items.into_iter().next().map(|i| i.into_article()))
    }

    async fn sources(&self) -> NewsResult<Vec<Source>> {
        let list = self.subscription_list().await?;
        Ok(list
            .subscriptions
            .into_iter()
            .map(|s| s.into_source())
            .collect())
    }
}
