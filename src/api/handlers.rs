use std::time::Duration;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Json,
};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::AppState;
use crate::categorizer::CATEGORIES;
use crate::domain::Article;
use crate::errors::{NewsError, NewsResult};
use crate::services::{export_opml, ArticleQuery, AuthService};

pub const MAX_BATCH: usize = 100;
pub const OAUTH_STATE_TTL: Duration = Duration::from_secs(600);
pub const AUTH_COOKIES: [&str; 2] = ["auth_token", "refresh_token"];

const INVALID_BATCH: &str = "Missing or invalid articles array";

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn news(State(state): State<AppState>) -> NewsResult<Json<Value>> {
    let items = state.news.feed().await?;
    Ok(Json(json!({ "items": items })))
}

pub async fn list_articles(
    State(state): State<AppState>,
    query: Result<Query<ArticleQuery>, QueryRejection>,
) -> NewsResult<Json<Value>> {
    let Query(query) = query.map_err(|e| NewsError::InvalidInput(e.body_text()))?;
    let page = state.news.list_articles(&query).await?;
    Ok(Json(serde_json::to_value(page)?))
}

pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> NewsResult<Json<Value>> {
    let article = state.news.article(&id).await?;
    Ok(Json(json!({ "article": article })))
}

#[derive(Debug, Deserialize)]
pub struct CategorizeRequest {
    #[serde(default)]
    text: Option<String>,
}

pub async fn categorize(
    State(state): State<AppState>,
    body: Result<Json<CategorizeRequest>, JsonRejection>,
) -> NewsResult<Json<Value>> {
    let text = body
        .ok()
        .and_then(|Json(req)| req.text)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| NewsError::InvalidInput("Missing text".to_string()))?;

    let categories = state.enrichment.categorize_text(&text).await?;
    Ok(Json(json!({ "categories": categories })))
}

pub async fn list_categories() -> Json<Value> {
    Json(json!({ "categories": CATEGORIES }))
}

pub async fn article_categories(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> NewsResult<Json<Value>> {
    let article = state.news.article(&id).await?;
    let categories = state
        .enrichment
        .categorize_text(&article.categorization_text())
        .await?;
    Ok(Json(json!({ "articleId": article.id, "categories": categories })))
}

/// Articles out of a `{"articles": [...]}` body
fn batch_articles(body: Result<Json<Value>, JsonRejection>) -> NewsResult<Vec<Article>> {
    let invalid = || NewsError::InvalidInput(INVALID_BATCH.to_string());

    let Json(mut body) = body.map_err(|_| invalid())?;
    let articles = body
        .get_mut("articles")
        .filter(|a| a.is_array())
        .map(Value::take)
        .ok_or_else(invalid)?;

    let articles: Vec<Article> = serde_json::from_value(articles).map_err(|_| invalid())?;
    if articles.len() > MAX_BATCH {
        return Err(NewsError::InvalidInput(format!(
            "Too many articles, at most {} per request",
            MAX_BATCH
        )));
    }
    Ok(articles)
}

pub async fn categories_batch(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> NewsResult<Json<Value>> {
    let articles = batch_articles(body)?;
    let cache = state.enrichment.cache();

    let cached = join_all(
        articles
            .iter()
            .map(|article| cache.categories_for_article(article)),
    )
    .await;

    let mut uncached = Vec::new();
    let mut results = Vec::with_capacity(articles.len());
    for (article, categories) in articles.into_iter().zip(cached) {
        let missing = categories.is_none();
        results.push(json!({
            "articleId": article.id,
            "categories": categories.unwrap_or_default(),
        }));
        if missing {
            uncached.push(article);
        }
    }

    if !uncached.is_empty() {
        debug!(count = uncached.len(), "Scheduling enrichment for uncached articles");
        state.enrichment.spawn_background(uncached);
    }

    Ok(Json(json!({ "results": results })))
}

pub async fn related_batch(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> NewsResult<Json<Value>> {
    let articles = batch_articles(body)?;
    let cache = state.enrichment.cache();

    let cached = join_all(articles.iter().map(|article| cache.related(&article.id))).await;

    let mut uncached = false;
    let mut results = Vec::with_capacity(articles.len());
    for (article, related) in articles.iter().zip(cached) {
        uncached |= related.is_none();
        results.push(json!({
            "articleId": article.id,
            "related": related.unwrap_or_default(),
        }));
    }

    // Related lists are computed across the whole batch
    if uncached {
        state.enrichment.spawn_background(articles);
    }

    Ok(Json(json!({ "results": results })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbQuery {
    #[serde(default)]
    article_id: Option<String>,
}

pub async fn thumbnail(
    State(state): State<AppState>,
    query: Result<Query<ThumbQuery>, QueryRejection>,
) -> NewsResult<Json<Value>> {
    let article_id = query
        .ok()
        .and_then(|Query(q)| q.article_id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| NewsError::InvalidInput("Missing articleId".to_string()))?;

    let thumb = state.enrichment.cache().thumbnail(&article_id).await;
    Ok(Json(json!({ "thumb": thumb })))
}

pub async fn list_sources(State(state): State<AppState>) -> NewsResult<Json<Value>> {
    let sources = state.news.sources().await?;
    Ok(Json(json!({ "sources": sources })))
}

pub async fn source_articles(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> NewsResult<Json<Value>> {
    let articles = state.news.source_articles(&id).await?;
    Ok(Json(json!({ "articles": articles })))
}

pub async fn export_sources(State(state): State<AppState>) -> NewsResult<Response> {
    let sources = state.news.sources().await?;
    let document = export_opml(&sources)?;
    Ok(([(header::CONTENT_TYPE, "text/x-opml")], document).into_response())
}

fn auth_service(state: &AppState) -> NewsResult<&AuthService> {
    state
        .auth
        .as_deref()
        .ok_or_else(|| NewsError::NotConfigured("Authentication is not configured".to_string()))
}

pub async fn login(State(state): State<AppState>) -> NewsResult<Redirect> {
    let auth = auth_service(&state)?;

    let login_state = Uuid::new_v4().to_string();
    state
        .enrichment
        .cache()
        .issue_oauth_state(&login_state, OAUTH_STATE_TTL)
        .await;

    Ok(Redirect::temporary(&auth.authorize_url(&login_state)?))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

pub async fn callback(
    State(state): State<AppState>,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> NewsResult<Json<Value>> {
    let auth = auth_service(&state)?;
    let Query(query) = query.map_err(|e| NewsError::InvalidInput(e.body_text()))?;

    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| NewsError::InvalidInput("Missing code".to_string()))?;
    let login_state = query
        .state
        .filter(|s| !s.is_empty())
        .ok_or_else(|| NewsError::InvalidInput("Missing state".to_string()))?;

    if !state.enrichment.cache().take_oauth_state(&login_state).await {
        return Err(NewsError::InvalidInput("Invalid or expired state".to_string()));
    }

    let token = auth.exchange_code(&code).await?;
    let user = auth.user_info(&token.access_token).await?;
    info!(user_id = %user.id, "User signed in");

    Ok(Json(json!({
        "user": user,
        "access_token": token.access_token,
        "expires_in": token.expires_in,
        "refresh_token": token.refresh_token,
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Refresh token from the JSON body, else from the `refresh_token` cookie
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> NewsResult<Json<Value>> {
    let auth = auth_service(&state)?;

    let from_body = body
        .ok()
        .and_then(|Json(req)| req.refresh_token)
        .filter(|t| !t.is_empty());
    let refresh = from_body
        .or_else(|| cookie(&headers, "refresh_token").map(str::to_string))
        .ok_or_else(|| NewsError::InvalidInput("No refresh token provided".to_string()))?;

    let token = auth.refresh_token(&refresh).await?;
    debug!("Access token refreshed");

    Ok(Json(json!({
        "access_token": token.access_token,
        "expires_in": token.expires_in,
        "refresh_token": token.refresh_token,
    })))
}

pub async fn logout() -> impl IntoResponse {
    let cleared = AUTH_COOKIES.map(|name| {
        (
            header::SET_COOKIE,
            format!("{}=; Path=/; Max-Age=0; HttpOnly", name),
        )
    });
    (AppendHeaders(cleared), Json(json!({ "success": true })))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> NewsResult<Json<Value>> {
    let auth = auth_service(&state)?;
    let token = bearer_token(&headers)
        .ok_or_else(|| NewsError::Unauthorized("Missing bearer token".to_string()))?;

    let user = auth.user_info(token).await?;
    Ok(Json(json!({ "user": user })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_cookie_lookup() {
        let mut headers = HeaderMap::new();
        assert_eq!(cookie(&headers, "refresh_token"), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; refresh_token=r-1; auth_token="),
        );
        assert_eq!(cookie(&headers, "refresh_token"), Some("r-1"));
        assert_eq!(cookie(&headers, "auth_token"), None);
        assert_eq!(cookie(&headers, "token"), None);
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok-1"));
        assert_eq!(bearer_token(&headers), Some("tok-1"));
    }
}
