use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::CasdoorConfig;
use crate::domain::UserProfile;
use crate::errors::{NewsError, NewsResult};

pub const OAUTH_SCOPE: &str = "openid profile email address phone";

#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    preferred_username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

impl From<UserInfo> for UserProfile {
    fn from(info: UserInfo) -> Self {
        Self {
            id: info.sub,
            name: info.name.or(info.preferred_username),
            email: info.email,
            image: info.picture,
        }
    }
}

/// Tokens returned from a code exchange or a refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: Option<u64>,
    pub refresh_token: Option<String>,
}

/// Casdoor OAuth2 authorization-code flow
pub struct AuthService {
    client: Client,
    config: CasdoorConfig,
}

impl AuthService {
    pub fn new(config: CasdoorConfig) -> NewsResult<Self> {
        Url::parse(&config.endpoint)
            .map_err(|e| NewsError::InvalidUrl(format!("{}: {}", config.endpoint, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    pub fn authorize_url(&self, state: &str) -> NewsResult<String> {
        let url = Url::parse_with_params(
            &self.endpoint("/login/oauth/authorize"),
            &[
                ("client_id", self.config.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", OAUTH_SCOPE),
                ("state", state),
            ],
        )
        .map_err(|e| NewsError::InvalidUrl(e.to_string()))?;
        Ok(url.into())
    }

    pub async fn exchange_code(&self, code: &str) -> NewsResult<AccessToken> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ])
        .await
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> NewsResult<AccessToken> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> NewsResult<AccessToken> {
        let response = self
            .client
            .post(self.endpoint("/api/login/oauth/access_token"))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(%status, "Casdoor token response received");

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(%status, error = %e, "Unparsable Casdoor token response");
            NewsError::Auth("Failed to parse token response".to_string())
        })?;

        match token.access_token.filter(|t| !t.is_empty()) {
            Some(access_token) => Ok(AccessToken {
                access_token,
                expires_in: token.expires_in,
                refresh_token: token.refresh_token.filter(|t| !t.is_empty()),
            }),
            None => Err(NewsError::Auth(
                token
                    .error_description
                    .or(token.error)
                    .unwrap_or_else(|| format!("No access token in response ({})", status)),
            )),
        }
    }

    pub async fn user_info(&self, access_token: &str) -> NewsResult<UserProfile> {
        let response = self
            .client
            .get(self.endpoint("/api/userinfo"))
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(NewsError::Unauthorized("Invalid access token".to_string()));
        }
        if !status.is_success() {
            return Err(NewsError::Auth(format!("Userinfo request failed ({})", status)));
        }

        let body = response.text().await?;
        let info: UserInfo = serde_json::from_str(&body)
            .map_err(|_| NewsError::Unauthorized("Invalid access token".to_string()))?;
        Ok(info.into())
    }
}
