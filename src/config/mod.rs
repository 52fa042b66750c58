use std::str::FromStr;
use std::time::Duration;

use crate::errors::{NewsError, NewsResult};

const DEFAULT_CACHE_TTL_SECS: u64 = 5 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Sqlite,
    Disabled,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(CacheBackend::Redis),
            "sqlite" => Ok(CacheBackend::Sqlite),
            "none" | "disabled" | "off" => Ok(CacheBackend::Disabled),
            _ => Err(format!("Unknown cache backend: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategorizerKind {
    Ollama,
    Keywords,
}

impl FromStr for CategorizerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" | "llm" => Ok(CategorizerKind::Ollama),
            "keywords" | "keyword" => Ok(CategorizerKind::Keywords),
            _ => Err(format!("Unknown categorizer: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FreshRssConfig {
    pub url: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct CasdoorConfig {
    pub endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    freshrss_url: Option<String>,
    freshrss_user: Option<String>,
    freshrss_password: Option<String>,
    pub ollama_url: String,
    pub ollama_model: String,
    pub categorizer: CategorizerKind,
    pub cache_backend: CacheBackend,
    pub redis_url: String,
    pub cache_path: String,
    pub cache_ttl: Duration,
    pub worker_interval: Duration,
    pub worker_concurrency: usize,
    pub bind: String,
    pub casdoor: Option<CasdoorConfig>,
    pub debug: bool,
}

impl Config {
    /// Get the directory where the executable is located
    fn exe_dir() -> Option<std::path::PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    pub fn from_env() -> NewsResult<Self> {
        let exe_dir = Self::exe_dir();

        // Try to load .env from executable's directory first
        if let Some(ref dir) = exe_dir {
            let env_path = dir.join(".env");
            if env_path.exists() {
                dotenvy::from_path(&env_path).ok();
            }
        }
        // Fall back to current directory
        dotenvy::dotenv().ok();

        let categorizer = parse_var("CATEGORIZER", CategorizerKind::Ollama)?;
        let cache_backend = parse_var("CACHE_BACKEND", CacheBackend::Redis)?;

        // Default cache path is relative to executable directory
        let cache_path = std::env::var("NEWSFEED_CACHE_PATH").unwrap_or_else(|_| {
            exe_dir
                .map(|d| d.join("newsfeed-cache.db").to_string_lossy().into_owned())
                .unwrap_or_else(|| "./newsfeed-cache.db".to_string())
        });

        let cache_ttl = Duration::from_secs(parse_var("CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?);
        let worker_minutes: u64 = parse_var("WORKER_INTERVAL_MINUTES", 15)?;
        if worker_minutes == 0 {
            return Err(NewsError::Config(
                "WORKER_INTERVAL_MINUTES must be greater than zero".to_string(),
            ));
        }
        let worker_concurrency: usize = parse_var("WORKER_CONCURRENCY", 4)?;

        let casdoor = match (
            non_empty_var("CASDOOR_CLIENT_ID"),
            non_empty_var("CASDOOR_CLIENT_SECRET"),
        ) {
            (Some(client_id), Some(client_secret)) => Some(CasdoorConfig {
                endpoint: var_or("CASDOOR_ENDPOINT", "http://localhost:8000"),
                client_id,
                client_secret,
                redirect_uri: var_or(
                    "CASDOOR_REDIRECT_URI",
                    "http://localhost:8080/api/auth/callback",
                ),
            }),
            _ => None,
        };

        Ok(Self {
            freshrss_url: non_empty_var("FRESHRSS_URL"),
            freshrss_user: non_empty_var("FRESHRSS_API_USER"),
            freshrss_password: non_empty_var("FRESHRSS_API_PASSWORD"),
            ollama_url: non_empty_var("OLLAMA_URL")
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            ollama_model: var_or("OLLAMA_MODEL", "llama3"),
            categorizer,
            cache_backend,
            redis_url: var_or("REDIS_URL", "redis://localhost:6379"),
            cache_path,
            cache_ttl,
            worker_interval: Duration::from_secs(worker_minutes * 60),
            worker_concurrency: worker_concurrency.max(1),
            bind: var_or("NEWSFEED_BIND", "0.0.0.0:8080"),
            casdoor,
            debug: is_truthy(&var_or("BACKEND_DEBUG", "false")),
        })
    }

    /// FreshRSS credentials, required by every command that reads articles
    pub fn freshrss(&self) -> NewsResult<FreshRssConfig> {
        let url = self
            .freshrss_url
            .clone()
            .ok_or_else(|| NewsError::MissingEnvVar("FRESHRSS_URL".to_string()))?;
        let user = self
            .freshrss_user
            .clone()
            .ok_or_else(|| NewsError::MissingEnvVar("FRESHRSS_API_USER".to_string()))?;
        let password = self
            .freshrss_password
            .clone()
            .ok_or_else(|| NewsError::MissingEnvVar("FRESHRSS_API_PASSWORD".to_string()))?;

        Ok(FreshRssConfig {
            url: url.trim_end_matches('/').to_string(),
            user,
            password,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn var_or(name: &str, default: &str) -> String {
    non_empty_var(name).unwrap_or_else(|| default.to_string())
}

fn parse_var<T>(name: &str, default: T) -> NewsResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| NewsError::Config(format!("{}: {}", name, e))),
        None => Ok(default),
    }
}

pub fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "t" | "yes")
}
