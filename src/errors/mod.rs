use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewsError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Service not configured: {0}")]
    NotConfigured(String),

    // Input errors
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Network errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // Collaborator errors
    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("FreshRSS error: {0}")]
    FreshRss(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Categorization failed: {0}")]
    Llm(String),

    // Thumbnail errors
    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    // Storage errors
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Cache error: {0}")]
    Cache(String),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("OPML export failed: {0}")]
    Opml(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type NewsResult<T> = Result<T, NewsError>;
