use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::errors::NewsError;

impl NewsError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            NewsError::InvalidInput(_) | NewsError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            NewsError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            NewsError::NotFound(_) => StatusCode::NOT_FOUND,
            NewsError::NotConfigured(_) | NewsError::MissingEnvVar(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            NewsError::Http(_)
            | NewsError::Upstream(_)
            | NewsError::FreshRss(_)
            | NewsError::Auth(_)
            | NewsError::Llm(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to API clients
    fn public_message(&self) -> String {
        match self {
            NewsError::InvalidInput(msg)
            | NewsError::NotFound(msg)
            | NewsError::Unauthorized(msg)
            | NewsError::NotConfigured(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for NewsError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = json!({
            "error": self.public_message(),
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (NewsError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (NewsError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (NewsError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (NewsError::NotConfigured("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (NewsError::FreshRss("x".into()), StatusCode::BAD_GATEWAY),
            (NewsError::Llm("x".into()), StatusCode::BAD_GATEWAY),
            (NewsError::Cache("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{}", err);
        }
    }

    #[test]
    fn test_public_message_unwraps_client_errors() {
        assert_eq!(
            NewsError::NotFound("Article not found".into()).public_message(),
            "Article not found"
        );
        assert_eq!(
            NewsError::FreshRss("down".into()).public_message(),
            "FreshRSS error: down"
        );
    }
}
