pub mod error;
pub mod handlers;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::NewsResult;
use crate::services::{AuthService, EnrichmentService, NewsService};

#[derive(Clone)]
pub struct AppState {
    pub news: Arc<NewsService>,
    pub enrichment: Arc<EnrichmentService>,
    /// `None` when Casdoor credentials are not configured
    pub auth: Option<Arc<AuthService>>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(handlers::health))
        .route("/health", get(handlers::health))
        .route("/api/news", get(handlers::news))
        .route("/api/articles", get(handlers::list_articles))
        .route("/api/articles/{id}", get(handlers::get_article))
        .route("/api/categorize", post(handlers::categorize))
        .route("/api/categories", get(handlers::list_categories))
        .route("/api/categories/batch", post(handlers::categories_batch))
        .route("/api/categories/{article_id}", get(handlers::article_categories))
        .route("/api/related/batch", post(handlers::related_batch))
        .route("/api/thumb", get(handlers::thumbnail))
        .route("/api/sources", get(handlers::list_sources))
        .route("/api/sources/export", get(handlers::export_sources))
        .route("/api/sources/{id}/articles", get(handlers::source_articles))
        .route("/api/auth/login", get(handlers::login))
        .route("/api/auth/callback", get(handlers::callback))
        .route("/api/auth/me", get(handlers::me))
        .route("/api/auth/refresh-token", post(handlers::refresh_token))
        .route("/api/auth/logout", post(handlers::logout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(state: AppState, bind: &str, shutdown: F) -> NewsResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(bind).await?;
    info!(address = %listener.local_addr()?, "Server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
