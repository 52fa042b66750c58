pub mod auth_service;
pub mod enrichment_service;
pub mod export_service;
pub mod news_service;
pub mod related;
pub mod thumbnail_service;

pub use auth_service::{AccessToken, AuthService};
pub use enrichment_service::{Enrichment, EnrichmentService};
pub use export_service::export_opml;
pub use news_service::{ArticlePage, ArticleQuery, NewsService};
pub use thumbnail_service::ThumbnailService;
