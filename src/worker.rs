use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::errors::NewsResult;
use crate::services::{EnrichmentService, NewsService};

/// Periodic enrichment of the whole reading list
pub struct Worker {
    news: Arc<NewsService>,
    enrichment: Arc<EnrichmentService>,
    interval: Duration,
}

impl Worker {
    pub fn new(
        news: Arc<NewsService>,
        enrichment: Arc<EnrichmentService>,
        interval: Duration,
    ) -> Self {
        Self {
            news,
            enrichment,
            interval,
        }
    }

    /// One pass over a freshly fetched reading list
    pub async fn run_once(&self) -> NewsResult<usize> {
        let articles = self.news.normalized_feed().await?;
        Ok(self.enrichment.process_all(&articles).await)
    }

    /// Run immediately, then on every interval until `shutdown` fires
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "Enrichment worker started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!(error = %e, "Enrichment pass failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Enrichment worker stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
