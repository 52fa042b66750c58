use std::fs;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;

use newsfeed::api::{self, AppState};
use newsfeed::categorizer::{self, Categorizer, KeywordCategorizer};
use newsfeed::cli::{Cli, Commands};
use newsfeed::config::Config;
use newsfeed::errors::NewsResult;
use newsfeed::logging::init_logging;
use newsfeed::services::{export_opml, AuthService, EnrichmentService, NewsService, ThumbnailService};
use newsfeed::sources::FreshRssClient;
use newsfeed::storage::open_cache;
use newsfeed::worker::Worker;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;
    init_logging(config.debug);

    match cli.command {
        Commands::Serve { bind, no_worker } => cmd_serve(&config, bind, no_worker).await?,
        Commands::Fetch {
            limit,
            category,
            json,
        } => cmd_fetch(&config, limit, category, json).await?,
        Commands::Enrich { watch } => cmd_enrich(&config, watch).await?,
        Commands::Categorize { text, keywords } => cmd_categorize(&config, &text, keywords).await?,
        Commands::Sources { opml, output } => cmd_sources(&config, opml, output).await?,
    }

    Ok(())
}

async fn build_services(config: &Config) -> NewsResult<(Arc<NewsService>, Arc<EnrichmentService>)> {
    // Fail on missing FreshRSS settings before touching the cache
    let source = Arc::new(FreshRssClient::new(&config.freshrss()?)?);
    let cache = open_cache(config).await?;

    let news = Arc::new(NewsService::new(source, cache.clone()));
    let enrichment = Arc::new(EnrichmentService::new(
        categorizer::from_config(config)?,
        cache,
        ThumbnailService::new()?,
        config.worker_concurrency,
    ));
    Ok((news, enrichment))
}

async fn cmd_serve(config: &Config, bind: Option<String>, no_worker: bool) -> anyhow::Result<()> {
    let (news, enrichment) = build_services(config).await?;

    let auth = match config.casdoor.clone() {
        Some(casdoor) => Some(Arc::new(AuthService::new(casdoor)?)),
        None => {
            tracing::warn!("Casdoor credentials not set, authentication disabled");
            None
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = if no_worker {
        None
    } else {
        let worker = Worker::new(news.clone(), enrichment.clone(), config.worker_interval);
        Some(worker.spawn(shutdown_rx))
    };

    let state = AppState {
        news,
        enrichment,
        auth,
    };
    let bind = bind.unwrap_or_else(|| config.bind.clone());

    let served = api::serve(state, &bind, api::shutdown_signal()).await;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = worker {
        let _ = handle.await;
    }

    served.with_context(|| format!("Server on {} failed", bind))
}

async fn cmd_fetch(
    config: &Config,
    limit: usize,
    category: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let (news, _) = build_services(config).await?;
    let articles: Vec<_> = news
        .feed()
        .await?
        .into_iter()
        .filter(|article| match &category {
            Some(category) => article
                .categories
                .iter()
                .any(|c| c.eq_ignore_ascii_case(category)),
            None => true,
        })
        .take(limit)
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&articles)?);
        return Ok(());
    }

    if articles.is_empty() {
        println!("No articles found.");
        return Ok(());
    }

    for article in articles {
        println!("  {} [{}]", article.title, article.origin.title);
        println!("    URL: {}", article.url);
        if !article.categories.is_empty() {
            println!("    Categories: {}", article.categories.join(", "));
        }
        if !article.related.is_empty() {
            println!("    Related: {}", article.related.len());
        }
        let summary = article.summary_text();
        if !summary.is_empty() {
            println!("    {}", summary);
        }
        println!();
    }

    Ok(())
}

async fn cmd_enrich(config: &Config, keep_running: bool) -> anyhow::Result<()> {
    let (news, enrichment) = build_services(config).await?;
    let worker = Worker::new(news, enrichment, config.worker_interval);

    if !keep_running {
        let processed = worker.run_once().await?;
        println!("Enriched {} articles.", processed);
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        api::shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });
    worker.run(shutdown_rx).await;

    Ok(())
}

async fn cmd_categorize(config: &Config, text: &str, keywords: bool) -> anyhow::Result<()> {
    let categorizer: Arc<dyn Categorizer> = if keywords {
        Arc::new(KeywordCategorizer::new())
    } else {
        categorizer::from_config(config)?
    };

    let categories = categorizer.categorize(text).await?;
    if categories.is_empty() {
        println!("No categories.");
    } else {
        println!("{}", categories.join(", "));
    }

    Ok(())
}

async fn cmd_sources(config: &Config, opml: bool, output: Option<String>) -> anyhow::Result<()> {
    let client = FreshRssClient::new(&config.freshrss()?)?;
    let cache = open_cache(config).await?;
    let sources = NewsService::new(Arc::new(client), cache).sources().await?;

    if opml {
        let document = export_opml(&sources)?;
        match output {
            Some(path) => {
                fs::write(&path, &document)
                    .with_context(|| format!("Failed to write {}", path))?;
                println!("Exported {} sources to {}", sources.len(), path);
            }
            None => println!("{}", document),
        }
        return Ok(());
    }

    if sources.is_empty() {
        println!("No subscriptions.");
        return Ok(());
    }

    println!("Subscriptions:\n");
    for source in sources {
        if source.category.is_empty() {
            println!("  {}", source.title);
        } else {
            println!("  {} [{}]", source.title, source.category);
        }
        println!("    Feed: {}", source.feed_url);
        if !source.url.is_empty() && source.url != source.feed_url {
            println!("    Site: {}", source.url);
        }
        println!();
    }

    Ok(())
}
