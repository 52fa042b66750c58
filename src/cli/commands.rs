use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "newsfeed")]
#[command(about = "News aggregation backend over FreshRSS with LLM categorization")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API and the enrichment worker
    Serve {
        /// Address to listen on (overrides NEWSFEED_BIND)
        #[arg(long)]
        bind: Option<String>,

        /// Do not start the background enrichment worker
        #[arg(long)]
        no_worker: bool,
    },

    /// Print the normalized reading list
    Fetch {
        /// Maximum number of articles to print
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Only articles with this cached category
        #[arg(short, long)]
        category: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Categorize, relate and thumbnail the reading list
    Enrich {
        /// Keep running on the worker interval
        #[arg(long)]
        watch: bool,
    },

    /// Categorize a piece of text
    Categorize {
        /// Text to categorize
        text: String,

        /// Use the offline keyword categorizer
        #[arg(long)]
        keywords: bool,
    },

    /// List subscriptions or export them as OPML
    Sources {
        /// Print OPML instead of a list
        #[arg(long)]
        opml: bool,

        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}
