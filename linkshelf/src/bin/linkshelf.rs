//! Command-line front-end for the link shelf.
//!
//! Every subcommand maps onto one `LinkShelfApi` operation and prints its
//! result as JSON on stdout. Logs go to stderr.
//!
//! Usage:
//!     linkshelf save https://example.com/post
//!     linkshelf ingest "new post https://example.com/a" --channel "Tech News"
//!     linkshelf search -q rust -t reading -t async

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use linkshelf::config::{Config, LogFormat, LoggingConfig};
use linkshelf::ingest::Ingestor;
use linkshelf::{Category, LinkFilter, LinkShelfApi, LinkSource, LinkStore, LinkUpdate};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "linkshelf", version, about = "Save links with resolved metadata and search them by tag")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = "linkshelf.toml")]
    config: PathBuf,

    /// Override the database path from the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve and save a single URL
    Save {
        url: String,
        /// Record the link as forwarded from this channel
        #[arg(long)]
        channel: Option<String>,
    },
    /// Save every URL found in a message
    Ingest {
        text: String,
        #[arg(long)]
        channel: Option<String>,
    },
    /// All links, newest first
    List,
    /// Filter by text, category and tags (all tags must match)
    Search {
        #[arg(short = 'q', long)]
        query: Option<String>,
        #[arg(short, long)]
        category: Option<Category>,
        #[arg(short = 't', long = "tag")]
        tags: Vec<String>,
    },
    Show {
        id: i64,
    },
    /// Overwrite title, description, image or category; omitted fields keep their value
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
        #[arg(long)]
        category: Option<Category>,
    },
    /// Replace the link's tags
    SetTags {
        id: i64,
        tags: Vec<String>,
    },
    Toggle {
        id: i64,
    },
    Delete {
        id: i64,
    },
    BulkAddTags {
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<i64>,
        #[arg(long, value_delimiter = ',', required = true)]
        tags: Vec<String>,
    },
    BulkRemoveTags {
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<i64>,
        #[arg(long, value_delimiter = ',', required = true)]
        tags: Vec<String>,
    },
    BulkDelete {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Tag usage counts
    Tags,
    /// Link counts per category
    Categories,
}

fn init_logging(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));
    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    if let Some(db) = cli.db {
        config.database.path = db;
    }
    init_logging(&config.logging);

    let store = LinkStore::open(&config)
        .with_context(|| format!("opening database {}", config.database.path.display()))?;

    match cli.command {
        Command::Save { url, channel } => {
            let source = if channel.is_some() {
                LinkSource::ChannelForward
            } else {
                LinkSource::Manual
            };
            print_json(&store.resolve_and_save(url, source, channel).await?)?;
        }
        Command::Ingest { text, channel } => {
            let api: Arc<dyn LinkShelfApi> = Arc::new(store);
            let ingestor = Ingestor::new(api, config.ingest.concurrency);
            let outcomes = ingestor.ingest_message(&text, channel.as_deref()).await;
            if outcomes.is_empty() {
                bail!("no URLs found in message");
            }
            print_json(&outcomes)?;
        }
        Command::List => print_json(&store.list().await?)?,
        Command::Search { query, category, tags } => {
            let filter = LinkFilter { text: query, category, tags };
            print_json(&store.search(filter).await?)?;
        }
        Command::Show { id } => print_json(&store.get(id).await?)?,
        Command::Edit { id, title, description, image_url, category } => {
            let current = store.get(id).await?;
            let update = LinkUpdate {
                title: title.unwrap_or(current.title),
                description: description.or(current.description),
                image_url: image_url.or(current.image_url),
                category: category.unwrap_or(current.category),
            };
            print_json(&store.update(id, update).await?)?;
        }
        Command::SetTags { id, tags } => print_json(&store.set_tags(id, tags).await?)?,
        Command::Toggle { id } => print_json(&store.toggle_complete(id).await?)?,
        Command::Delete { id } => {
            store.delete(id).await?;
            print_json(&serde_json::json!({ "deleted": id }))?;
        }
        Command::BulkAddTags { ids, tags } => print_json(&store.bulk_add_tags(ids, tags).await?)?,
        Command::BulkRemoveTags { ids, tags } => {
            print_json(&store.bulk_remove_tags(ids, tags).await?)?
        }
        Command::BulkDelete { ids } => print_json(&store.bulk_delete(ids).await?)?,
        Command::Tags => print_json(&store.list_tags().await?)?,
        Command::Categories => print_json(&store.list_categories().await?)?,
    }

    Ok(())
}
