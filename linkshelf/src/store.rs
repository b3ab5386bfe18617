//! LinkStore - main API over the database and the metadata resolver
//!
//! The store is an explicitly constructed handle: open it once at startup,
//! share it behind an `Arc`, drop it at shutdown. It holds no cached link
//! state; every read goes back to SQLite.
//!
//! Async Cancellation Architecture:
//! When a caller abandons an operation its future is dropped. A DropGuard
//! triggers a CancellationToken that queued blocking work checks before it
//! writes, and that interrupts an in-flight search statement.

use crate::config::Config;
use crate::database::{Database, NewLink};
use crate::fetcher::{HttpFetcher, PageFetcher};
use crate::ingest::channel_tag;
use crate::interface::{
    BulkOutcome, BulkStatus, CategoryCount, Link, LinkFilter, LinkShelfApi, LinkShelfError,
    LinkSource, LinkUpdate, TagCount,
};
use crate::link_metadata::MetadataResolver;
use crate::models::{non_empty, normalize_tag_set};
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;
use validator::Validate;

/// RAII guard that cancels a token when dropped.
/// Dropping the operation's future drops this guard, which triggers the
/// cancellation token.
struct DropGuard {
    token: CancellationToken,
}

impl DropGuard {
    fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Thread-safe link store with SQLite + metadata resolution
///
/// Concurrency Model:
/// - Database uses r2d2 connection pool (concurrent reads, no mutex blocking)
/// - Upserts are atomic on the unique url; no extra locking
/// - Blocking work runs on tokio::spawn_blocking threads
pub struct LinkStore {
    db: Arc<Database>,
    resolver: Arc<MetadataResolver>,
}

impl LinkStore {
    pub fn new(db: Database, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            db: Arc::new(db),
            resolver: Arc::new(MetadataResolver::new(fetcher)),
        }
    }

    /// Open the configured database and build an HTTP fetcher
    pub fn open(config: &Config) -> Result<Self, LinkShelfError> {
        let db = Database::open(&config.database)?;
        let fetcher = HttpFetcher::new(&config.fetch)
            .map_err(|e| LinkShelfError::FetchClient(e.to_string()))?;
        Ok(Self::new(db, Arc::new(fetcher)))
    }

    /// Create a store with an in-memory database (for testing)
    pub fn new_in_memory(fetcher: Arc<dyn PageFetcher>) -> Result<Self, LinkShelfError> {
        let db = Database::open_in_memory()?;
        Ok(Self::new(db, fetcher))
    }

    /// Run database work on the blocking pool
    async fn blocking<T, F>(&self, work: F) -> Result<T, LinkShelfError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, LinkShelfError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        match tokio::task::spawn_blocking(move || work(db.as_ref())).await {
            Ok(result) => result,
            // JoinError means the task panicked or was aborted
            Err(_join_error) => Err(LinkShelfError::Cancelled),
        }
    }

    /// Apply `op` to every id independently, collecting per-id outcomes
    async fn bulk<F>(&self, ids: Vec<i64>, op: F) -> Result<Vec<BulkOutcome>, LinkShelfError>
    where
        F: Fn(&Database, i64) -> Result<bool, LinkShelfError> + Send + 'static,
    {
        self.blocking(move |db| {
            Ok(ids
                .iter()
                .map(|&id| BulkOutcome::from_result(id, op(db, id).and_then(|found| found_or(id, found))))
                .collect())
        })
        .await
    }
}

fn found_or(id: i64, found: bool) -> Result<(), LinkShelfError> {
    if found {
        Ok(())
    } else {
        Err(LinkShelfError::NotFound(id))
    }
}

/// Reject anything that is not an absolute http(s) URL
pub fn validate_link_url(url: &str) -> Result<String, LinkShelfError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(LinkShelfError::InvalidInput("url is empty".into()));
    }
    let parsed = Url::parse(trimmed)
        .map_err(|e| LinkShelfError::InvalidInput(format!("invalid url {}: {}", trimmed, e)))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(trimmed.to_string()),
        scheme => Err(LinkShelfError::InvalidInput(format!(
            "unsupported url scheme: {}",
            scheme
        ))),
    }
}

fn require_ids(ids: &[i64]) -> Result<(), LinkShelfError> {
    if ids.is_empty() {
        return Err(LinkShelfError::InvalidInput("no link ids given".into()));
    }
    Ok(())
}

fn require_tags(tags: &[String]) -> Result<Vec<String>, LinkShelfError> {
    let tags = normalize_tag_set(tags);
    if tags.is_empty() {
        return Err(LinkShelfError::InvalidInput("no tags given".into()));
    }
    Ok(tags)
}

fn summarize(op: &str, outcomes: &[BulkOutcome]) {
    let done = outcomes.iter().filter(|o| o.status == BulkStatus::Done).count();
    info!(op, requested = outcomes.len(), done, "bulk operation finished");
}

#[async_trait::async_trait]
impl LinkShelfApi for LinkStore {
    // ─────────────────────────────────────────────────────────────────────────────
    // Ingestion
    // ─────────────────────────────────────────────────────────────────────────────

    async fn resolve_and_save(
        &self,
        url: String,
        source: LinkSource,
        source_name: Option<String>,
    ) -> Result<Link, LinkShelfError> {
        let url = validate_link_url(&url)?;
        let source_name = match source {
            LinkSource::ChannelForward => non_empty(source_name.as_deref()),
            LinkSource::Manual => None,
        };

        let token = CancellationToken::new();
        let _guard = DropGuard::new(token.clone());

        let metadata = self.resolver.resolve(&url).await;

        let new_link = NewLink {
            url: url.clone(),
            title: metadata.title,
            description: non_empty(Some(metadata.description.as_str())),
            image_url: non_empty(Some(metadata.image_url.as_str())),
            category: metadata.category,
            source,
            source_name: source_name.clone(),
            saved_at: Utc::now(),
        };

        let token_clone = token.clone();
        let id = self
            .blocking(move |db| {
                // Never write once the caller has gone away
                if token_clone.is_cancelled() {
                    return Err(LinkShelfError::Cancelled);
                }
                Ok(db.upsert_link(&new_link)?)
            })
            .await?;
        info!(id, url = %url, category = %metadata.category, "saved link");

        // Second, independent write; the saved link stands even if this fails
        if let Some(name) = source_name {
            let tag = channel_tag(&name);
            let attached = self
                .blocking(move |db| Ok(db.add_tags(id, &[tag])?))
                .await;
            if let Err(e) = attached {
                warn!(id, channel = %name, error = %e, "channel tag not attached");
            }
        }

        self.get(id).await
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Read Operations
    // ─────────────────────────────────────────────────────────────────────────────

    async fn list(&self) -> Result<Vec<Link>, LinkShelfError> {
        self.search(LinkFilter::default()).await
    }

    async fn search(&self, filter: LinkFilter) -> Result<Vec<Link>, LinkShelfError> {
        // Create cancellation token and guard
        let token = CancellationToken::new();
        let _guard = DropGuard::new(token.clone());

        let runtime = tokio::runtime::Handle::current();
        let token_clone = token.clone();

        self.blocking(move |db| {
            let links = db.fetch_links_interruptible(&filter, &token_clone, &runtime)?;
            if token_clone.is_cancelled() {
                return Err(LinkShelfError::Cancelled);
            }
            Ok(links)
        })
        .await
    }

    async fn get(&self, id: i64) -> Result<Link, LinkShelfError> {
        self.blocking(move |db| db.fetch_link(id)?.ok_or(LinkShelfError::NotFound(id)))
            .await
    }

    async fn list_tags(&self) -> Result<Vec<TagCount>, LinkShelfError> {
        self.blocking(|db| Ok(db.tag_counts()?)).await
    }

    async fn list_categories(&self) -> Result<Vec<CategoryCount>, LinkShelfError> {
        self.blocking(|db| Ok(db.category_counts()?)).await
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Write Operations
    // ─────────────────────────────────────────────────────────────────────────────

    async fn update(&self, id: i64, update: LinkUpdate) -> Result<Link, LinkShelfError> {
        let update = update.normalized();
        update.validate()?;

        self.blocking(move |db| found_or(id, db.update_link(id, &update, Utc::now())?))
            .await?;
        self.get(id).await
    }

    async fn set_tags(&self, id: i64, tags: Vec<String>) -> Result<Link, LinkShelfError> {
        self.blocking(move |db| found_or(id, db.set_link_tags(id, &tags)?))
            .await?;
        self.get(id).await
    }

    async fn toggle_complete(&self, id: i64) -> Result<Link, LinkShelfError> {
        self.blocking(move |db| found_or(id, db.toggle_completed(id, Utc::now())?))
            .await?;
        self.get(id).await
    }

    async fn delete(&self, id: i64) -> Result<(), LinkShelfError> {
        self.blocking(move |db| found_or(id, db.delete_link(id)?))
            .await?;
        info!(id, "deleted link");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Bulk Operations
    // ─────────────────────────────────────────────────────────────────────────────

    async fn bulk_add_tags(
        &self,
        ids: Vec<i64>,
        tags: Vec<String>,
    ) -> Result<Vec<BulkOutcome>, LinkShelfError> {
        require_ids(&ids)?;
        let tags = require_tags(&tags)?;
        let outcomes = self
            .bulk(ids, move |db, id| Ok(db.add_tags(id, &tags)?))
            .await?;
        summarize("add_tags", &outcomes);
        Ok(outcomes)
    }

    async fn bulk_remove_tags(
        &self,
        ids: Vec<i64>,
        tags: Vec<String>,
    ) -> Result<Vec<BulkOutcome>, LinkShelfError> {
        require_ids(&ids)?;
        let tags = require_tags(&tags)?;
        let outcomes = self
            .bulk(ids, move |db, id| Ok(db.remove_tags(id, &tags)?))
            .await?;
        summarize("remove_tags", &outcomes);
        Ok(outcomes)
    }

    async fn bulk_delete(&self, ids: Vec<i64>) -> Result<Vec<BulkOutcome>, LinkShelfError> {
        require_ids(&ids)?;
        let outcomes = self
            .bulk(ids, |db, id| Ok(db.delete_link(id)?))
            .await?;
        summarize("delete", &outcomes);
        Ok(outcomes)
    }
}
