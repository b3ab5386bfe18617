//! Ingestion of raw messages
//!
//! A message front-end hands over plain text and, for forwarded posts, the
//! channel it came from. Every URL in the text becomes one `IngestEvent`, and
//! `Ingestor` saves them concurrently, reporting one outcome per URL.

use crate::interface::{Link, LinkShelfApi, LinkSource};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// http(s) URL up to the next whitespace
static URL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s]+").unwrap());

static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Channel name used when a forward carries no usable name
pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";

/// One URL to resolve and save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestEvent {
    pub url: String,
    pub source: LinkSource,
    pub source_name: Option<String>,
}

/// Result for a single event
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    Saved(Link),
    Failed { url: String, error: String },
}

/// Every URL in `text`, in order of appearance, without exact duplicates
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    URL_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Build events for a message. `forwarded_from` is the channel name of a
/// forwarded post, `None` for a manual submission.
pub fn events_from_message(text: &str, forwarded_from: Option<&str>) -> Vec<IngestEvent> {
    let (source, source_name) = match forwarded_from {
        Some(name) => {
            let name = name.trim();
            let name = if name.is_empty() { UNKNOWN_CHANNEL } else { name };
            (LinkSource::ChannelForward, Some(name.to_string()))
        }
        None => (LinkSource::Manual, None),
    };

    extract_urls(text)
        .into_iter()
        .map(|url| IngestEvent {
            url,
            source,
            source_name: source_name.clone(),
        })
        .collect()
}

/// `channel:<slug>` tag for a channel name, e.g. "Tech News" -> "channel:tech-news"
pub fn channel_tag(channel_name: &str) -> String {
    let lower = channel_name.trim().to_lowercase();
    format!("channel:{}", WHITESPACE_REGEX.replace_all(&lower, "-"))
}

/// Saves ingestion events through any `LinkShelfApi` with bounded concurrency
pub struct Ingestor {
    api: Arc<dyn LinkShelfApi>,
    concurrency: usize,
}

impl Ingestor {
    pub fn new(api: Arc<dyn LinkShelfApi>, concurrency: usize) -> Self {
        Self {
            api,
            concurrency: concurrency.max(1),
        }
    }

    /// Save every event. Outcomes come back in input order; one failing URL
    /// never stops the others.
    pub async fn ingest(&self, events: Vec<IngestEvent>) -> Vec<IngestOutcome> {
        let total = events.len();
        let outcomes: Vec<IngestOutcome> = stream::iter(events)
            .map(|event| {
                let api = Arc::clone(&self.api);
                async move {
                    match api
                        .resolve_and_save(event.url.clone(), event.source, event.source_name)
                        .await
                    {
                        Ok(link) => IngestOutcome::Saved(link),
                        Err(e) => {
                            warn!(url = %event.url, error = %e, "failed to ingest url");
                            IngestOutcome::Failed {
                                url: event.url,
                                error: e.to_string(),
                            }
                        }
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let saved = outcomes
            .iter()
            .filter(|o| matches!(o, IngestOutcome::Saved(_)))
            .count();
        info!(total, saved, "ingested message");
        outcomes
    }

    /// Extract URLs from `text` and save them
    pub async fn ingest_message(&self, text: &str, forwarded_from: Option<&str>) -> Vec<IngestOutcome> {
        self.ingest(events_from_message(text, forwarded_from)).await
    }
}
