//! LinkShelf public interface
//!
//! This file defines the records handed to callers, the error type, and the
//! `LinkShelfApi` trait that every front-end (CLI, HTTP, chat bot) talks to.
//! It acts as the source of truth for shared types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

// ═══════════════════════════════════════════════════════════════════════════════
// ENUMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Content type of a saved link, inferred from its URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Video,
    Tech,
    Product,
    Article,
    Docs,
    Social,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Video,
        Category::Tech,
        Category::Product,
        Category::Article,
        Category::Docs,
        Category::Social,
    ];

    /// Storage / wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Video => "video",
            Category::Tech => "tech",
            Category::Product => "product",
            Category::Article => "article",
            Category::Docs => "docs",
            Category::Social => "social",
        }
    }

    /// Unknown database values fall back to `Article`, the classifier default
    pub fn from_database(value: &str) -> Self {
        value.parse().unwrap_or(Category::Article)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = LinkShelfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == lower)
            .ok_or_else(|| LinkShelfError::InvalidInput(format!("unknown category: {}", s)))
    }
}

/// Where a link came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkSource {
    #[default]
    Manual,
    ChannelForward,
}

impl LinkSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkSource::Manual => "manual",
            LinkSource::ChannelForward => "channel_forward",
        }
    }

    pub fn from_database(value: &str) -> Self {
        match value {
            "channel_forward" => LinkSource::ChannelForward,
            _ => LinkSource::Manual,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS (Structs)
// ═══════════════════════════════════════════════════════════════════════════════

/// A saved URL with its resolved metadata and attached tag names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category: Category,
    pub completed: bool,
    pub source: LinkSource,
    /// Present only for `ChannelForward` links
    pub source_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Attached tag names, sorted; empty when none are attached
    pub tags: Vec<String>,
}

/// Tag usage count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub name: String,
    pub count: u64,
}

/// Number of links per category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: u64,
}

/// Editable link fields. `url`, `source` and `created_at` are never touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LinkUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    pub category: Category,
}

impl LinkUpdate {
    /// Trim fields and turn blank optionals into `None`
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            description: crate::models::non_empty(self.description.as_deref()),
            image_url: crate::models::non_empty(self.image_url.as_deref()),
            category: self.category,
        }
    }
}

/// Search filters. Absent filters impose no constraint; present ones are ANDed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkFilter {
    /// Case-insensitive substring over title, description or URL
    pub text: Option<String>,
    pub category: Option<Category>,
    /// A link must carry every one of these tags
    pub tags: Vec<String>,
}

impl LinkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Per-id result of a bulk operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BulkStatus {
    Done,
    NotFound,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub id: i64,
    #[serde(flatten)]
    pub status: BulkStatus,
}

impl BulkOutcome {
    pub(crate) fn from_result(id: i64, result: Result<(), LinkShelfError>) -> Self {
        let status = match result {
            Ok(()) => BulkStatus::Done,
            Err(LinkShelfError::NotFound(_)) => BulkStatus::NotFound,
            Err(e) => BulkStatus::Failed { message: e.to_string() },
        };
        Self { id, status }
    }
}

/// Error type for LinkShelf operations
#[derive(Debug, Error)]
pub enum LinkShelfError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Link {0} not found")]
    NotFound(i64),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("HTTP client error: {0}")]
    FetchClient(String),
    #[error("Operation cancelled")]
    Cancelled,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// The primary interface for accessing the link shelf.
/// This matches the functionality exposed by the `LinkStore` object.
#[async_trait::async_trait]
pub trait LinkShelfApi: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────────
    // Ingestion
    // ─────────────────────────────────────────────────────────────────────────────

    /// Resolve metadata for `url` and upsert it. Channel forwards also get a
    /// `channel:<slug>` tag.
    async fn resolve_and_save(
        &self,
        url: String,
        source: LinkSource,
        source_name: Option<String>,
    ) -> Result<Link, LinkShelfError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Read Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// All links, newest first
    async fn list(&self) -> Result<Vec<Link>, LinkShelfError>;

    /// Filtered links, newest first
    async fn search(&self, filter: LinkFilter) -> Result<Vec<Link>, LinkShelfError>;

    async fn get(&self, id: i64) -> Result<Link, LinkShelfError>;

    async fn list_tags(&self) -> Result<Vec<TagCount>, LinkShelfError>;

    async fn list_categories(&self) -> Result<Vec<CategoryCount>, LinkShelfError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Write Operations
    // ─────────────────────────────────────────────────────────────────────────────

    async fn update(&self, id: i64, update: LinkUpdate) -> Result<Link, LinkShelfError>;

    /// Make the link's tag set equal to `tags` (created on demand)
    async fn set_tags(&self, id: i64, tags: Vec<String>) -> Result<Link, LinkShelfError>;

    async fn toggle_complete(&self, id: i64) -> Result<Link, LinkShelfError>;

    async fn delete(&self, id: i64) -> Result<(), LinkShelfError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Bulk Operations (each id succeeds or fails on its own)
    // ─────────────────────────────────────────────────────────────────────────────

    async fn bulk_add_tags(
        &self,
        ids: Vec<i64>,
        tags: Vec<String>,
    ) -> Result<Vec<BulkOutcome>, LinkShelfError>;

    async fn bulk_remove_tags(
        &self,
        ids: Vec<i64>,
        tags: Vec<String>,
    ) -> Result<Vec<BulkOutcome>, LinkShelfError>;

    async fn bulk_delete(&self, ids: Vec<i64>) -> Result<Vec<BulkOutcome>, LinkShelfError>;
}

impl From<crate::database::DatabaseError> for LinkShelfError {
    fn from(e: crate::database::DatabaseError) -> Self {
        LinkShelfError::DatabaseError(e.to_string())
    }
}

impl From<validator::ValidationErrors> for LinkShelfError {
    fn from(e: validator::ValidationErrors) -> Self {
        LinkShelfError::InvalidInput(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_roundtrip() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert_eq!(" Docs ".parse::<Category>().unwrap(), Category::Docs);
        assert!("podcast".parse::<Category>().is_err());
        assert_eq!(Category::from_database("garbage"), Category::Article);
    }

    #[test]
    fn test_link_update_validation() {
        let ok = LinkUpdate {
            title: "Title".into(),
            description: None,
            image_url: Some("https://example.com/a.png".into()),
            category: Category::Tech,
        };
        assert!(ok.validate().is_ok());

        let long_title = LinkUpdate { title: "t".repeat(201), ..ok.clone() };
        assert!(long_title.validate().is_err());

        let bad_image = LinkUpdate { image_url: Some("not a url".into()), ..ok.clone() };
        assert!(bad_image.validate().is_err());

        let blank_image = LinkUpdate { image_url: Some("   ".into()), ..ok }.normalized();
        assert_eq!(blank_image.image_url, None);
        assert!(blank_image.validate().is_ok());
    }

    #[test]
    fn test_bulk_outcome_serialization() {
        let outcome = BulkOutcome::from_result(7, Err(LinkShelfError::NotFound(7)));
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, r#"{"id":7,"status":"not_found"}"#);
    }

    #[test]
    fn test_source_wire_names() {
        assert_eq!(
            serde_json::to_string(&LinkSource::ChannelForward).unwrap(),
            "\"channel_forward\""
        );
        assert_eq!(LinkSource::from_database("something"), LinkSource::Manual);
    }
}
