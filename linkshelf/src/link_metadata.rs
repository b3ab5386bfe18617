//! Link metadata resolution
//!
//! Turns a raw URL into a fully populated `ResolvedMetadata`. Resolution never
//! fails: X/Twitter links are synthesized without a request, fetch failures
//! degrade to a URL-derived record, and every missing field has a default.

use crate::classifier::{self, TWITTER_ICON};
use crate::fetcher::{FetchError, HtmlDocument, PageFetcher};
use crate::interface::Category;
use crate::models::truncate_chars;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 500;
/// Title length used when the page could not be fetched
pub const FALLBACK_TITLE_CHARS: usize = 100;
pub const UNTITLED: &str = "Untitled";

const X_DESCRIPTION: &str = "Click to view on X";

/// Resolved link metadata. `description` may be empty; the other fields never are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMetadata {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub category: Category,
}

/// Raw candidates pulled from a page, before defaults are applied
#[derive(Debug, Default, PartialEq, Eq)]
struct PageFields {
    title: Option<String>,
    description: Option<String>,
    image: Option<String>,
}

/// Fetches and resolves link metadata through an injected `PageFetcher`
pub struct MetadataResolver {
    fetcher: Arc<dyn PageFetcher>,
}

impl MetadataResolver {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    /// Resolve `url`. Always returns a populated record.
    pub async fn resolve(&self, url: &str) -> ResolvedMetadata {
        let url = url.trim();

        if classifier::is_x_host(url) {
            debug!(url, "x.com link, skipping fetch");
            return x_metadata(url);
        }

        let page_url = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                let e = FetchError::InvalidUrl(e.to_string());
                warn!(url, error = %e, "cannot resolve, using fallback metadata");
                return fallback_metadata(url);
            }
        };

        let html = match self.fetcher.fetch_html(&page_url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(url, error = %e, "fetch failed, using fallback metadata");
                return fallback_metadata(url);
            }
        };

        // HtmlDocument is !Send; extract_fields keeps it off the await path
        let fields = extract_fields(&html);

        let title = fields
            .title
            .map(|t| truncate_chars(&t, MAX_TITLE_CHARS))
            .unwrap_or_else(|| UNTITLED.to_string());
        let description = fields
            .description
            .map(|d| truncate_chars(&d, MAX_DESCRIPTION_CHARS))
            .unwrap_or_default();
        let image_url = fields
            .image
            .and_then(|raw| {
                let normalized = normalize_image_url(&page_url, &raw);
                if normalized.is_none() {
                    warn!(url, image = %raw, "discarding unusable image reference");
                }
                normalized
            })
            .unwrap_or_else(|| classifier::default_asset_or_generic(url).to_string());

        ResolvedMetadata {
            title,
            description,
            image_url,
            category: classifier::classify(url),
        }
    }
}

/// Apply the per-field priority cascade to a page body
fn extract_fields(html: &str) -> PageFields {
    let doc = HtmlDocument::parse(html);

    PageFields {
        title: doc
            .meta_property("og:title")
            .or_else(|| doc.meta_name("twitter:title"))
            .or_else(|| doc.title()),
        description: doc
            .meta_property("og:description")
            .or_else(|| doc.meta_name("twitter:description"))
            .or_else(|| doc.meta_name("description")),
        image: doc
            .meta_property("og:image")
            .or_else(|| doc.meta_name("twitter:image"))
            .or_else(|| doc.first_image_src()),
    }
}

/// Resolve an image reference against the page origin.
///
/// Absolute http(s) URLs are kept, other schemes (`data:`, `javascript:`)
/// are dropped. `//host/x` takes the page scheme, `/x` and `x` are both
/// resolved against the origin, not the page path.
pub fn normalize_image_url(page_url: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    match Url::parse(raw) {
        Ok(absolute) => return http_only(absolute),
        Err(url::ParseError::RelativeUrlWithoutBase) => {}
        Err(_) => return None,
    }

    let origin = page_url.origin().ascii_serialization();
    let candidate = if raw.starts_with("//") {
        format!("{}:{}", page_url.scheme(), raw)
    } else if raw.starts_with('/') {
        format!("{}{}", origin, raw)
    } else {
        format!("{}/{}", origin, raw)
    };

    Url::parse(&candidate).ok().and_then(http_only)
}

fn http_only(url: Url) -> Option<String> {
    match url.scheme() {
        "http" | "https" => Some(url.to_string()),
        _ => None,
    }
}

/// Record used when the page could not be fetched
pub fn fallback_metadata(url: &str) -> ResolvedMetadata {
    ResolvedMetadata {
        title: truncate_chars(url, FALLBACK_TITLE_CHARS),
        description: String::new(),
        image_url: classifier::default_asset_or_generic(url).to_string(),
        category: classifier::classify(url),
    }
}

/// X serves no usable markup to automated clients; build the title from the path
fn x_metadata(url: &str) -> ResolvedMetadata {
    let segments: Vec<String> = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .map(|segs| segs.filter(|s| !s.is_empty()).map(str::to_string).collect())
        })
        .unwrap_or_default();

    let title = match segments.as_slice() {
        [user, status, _, ..] if status == "status" => format!("Tweet by @{}", user),
        [user, ..] => format!("@{} on X", user),
        [] => "Post on X".to_string(),
    };

    ResolvedMetadata {
        title,
        description: X_DESCRIPTION.to_string(),
        image_url: TWITTER_ICON.to_string(),
        category: Category::Social,
    }
}
