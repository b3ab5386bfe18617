//! HTML fetch and parse adapter
//!
//! `PageFetcher` is the seam between the resolution pipeline and the network:
//! `HttpFetcher` issues a single bounded GET, tests substitute their own.
//! `HtmlDocument` is a read-only accessor over the meta tags, `<title>` and
//! first inline image of a parsed page.

use crate::config::FetchConfig;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status: {0}")]
    Status(u16),
    #[error("Failed to parse URL: {0}")]
    InvalidUrl(String),
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),
}

/// Retrieves the HTML body of a page
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_html(&self, url: &Url) -> Result<String, FetchError>;
}

/// reqwest-backed fetcher: bounded timeout, limited redirects, browser UA
pub struct HttpFetcher {
    client: reqwest::Client,
    max_html_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            max_html_bytes: config.max_html_bytes,
        })
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_html(&self, url: &Url) -> Result<String, FetchError> {
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(FetchError::UnsupportedScheme(other.to_string())),
        }

        debug!(url = %url, "fetching page");
        let mut response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // Read at most max_html_bytes; metadata lives in <head>
        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let remaining = self.max_html_bytes.saturating_sub(body.len());
            if chunk.len() >= remaining {
                body.extend_from_slice(&chunk[..remaining]);
                debug!(url = %url, limit = self.max_html_bytes, "page body truncated");
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(decode_body(&body, content_type.as_deref()))
    }
}

/// Decode a page body with the charset named in its `Content-Type`, falling
/// back to UTF-8. A byte-order mark overrides the header.
pub(crate) fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_label)
        .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()))
        .unwrap_or(encoding_rs::UTF_8);
    let (text, _used, _had_errors) = encoding.decode(body);
    text.into_owned()
}

fn charset_label(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML ACCESSOR
// ─────────────────────────────────────────────────────────────────────────────

static META_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("meta").unwrap());
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());

/// Parsed page. Not `Send`; build, read and drop it without crossing an await.
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }

    /// `content` of the first `<meta property=key>`
    pub fn meta_property(&self, key: &str) -> Option<String> {
        self.meta_content("property", key)
    }

    /// `content` of the first `<meta name=key>`
    pub fn meta_name(&self, key: &str) -> Option<String> {
        self.meta_content("name", key)
    }

    fn meta_content(&self, attr: &str, key: &str) -> Option<String> {
        self.html
            .select(&META_SELECTOR)
            .filter(|el| {
                el.value()
                    .attr(attr)
                    .is_some_and(|v| v.trim().eq_ignore_ascii_case(key))
            })
            .find_map(|el| non_blank(el.value().attr("content")))
    }

    /// Text of the document `<title>`
    pub fn title(&self) -> Option<String> {
        self.html
            .select(&TITLE_SELECTOR)
            .next()
            .and_then(|el| non_blank(Some(el.text().collect::<String>().as_str())))
    }

    /// `src` of the first `<img>` that has one
    pub fn first_image_src(&self) -> Option<String> {
        self.html
            .select(&IMG_SELECTOR)
            .find_map(|el| non_blank(el.value().attr("src")))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    crate::models::non_empty(value)
}

/// Canned pages for tests; unknown URLs fail with 503
#[cfg(test)]
#[derive(Default)]
pub(crate) struct StaticFetcher {
    pages: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl StaticFetcher {
    pub(crate) fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch_html(&self, url: &Url) -> Result<String, FetchError> {
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or(FetchError::Status(503))
    }
}
