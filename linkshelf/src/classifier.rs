//! URL classification and default assets
//!
//! Maps a URL to a `Category` and, when a page yields no image, to a
//! well-known logo for its host. Both are ordered first-match tables over the
//! lower-cased URL, so the table order is part of the behaviour.

use crate::interface::Category;
use url::Url;

/// Fallback image for links on hosts without a known logo
pub const GENERIC_LINK_ICON: &str = "https://cdn-icons-png.flaticon.com/512/2058/2058947.png";

pub const TWITTER_ICON: &str = "https://abs.twimg.com/icons/apple-touch-icon-192x192.png";

/// A single match rule, evaluated against the lower-cased URL
#[derive(Debug, Clone, Copy)]
enum Pattern {
    /// Substring anywhere in the URL
    Contains(&'static str),
    /// Host equals the domain or is a subdomain of it
    Host(&'static str),
}

impl Pattern {
    fn matches(&self, lower_url: &str, host: Option<&str>) -> bool {
        match self {
            Pattern::Contains(needle) => lower_url.contains(*needle),
            Pattern::Host(domain) => host.is_some_and(|h| {
                h == *domain
                    || h.strip_suffix(*domain)
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }),
        }
    }
}

/// Category rules in priority order. The first matching row wins.
const CATEGORY_RULES: &[(Category, &[Pattern])] = &[
    (
        Category::Video,
        &[
            Pattern::Contains("youtube.com"),
            Pattern::Contains("youtu.be"),
            Pattern::Contains("vimeo.com"),
            Pattern::Contains("twitch.tv"),
            Pattern::Contains("tiktok.com"),
        ],
    ),
    (
        Category::Tech,
        &[
            Pattern::Contains("github.com"),
            Pattern::Contains("stackoverflow.com"),
            Pattern::Contains("gitlab.com"),
            Pattern::Contains("bitbucket.org"),
        ],
    ),
    (
        Category::Product,
        &[
            Pattern::Contains("amazon."),
            Pattern::Contains("producthunt.com"),
            Pattern::Contains("etsy.com"),
            Pattern::Contains("ebay.com"),
            Pattern::Contains("aliexpress.com"),
        ],
    ),
    (
        Category::Article,
        &[
            Pattern::Contains("medium.com"),
            Pattern::Contains("dev.to"),
            Pattern::Contains("substack.com"),
            Pattern::Contains("bloomberg.com"),
            Pattern::Contains("techcrunch.com"),
            Pattern::Contains("theverge.com"),
            Pattern::Contains("arstechnica.com"),
            Pattern::Contains("wired.com"),
        ],
    ),
    (
        Category::Docs,
        &[
            Pattern::Contains("docs."),
            Pattern::Contains("/docs/"),
            Pattern::Contains("documentation"),
        ],
    ),
    (
        Category::Social,
        &[
            Pattern::Host("twitter.com"),
            Pattern::Host("x.com"),
            Pattern::Contains("reddit.com"),
            Pattern::Contains("linkedin.com"),
            Pattern::Contains("facebook.com"),
            Pattern::Contains("instagram.com"),
        ],
    ),
];

/// Known logos, checked in order after the page itself yields no image
const DEFAULT_ASSETS: &[(Pattern, &str)] = &[
    (Pattern::Host("twitter.com"), TWITTER_ICON),
    (Pattern::Host("x.com"), TWITTER_ICON),
    (
        Pattern::Contains("facebook.com"),
        "https://www.facebook.com/images/fb_icon_325x325.png",
    ),
    (
        Pattern::Contains("instagram.com"),
        "https://www.instagram.com/static/images/ico/favicon-192.png/68d99ba29cc8.png",
    ),
    (
        Pattern::Contains("linkedin.com"),
        "https://static.licdn.com/aero-v1/sc/h/al2o9zrvru7aqj8e1x2rzsrca",
    ),
    (
        Pattern::Contains("reddit.com"),
        "https://www.redditstatic.com/desktop2x/img/favicon/android-icon-192x192.png",
    ),
    (
        Pattern::Contains("github.com"),
        "https://github.githubassets.com/assets/apple-touch-icon-144x144-b882e354c005.png",
    ),
    (
        Pattern::Contains("stackoverflow.com"),
        "https://cdn.sstatic.net/Sites/stackoverflow/Img/apple-touch-icon@2.png",
    ),
    (
        Pattern::Contains("youtube.com"),
        "https://www.youtube.com/s/desktop/f506bd45/img/favicon_144x144.png",
    ),
    (
        Pattern::Contains("youtu.be"),
        "https://www.youtube.com/s/desktop/f506bd45/img/favicon_144x144.png",
    ),
    (
        Pattern::Contains("vimeo.com"),
        "https://f.vimeocdn.com/images_v6/share/vimeo_icon_white.png",
    ),
    (
        Pattern::Contains("tiktok.com"),
        "https://sf16-website-login.neutral.ttwstatic.com/obj/tiktok_web_login_static/tiktok/webapp/main/webapp-desktop/8152caf0c8e8bc67ae0d.png",
    ),
    (
        Pattern::Contains("medium.com"),
        "https://miro.medium.com/v2/1*m-R_BkNf1Qjr1YbyOIJY2w.png",
    ),
    (
        Pattern::Contains("dev.to"),
        "https://dev-to-uploads.s3.amazonaws.com/uploads/logos/resized_logo_UQww2soKuUsjaOGNB38o.png",
    ),
    (
        Pattern::Contains("producthunt.com"),
        "https://ph-static.imgix.net/ph-ios-icon.png",
    ),
];

fn host_of(url: &str) -> Option<String> {
    Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

/// Classify a URL. Never fails; anything unmatched is an `Article`.
pub fn classify(url: &str) -> Category {
    let lower = url.to_lowercase();
    let host = host_of(url);

    CATEGORY_RULES
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| p.matches(&lower, host.as_deref())))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Article)
}

/// Well-known logo for the URL's host, if any
pub fn default_asset(url: &str) -> Option<&'static str> {
    let lower = url.to_lowercase();
    let host = host_of(url);

    DEFAULT_ASSETS
        .iter()
        .find(|(pattern, _)| pattern.matches(&lower, host.as_deref()))
        .map(|(_, asset)| *asset)
}

/// Known logo or the generic link icon
pub fn default_asset_or_generic(url: &str) -> &'static str {
    default_asset(url).unwrap_or(GENERIC_LINK_ICON)
}

/// Whether the URL points at X / Twitter, which serves no usable metadata
pub fn is_x_host(url: &str) -> bool {
    let host = host_of(url);
    [Pattern::Host("twitter.com"), Pattern::Host("x.com")]
        .iter()
        .any(|p| p.matches("", host.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_hosts() {
        assert_eq!(classify("https://www.youtube.com/watch?v=abc"), Category::Video);
        assert_eq!(classify("https://youtu.be/abc"), Category::Video);
        assert_eq!(classify("https://github.com/rust-lang/rust"), Category::Tech);
        assert_eq!(classify("https://www.amazon.co.uk/dp/B0"), Category::Product);
        assert_eq!(classify("https://blog.substack.com/p/post"), Category::Article);
        assert_eq!(classify("https://x.com/user/status/1"), Category::Social);
        assert_eq!(classify("https://mobile.twitter.com/user"), Category::Social);
        assert_eq!(classify("https://old.reddit.com/r/rust"), Category::Social);
    }

    #[test]
    fn test_classify_default_is_article() {
        assert_eq!(classify("https://example.com/"), Category::Article);
        assert_eq!(classify("not even a url"), Category::Article);
        assert_eq!(classify(""), Category::Article);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify("HTTPS://WWW.YOUTUBE.COM/watch"), Category::Video);
    }

    #[test]
    fn test_docs_rule_order() {
        assert_eq!(classify("https://docs.rs/serde"), Category::Docs);
        assert_eq!(classify("https://example.com/docs/intro"), Category::Docs);
        // Tech is checked before docs
        assert_eq!(classify("https://github.com/org/repo/docs/readme"), Category::Tech);
        // Article is checked before docs
        assert_eq!(classify("https://medium.com/docs/thing"), Category::Article);
    }

    #[test]
    fn test_x_host_needs_exact_domain() {
        assert_eq!(classify("https://netflix.com/title/1"), Category::Article);
        assert!(!is_x_host("https://netflix.com/"));
        assert!(is_x_host("https://x.com/someone"));
        assert!(is_x_host("https://www.twitter.com/someone"));
    }

    #[test]
    fn test_default_asset() {
        assert_eq!(default_asset("https://x.com/a"), Some(TWITTER_ICON));
        assert_eq!(
            default_asset("https://youtu.be/abc"),
            default_asset("https://www.youtube.com/watch?v=abc")
        );
        assert!(default_asset("https://github.com/a/b").unwrap().contains("githubassets"));
        assert_eq!(default_asset("https://example.com"), None);
        assert_eq!(default_asset_or_generic("https://example.com"), GENERIC_LINK_ICON);
    }
}
