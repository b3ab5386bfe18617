//! Text and timestamp helpers shared by the store, the resolver and ingestion.

use chrono::{DateTime, TimeZone, Utc};

/// Fixed-width UTC format so lexical order in SQLite matches chronological order
const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Format a timestamp for storage
pub fn format_db_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format(DB_TIMESTAMP_FORMAT).to_string()
}

/// Parse timestamp string from database to DateTime<Utc>
pub fn parse_db_timestamp(timestamp_str: &str) -> DateTime<Utc> {
    chrono::NaiveDateTime::parse_from_str(timestamp_str, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(timestamp_str, "%Y-%m-%d %H:%M:%S"))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .unwrap_or_else(|_| Utc::now())
}

// ─────────────────────────────────────────────────────────────────────────────
// TAG NAMES
// ─────────────────────────────────────────────────────────────────────────────

/// Canonical stored form of a tag name: trimmed and lower-cased.
pub fn normalize_tag(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Normalize a list of tag names into a set, preserving first-seen order.
/// Blank names are dropped.
pub fn normalize_tag_set<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .map(|n| normalize_tag(n.as_ref()))
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(n.clone()))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// TEXT
// ─────────────────────────────────────────────────────────────────────────────

/// Truncate to at most `max_chars` characters (never splits a code point)
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// `None` for empty or whitespace-only strings
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Build a case-insensitive `%needle%` LIKE pattern, escaping wildcards with `\`
pub fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_normalization() {
        assert_eq!(normalize_tag("Foo"), "foo");
        assert_eq!(normalize_tag(" foo "), "foo");
        assert_eq!(normalize_tag("foo"), "foo");
    }

    #[test]
    fn test_tag_set_dedupes_and_drops_blank() {
        let set = normalize_tag_set(&["Rust", " rust", "", "  ", "async"]);
        assert_eq!(set, vec!["rust".to_string(), "async".to_string()]);
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars(&"x".repeat(300), 200).chars().count(), 200);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_Off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_timestamp_roundtrip_keeps_micros() {
        let now = Utc::now();
        let parsed = parse_db_timestamp(&format_db_timestamp(now));
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  ")), None);
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some(" a ")), Some("a".to_string()));
    }
}
