//! Tagged search and filter builder
//!
//! Composes free-text, category and tag predicates into one parameterised
//! SQL statement over `links`. Filter kinds are ANDed; tags use
//! all-of semantics via a grouped subquery.

use crate::database::UNICODE_LOWER;
use crate::interface::LinkFilter;
use crate::models::{like_pattern, normalize_tag_set};
use rusqlite::types::Value;

/// Columns read by `Database::row_to_link`, in order
pub const LINK_COLUMNS: &str = "l.id, l.url, l.title, l.description, l.image_url, l.category, \
     l.completed, l.source, l.source_name, l.created_at, l.updated_at";

/// Newest first; id breaks ties between equal timestamps
pub const LINK_ORDER: &str = "ORDER BY l.created_at DESC, l.id DESC";

/// A built statement and its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct LinkQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Build the SELECT for `filter`. Blank text and empty tag sets impose no constraint.
pub fn build_link_query(filter: &LinkFilter) -> LinkQuery {
    let mut sql = format!("SELECT {} FROM links l WHERE 1=1", LINK_COLUMNS);
    let mut params: Vec<Value> = Vec::new();

    if let Some(text) = filter.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = like_pattern(text);
        sql.push_str(&format!(
            " AND ({f}(l.title) LIKE ? ESCAPE '\\' \
             OR {f}(COALESCE(l.description, '')) LIKE ? ESCAPE '\\' \
             OR {f}(l.url) LIKE ? ESCAPE '\\')",
            f = UNICODE_LOWER
        ));
        for _ in 0..3 {
            params.push(Value::Text(pattern.clone()));
        }
    }

    if let Some(category) = filter.category {
        sql.push_str(" AND l.category = ?");
        params.push(Value::Text(category.as_str().to_string()));
    }

    let tags = normalize_tag_set(&filter.tags);
    if !tags.is_empty() {
        let placeholders = tags.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        sql.push_str(&format!(
            " AND l.id IN (\
                SELECT lt.link_id FROM link_tags lt \
                JOIN tags t ON t.id = lt.tag_id \
                WHERE t.name IN ({}) \
                GROUP BY lt.link_id \
                HAVING COUNT(DISTINCT t.name) = ?)",
            placeholders
        ));
        let required = tags.len() as i64;
        params.extend(tags.into_iter().map(Value::Text));
        params.push(Value::Integer(required));
    }

    sql.push(' ');
    sql.push_str(LINK_ORDER);

    LinkQuery { sql, params }
}
