//! SQLite database layer for saved links
//!
//! Schema: `links` keyed by unique `url`, `tags` keyed by unique normalized
//! `name`, and the `link_tags` association with cascading foreign keys.
//! Uses r2d2 connection pooling to allow concurrent reads without mutex blocking.

use crate::config::DatabaseConfig;
use crate::interface::{Category, CategoryCount, Link, LinkFilter, LinkSource, LinkUpdate, TagCount};
use crate::models::{format_db_timestamp, normalize_tag_set, parse_db_timestamp};
use crate::search::{build_link_query, LINK_COLUMNS};
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Name of the Unicode-aware lower-casing function available on every pooled connection
pub const UNICODE_LOWER: &str = "unicode_lower";

/// Install per-connection SQL functions. SQLite's own `LOWER()` folds ASCII
/// only, so text search folds both sides with Rust's `to_lowercase`.
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        UNICODE_LOWER,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|v| v.to_lowercase()))
        },
    )
}

/// Fully resolved link row, written in one statement
#[derive(Debug, Clone)]
pub struct NewLink {
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category: Category,
    pub source: LinkSource,
    pub source_name: Option<String>,
    pub saved_at: DateTime<Utc>,
}

/// Thread-safe database wrapper using connection pooling
///
/// Uses r2d2 connection pool for concurrent read access.
/// WAL mode enables readers to proceed without blocking each other.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open or create a database at the configured path with connection pooling
    pub fn open(config: &DatabaseConfig) -> DatabaseResult<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let manager = SqliteConnectionManager::file(&config.path)
            .with_init(move |conn| {
                conn.execute_batch("
                    PRAGMA journal_mode=WAL;
                    PRAGMA synchronous=NORMAL;
                    PRAGMA foreign_keys=ON;
                ")?;
                conn.busy_timeout(busy_timeout)?;
                register_functions(conn)
            });

        let pool = Pool::builder()
            .max_size(config.pool_size.max(1))
            .connection_timeout(config.connection_timeout())
            .build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| {
                conn.execute_batch("PRAGMA foreign_keys=ON;")?;
                register_functions(conn)
            });

        // In-memory needs single connection to maintain state
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Get a connection from the pool
    fn get_conn(&self) -> DatabaseResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    fn setup_schema(&self) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                description TEXT,
                image_url TEXT,
                category TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                source TEXT NOT NULL DEFAULT 'manual',
                source_name TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS link_tags (
                link_id INTEGER NOT NULL REFERENCES links(id) ON DELETE CASCADE,
                tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (link_id, tag_id)
            );

            CREATE INDEX IF NOT EXISTS idx_links_category ON links(category);
            CREATE INDEX IF NOT EXISTS idx_links_created_at ON links(created_at);
            CREATE INDEX IF NOT EXISTS idx_tags_name ON tags(name);
            CREATE INDEX IF NOT EXISTS idx_link_tags_tag ON link_tags(tag_id);
        "#)?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // LINKS
    // ─────────────────────────────────────────────────────────────────────────────

    /// Insert or update keyed on `url`. Returns the stable id either way.
    /// `id`, `created_at` and `completed` survive a re-save.
    pub fn upsert_link(&self, link: &NewLink) -> DatabaseResult<i64> {
        let conn = self.get_conn()?;
        let saved_at = format_db_timestamp(link.saved_at);
        let id = conn.query_row(
            "INSERT INTO links (url, title, description, image_url, category, source, source_name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                image_url = excluded.image_url,
                category = excluded.category,
                source = excluded.source,
                source_name = excluded.source_name,
                updated_at = excluded.updated_at
             RETURNING id",
            params![
                link.url,
                link.title,
                link.description,
                link.image_url,
                link.category.as_str(),
                link.source.as_str(),
                link.source_name,
                saved_at,
            ],
            |row| row.get(0),
        )?;
        debug!(id, url = %link.url, "upserted link");
        Ok(id)
    }

    /// Fetch one link with its tags
    pub fn fetch_link(&self, id: i64) -> DatabaseResult<Option<Link>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM links l WHERE l.id = ?1", LINK_COLUMNS);
        let link = conn
            .query_row(&sql, params![id], Self::row_to_link)
            .optional()?;

        match link {
            Some(link) => {
                let mut links = vec![link];
                Self::attach_tags(&conn, &mut links)?;
                Ok(links.pop())
            }
            None => Ok(None),
        }
    }

    /// Links matching `filter`, newest first, with tags attached
    pub fn fetch_links(&self, filter: &LinkFilter) -> DatabaseResult<Vec<Link>> {
        let conn = self.get_conn()?;
        Self::query_links(&conn, filter)
    }

    /// Like `fetch_links`, but aborts the statement when `token` is cancelled.
    /// An interrupted query yields an empty result.
    pub fn fetch_links_interruptible(
        &self,
        filter: &LinkFilter,
        token: &tokio_util::sync::CancellationToken,
        runtime: &tokio::runtime::Handle,
    ) -> DatabaseResult<Vec<Link>> {
        use tokio_util::task::AbortOnDropHandle;

        let conn = self.get_conn()?;
        let interrupt_handle = conn.get_interrupt_handle();

        let token_clone = token.clone();
        let watcher = runtime.spawn(async move {
            token_clone.cancelled().await;
            interrupt_handle.interrupt();
        });
        let _abort_guard = AbortOnDropHandle::new(watcher);

        match Self::query_links(&conn, filter) {
            Ok(links) => Ok(links),
            Err(DatabaseError::Sqlite(rusqlite::Error::SqliteFailure(err, _)))
                if err.code == rusqlite::ffi::ErrorCode::OperationInterrupted =>
            {
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn query_links(conn: &Connection, filter: &LinkFilter) -> DatabaseResult<Vec<Link>> {
        let query = build_link_query(filter);
        debug!(sql = %query.sql, params = query.params.len(), "querying links");

        let mut stmt = conn.prepare(&query.sql)?;
        let mut links = stmt
            .query_map(rusqlite::params_from_iter(query.params), Self::row_to_link)?
            .collect::<Result<Vec<_>, _>>()?;

        Self::attach_tags(conn, &mut links)?;
        Ok(links)
    }

    /// Overwrite the editable fields. Returns false if the link does not exist.
    pub fn update_link(&self, id: i64, update: &LinkUpdate, now: DateTime<Utc>) -> DatabaseResult<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "UPDATE links SET title = ?1, description = ?2, image_url = ?3, category = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                update.title,
                update.description,
                update.image_url,
                update.category.as_str(),
                format_db_timestamp(now),
                id,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Flip `completed`. Returns false if the link does not exist.
    pub fn toggle_completed(&self, id: i64, now: DateTime<Utc>) -> DatabaseResult<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "UPDATE links SET completed = NOT completed, updated_at = ?1 WHERE id = ?2",
            params![format_db_timestamp(now), id],
        )?;
        Ok(changed > 0)
    }

    /// Delete a link; its associations cascade. Returns false if it did not exist.
    pub fn delete_link(&self, id: i64) -> DatabaseResult<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute("DELETE FROM links WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // TAGS
    // ─────────────────────────────────────────────────────────────────────────────

    /// Attach tags, creating missing ones. Already-attached tags are a no-op.
    /// Returns false if the link does not exist.
    pub fn add_tags(&self, link_id: i64, names: &[String]) -> DatabaseResult<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        if !Self::link_exists(&tx, link_id)? {
            return Ok(false);
        }

        let now = format_db_timestamp(Utc::now());
        for name in normalize_tag_set(names) {
            let tag_id = Self::get_or_create_tag(&tx, &name, &now)?;
            Self::attach_tag(&tx, link_id, tag_id)?;
        }
        tx.commit()?;
        Ok(true)
    }

    /// Detach tags by name. Tag rows are kept. Returns false if the link does not exist.
    pub fn remove_tags(&self, link_id: i64, names: &[String]) -> DatabaseResult<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        if !Self::link_exists(&tx, link_id)? {
            return Ok(false);
        }

        for name in normalize_tag_set(names) {
            Self::detach_tag(&tx, link_id, &name)?;
        }
        tx.commit()?;
        Ok(true)
    }

    /// Make the link's tag set equal to `names` in one transaction.
    /// Returns false if the link does not exist.
    pub fn set_link_tags(&self, link_id: i64, names: &[String]) -> DatabaseResult<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        if !Self::link_exists(&tx, link_id)? {
            return Ok(false);
        }

        let desired = normalize_tag_set(names);
        let current = Self::tag_names_for(&tx, link_id)?;

        for name in current.iter().filter(|n| !desired.contains(n)) {
            Self::detach_tag(&tx, link_id, name)?;
        }

        let now = format_db_timestamp(Utc::now());
        for name in desired.iter().filter(|n| !current.contains(n)) {
            let tag_id = Self::get_or_create_tag(&tx, name, &now)?;
            Self::attach_tag(&tx, link_id, tag_id)?;
        }

        tx.commit()?;
        debug!(link_id, tags = desired.len(), "reconciled link tags");
        Ok(true)
    }

    /// Tag usage counts, most used first, ties by name. Orphaned tags report 0.
    pub fn tag_counts(&self) -> DatabaseResult<Vec<TagCount>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT t.name, COUNT(lt.link_id) AS count
             FROM tags t
             LEFT JOIN link_tags lt ON lt.tag_id = t.id
             GROUP BY t.id
             ORDER BY count DESC, t.name ASC",
        )?;
        let counts = stmt
            .query_map([], |row| {
                Ok(TagCount {
                    name: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    /// Links per category, largest first, ties by category name
    pub fn category_counts(&self) -> DatabaseResult<Vec<CategoryCount>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*) AS count
             FROM links
             GROUP BY category
             ORDER BY count DESC, category ASC",
        )?;
        let counts = stmt
            .query_map([], |row| {
                let category: String = row.get(0)?;
                Ok(CategoryCount {
                    category: Category::from_database(&category),
                    count: row.get::<_, i64>(1)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // HELPERS
    // ─────────────────────────────────────────────────────────────────────────────

    fn link_exists(conn: &Connection, id: i64) -> DatabaseResult<bool> {
        let exists = conn
            .query_row("SELECT 1 FROM links WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?
            .is_some();
        Ok(exists)
    }

    /// Atomic get-or-create keyed on the normalized name
    fn get_or_create_tag(conn: &Connection, name: &str, now: &str) -> DatabaseResult<i64> {
        let id = conn.query_row(
            "INSERT INTO tags (name, created_at) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET name = excluded.name
             RETURNING id",
            params![name, now],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn attach_tag(conn: &Connection, link_id: i64, tag_id: i64) -> DatabaseResult<()> {
        conn.execute(
            "INSERT INTO link_tags (link_id, tag_id) VALUES (?1, ?2) ON CONFLICT DO NOTHING",
            params![link_id, tag_id],
        )?;
        Ok(())
    }

    fn detach_tag(conn: &Connection, link_id: i64, name: &str) -> DatabaseResult<()> {
        conn.execute(
            "DELETE FROM link_tags
             WHERE link_id = ?1 AND tag_id IN (SELECT id FROM tags WHERE name = ?2)",
            params![link_id, name],
        )?;
        Ok(())
    }

    fn tag_names_for(conn: &Connection, link_id: i64) -> DatabaseResult<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT t.name FROM link_tags lt JOIN tags t ON t.id = lt.tag_id
             WHERE lt.link_id = ?1 ORDER BY t.name",
        )?;
        let names = stmt
            .query_map(params![link_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Fill `tags` on every link with one query
    fn attach_tags(conn: &Connection, links: &mut [Link]) -> DatabaseResult<()> {
        if links.is_empty() {
            return Ok(());
        }

        let placeholders = links.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT lt.link_id, t.name FROM link_tags lt JOIN tags t ON t.id = lt.tag_id
             WHERE lt.link_id IN ({}) ORDER BY t.name",
            placeholders
        );

        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<rusqlite::types::Value> = links.iter().map(|l| l.id.into()).collect();
        let mut by_link: HashMap<i64, Vec<String>> = HashMap::new();
        let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (link_id, name) = row?;
            by_link.entry(link_id).or_default().push(name);
        }

        for link in links.iter_mut() {
            link.tags = by_link.remove(&link.id).unwrap_or_default();
        }
        Ok(())
    }

    fn row_to_link(row: &rusqlite::Row) -> rusqlite::Result<Link> {
        let category: String = row.get(5)?;
        let source: String = row.get(7)?;
        let created_at: String = row.get(9)?;
        let updated_at: String = row.get(10)?;

        Ok(Link {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            image_url: row.get(4)?,
            category: Category::from_database(&category),
            completed: row.get(6)?,
            source: LinkSource::from_database(&source),
            source_name: row.get(8)?,
            created_at: parse_db_timestamp(&created_at),
            updated_at: parse_db_timestamp(&updated_at),
            tags: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn new_link(url: &str, title: &str, saved_at: DateTime<Utc>) -> NewLink {
        NewLink {
            url: url.to_string(),
            title: title.to_string(),
            description: None,
            image_url: None,
            category: Category::Article,
            source: LinkSource::Manual,
            source_name: None,
            saved_at,
        }
    }

    fn names(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_upsert_keeps_id_and_created_at() {
        let db = Database::open_in_memory().unwrap();
        let first_at = Utc::now();
        let id = db.upsert_link(&new_link("https://a.example", "First", first_at)).unwrap();
        db.toggle_completed(id, first_at).unwrap();

        let later = first_at + ChronoDuration::seconds(30);
        let mut second = new_link("https://a.example", "Second", later);
        second.category = Category::Docs;
        let id2 = db.upsert_link(&second).unwrap();

        assert_eq!(id, id2);
        let link = db.fetch_link(id).unwrap().unwrap();
        assert_eq!(link.title, "Second");
        assert_eq!(link.category, Category::Docs);
        assert_eq!(link.created_at.timestamp_micros(), first_at.timestamp_micros());
        assert_eq!(link.updated_at.timestamp_micros(), later.timestamp_micros());
        assert!(link.completed);
        assert_eq!(db.fetch_links(&LinkFilter::new()).unwrap().len(), 1);
    }

    #[test]
    fn test_tags_are_normalized_to_one_row() {
        let db = Database::open_in_memory().unwrap();
        let id = db.upsert_link(&new_link("https://a.example", "A", Utc::now())).unwrap();

        db.add_tags(id, &names(&["Foo", " foo ", "foo"])).unwrap();
        db.add_tags(id, &names(&["FOO"])).unwrap();

        let link = db.fetch_link(id).unwrap().unwrap();
        assert_eq!(link.tags, vec!["foo".to_string()]);
        assert_eq!(db.tag_counts().unwrap(), vec![TagCount { name: "foo".into(), count: 1 }]);
    }

    #[test]
    fn test_set_tags_reconciles() {
        let db = Database::open_in_memory().unwrap();
        let id = db.upsert_link(&new_link("https://a.example", "A", Utc::now())).unwrap();
        db.add_tags(id, &names(&["keep", "drop"])).unwrap();

        assert!(db.set_link_tags(id, &names(&["Keep", "new", ""])).unwrap());
        let link = db.fetch_link(id).unwrap().unwrap();
        assert_eq!(link.tags, names(&["keep", "new"]));

        assert!(db.set_link_tags(id, &[]).unwrap());
        assert!(db.fetch_link(id).unwrap().unwrap().tags.is_empty());
        assert!(!db.set_link_tags(999, &names(&["x"])).unwrap());
    }

    #[test]
    fn test_delete_cascades_associations_only() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        let a = db.upsert_link(&new_link("https://a.example", "A", now)).unwrap();
        let b = db.upsert_link(&new_link("https://b.example", "B", now)).unwrap();
        db.add_tags(a, &names(&["shared", "solo"])).unwrap();
        db.add_tags(b, &names(&["shared"])).unwrap();

        assert!(db.delete_link(a).unwrap());
        assert!(!db.delete_link(a).unwrap());

        let conn = db.get_conn().unwrap();
        let assoc: i64 = conn
            .query_row("SELECT COUNT(*) FROM link_tags WHERE link_id = ?1", params![a], |r| r.get(0))
            .unwrap();
        let tag_rows: i64 = conn.query_row("SELECT COUNT(*) FROM tags", [], |r| r.get(0)).unwrap();
        drop(conn);

        assert_eq!(assoc, 0);
        // Orphaned tags are kept
        assert_eq!(tag_rows, 2);
        assert_eq!(db.fetch_link(b).unwrap().unwrap().tags, names(&["shared"]));
        assert_eq!(
            db.tag_counts().unwrap(),
            vec![
                TagCount { name: "shared".into(), count: 1 },
                TagCount { name: "solo".into(), count: 0 },
            ]
        );
    }

    #[test]
    fn test_ordering_newest_first_with_id_tiebreak() {
        let db = Database::open_in_memory().unwrap();
        let t0 = Utc::now();
        let old = db.upsert_link(&new_link("https://old.example", "Old", t0)).unwrap();
        let tie_a = db.upsert_link(&new_link("https://a.example", "A", t0 + ChronoDuration::seconds(5))).unwrap();
        let tie_b = db.upsert_link(&new_link("https://b.example", "B", t0 + ChronoDuration::seconds(5))).unwrap();

        let ids: Vec<i64> = db.fetch_links(&LinkFilter::new()).unwrap().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![tie_b, tie_a, old]);
    }

    #[test]
    fn test_and_tag_search() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        let full = db.upsert_link(&new_link("https://full.example", "Full", now)).unwrap();
        let partial = db.upsert_link(&new_link("https://partial.example", "Partial", now)).unwrap();
        db.add_tags(full, &names(&["a", "b", "c"])).unwrap();
        db.add_tags(partial, &names(&["a"])).unwrap();

        let hits = db.fetch_links(&LinkFilter::new().tag("A").tag("b")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, full);
        assert_eq!(hits[0].tags, names(&["a", "b", "c"]));

        let hits = db.fetch_links(&LinkFilter::new().tag("a")).unwrap();
        assert_eq!(hits.len(), 2);

        let hits = db.fetch_links(&LinkFilter::new().tag("a").tag("missing")).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_text_and_category_filters() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        let mut rust = new_link("https://blog.example/rust", "Learning RUST", now);
        rust.category = Category::Tech;
        let rust = db.upsert_link(&rust).unwrap();
        let mut described = new_link("https://b.example", "Other", now);
        described.description = Some("All about 100% coverage".into());
        let described = db.upsert_link(&described).unwrap();
        db.upsert_link(&new_link("https://c.example/100x", "Plain", now)).unwrap();

        let hits = db.fetch_links(&LinkFilter::new().text("rust")).unwrap();
        assert_eq!(hits.iter().map(|l| l.id).collect::<Vec<_>>(), vec![rust]);

        let hits = db.fetch_links(&LinkFilter::new().text("100%")).unwrap();
        assert_eq!(hits.iter().map(|l| l.id).collect::<Vec<_>>(), vec![described]);

        let hits = db.fetch_links(&LinkFilter::new().text("learning").category(Category::Article)).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_text_filter_non_ascii() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        let uber = db.upsert_link(&new_link("https://a.example", "ÜBER Café Straße", now)).unwrap();
        let mut ecole = new_link("https://b.example", "Other", now);
        ecole.description = Some("ÉCOLE normale".into());
        let ecole = db.upsert_link(&ecole).unwrap();

        let ids = |q: &str| {
            db.fetch_links(&LinkFilter::new().text(q))
                .unwrap()
                .iter()
                .map(|l| l.id)
                .collect::<Vec<_>>()
        };
        assert_eq!(ids("ÜBER"), vec![uber]);
        assert_eq!(ids("über"), vec![uber]);
        assert_eq!(ids("café"), vec![uber]);
        assert_eq!(ids("STRASSE"), Vec::<i64>::new());
        assert_eq!(ids("straße"), vec![uber]);
        assert_eq!(ids("École"), vec![ecole]);
        assert_eq!(ids("ÉCOLE"), vec![ecole]);
    }

    #[test]
    fn test_category_counts() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        for (url, category) in [
            ("https://a.example", Category::Video),
            ("https://b.example", Category::Tech),
            ("https://c.example", Category::Video),
        ] {
            let mut link = new_link(url, "x", now);
            link.category = category;
            db.upsert_link(&link).unwrap();
        }

        let counts = db.category_counts().unwrap();
        assert_eq!(
            counts,
            vec![
                CategoryCount { category: Category::Video, count: 2 },
                CategoryCount { category: Category::Tech, count: 1 },
            ]
        );
    }

    #[test]
    fn test_update_and_toggle_missing_link() {
        let db = Database::open_in_memory().unwrap();
        let update = LinkUpdate {
            title: "t".into(),
            description: None,
            image_url: None,
            category: Category::Docs,
        };
        assert!(!db.update_link(42, &update, Utc::now()).unwrap());
        assert!(!db.toggle_completed(42, Utc::now()).unwrap());
        assert!(!db.add_tags(42, &names(&["x"])).unwrap());
        assert!(!db.remove_tags(42, &names(&["x"])).unwrap());
    }
}
