//! LinkShelf Core - link resolution and tagged search
//!
//! This library turns submitted URLs into stored links with best-effort
//! metadata (title, description, preview image, category), keeps a
//! many-to-many tag relation over them, and answers free-text, category and
//! all-of-tags queries against SQLite.

pub mod classifier;
pub mod config;
pub mod database;
pub mod fetcher;
pub mod ingest;
pub mod interface;
pub mod link_metadata;
pub mod models;
pub mod search;
mod store;

pub use interface::*;
pub use store::{validate_link_url, LinkStore};
