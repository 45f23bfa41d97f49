//! newslens storage crate - SQLite persistence for the shared document store.
//!
//! Every document (article chunks, request counters, cached search results)
//! is a row in one `documents` table, partitioned only by its `doc_type`.
//! Article rows also carry their embedding so the in-memory index can be
//! rebuilt on startup.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{DocumentRepository, StoredEmbedding};
