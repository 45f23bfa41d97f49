//! The SQLite file behind the document store.
//!
//! Articles, request counters and cache entries all live in the one
//! `documents` table; the similarity index is rebuilt from its embedding
//! column at startup, so this file is the only durable state.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use newslens_core::error::NewslensError;

use crate::migrations;

/// Handle to the documents database.
///
/// The ingestion task writes article chunks and request handlers read and
/// write counters and cache entries through the same connection. Each
/// `with_conn` call holds it exclusively.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the store file, creating its directory as needed,
    /// and bring the `documents` schema up to date.
    ///
    /// WAL lets lookups from request handlers proceed while an ingestion
    /// batch is being written.
    pub fn new(path: &Path) -> Result<Self, NewslensError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| NewslensError::Storage(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16384;",
        )
        .map_err(|e| NewslensError::Storage(format!("Failed to set pragmas: {}", e)))?;

        info!("Database opened at {}", path.display());

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Empty store that vanishes on drop. Used by tests.
    pub fn in_memory() -> Result<Self, NewslensError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| NewslensError::Storage(format!("Failed to open in-memory db: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Run `f` with exclusive use of the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, NewslensError>
    where
        F: FnOnce(&Connection) -> Result<T, NewslensError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| NewslensError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_database() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
                .map_err(|e| NewslensError::Storage(e.to_string()))?;
            assert_eq!(count, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_file_database_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store").join("newslens.db");
        let _db = Database::new(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_wal_mode_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(&dir.path().join("wal.db")).unwrap();
        db.with_conn(|conn| {
            let mode: String = conn
                .query_row("PRAGMA journal_mode", [], |row| row.get(0))
                .map_err(|e| NewslensError::Storage(e.to_string()))?;
            assert_eq!(mode, "wal");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_rejects_unknown_doc_type() {
        let db = Database::in_memory().unwrap();
        let result = db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (id, doc_type, content, created_at, updated_at)
                 VALUES ('x', 'bogus', '', 0, 0)",
                [],
            )
            .map_err(|e| NewslensError::Storage(e.to_string()))
        });
        assert!(matches!(result, Err(NewslensError::Storage(_))));
    }
}
