//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use newslens_core::error::NewslensError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), NewslensError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| NewslensError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| NewslensError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: documents");
    }

    Ok(())
}

/// Version 1: the shared documents table.
fn apply_v1(conn: &Connection) -> Result<(), NewslensError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS documents (
            id          TEXT PRIMARY KEY NOT NULL,
            doc_type    TEXT NOT NULL
                        CHECK (doc_type IN ('article', 'cache_entry', 'request_counter')),
            content     TEXT NOT NULL,
            source      TEXT,
            metadata    TEXT NOT NULL DEFAULT '{}',
            embedding   BLOB,
            created_at  INTEGER NOT NULL,
            updated_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_documents_doc_type
            ON documents (doc_type);

        CREATE INDEX IF NOT EXISTS idx_documents_source
            ON documents (source);

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'documents');
        ",
    )
    .map_err(|e| NewslensError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_run_once() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_doc_type_check() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO documents (id, doc_type, content, created_at, updated_at)
             VALUES ('x', 'user_requests', '1', 0, 0)",
            [],
        );
        assert!(result.is_err());

        conn.execute(
            "INSERT INTO documents (id, doc_type, content, created_at, updated_at)
             VALUES ('y', 'request_counter', '1', 0, 0)",
            [],
        )
        .unwrap();
    }
}
