//! Repository for the shared documents table.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::OptionalExtension;

use newslens_core::error::NewslensError;
use newslens_core::types::{DocType, Document, NewDocument};

use crate::db::Database;

/// An embedding row loaded back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEmbedding {
    pub id: String,
    pub vector: Vec<f32>,
}

/// Repository for documents of every type.
#[derive(Clone)]
pub struct DocumentRepository {
    db: Arc<Database>,
}

impl DocumentRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a document, or overwrite the existing row with the same id.
    ///
    /// `created_at` is kept from the first write; `updated_at` moves forward.
    pub fn upsert(
        &self,
        doc: &NewDocument,
        embedding: Option<&[f32]>,
    ) -> Result<(), NewslensError> {
        let now = Utc::now().timestamp();
        let metadata = serde_json::to_string(&doc.metadata)?;
        let blob = embedding.map(encode_embedding);

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (id, doc_type, content, source, metadata, embedding, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    doc_type = excluded.doc_type,
                    content = excluded.content,
                    source = excluded.source,
                    metadata = excluded.metadata,
                    embedding = excluded.embedding,
                    updated_at = excluded.updated_at",
                rusqlite::params![
                    doc.id,
                    doc.doc_type.as_str(),
                    doc.content,
                    doc.source,
                    metadata,
                    blob,
                    now,
                ],
            )
            .map_err(|e| NewslensError::Storage(format!("Failed to save document: {}", e)))?;
            Ok(())
        })
    }

    /// Find a document by id.
    pub fn find_by_id(&self, id: &str) -> Result<Option<Document>, NewslensError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, doc_type, content, source, metadata, created_at, updated_at
                     FROM documents WHERE id = ?1",
                )
                .map_err(|e| NewslensError::Storage(e.to_string()))?;

            let row = stmt
                .query_row(rusqlite::params![id], read_row)
                .optional()
                .map_err(|e| NewslensError::Storage(e.to_string()))?;

            row.map(row_to_document).transpose()
        })
    }

    /// Load every stored embedding of the given type.
    pub fn embeddings(&self, doc_type: DocType) -> Result<Vec<StoredEmbedding>, NewslensError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, embedding FROM documents
                     WHERE doc_type = ?1 AND embedding IS NOT NULL",
                )
                .map_err(|e| NewslensError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![doc_type.as_str()], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
                })
                .map_err(|e| NewslensError::Storage(e.to_string()))?;

            let mut out = Vec::new();
            for row in rows {
                let (id, blob) = row.map_err(|e| NewslensError::Storage(e.to_string()))?;
                out.push(StoredEmbedding {
                    vector: decode_embedding(&id, &blob)?,
                    id,
                });
            }
            Ok(out)
        })
    }

    /// Count documents, optionally restricted to one type.
    pub fn count(&self, doc_type: Option<DocType>) -> Result<u64, NewslensError> {
        self.db.with_conn(|conn| {
            let count: i64 = match doc_type {
                Some(dt) => conn.query_row(
                    "SELECT COUNT(*) FROM documents WHERE doc_type = ?1",
                    rusqlite::params![dt.as_str()],
                    |row| row.get(0),
                ),
                None => conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0)),
            }
            .map_err(|e| NewslensError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

type RawRow = (String, String, String, Option<String>, String, i64, i64);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn row_to_document(raw: RawRow) -> Result<Document, NewslensError> {
    let (id, doc_type, content, source, metadata, created_at, updated_at) = raw;
    Ok(Document {
        id,
        doc_type: doc_type.parse()?,
        content,
        source,
        metadata: serde_json::from_str(&metadata)?,
        created_at: from_unix(created_at),
        updated_at: from_unix(updated_at),
    })
}

fn from_unix(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(id: &str, blob: &[u8]) -> Result<Vec<f32>, NewslensError> {
    if blob.len() % 4 != 0 {
        return Err(NewslensError::Storage(format!(
            "Corrupt embedding for document {}: {} bytes",
            id,
            blob.len()
        )));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_repo() -> DocumentRepository {
        DocumentRepository::new(Arc::new(Database::in_memory().unwrap()))
    }

    fn counter(user: &str, count: u64) -> NewDocument {
        NewDocument::keyed(
            format!("user:{}:requests", user),
            DocType::RequestCounter,
            count.to_string(),
            serde_json::json!({}),
        )
    }

    #[test]
    fn test_upsert_and_find() {
        let repo = make_repo();
        let doc = NewDocument::article("https://example.com", "hello world", "a1".into());
        repo.upsert(&doc, Some(&[0.5, -0.25])).unwrap();

        let found = repo.find_by_id("a1").unwrap().unwrap();
        assert_eq!(found.doc_type, DocType::Article);
        assert_eq!(found.content, "hello world");
        assert_eq!(found.source.as_deref(), Some("https://example.com"));
        assert_eq!(found.metadata["source"], "https://example.com");
    }

    #[test]
    fn test_find_missing_returns_none() {
        let repo = make_repo();
        assert!(repo.find_by_id("nope").unwrap().is_none());
    }

    #[test]
    fn test_upsert_overwrites_content() {
        let repo = make_repo();
        repo.upsert(&counter("u1", 1), None).unwrap();
        repo.upsert(&counter("u1", 2), None).unwrap();

        let found = repo.find_by_id("user:u1:requests").unwrap().unwrap();
        assert_eq!(found.content, "2");
        assert_eq!(repo.count(None).unwrap(), 1);
    }

    #[test]
    fn test_embeddings_round_trip_only_for_requested_type() {
        let repo = make_repo();
        let article = NewDocument::article("https://example.com", "text", "a1".into());
        repo.upsert(&article, Some(&[1.0, 2.0, 3.0])).unwrap();
        repo.upsert(&counter("u1", 1), None).unwrap();

        let loaded = repo.embeddings(DocType::Article).unwrap();
        assert_eq!(
            loaded,
            vec![StoredEmbedding {
                id: "a1".into(),
                vector: vec![1.0, 2.0, 3.0]
            }]
        );
        assert!(repo.embeddings(DocType::RequestCounter).unwrap().is_empty());
    }

    #[test]
    fn test_count_by_type() {
        let repo = make_repo();
        repo.upsert(&counter("u1", 1), None).unwrap();
        repo.upsert(&counter("u2", 1), None).unwrap();
        repo.upsert(
            &NewDocument::article("https://example.com", "x", "a1".into()),
            Some(&[1.0]),
        )
        .unwrap();

        assert_eq!(repo.count(Some(DocType::RequestCounter)).unwrap(), 2);
        assert_eq!(repo.count(Some(DocType::Article)).unwrap(), 1);
        assert_eq!(repo.count(Some(DocType::CacheEntry)).unwrap(), 0);
        assert_eq!(repo.count(None).unwrap(), 3);
    }

    #[test]
    fn test_decode_rejects_truncated_blob() {
        assert!(decode_embedding("x", &[0, 0, 0]).is_err());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("newslens.db");
        {
            let repo = DocumentRepository::new(Arc::new(Database::new(&path).unwrap()));
            repo.upsert(&counter("u1", 4), None).unwrap();
        }
        let repo = DocumentRepository::new(Arc::new(Database::new(&path).unwrap()));
        let found = repo.find_by_id("user:u1:requests").unwrap().unwrap();
        assert_eq!(found.content, "4");
    }
}
