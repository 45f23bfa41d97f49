//! The shared document store.
//!
//! One `VectorStore` holds articles, request counters and cache entries.
//! Only articles are embedded; bookkeeping documents are written and read
//! by key and never enter the similarity index.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use newslens_core::error::NewslensError;
use newslens_core::types::{DocType, Document, NewDocument};
use newslens_storage::{Database, DocumentRepository};

use crate::embedding::{DynEmbeddingService, EmbeddingService};
use crate::index::VectorIndex;

/// Content-derived id for an article chunk.
pub fn article_id(source: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"\n");
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Persistent document store with nearest-neighbour search over articles.
///
/// Safe to share behind an `Arc` between the ingestion task and request
/// handlers. Each `add`/`get` is independent; there is no multi-key
/// atomicity.
pub struct VectorStore {
    repo: DocumentRepository,
    index: VectorIndex,
    embedder: Box<dyn DynEmbeddingService>,
}

impl VectorStore {
    /// Open the store over a database, rebuilding the index from the
    /// embeddings persisted there.
    pub fn open(
        db: Arc<Database>,
        embedder: impl EmbeddingService + 'static,
    ) -> Result<Self, NewslensError> {
        Self::open_dyn(db, Box::new(embedder))
    }

    /// Open the store with a pre-boxed embedding service.
    pub fn open_dyn(
        db: Arc<Database>,
        embedder: Box<dyn DynEmbeddingService>,
    ) -> Result<Self, NewslensError> {
        let repo = DocumentRepository::new(db);
        let index = VectorIndex::new();

        let dimensions = embedder.dimensions();
        let stored = repo.embeddings(DocType::Article)?;
        let restored = stored.len();
        for row in stored {
            if row.vector.len() != dimensions {
                return Err(NewslensError::Config(format!(
                    "Stored embedding {} has {} dimensions but the embedder produces {}; \
                     use the embedder the store was built with or start from an empty store",
                    row.id,
                    row.vector.len(),
                    dimensions
                )));
            }
            index.insert(&row.id, row.vector)?;
        }
        info!(restored, dimensions, "Vector index rebuilt from storage");

        Ok(Self {
            repo,
            index,
            embedder,
        })
    }

    /// Write documents, overwriting any with the same id. Returns their ids.
    ///
    /// Articles are embedded before being persisted. If any embed or write
    /// fails, documents earlier in the batch stay written.
    pub async fn add(&self, docs: Vec<NewDocument>) -> Result<Vec<String>, NewslensError> {
        let mut ids = Vec::with_capacity(docs.len());
        for doc in docs {
            if doc.doc_type.is_searchable() {
                let embedding = self.embedder.embed_boxed(&doc.content).await?;
                if embedding.len() != self.embedder.dimensions() {
                    return Err(NewslensError::Embedding(format!(
                        "Embedder returned {} dimensions for {}, expected {}",
                        embedding.len(),
                        doc.id,
                        self.embedder.dimensions()
                    )));
                }
                self.repo.upsert(&doc, Some(embedding.as_slice()))?;
                self.index.insert(&doc.id, embedding)?;
            } else {
                self.repo.upsert(&doc, None)?;
                // An id reused for bookkeeping must not stay searchable.
                self.index.delete(&doc.id)?;
            }
            debug!(id = %doc.id, doc_type = %doc.doc_type, "Document written");
            ids.push(doc.id);
        }
        Ok(ids)
    }

    /// Point lookup by id.
    pub fn get(&self, id: &str) -> Result<Option<Document>, NewslensError> {
        self.repo.find_by_id(id)
    }

    /// Embed `query` and return the `k` most similar documents, most similar
    /// first. Scores are cosine similarities: higher means more similar.
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(Document, f64)>, NewslensError> {
        if k == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed_boxed(query).await?;
        let hits = self.index.search(&query_vec, k)?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            // A concurrent overwrite may have removed the row; skip it.
            if let Some(doc) = self.repo.find_by_id(&hit.id)? {
                results.push((doc, hit.score));
            }
        }
        Ok(results)
    }

    /// Number of persisted documents of one type.
    pub fn count(&self, doc_type: DocType) -> Result<u64, NewslensError> {
        self.repo.count(Some(doc_type))
    }

    /// Number of vectors in the similarity index.
    pub fn indexed(&self) -> usize {
        self.index.len()
    }

    pub fn embedding_dimensions(&self) -> usize {
        self.embedder.dimensions()
    }
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("indexed", &self.index.len())
            .finish()
    }
}
