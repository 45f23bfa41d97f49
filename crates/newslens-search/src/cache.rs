//! Search result cache stored as `CacheEntry` documents.

use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use newslens_core::error::NewslensError;
use newslens_core::types::{DocType, NewDocument, SearchResult};
use newslens_vector::VectorStore;

/// Deterministic key for a `(text, top_k, threshold)` triple.
///
/// Whitespace in `text` is trimmed and collapsed; case is preserved.
pub fn cache_key(text: &str, top_k: usize, threshold: f64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_query(text).as_bytes());
    hasher.update([0u8]);
    hasher.update(top_k.to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(threshold.to_string().as_bytes());
    format!("search:{}", hex::encode(hasher.finalize()))
}

/// Trim `text` and collapse runs of whitespace to single spaces.
pub fn normalize_query(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone)]
pub struct SearchCache {
    store: Arc<VectorStore>,
}

impl SearchCache {
    pub fn new(store: Arc<VectorStore>) -> Self {
        Self { store }
    }

    /// Cached results for the triple, if an unexpired entry exists.
    ///
    /// Expired or unreadable entries count as misses; the next `store`
    /// for the same key overwrites them.
    pub fn lookup(
        &self,
        text: &str,
        top_k: usize,
        threshold: f64,
    ) -> Result<Option<Vec<SearchResult>>, NewslensError> {
        let key = cache_key(text, top_k, threshold);
        let Some(doc) = self.store.get(&key)? else {
            return Ok(None);
        };
        if doc.doc_type != DocType::CacheEntry {
            warn!(key, doc_type = %doc.doc_type, "Cache key holds a foreign document");
            return Ok(None);
        }

        let expires_at_ms = doc.metadata.get("expires_at_ms").and_then(|v| v.as_i64());
        if let Some(expires_at_ms) = expires_at_ms {
            if expires_at_ms < Utc::now().timestamp_millis() {
                debug!(key, expires_at_ms, "Cache entry expired");
                return Ok(None);
            }
        }

        match serde_json::from_str::<Vec<SearchResult>>(&doc.content) {
            Ok(results) => Ok(Some(results)),
            Err(e) => {
                warn!(key, error = %e, "Discarding unreadable cache entry");
                Ok(None)
            }
        }
    }

    /// Write results for the triple, expiring `ttl_secs` from now.
    pub async fn store(
        &self,
        text: &str,
        top_k: usize,
        threshold: f64,
        results: &[SearchResult],
        ttl_secs: u64,
    ) -> Result<(), NewslensError> {
        let key = cache_key(text, top_k, threshold);
        let ttl_ms = i64::try_from(ttl_secs)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        let expires_at_ms = Utc::now().timestamp_millis().saturating_add(ttl_ms);

        let doc = NewDocument::keyed(
            key,
            DocType::CacheEntry,
            serde_json::to_string(results)?,
            serde_json::json!({
                "query": normalize_query(text),
                "top_k": top_k,
                "threshold": threshold,
                "expires_at_ms": expires_at_ms,
            }),
        );
        self.store.add(vec![doc]).await?;
        Ok(())
    }
}
