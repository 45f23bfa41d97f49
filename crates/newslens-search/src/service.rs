//! One search request, end to end.
//!
//! Steps run in order: rate-limit check, cache check, retrieval, filtering,
//! cache write. A denied request stops at the first step with
//! [`NewslensError::RateLimited`]; a cache hit stops at the second.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use newslens_core::config::{SearchConfig, MAX_TOP_K};
use newslens_core::error::NewslensError;
use newslens_core::types::{DocType, Document, SearchOutcome, SearchQuery, SearchResult};
use newslens_vector::VectorStore;

use crate::cache::{normalize_query, SearchCache};
use crate::rate_limit::RateLimiter;

/// Keep hits scoring at least `threshold` that are articles, in retrieval
/// order.
pub fn filter_results(pairs: Vec<(Document, f64)>, threshold: f64) -> Vec<SearchResult> {
    pairs
        .into_iter()
        .filter(|(doc, score)| *score >= threshold && doc.doc_type == DocType::Article)
        .map(|(doc, score)| SearchResult {
            source: doc.source.unwrap_or_default(),
            content: doc.content,
            score,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct SearchService {
    store: Arc<VectorStore>,
    limiter: RateLimiter,
    cache: SearchCache,
    cache_ttl_secs: u64,
}

impl SearchService {
    pub fn new(store: Arc<VectorStore>, config: &SearchConfig) -> Self {
        Self {
            limiter: RateLimiter::new(Arc::clone(&store), config.rate_limit),
            cache: SearchCache::new(Arc::clone(&store)),
            cache_ttl_secs: config.cache_expiration_secs,
            store,
        }
    }

    /// Serve one query.
    ///
    /// Invalid queries are rejected before they count against the user's
    /// limit.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, NewslensError> {
        validate(query)?;
        let started = Instant::now();

        if !self.limiter.check_and_increment(&query.user_id).await? {
            return Err(NewslensError::RateLimited);
        }

        // Cache key and embedding input are the same text.
        let text = normalize_query(&query.text);

        if let Some(results) = self.cache.lookup(&text, query.top_k, query.threshold)? {
            info!(
                user_id = %query.user_id,
                text = %query.text,
                cached = true,
                results = results.len(),
                elapsed_secs = started.elapsed().as_secs_f64(),
                "Search served"
            );
            return Ok(SearchOutcome {
                results,
                cached: true,
                inference_time: None,
            });
        }

        let pairs = self
            .store
            .similarity_search(&text, query.top_k)
            .await
            .map_err(|e| match e {
                NewslensError::Embedding(msg) => NewslensError::Search(msg),
                other => other,
            })?;
        let results = filter_results(pairs, query.threshold);

        self.cache
            .store(
                &text,
                query.top_k,
                query.threshold,
                &results,
                self.cache_ttl_secs,
            )
            .await?;

        let elapsed = started.elapsed().as_secs_f64();
        info!(
            user_id = %query.user_id,
            text = %query.text,
            cached = false,
            results = results.len(),
            elapsed_secs = elapsed,
            "Search served"
        );

        Ok(SearchOutcome {
            results,
            cached: false,
            inference_time: Some(elapsed),
        })
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

fn validate(query: &SearchQuery) -> Result<(), NewslensError> {
    if query.user_id.trim().is_empty() {
        return Err(NewslensError::Validation("user_id must not be empty".into()));
    }
    if query.text.trim().is_empty() {
        return Err(NewslensError::Validation("text must not be empty".into()));
    }
    if !(1..=MAX_TOP_K).contains(&query.top_k) {
        return Err(NewslensError::Validation(format!(
            "top_k must be between 1 and {}",
            MAX_TOP_K
        )));
    }
    if !query.threshold.is_finite() {
        return Err(NewslensError::Validation("threshold must be a finite number".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use newslens_core::types::NewDocument;
    use newslens_storage::Database;
    use newslens_vector::{article_id, MockEmbedding};

    fn store() -> Arc<VectorStore> {
        Arc::new(
            VectorStore::open(Arc::new(Database::in_memory().unwrap()), MockEmbedding::new())
                .unwrap(),
        )
    }

    fn service(store: Arc<VectorStore>) -> SearchService {
        SearchService::new(store, &SearchConfig::default())
    }

    fn query(user_id: &str, text: &str) -> SearchQuery {
        SearchQuery {
            user_id: user_id.into(),
            text: text.into(),
            top_k: 3,
            threshold: 0.5,
        }
    }

    async fn add_article(store: &VectorStore, source: &str, content: &str) {
        store
            .add(vec![NewDocument::article(
                source,
                content,
                article_id(source, content),
            )])
            .await
            .unwrap();
    }

    fn doc(doc_type: DocType, content: &str) -> Document {
        Document {
            id: content.into(),
            doc_type,
            content: content.into(),
            source: Some("https://a.example".into()),
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_filter_keeps_articles_above_threshold_in_order() {
        let pairs = vec![
            (doc(DocType::Article, "first"), 0.9),
            (doc(DocType::CacheEntry, "cache"), 0.95),
            (doc(DocType::Article, "second"), 0.5),
            (doc(DocType::RequestCounter, "counter"), 0.99),
            (doc(DocType::Article, "weak"), 0.49),
        ];
        let results = filter_results(pairs, 0.5);
        let contents: Vec<_> = results.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert_eq!(results[0].source, "https://a.example");
        assert_eq!(results[0].score, 0.9);
    }

    #[tokio::test]
    async fn test_no_matching_articles_returns_empty_uncached() {
        let service = service(store());
        let outcome = service.search(&query("u1", "rust")).await.unwrap();
        assert!(outcome.results.is_empty());
        assert!(!outcome.cached);
        assert!(outcome.inference_time.is_some());
    }

    #[tokio::test]
    async fn test_repeat_query_is_cached_with_same_results() {
        let store = store();
        add_article(&store, "https://a.example", "rust").await;
        add_article(&store, "https://b.example", "gardening tips").await;
        let service = service(store);

        let first = service.search(&query("u1", "rust")).await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.results.len(), 1);
        assert_eq!(first.results[0].source, "https://a.example");

        let second = service.search(&query("u1", "rust")).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.inference_time, None);
        assert_eq!(second.results, first.results);
    }

    #[tokio::test]
    async fn test_query_whitespace_is_normalized_before_retrieval() {
        let store = store();
        add_article(&store, "https://a.example", "rust lang").await;
        let service = service(store);

        let first = service.search(&query("u1", "  rust   lang ")).await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.results.len(), 1);
        assert!((first.results[0].score - 1.0).abs() < 1e-6);

        let second = service.search(&query("u1", "rust lang")).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.results, first.results);
    }

    #[tokio::test]
    async fn test_sixth_request_is_rate_limited() {
        let service = service(store());
        for _ in 0..5 {
            service.search(&query("u1", "rust")).await.unwrap();
        }
        assert!(matches!(
            service.search(&query("u1", "rust")).await,
            Err(NewslensError::RateLimited)
        ));
        assert_eq!(service.limiter().count("u1").unwrap(), 6);
        assert!(service.search(&query("u2", "rust")).await.is_ok());
    }

    #[tokio::test]
    async fn test_bookkeeping_content_never_returned() {
        let store = store();
        store
            .add(vec![NewDocument::keyed(
                "user:rust:requests",
                DocType::RequestCounter,
                "rust",
                serde_json::json!({}),
            )])
            .await
            .unwrap();
        let service = service(store);

        let outcome = service.search(&query("u1", "rust")).await.unwrap();
        assert!(outcome.results.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_query_does_not_count() {
        let service = service(store());
        let mut bad = query("u1", "   ");
        assert!(matches!(
            service.search(&bad).await,
            Err(NewslensError::Validation(_))
        ));

        bad = SearchQuery {
            top_k: 0,
            ..query("u1", "rust")
        };
        assert!(matches!(
            service.search(&bad).await,
            Err(NewslensError::Validation(_))
        ));

        bad = SearchQuery {
            threshold: f64::NAN,
            ..query("u1", "rust")
        };
        assert!(service.search(&bad).await.is_err());
        assert!(service.search(&query("", "rust")).await.is_err());

        assert_eq!(service.limiter().count("u1").unwrap(), 0);
    }
}
