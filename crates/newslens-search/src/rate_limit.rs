//! Per-user request counter with a fixed lifetime ceiling.
//!
//! Counters live in the shared store as `RequestCounter` documents. There
//! is no time window: once a user passes the ceiling every later request
//! is denied until the counter is reset from outside (see [`RateLimiter::reset`]).

use std::sync::Arc;

use tracing::{debug, warn};

use newslens_core::error::NewslensError;
use newslens_core::types::{DocType, NewDocument};
use newslens_vector::VectorStore;

/// Store id of a user's request counter.
pub fn counter_id(user_id: &str) -> String {
    format!("user:{}:requests", user_id)
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    store: Arc<VectorStore>,
    ceiling: u64,
}

impl RateLimiter {
    pub fn new(store: Arc<VectorStore>, ceiling: u64) -> Self {
        Self { store, ceiling }
    }

    /// Count this request and report whether it may be served.
    ///
    /// The incremented count is persisted even when the request is denied,
    /// so the stored value always equals the number of attempts. Concurrent
    /// calls for the same user may lose an update.
    pub async fn check_and_increment(&self, user_id: &str) -> Result<bool, NewslensError> {
        let previous = self.count(user_id)?;
        let current = previous.saturating_add(1);
        self.write(user_id, current).await?;

        let allowed = current <= self.ceiling;
        if allowed {
            debug!(user_id, count = current, "Request counted");
        } else {
            warn!(user_id, count = current, ceiling = self.ceiling, "Rate limit exceeded");
        }
        Ok(allowed)
    }

    /// Current stored count for a user; zero if none has been recorded.
    pub fn count(&self, user_id: &str) -> Result<u64, NewslensError> {
        let id = counter_id(user_id);
        let Some(doc) = self.store.get(&id)? else {
            return Ok(0);
        };
        if doc.doc_type != DocType::RequestCounter {
            return Err(NewslensError::Storage(format!(
                "{} holds a {} document, expected a request counter",
                id, doc.doc_type
            )));
        }
        doc.content.trim().parse::<u64>().map_err(|e| {
            NewslensError::Storage(format!("Corrupt request counter {}: {}", id, e))
        })
    }

    /// Set a user's counter back to zero.
    pub async fn reset(&self, user_id: &str) -> Result<(), NewslensError> {
        self.write(user_id, 0).await
    }

    async fn write(&self, user_id: &str, count: u64) -> Result<(), NewslensError> {
        let doc = NewDocument::keyed(
            counter_id(user_id),
            DocType::RequestCounter,
            count.to_string(),
            serde_json::json!({ "user_id": user_id, "count": count }),
        );
        self.store.add(vec![doc]).await?;
        Ok(())
    }
}
