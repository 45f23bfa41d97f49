use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Discriminator for everything written to the shared document store.
///
/// Articles, request counters and cached search results all live in one
/// store. Every read path that can surface documents to a user must check
/// this tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    /// A chunk of scraped article text. Embedded and searchable.
    Article,
    /// A serialized search result list with an expiry timestamp.
    CacheEntry,
    /// A per-user request count.
    RequestCounter,
}

impl DocType {
    /// The string stored in the `doc_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Article => "article",
            DocType::CacheEntry => "cache_entry",
            DocType::RequestCounter => "request_counter",
        }
    }

    /// Whether documents of this type are embedded into the similarity index.
    pub fn is_searchable(&self) -> bool {
        matches!(self, DocType::Article)
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocType {
    type Err = crate::error::NewslensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "article" => Ok(DocType::Article),
            "cache_entry" => Ok(DocType::CacheEntry),
            "request_counter" => Ok(DocType::RequestCounter),
            other => Err(crate::error::NewslensError::Storage(format!(
                "Unknown doc_type '{}'",
                other
            ))),
        }
    }
}

// =============================================================================
// Documents
// =============================================================================

/// A document as persisted in the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Opaque id: content-derived for articles, an explicit key otherwise.
    pub id: String,
    pub doc_type: DocType,
    pub content: String,
    /// Source URL. Only articles carry one.
    pub source: Option<String>,
    /// Free-form metadata (e.g. `expires_at` for cache entries).
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A document about to be written. The store assigns timestamps.
#[derive(Clone, Debug, PartialEq)]
pub struct NewDocument {
    pub id: String,
    pub doc_type: DocType,
    pub content: String,
    pub source: Option<String>,
    pub metadata: serde_json::Value,
}

impl NewDocument {
    /// An article chunk. The id is derived from the source and content so
    /// that re-ingesting the same chunk overwrites it.
    pub fn article(source: &str, content: impl Into<String>, id: String) -> Self {
        Self {
            id,
            doc_type: DocType::Article,
            content: content.into(),
            source: Some(source.to_string()),
            metadata: serde_json::json!({ "source": source }),
        }
    }

    /// A keyed bookkeeping document (counter or cache entry).
    pub fn keyed(
        id: impl Into<String>,
        doc_type: DocType,
        content: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            doc_type,
            content: content.into(),
            source: None,
            metadata,
        }
    }
}

// =============================================================================
// Search
// =============================================================================

/// A single user-facing search hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub content: String,
    pub source: String,
    pub score: f64,
}

/// Parameters of one search, after defaults have been applied.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchQuery {
    pub user_id: String,
    pub text: String,
    pub top_k: usize,
    pub threshold: f64,
}

/// Outcome of a served search.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub cached: bool,
    /// Wall-clock seconds spent computing a fresh result. `None` on cache hits.
    pub inference_time: Option<f64>,
}
