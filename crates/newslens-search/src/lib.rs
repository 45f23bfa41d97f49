//! Rate-limited, cached semantic search over ingested articles.

pub mod cache;
pub mod rate_limit;
pub mod service;

pub use cache::{cache_key, normalize_query, SearchCache};
pub use rate_limit::{counter_id, RateLimiter};
pub use service::{filter_results, SearchService};
