use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{NewslensError, Result};

/// Top-level configuration for the newslens service.
///
/// Loaded from a TOML file, then overridden from the environment (see
/// [`NewslensConfig::apply_env`]). Each section corresponds to one
/// component of the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewslensConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub redis: RedisConfig,
}

impl NewslensConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: NewslensConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using an arbitrary variable lookup.
    ///
    /// Unparseable numeric values are ignored with a warning so that one bad
    /// variable does not prevent startup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("NEWSLENS_HOST") {
            self.server.host = v;
        }
        if let Some(v) = parse_env(&lookup, "NEWSLENS_PORT") {
            self.server.port = v;
        }
        if let Some(v) = lookup("CHROMA_PERSIST_DIRECTORY") {
            self.storage.persist_directory = v;
        }
        if let Some(v) = lookup("NEWSLENS_EMBEDDING_PROVIDER") {
            self.embedding.provider = v;
        }
        if let Some(v) = lookup("OPENAI_API_KEY") {
            if !v.trim().is_empty() {
                self.embedding.api_key = Some(v);
            }
        }
        if let Some(v) = parse_env(&lookup, "RATE_LIMIT") {
            self.search.rate_limit = v;
        }
        if let Some(v) = parse_env(&lookup, "CACHE_EXPIRATION") {
            self.search.cache_expiration_secs = v;
        }
        if let Some(v) = lookup("REDIS_HOST") {
            self.redis.host = v;
        }
        if let Some(v) = parse_env(&lookup, "REDIS_PORT") {
            self.redis.port = v;
        }
        if let Some(v) = parse_env(&lookup, "REDIS_DB") {
            self.redis.db = v;
        }
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.ingest.chunk_size == 0 {
            return Err(NewslensError::Config(
                "ingest.chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.ingest.chunk_overlap >= self.ingest.chunk_size {
            return Err(NewslensError::Config(
                "ingest.chunk_overlap must be smaller than ingest.chunk_size".to_string(),
            ));
        }
        if self.ingest.link_classes.is_empty() {
            return Err(NewslensError::Config(
                "ingest.link_classes must name at least one class".to_string(),
            ));
        }
        if self.search.rate_limit == 0 {
            return Err(NewslensError::Config(
                "search.rate_limit must be at least 1".to_string(),
            ));
        }
        if !(1..=MAX_TOP_K).contains(&self.search.default_top_k) {
            return Err(NewslensError::Config(format!(
                "search.default_top_k must be between 1 and {}",
                MAX_TOP_K
            )));
        }
        Ok(())
    }
}

/// Upper bound on `top_k` accepted from clients.
pub const MAX_TOP_K: usize = 100;

fn parse_env<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Document store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the SQLite database.
    pub persist_directory: String,
    /// Database file name inside `persist_directory`.
    pub database_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            persist_directory: "langchain_store".to_string(),
            database_file: "newslens.db".to_string(),
        }
    }
}

/// Embedding backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// "openai" or "mock".
    pub provider: String,
    /// Bearer credential for the embeddings API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Vector dimensionality reported by the model.
    pub dimensions: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            api_key: None,
            model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            dimensions: 1536,
            timeout_secs: 30,
        }
    }
}

/// Search, rate limiting and caching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum requests a user may make. Never resets on its own.
    pub rate_limit: u64,
    /// Cache entry lifetime in seconds.
    pub cache_expiration_secs: u64,
    pub default_top_k: usize,
    pub default_threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            rate_limit: 5,
            cache_expiration_secs: 3600,
            default_top_k: 5,
            default_threshold: 0.5,
        }
    }
}

/// Background ingestion loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub enabled: bool,
    /// Front page whose top stories are crawled.
    pub source_url: String,
    /// Number of story links followed per cycle.
    pub top_n: usize,
    /// CSS classes marking story links: either on the anchor itself or on
    /// the element the anchor is nested in.
    pub link_classes: Vec<String>,
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Sleep after a successful cycle.
    pub interval_secs: u64,
    /// Sleep after a failed cycle.
    pub backoff_secs: u64,
    /// Per-request timeout for every outbound fetch.
    pub fetch_timeout_secs: u64,
    /// Hosts that may be fetched. Empty allows any host.
    pub allowed_hosts: Vec<String>,
    pub user_agent: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source_url: "https://news.ycombinator.com".to_string(),
            top_n: 5,
            link_classes: vec!["titleline".to_string(), "storylink".to_string()],
            chunk_size: 1000,
            chunk_overlap: 0,
            interval_secs: 3600,
            backoff_secs: 300,
            fetch_timeout_secs: 15,
            allowed_hosts: vec![],
            user_agent: concat!("newslens/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Redis connection settings.
///
/// Parsed and carried for deployments that set them, but no component
/// connects to Redis: counters and cache entries live in the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub db: u32,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
        }
    }
}
