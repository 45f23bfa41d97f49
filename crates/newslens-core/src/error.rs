use thiserror::Error;

/// Top-level error type for the newslens service.
///
/// Subsystem crates report failures through these variants so that the `?`
/// operator works across crate boundaries. The API layer decides which
/// variants are client faults and which are server faults.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NewslensError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Rate limit exceeded")]
    RateLimited,
}

impl NewslensError {
    /// True for failures of the ingestion inputs (network or markup), which
    /// the ingestion loop treats as transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, NewslensError::Fetch(_) | NewslensError::Parse(_))
    }
}

impl From<toml::de::Error> for NewslensError {
    fn from(err: toml::de::Error) -> Self {
        NewslensError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for NewslensError {
    fn from(err: serde_json::Error) -> Self {
        NewslensError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for newslens operations.
pub type Result<T> = std::result::Result<T, NewslensError>;
