//! Embedding service trait and implementations.
//!
//! - `OpenAiEmbedding` calls an OpenAI-compatible `/embeddings` endpoint.
//!   This is the production embedding backend.
//! - `MockEmbedding` provides deterministic hash-based vectors for testing
//!   and offline runs.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use newslens_core::config::EmbeddingConfig;
use newslens_core::error::NewslensError;

/// Service for generating text embeddings.
///
/// Used both when articles are written and when queries are searched, so
/// the two sides always live in the same vector space.
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, NewslensError>> + Send;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

/// Object-safe version of [`EmbeddingService`] for dynamic dispatch.
///
/// Because `EmbeddingService::embed` returns `impl Future` it is not
/// object-safe. This trait uses a boxed future instead, allowing
/// `Box<dyn DynEmbeddingService>` to be stored without generics.
pub trait DynEmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text (boxed future).
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<f32>, NewslensError>> + Send + 'a>,
    >;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<f32>, NewslensError>> + Send + 'a>,
    > {
        Box::pin(self.embed(text))
    }

    fn dimensions(&self) -> usize {
        EmbeddingService::dimensions(self)
    }
}

// ---------------------------------------------------------------------------
// OpenAiEmbedding - remote embeddings API
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embedding service backed by an OpenAI-compatible HTTP API.
#[derive(Clone)]
pub struct OpenAiEmbedding {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl std::fmt::Debug for OpenAiEmbedding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedding")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl OpenAiEmbedding {
    /// Build a client from the embedding section of the configuration.
    ///
    /// Fails if no API key is configured.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, NewslensError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                NewslensError::Config("OPENAI_API_KEY is required for openai embeddings".into())
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NewslensError::Embedding(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

impl EmbeddingService for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, NewslensError> {
        if text.is_empty() {
            return Err(NewslensError::Embedding("Cannot embed empty text".to_string()));
        }

        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| NewslensError::Embedding(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NewslensError::Embedding(format!(
                "Embeddings API returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| NewslensError::Embedding(format!("Invalid response: {}", e)))?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| NewslensError::Embedding("Response contained no embedding".into()))?;

        debug!(model = %self.model, dims = vector.len(), "Text embedded");
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ---------------------------------------------------------------------------
// MockEmbedding - deterministic hash-based vectors for testing
// ---------------------------------------------------------------------------

/// Mock embedding service that returns deterministic 384-dimensional vectors.
///
/// The output is derived from a hash of the input text, so identical inputs
/// always produce identical outputs (cosine similarity 1.0) while distinct
/// inputs land close to orthogonal.
#[derive(Debug, Clone, Default)]
pub struct MockEmbedding;

impl MockEmbedding {
    pub fn new() -> Self {
        Self
    }

    fn hash_to_vector(text: &str) -> Vec<f32> {
        let mut result = Vec::with_capacity(384);
        for i in 0..384 {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let h = hasher.finish();
            let val = ((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0;
            result.push(val as f32);
        }

        let norm: f32 = result.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut result {
                *val /= norm;
            }
        }

        result
    }
}

impl EmbeddingService for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, NewslensError> {
        if text.is_empty() {
            return Err(NewslensError::Embedding("Cannot embed empty text".to_string()));
        }
        Ok(Self::hash_to_vector(text))
    }

    fn dimensions(&self) -> usize {
        384
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedding_dimension() {
        let service = MockEmbedding::new();
        let vec = service.embed("hello world").await.unwrap();
        assert_eq!(vec.len(), 384);
    }

    #[tokio::test]
    async fn test_mock_embedding_deterministic() {
        let service = MockEmbedding::new();
        let v1 = service.embed("same text").await.unwrap();
        let v2 = service.embed("same text").await.unwrap();
        assert_eq!(v1, v2);
    }

    #[tokio::test]
    async fn test_mock_embedding_different_inputs() {
        let service = MockEmbedding::new();
        let v1 = service.embed("text one").await.unwrap();
        let v2 = service.embed("text two").await.unwrap();
        assert_ne!(v1, v2);
    }

    #[tokio::test]
    async fn test_mock_embedding_empty_text() {
        let service = MockEmbedding::new();
        assert!(service.embed("").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_embedding_is_unit_length() {
        let service = MockEmbedding::new();
        let vec = service.embed("norm check").await.unwrap();
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_dyn_dispatch() {
        let boxed: Box<dyn DynEmbeddingService> = Box::new(MockEmbedding::new());
        let vec = boxed.embed_boxed("boxed").await.unwrap();
        assert_eq!(vec.len(), boxed.dimensions());
    }

    #[test]
    fn test_openai_requires_api_key() {
        let config = EmbeddingConfig::default();
        assert!(matches!(
            OpenAiEmbedding::from_config(&config),
            Err(NewslensError::Config(_))
        ));
    }

    #[test]
    fn test_openai_from_config() {
        let config = EmbeddingConfig {
            api_key: Some("sk-test".into()),
            base_url: "http://localhost:9999/v1/".into(),
            ..Default::default()
        };
        let service = OpenAiEmbedding::from_config(&config).unwrap();
        assert_eq!(EmbeddingService::dimensions(&service), 1536);
        let debug = format!("{:?}", service);
        assert!(debug.contains("http://localhost:9999/v1"));
        assert!(!debug.contains("sk-test"));
    }
}
