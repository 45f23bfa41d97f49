//! newslens vector crate - embeddings, cosine index, chunking, and the
//! document store facade.
//!
//! [`VectorStore`] is the single shared store: it persists every document
//! through `newslens-storage`, embeds articles with an [`EmbeddingService`],
//! and answers nearest-neighbour queries from an in-memory [`VectorIndex`]
//! rebuilt from disk on open.

pub mod chunker;
pub mod embedding;
pub mod index;
pub mod store;

pub use chunker::{split, TextChunker};
pub use embedding::{DynEmbeddingService, EmbeddingService, MockEmbedding, OpenAiEmbedding};
pub use index::{SearchHit, VectorIndex};
pub use store::{article_id, VectorStore};
