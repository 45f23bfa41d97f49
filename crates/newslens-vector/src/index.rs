//! In-memory vector index with brute-force cosine similarity search.
//!
//! All operations are O(n) for search, which is fine for the few thousand
//! chunks an hourly top-N crawl accumulates.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use newslens_core::error::NewslensError;

/// A single hit returned from a vector search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Id of the matching document.
    pub id: String,
    /// Cosine similarity in [-1, 1]; higher is more similar.
    pub score: f64,
}

/// In-memory vector index using brute-force cosine similarity.
///
/// Thread-safe via interior RwLock; clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Arc<RwLock<HashMap<String, Vec<f32>>>>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a vector. Overwrites any existing entry with the same id.
    pub fn insert(&self, id: &str, embedding: Vec<f32>) -> Result<(), NewslensError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| NewslensError::Storage(format!("Lock poisoned: {}", e)))?;
        entries.insert(id.to_string(), embedding);
        Ok(())
    }

    /// Search for the k nearest neighbours to the query vector.
    ///
    /// Returns results sorted by descending similarity score.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, NewslensError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| NewslensError::Storage(format!("Lock poisoned: {}", e)))?;

        let mut scored: Vec<SearchHit> = entries
            .iter()
            .map(|(id, embedding)| SearchHit {
                id: id.clone(),
                score: cosine_similarity(query, embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored)
    }

    /// Remove an entry. Missing ids are not an error.
    pub fn delete(&self, id: &str) -> Result<(), NewslensError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| NewslensError::Storage(format!("Lock poisoned: {}", e)))?;
        entries.remove(id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();

    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_search() {
        let index = VectorIndex::new();
        index.insert("a", vec![1.0f32; 8]).unwrap();
        index.insert("b", vec![1.0f32; 8]).unwrap();
        assert_eq!(index.len(), 2);

        let hits = index.search(&[1.0f32; 8], 5).unwrap();
        assert_eq!(hits.len(), 2);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_search_empty_index() {
        let index = VectorIndex::new();
        assert!(index.search(&[1.0f32; 8], 10).unwrap().is_empty());
    }

    #[test]
    fn test_search_respects_k_limit() {
        let index = VectorIndex::new();
        for i in 0..10 {
            index.insert(&format!("doc-{}", i), vec![1.0f32; 8]).unwrap();
        }
        assert_eq!(index.search(&[1.0f32; 8], 3).unwrap().len(), 3);
    }

    #[test]
    fn test_search_ordering() {
        let index = VectorIndex::new();
        index.insert("close", vec![1.0f32; 8]).unwrap();
        index.insert("far", vec![-1.0f32; 8]).unwrap();

        let hits = index.search(&[1.0f32; 8], 10).unwrap();
        assert_eq!(hits[0].id, "close");
        assert!(hits[0].score > hits[1].score);
        assert!((hits[1].score + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_insert_overwrites() {
        let index = VectorIndex::new();
        index.insert("a", vec![1.0f32; 8]).unwrap();
        index.insert("a", vec![2.0f32; 8]).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_delete() {
        let index = VectorIndex::new();
        index.insert("a", vec![1.0f32; 8]).unwrap();
        index.delete("a").unwrap();
        index.delete("never-existed").unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let mut a = vec![0.0f32; 16];
        let mut b = vec![0.0f32; 16];
        a[0] = 1.0;
        b[1] = 1.0;
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[0.0; 4], &[1.0; 4]), 0.0);
        assert_eq!(cosine_similarity(&[1.0; 4], &[1.0; 5]), 0.0);
    }
}
