//! C1 — Embedding provider: produces fixed-dimension dense vectors for
//! text input. The provider itself is an external collaborator
//! (`spec.md` §2); this module defines the trait boundary and ships
//! the local fastembed-backed default implementation.

mod local;

pub use local::{EMBEDDING_DIMENSIONS, LocalEmbeddingProvider};

/// Errors surfaced by an [`EmbeddingProvider`].
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding model initialization failed: {0}")]
    ModelInit(String),
    #[error("embedding generation failed: {0}")]
    Failed(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// A dense embedding vector plus its dimensionality.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub vector: Vec<f32>,
}

impl Embedding {
    #[must_use]
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }

    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }

    #[must_use]
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        cosine_similarity(&self.vector, &other.vector)
    }
}

/// C1's interface: a fixed-dimension text embedder. The write
/// coordinator and retrieval engine depend on this trait, not a
/// concrete backend, so swapping providers never touches C2–C9.
pub trait EmbeddingProvider: Send + Sync {
    /// Declared output dimensionality.
    fn dimensions(&self) -> usize;

    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Embed a batch of texts. The default implementation embeds
    /// sequentially; backends that support true batching should
    /// override this.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Cosine similarity between two equal-length vectors. Returns `0.0`
/// for mismatched lengths or degenerate (zero-norm) inputs.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = (norm_a * norm_b).sqrt();
    if denom > 0.0 { dot / denom } else { 0.0 }
}

/// Euclidean distance between two equal-length vectors.
#[must_use]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::MAX;
    }
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn mismatched_lengths_yield_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }
}
