//! Shared fixtures for integration tests: a deterministic embedding
//! provider (no model download, no network) and a fresh in-memory
//! `Elefante` instance.

use elefante::config::Config;
use elefante::embeddings::{Embedding, EmbeddingError, EmbeddingProvider};
use elefante::Elefante;
use std::sync::Arc;

/// Hashes input text into a fixed-dimension vector so identical
/// content always embeds identically and similar content (shared
/// words) embeds closely.
pub struct FixtureEmbeddingProvider;

impl EmbeddingProvider for FixtureEmbeddingProvider {
    fn dimensions(&self) -> usize {
        elefante::embeddings::EMBEDDING_DIMENSIONS
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let mut vector = vec![0.0_f32; self.dimensions()];
        for word in text.to_lowercase().split_whitespace() {
            let mut hash: u32 = 2166136261;
            for byte in word.bytes() {
                hash ^= u32::from(byte);
                hash = hash.wrapping_mul(16777619);
            }
            vector[hash as usize % vector.len()] += 1.0;
        }
        if vector.iter().all(|v| *v == 0.0) {
            vector[0] = 1.0;
        }
        Ok(Embedding::new(vector))
    }
}

#[allow(dead_code)]
pub fn elefante() -> Elefante {
    Elefante::open_in_memory(Config::default(), Arc::new(FixtureEmbeddingProvider)).unwrap()
}
