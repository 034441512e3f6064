//! Local embedding provider backed by fastembed (ONNX), adapted from
//! the teacher's `embeddings::local` module. No network calls at query
//! time; model weights are downloaded once and cached.

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;

use super::{Embedding, EmbeddingError, EmbeddingProvider};

/// Matryoshka-truncated output dimensionality (nomic-embed-text-v1.5
/// is trained for truncation-then-renormalize at this width).
pub const EMBEDDING_DIMENSIONS: usize = 256;

const MAX_TEXT_LENGTH: usize = 8192;
const BATCH_SIZE: usize = 32;

fn cache_dir() -> std::path::PathBuf {
    if let Ok(path) = std::env::var("ELEFANTE_EMBEDDING_CACHE") {
        return std::path::PathBuf::from(path);
    }
    if let Some(proj_dirs) = directories::ProjectDirs::from("com", "elefante", "elefante") {
        return proj_dirs.cache_dir().join("fastembed");
    }
    if let Some(base_dirs) = directories::BaseDirs::new() {
        return base_dirs.home_dir().join(".cache/elefante/fastembed");
    }
    std::path::PathBuf::from(".elefante_cache")
}

fn matryoshka_truncate(mut vector: Vec<f32>) -> Vec<f32> {
    if vector.len() > EMBEDDING_DIMENSIONS {
        vector.truncate(EMBEDDING_DIMENSIONS);
    }
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}

/// Local fastembed-backed [`EmbeddingProvider`] using nomic-embed-text-v1.5.
pub struct LocalEmbeddingProvider {
    model: Mutex<TextEmbedding>,
}

impl LocalEmbeddingProvider {
    /// Initialize the model, downloading weights into the cache
    /// directory on first use.
    pub fn new() -> Result<Self, EmbeddingError> {
        let dir = cache_dir();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!(error = %e, path = ?dir, "failed to create embedding cache directory");
        }
        let options = InitOptions::new(EmbeddingModel::NomicEmbedTextV15)
            .with_show_download_progress(false)
            .with_cache_dir(dir);
        let model = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;
        Ok(Self { model: Mutex::new(model) })
    }
}

impl EmbeddingProvider for LocalEmbeddingProvider {
    fn dimensions(&self) -> usize {
        EMBEDDING_DIMENSIONS
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("text cannot be empty".into()));
        }
        let truncated = if text.len() > MAX_TEXT_LENGTH {
            &text[..MAX_TEXT_LENGTH]
        } else {
            text
        };
        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::ModelInit(format!("lock poisoned: {e}")))?;
        let mut embeddings = model
            .embed(vec![truncated], None)
            .map_err(|e| EmbeddingError::Failed(e.to_string()))?;
        let vector = embeddings
            .pop()
            .ok_or_else(|| EmbeddingError::Failed("no embedding generated".into()))?;
        Ok(Embedding::new(matryoshka_truncate(vector)))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::ModelInit(format!("lock poisoned: {e}")))?;
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            let truncated: Vec<&str> = chunk
                .iter()
                .map(|t| if t.len() > MAX_TEXT_LENGTH { &t[..MAX_TEXT_LENGTH] } else { *t })
                .collect();
            let embeddings = model
                .embed(truncated, None)
                .map_err(|e| EmbeddingError::Failed(e.to_string()))?;
            out.extend(embeddings.into_iter().map(|v| Embedding::new(matryoshka_truncate(v))));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matryoshka_truncate_renormalizes() {
        let v = vec![3.0_f32; 300];
        let truncated = matryoshka_truncate(v);
        assert_eq!(truncated.len(), EMBEDDING_DIMENSIONS);
        let norm = truncated.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn matryoshka_truncate_is_noop_under_width() {
        let v = vec![1.0_f32, 0.0, 0.0];
        let truncated = matryoshka_truncate(v.clone());
        assert_eq!(truncated.len(), 3);
    }
}
