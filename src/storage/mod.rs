//! Storage layer: C2 (semantic store) and C3 (structured store), both
//! backed by the same SQLite file, plus the HNSW vector index C2
//! delegates k-NN search to.

mod graph;
mod migrations;
mod semantic;
mod vector_index;

pub use graph::{PatternRow, StructuredStore};
pub use semantic::{SemanticStore, normalize_content};
pub use vector_index::{VectorIndex, VectorIndexConfig, VectorIndexStats, VectorSearchError};

/// Unified storage error for both the semantic and structured stores.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("memory not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("vector search error: {0}")]
    VectorSearch(#[from] VectorSearchError),
    #[error("initialization error: {0}")]
    Init(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;
