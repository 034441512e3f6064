//! Crate-wide error taxonomy (`spec.md` §7).
//!
//! Validation and store-unavailability are ordinary errors; `REDUNDANT`/
//! `CONTRADICTORY` are outcomes, not errors, and are modeled instead by
//! [`crate::memory::AddMemoryOutcome`]. `InvariantViolated` is reserved
//! for the "internal invariant" class — a composite score outside
//! `[0,1]`, for example — which callers should treat as a bug.

use crate::memory::MemoryId;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Names the store implicated by a `StoreUnavailable`/`Database` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Semantic,
    Graph,
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::Semantic => write!(f, "semantic"),
            StoreKind::Graph => write!(f, "graph"),
        }
    }
}

/// Top-level error type returned by every public operation.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// Bad input: empty content, weights that don't sum to 1 after
    /// normalization, an unknown memory type. Operation aborts, no state
    /// changed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A store could not be reached after one retry.
    #[error("{store} store unavailable: {reason}")]
    StoreUnavailable { store: StoreKind, reason: String },

    /// The requested memory does not exist.
    #[error("memory not found: {0}")]
    NotFound(MemoryId),

    /// A public operation's deadline elapsed.
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A score or invariant escaped its declared range — a bug, not a
    /// runtime condition. Carries the offending id and value for
    /// diagnosis.
    #[error("internal invariant violated for {subject}: {detail}")]
    InvariantViolated { subject: String, detail: String },

    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),

    #[error(transparent)]
    Embedding(#[from] crate::embeddings::EmbeddingError),

    #[cfg(feature = "vector-search")]
    #[error(transparent)]
    VectorSearch(#[from] crate::storage::VectorSearchError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
