//! C5 — Write coordinator: the single entry point for adding memories.
//! Owns cross-store consistency and dedup (`spec.md` §4.2). Every
//! mutation to a [`crate::memory::Memory`] passes through here.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;

use crate::curator;
use crate::embeddings::{Embedding, EmbeddingProvider};
use crate::error::{Error, Result};
use crate::memory::{AddMemoryOutcome, AddMemoryRequest, Memory};
use crate::storage::{SemanticStore, StructuredStore};

/// Similarity at or above which a near-duplicate candidate is flagged
/// `CONTRADICTORY` instead of created outright (`spec.md` §3, §4.2).
const NEAR_DUPLICATE_THRESHOLD: f32 = 0.90;

/// Bound on concurrent embedding calls within a single `add_memory_batch`
/// (`spec.md` §5: CPU-bound work runs on a bounded worker pool).
const DEFAULT_BATCH_CONCURRENCY: usize = 4;

/// Single write path into the dual-store substrate. Holds no mutable
/// state of its own beyond the stores and embedding provider it was
/// built with — safe to share behind an `Arc` across the process.
pub struct WriteCoordinator {
    semantic: Arc<SemanticStore>,
    structured: Arc<StructuredStore>,
    embeddings: Arc<dyn EmbeddingProvider>,
    batch_concurrency: usize,
}

impl WriteCoordinator {
    #[must_use]
    pub fn new(
        semantic: Arc<SemanticStore>,
        structured: Arc<StructuredStore>,
        embeddings: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            semantic,
            structured,
            embeddings,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }

    #[must_use]
    pub fn with_batch_concurrency(mut self, permits: usize) -> Self {
        self.batch_concurrency = permits.max(1);
        self
    }

    /// Run the §4.2 algorithm over a single request: normalize, check
    /// for an exact duplicate, check for a near duplicate, curate,
    /// persist, upsert entities, return the outcome.
    pub async fn add_memory(&self, request: AddMemoryRequest) -> Result<AddMemoryOutcome> {
        if request.content.trim().is_empty() {
            return Err(Error::Validation("memory content must not be empty".into()));
        }

        let semantic = Arc::clone(&self.semantic);
        let structured = Arc::clone(&self.structured);
        let embeddings = Arc::clone(&self.embeddings);
        let request = request;

        tokio::task::spawn_blocking(move || Self::add_memory_blocking(&semantic, &structured, &embeddings, &request))
            .await
            .map_err(|e| Error::InvariantViolated {
                subject: "add_memory".into(),
                detail: format!("blocking task panicked: {e}"),
            })?
    }

    /// Run `add_memory` over many requests, bounded to
    /// `batch_concurrency` concurrent embedding/store operations.
    pub async fn add_memory_batch(&self, requests: Vec<AddMemoryRequest>) -> Vec<Result<AddMemoryOutcome>> {
        let semaphore = Arc::new(Semaphore::new(self.batch_concurrency));
        let mut handles = Vec::with_capacity(requests.len());

        for request in requests {
            let semaphore = Arc::clone(&semaphore);
            let semantic = Arc::clone(&self.semantic);
            let structured = Arc::clone(&self.structured);
            let embeddings = Arc::clone(&self.embeddings);

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                if request.content.trim().is_empty() {
                    return Err(Error::Validation("memory content must not be empty".into()));
                }
                tokio::task::spawn_blocking(move || Self::add_memory_blocking(&semantic, &structured, &embeddings, &request))
                    .await
                    .map_err(|e| Error::InvariantViolated {
                        subject: "add_memory_batch".into(),
                        detail: format!("blocking task panicked: {e}"),
                    })?
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            outcomes.push(match handle.await {
                Ok(result) => result,
                Err(e) => Err(Error::InvariantViolated {
                    subject: "add_memory_batch".into(),
                    detail: format!("task join failed: {e}"),
                }),
            });
        }
        outcomes
    }

    /// The synchronous body of the §4.2 algorithm, run inside
    /// `spawn_blocking` since every step is a blocking SQLite call.
    fn add_memory_blocking(
        semantic: &SemanticStore,
        structured: &StructuredStore,
        embeddings: &dyn EmbeddingProvider,
        request: &AddMemoryRequest,
    ) -> Result<AddMemoryOutcome> {
        // 1. Normalize + 2. exact-duplicate check.
        let normalized = crate::storage::normalize_content(&request.content);
        if let Some(existing) = semantic.find_by_normalized_content(&request.content)? {
            return Ok(AddMemoryOutcome::Redundant(existing));
        }

        // 3. Near-duplicate check.
        let embedding = embeddings.embed(&request.content)?;
        if let Some((nearest, similarity)) = semantic.knn(&embedding.vector, 1)?.into_iter().next() {
            if similarity >= NEAR_DUPLICATE_THRESHOLD {
                let nearest_normalized = crate::storage::normalize_content(&nearest.content);
                if nearest_normalized != normalized {
                    return Ok(AddMemoryOutcome::Contradictory { existing: nearest.id, similarity });
                }
            }
        }

        // 4. Curate.
        let now = Utc::now();
        let curated = curator::curate(request, now);

        // 5. Persist semantic row.
        let memory = Memory {
            id: crate::memory::MemoryId::new(),
            content: request.content.clone(),
            title: curated.title,
            summary: curated.summary,
            concepts: curated.concepts,
            surfaces_when: curated.surfaces_when,
            layer: curated.classification.layer,
            sublayer: curated.classification.sublayer,
            memory_type: curated.memory_type,
            domain: curated.domain,
            importance: curated.classification.importance,
            authority_score: curated.authority_score,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            superseded_by_id: None,
            potential_conflicts: Vec::new(),
            archived: false,
            custom: custom_metadata(request),
        };
        semantic.upsert(&memory, &embedding)?;

        // 6. Upsert entities and connect them to the new memory. The
        // graph is rebuildable from the semantic store, so a failure
        // here is logged and swallowed rather than surfaced (§4.2
        // failure semantics): the memory still exists.
        if let Err(e) = Self::link_entities(structured, &memory, request) {
            tracing::warn!(memory_id = %memory.id, error = %e, "structured-store upsert failed; memory persisted without graph links");
        }

        // 7. Return the new id.
        Ok(AddMemoryOutcome::Created(memory.id))
    }

    fn link_entities(structured: &StructuredStore, memory: &Memory, request: &AddMemoryRequest) -> Result<()> {
        for entity_ref in &request.entities {
            let entity_id = structured.upsert_entity(entity_ref)?;
            structured.link_memory_entity(memory.id, entity_id)?;
        }
        Ok(())
    }

    /// Re-embed a memory, used by recompute paths (e.g. curator
    /// re-runs) that need a fresh vector without going through
    /// `add_memory`.
    pub fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.embeddings.embed(text)?)
    }
}

fn custom_metadata(request: &AddMemoryRequest) -> Option<serde_json::Value> {
    let meta = &request.metadata;
    if meta.category.is_none() && meta.intent.is_none() && meta.confidence.is_none() && meta.source.is_none() && meta.session_id.is_none()
    {
        return None;
    }
    Some(serde_json::json!({
        "category": meta.category,
        "intent": meta.intent,
        "confidence": meta.confidence,
        "source": meta.source,
        "sessionId": meta.session_id,
    }))
}
