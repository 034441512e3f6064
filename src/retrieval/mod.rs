//! C6 — Retrieval engine: analyze query → gather candidates → score
//! six signals → reweight by source → deduplicate (`spec.md` §4.3).

mod dedup;
mod query;
mod signals;
mod sources;

pub use dedup::find_duplicate_groups;
pub use query::{Intent, QueryAnalysis, analyze_query};
pub use signals::{Explanation, Signal, SignalWeights, score_candidate};
pub use sources::{Source, SourceWeights, adaptive_weights};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::coactivation::CoactivationMatrix;
use crate::curator::canonicalize_label;
use crate::embeddings::{EmbeddingProvider, cosine_similarity};
use crate::error::{Error, Result};
use crate::memory::{Layer, Memory, MemoryId, MemoryType};
use crate::storage::{SemanticStore, StructuredStore};

/// Which stores a `search` call consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Semantic,
    Structured,
    Hybrid,
}

/// Restricts which memories are eligible candidates.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub domain: Option<String>,
    pub layer: Option<Layer>,
    pub memory_type: Option<MemoryType>,
    pub include_archived: bool,
}

/// Tuning knobs for a single `search` call.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub include_explanation: bool,
    /// Short-term conversation session this query belongs to, if any.
    /// When set, recent memories tagged with the same session id are
    /// gathered as the "conversation" candidate source.
    pub session_id: Option<String>,
    /// Ids returned by the caller's most recent searches, used to
    /// compute the co-activation signal for this query.
    pub recent_memory_ids: Vec<MemoryId>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { include_explanation: true, session_id: None, recent_memory_ids: Vec::new() }
    }
}

/// One scored, explained search hit.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub memory: Memory,
    pub score: f64,
    pub source: Source,
    pub vector_score: Option<f64>,
    pub graph_score: Option<f64>,
    pub explanation: Option<Explanation>,
}

struct Candidate {
    memory: Memory,
    sources: Vec<Source>,
    vector_similarity: f64,
    embedding: Vec<f32>,
}

/// C6: executes `search` over the semantic and structured stores,
/// merging and re-scoring candidates from both. Every field is an
/// owned `Arc` or `Copy` value, so cloning is cheap — used to move a
/// handle into a `spawn_blocking` closure without borrowing `self`.
#[derive(Clone)]
pub struct RetrievalEngine {
    semantic: Arc<SemanticStore>,
    structured: Arc<StructuredStore>,
    embeddings: Arc<dyn EmbeddingProvider>,
    coactivation: Arc<CoactivationMatrix>,
    weights: SignalWeights,
}

impl RetrievalEngine {
    #[must_use]
    pub fn new(
        semantic: Arc<SemanticStore>,
        structured: Arc<StructuredStore>,
        embeddings: Arc<dyn EmbeddingProvider>,
        coactivation: Arc<CoactivationMatrix>,
    ) -> Self {
        Self { semantic, structured, embeddings, coactivation, weights: SignalWeights::default() }
    }

    #[must_use]
    pub fn with_weights(mut self, weights: SignalWeights) -> Self {
        self.weights = weights.normalized();
        self
    }

    /// Run the hybrid retrieval algorithm (`spec.md` §4.3).
    pub fn search(
        &self,
        query: &str,
        mode: SearchMode,
        limit: usize,
        filters: &SearchFilters,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(Error::Validation("search query must not be empty".into()));
        }
        let limit = limit.clamp(1, 100);

        // 1. Analyze query.
        let embedding = self.embeddings.embed(query)?;
        let analysis = analyze_query(query, embedding.clone());
        let k = 2 * limit;

        // 2. Gather candidates.
        let mut merged: HashMap<MemoryId, Candidate> = HashMap::new();

        if mode != SearchMode::Structured {
            for (memory, similarity) in self.semantic.knn(&embedding.vector, k)? {
                self.merge_candidate(&mut merged, memory, f64::from(similarity), Source::Semantic);
            }
        }

        if mode != SearchMode::Semantic {
            for memory in self.gather_graph_candidates(&analysis.concepts)? {
                let similarity = self.similarity_to_query(&embedding.vector, memory.id)?;
                self.merge_candidate(&mut merged, memory, similarity, Source::Graph);
            }
        }

        if let Some(session_id) = &options.session_id {
            for memory in self.gather_conversation_candidates(session_id, k)? {
                let similarity = self.similarity_to_query(&embedding.vector, memory.id)?;
                self.merge_candidate(&mut merged, memory, similarity, Source::Conversation);
            }
        }

        // Apply filters.
        let mut candidates: Vec<Candidate> = merged
            .into_values()
            .filter(|c| filters.include_archived || !c.memory.archived)
            .filter(|c| filters.domain.as_deref().is_none_or(|d| d == c.memory.domain))
            .filter(|c| filters.layer.is_none_or(|l| l == c.memory.layer))
            .filter(|c| filters.memory_type.is_none_or(|t| t == c.memory.memory_type))
            .collect();

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        // 3. Score each candidate using six signals.
        let now = Utc::now();
        let source_weights = adaptive_weights(query, options.session_id.is_some(), mode);
        let mut scored: Vec<(Candidate, Explanation, f64)> = candidates
            .drain(..)
            .map(|candidate| {
                let coactivation_total = self.coactivation.sum_with(candidate.memory.id, &options.recent_memory_ids);
                let explanation = score_candidate(&candidate.memory, &analysis, candidate.vector_similarity, coactivation_total, self.weights, now);
                // 4. Adaptive source reweighting.
                let trust = source_weights.trust(&candidate.sources);
                let score = (explanation.composite * trust).clamp(0.0, 1.0);
                (candidate, explanation, score)
            })
            .collect();

        scored.sort_by(|a, b| b.2.total_cmp(&a.2));

        // 5. Deduplicate near-identical candidates, keeping the
        // highest composite-scored member of each group.
        let embeddings: Vec<Vec<f32>> = scored.iter().map(|(c, _, _)| c.embedding.clone()).collect();
        let groups = dedup::find_duplicate_groups(&embeddings);

        let mut slots: Vec<Option<(Candidate, Explanation, f64)>> = scored.into_iter().map(Some).collect();
        let mut survivors: Vec<(Candidate, Explanation, f64)> = Vec::with_capacity(groups.len());
        for group in groups {
            let winner_idx = group
                .into_iter()
                .max_by(|&a, &b| slots[a].as_ref().unwrap().1.composite.total_cmp(&slots[b].as_ref().unwrap().1.composite))
                .expect("group is never empty");
            survivors.push(slots[winner_idx].take().expect("each index visited once"));
        }
        survivors.sort_by(|a, b| b.2.total_cmp(&a.2));
        survivors.truncate(limit);

        // 6. Build results (explanations already computed inline).
        let results: Vec<SearchResult> = survivors
            .into_iter()
            .map(|(candidate, explanation, score)| {
                let source = if candidate.sources.len() > 1 { Source::Hybrid } else { candidate.sources[0] };
                let graph_score = candidate.sources.contains(&Source::Graph).then(|| f64::from(candidate.memory.importance) / 10.0);
                SearchResult {
                    vector_score: Some(candidate.vector_similarity),
                    graph_score,
                    source,
                    explanation: options.include_explanation.then_some(explanation),
                    score,
                    memory: candidate.memory,
                }
            })
            .collect();

        // 7. Update co-activation for the returned top-K.
        let ids: Vec<MemoryId> = results.iter().map(|r| r.memory.id).collect();
        self.coactivation.record_coactivation(&ids);

        // 8. Access tracking.
        for id in &ids {
            self.semantic.touch_access(*id, now)?;
        }

        Ok(results)
    }

    fn similarity_to_query(&self, query_vector: &[f32], memory_id: MemoryId) -> Result<f64> {
        match self.semantic.get_embedding(memory_id)? {
            Some(embedding) => Ok(f64::from(cosine_similarity(query_vector, &embedding)).clamp(0.0, 1.0)),
            None => Ok(0.0),
        }
    }

    fn merge_candidate(&self, merged: &mut HashMap<MemoryId, Candidate>, memory: Memory, similarity: f64, source: Source) {
        let id = memory.id;
        match merged.get_mut(&id) {
            Some(existing) => {
                if !existing.sources.contains(&source) {
                    existing.sources.push(source);
                }
            }
            None => {
                let embedding = self.semantic.get_embedding(id).ok().flatten().unwrap_or_default();
                merged.insert(id, Candidate { memory, sources: vec![source], vector_similarity: similarity, embedding });
            }
        }
    }

    /// Entities matching query concepts by normalized name, then every
    /// memory linked to those entities — the graph-neighborhood
    /// candidate source (`spec.md` §4.3 step 2).
    fn gather_graph_candidates(&self, concepts: &[String]) -> Result<Vec<Memory>> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for concept in concepts {
            let normalized = canonicalize_label(concept);
            for entity in self.structured.entities_by_normalized_name(&normalized)? {
                for memory_id in self.structured.memory_ids_for_entity(entity.id)? {
                    if seen.insert(memory_id) {
                        if let Some(memory) = self.semantic.get(memory_id)? {
                            out.push(memory);
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    /// Recent, non-archived memories tagged with `session_id` in
    /// `custom.sessionId` — the conversation candidate source.
    fn gather_conversation_candidates(&self, session_id: &str, limit: usize) -> Result<Vec<Memory>> {
        let mut matches: Vec<Memory> = self
            .semantic
            .list_active()?
            .into_iter()
            .filter(|m| m.custom.as_ref().and_then(|c| c.get("sessionId")).and_then(|v| v.as_str()) == Some(session_id))
            .collect();
        matches.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed));
        matches.truncate(limit);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curator;
    use crate::embeddings::{Embedding, EmbeddingError};
    use crate::memory::AddMemoryRequest;

    struct FixtureEmbeddingProvider;

    impl EmbeddingProvider for FixtureEmbeddingProvider {
        fn dimensions(&self) -> usize {
            crate::embeddings::EMBEDDING_DIMENSIONS
        }

        fn embed(&self, text: &str) -> std::result::Result<Embedding, EmbeddingError> {
            let mut vector = vec![0.0_f32; self.dimensions()];
            for (i, byte) in text.bytes().enumerate() {
                vector[i % vector.len()] += f32::from(byte);
            }
            if vector.iter().all(|v| *v == 0.0) {
                vector[0] = 1.0;
            }
            Ok(Embedding::new(vector))
        }
    }

    fn seed(semantic: &SemanticStore, embeddings: &FixtureEmbeddingProvider, content: &str) -> MemoryId {
        let request = AddMemoryRequest::new(content);
        let curated = curator::curate(&request, Utc::now());
        let embedding = embeddings.embed(content).unwrap();
        let now = Utc::now();
        let memory = Memory {
            id: MemoryId::new(),
            content: content.to_string(),
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
            custom: None,
        };
        let id = memory.id;
        semantic.upsert(&memory, &embedding).unwrap();
        id
    }

    fn engine() -> (RetrievalEngine, Arc<SemanticStore>) {
        let semantic = Arc::new(SemanticStore::open_in_memory().unwrap());
        let structured = Arc::new(StructuredStore::open_in_memory().unwrap());
        let coactivation = Arc::new(CoactivationMatrix::new());
        let engine = RetrievalEngine::new(Arc::clone(&semantic), structured, Arc::new(FixtureEmbeddingProvider), coactivation);
        (engine, semantic)
    }

    #[test]
    fn search_returns_results_with_six_signal_explanations() {
        let (engine, semantic) = engine();
        seed(&semantic, &FixtureEmbeddingProvider, "User prefers 4 spaces for Python indentation");

        let results = engine.search("python indentation preference", SearchMode::Semantic, 5, &SearchFilters::default(), &SearchOptions::default()).unwrap();
        assert!(!results.is_empty());
        let explanation = results[0].explanation.as_ref().unwrap();
        assert_eq!(explanation.signals.len(), 6);
        let sum: f64 = explanation.signals.iter().map(|s| s.weighted).sum();
        assert!((sum - explanation.composite).abs() < 1e-6);
    }

    #[test]
    fn repeated_search_bumps_coactivation() {
        let (engine, semantic) = engine();
        seed(&semantic, &FixtureEmbeddingProvider, "First memory about onboarding");
        seed(&semantic, &FixtureEmbeddingProvider, "Second memory about onboarding steps");

        let first = engine.search("onboarding", SearchMode::Semantic, 5, &SearchFilters::default(), &SearchOptions::default()).unwrap();
        assert!(first.len() >= 2);
        let ids: Vec<MemoryId> = first.iter().map(|r| r.memory.id).collect();

        let _second = engine.search("onboarding", SearchMode::Semantic, 5, &SearchFilters::default(), &SearchOptions::default()).unwrap();
        assert!(engine.coactivation.count(ids[0], ids[1]) >= 1);
    }

    #[test]
    fn empty_query_is_rejected() {
        let (engine, _semantic) = engine();
        let result = engine.search("   ", SearchMode::Hybrid, 5, &SearchFilters::default(), &SearchOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn domain_filter_excludes_non_matching_memories() {
        let (engine, semantic) = engine();
        seed(&semantic, &FixtureEmbeddingProvider, "User prefers 4 spaces for Python indentation");
        let filters = SearchFilters { domain: Some("work".to_string()), ..Default::default() };
        let results = engine.search("python indentation", SearchMode::Semantic, 5, &filters, &SearchOptions::default()).unwrap();
        assert!(results.is_empty());
    }
}
