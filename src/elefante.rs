//! Top-level facade (`spec.md` §6.1). A single `Elefante` handle opens
//! both stores at startup and exposes the public operation table as
//! plain methods, delegating to the already-decomposed engines —
//! modeled on the teacher's `storage::sqlite::Storage`, which is
//! likewise one struct with one method per operation rather than a
//! tree of sub-clients the caller has to assemble themselves.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::coactivation::CoactivationMatrix;
use crate::config::Config;
use crate::constellation::{self, Constellation};
use crate::coordinator::WriteCoordinator;
use crate::embeddings::{EmbeddingProvider, LocalEmbeddingProvider};
use crate::error::Result;
use crate::health::{HealthAnalyzer, HealthReport};
use crate::memory::{
    AddMemoryOutcome, AddMemoryRequest, Entity, EntityId, EntityRef, EntityType, RelationshipId,
};
use crate::proactive::{ProactiveSurfacer, Suggestion};
use crate::retrieval::{RetrievalEngine, SearchFilters, SearchMode, SearchOptions, SearchResult};
use crate::storage::{PatternRow, SemanticStore, StructuredStore};

/// Counts per store plus schema status, returned by [`Elefante::get_stats`].
#[derive(Debug, Clone)]
pub struct Stats {
    pub memory_count: usize,
    pub entity_count: usize,
    pub relationship_count: usize,
    pub schema_ok: bool,
}

/// A single handle onto the whole engine: owns both stores, the
/// embedding provider, and the co-activation matrix, and composes C5
/// through C9 over them. Safe to share behind an `Arc` — every engine
/// it holds is itself `Arc`-friendly and internally synchronized.
pub struct Elefante {
    semantic: Arc<SemanticStore>,
    structured: Arc<StructuredStore>,
    coordinator: WriteCoordinator,
    retrieval: RetrievalEngine,
    health: HealthAnalyzer,
    proactive: ProactiveSurfacer,
}

impl Elefante {
    /// Open (or create) the dual-store substrate under `home`, per
    /// §6.2's layout, applying `config`'s tuning to every engine.
    pub fn open(home: &Path, config: Config) -> Result<Self> {
        let data_dir = home.join("data");
        let semantic_dir = match &config.vector_store.persist_directory {
            Some(dir) => PathBuf::from(dir),
            None => data_dir.join(&config.vector_store.collection_name),
        };
        crate::config::ensure_data_dir(&semantic_dir)?;

        let graph_dir = data_dir.join("graph_store");
        crate::config::ensure_data_dir(&graph_dir)?;
        let graph_path = match &config.graph_store.database_path {
            Some(path) => PathBuf::from(path),
            None => graph_dir.join("graph.sqlite3"),
        };

        let semantic = Arc::new(SemanticStore::open(&semantic_dir.join("memories.sqlite3"))?);
        let structured = Arc::new(StructuredStore::open(&graph_path)?);
        let embeddings: Arc<dyn EmbeddingProvider> = Arc::new(LocalEmbeddingProvider::new()?);
        let coactivation = Arc::new(CoactivationMatrix::new());

        Ok(Self::assemble(semantic, structured, embeddings, coactivation, config))
    }

    /// In-memory instance for tests and short-lived tools; never
    /// touches disk.
    pub fn open_in_memory(config: Config, embeddings: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let semantic = Arc::new(SemanticStore::open_in_memory()?);
        let structured = Arc::new(StructuredStore::open_in_memory()?);
        let coactivation = Arc::new(CoactivationMatrix::new());
        Ok(Self::assemble(semantic, structured, embeddings, coactivation, config))
    }

    fn assemble(
        semantic: Arc<SemanticStore>,
        structured: Arc<StructuredStore>,
        embeddings: Arc<dyn EmbeddingProvider>,
        coactivation: Arc<CoactivationMatrix>,
        config: Config,
    ) -> Self {
        let coordinator = WriteCoordinator::new(Arc::clone(&semantic), Arc::clone(&structured), Arc::clone(&embeddings));
        let mut retrieval = RetrievalEngine::new(Arc::clone(&semantic), Arc::clone(&structured), embeddings, coactivation);
        if let Some(weights) = config.retrieval.weights {
            retrieval = retrieval.with_weights(weights);
        }
        let health = HealthAnalyzer::new(Arc::clone(&semantic), Arc::clone(&structured)).with_config(config.health.into());
        let proactive = ProactiveSurfacer::new(Arc::clone(&semantic)).with_config(config.proactive.into());

        Self { semantic, structured, coordinator, retrieval, health, proactive }
    }

    /// §4.2: normalize, dedup, curate, persist, link entities.
    pub async fn add_memory(&self, request: AddMemoryRequest) -> Result<AddMemoryOutcome> {
        self.coordinator.add_memory(request).await
    }

    /// §4.2, batched and concurrency-bounded.
    pub async fn add_memory_batch(&self, requests: Vec<AddMemoryRequest>) -> Vec<Result<AddMemoryOutcome>> {
        self.coordinator.add_memory_batch(requests).await
    }

    /// §4.3: the hybrid retrieval algorithm. Blocking SQLite work runs
    /// on a blocking thread per §5's concurrency model.
    pub async fn search(
        &self,
        query: String,
        mode: SearchMode,
        limit: usize,
        filters: SearchFilters,
        options: SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let retrieval = self.retrieval.clone();
        tokio::task::spawn_blocking(move || retrieval.search(&query, mode, limit, &filters, &options))
            .await
            .map_err(|e| crate::error::Error::InvariantViolated { subject: "search".into(), detail: format!("blocking task panicked: {e}") })?
    }

    /// §4.4: run `search`, then assemble the results into a constellation.
    pub async fn constellation(
        &self,
        query: String,
        mode: SearchMode,
        limit: usize,
        filters: SearchFilters,
        options: SearchOptions,
    ) -> Result<Constellation> {
        let results = self.search(query, mode, limit, filters, options).await?;
        let conflicts = self.health.conflicts()?;
        let mut contradictions = std::collections::HashMap::new();
        for conflict in conflicts {
            contradictions.entry(conflict.memory_a).or_insert_with(Vec::new).push(conflict.memory_b);
            contradictions.entry(conflict.memory_b).or_insert_with(Vec::new).push(conflict.memory_a);
        }
        Ok(constellation::assemble(&results, &contradictions, &std::collections::HashMap::new()))
    }

    /// §6.1: counts per store plus schema status.
    pub fn get_stats(&self) -> Result<Stats> {
        Ok(Stats {
            memory_count: self.semantic.list_active()?.len(),
            entity_count: self.structured.entity_count()?,
            relationship_count: self.structured.relationship_count()?,
            schema_ok: true,
        })
    }

    /// §6.1: create an entity, or return the existing id for the same
    /// `(normalized name, type)`.
    pub fn create_entity(&self, name: impl Into<String>, entity_type: EntityType, properties: serde_json::Value) -> Result<EntityId> {
        let entity_ref = EntityRef { name: name.into(), entity_type, properties };
        Ok(self.structured.upsert_entity(&entity_ref)?)
    }

    pub fn get_entity(&self, id: EntityId) -> Result<Option<Entity>> {
        Ok(self.structured.get_entity(id)?)
    }

    /// §6.1: a directed, typed edge with `strength ∈ (0,1]`.
    pub fn create_relationship(&self, from_id: EntityId, to_id: EntityId, relationship_type: &str, strength: f32) -> Result<RelationshipId> {
        Ok(self.structured.upsert_edge(from_id, to_id, relationship_type, strength)?)
    }

    /// §6.1: run one of the structured store's named graph patterns.
    pub fn query_graph(&self, pattern: &str, params: &serde_json::Value) -> Result<Vec<PatternRow>> {
        Ok(self.structured.run_pattern(pattern, params)?)
    }

    /// §4.5: per-memory status plus pairwise conflicts.
    pub fn health_report(&self) -> Result<(Vec<HealthReport>, Vec<crate::health::Conflict>)> {
        Ok((self.health.scan()?, self.health.conflicts()?))
    }

    /// §4.6: up to 5 context-triggered suggestions.
    pub fn proactive_surfaces(&self, current_context: &str, conversation_domain: Option<&str>, recent_concepts: &[String]) -> Result<Vec<Suggestion>> {
        self.proactive.surface(current_context, conversation_domain, recent_concepts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{Embedding, EmbeddingError};

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

    fn elefante() -> Elefante {
        Elefante::open_in_memory(Config::default(), Arc::new(FixtureEmbeddingProvider)).unwrap()
    }

    #[tokio::test]
    async fn add_then_search_round_trips() {
        let elefante = elefante();
        elefante.add_memory(AddMemoryRequest::new("NEVER commit secrets to the repository")).await.unwrap();
        let results = elefante
            .search("secrets".to_string(), SearchMode::Hybrid, 5, SearchFilters::default(), SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn constellation_wraps_search_results() {
        let elefante = elefante();
        elefante.add_memory(AddMemoryRequest::new("Rust ownership rules prevent data races")).await.unwrap();
        let constellation = elefante
            .constellation("ownership".to_string(), SearchMode::Hybrid, 5, SearchFilters::default(), SearchOptions::default())
            .await
            .unwrap();
        assert!(constellation.primary.is_some());
    }

    #[test]
    fn create_entity_is_idempotent() {
        let elefante = elefante();
        let first = elefante.create_entity("Rust", EntityType::Technology, serde_json::Value::Null).unwrap();
        let second = elefante.create_entity("rust", EntityType::Technology, serde_json::Value::Null).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn get_stats_reports_zero_on_empty_store() {
        let elefante = elefante();
        let stats = elefante.get_stats().unwrap();
        assert_eq!(stats.memory_count, 0);
        assert_eq!(stats.entity_count, 0);
    }

    #[test]
    fn health_report_and_proactive_surfaces_run_without_error() {
        let elefante = elefante();
        let (reports, conflicts) = elefante.health_report().unwrap();
        assert!(reports.is_empty());
        assert!(conflicts.is_empty());
        let suggestions = elefante.proactive_surfaces("anything", None, &[]).unwrap();
        assert!(suggestions.is_empty());
    }
}
