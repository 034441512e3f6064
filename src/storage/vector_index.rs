//! HNSW vector index backing the semantic store's k-NN search
//! (`spec.md` §4.7, C2). Adapted from the teacher's
//! `search::vector::VectorIndex` — same USearch wrapper, retargeted
//! from spaced-repetition node ids to memory ids, and fixed to convert
//! USearch's cosine *distance* (range `[0,2]`) into a `[0,1]`
//! similarity rather than the teacher's `1 - distance` shortcut, which
//! only holds for metrics whose distance is already bounded to `[0,1]`.

use std::collections::HashMap;
use std::path::Path;

use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::embeddings::EMBEDDING_DIMENSIONS;

const DEFAULT_CONNECTIVITY: usize = 16;
const DEFAULT_EXPANSION_ADD: usize = 128;
const DEFAULT_EXPANSION_SEARCH: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum VectorSearchError {
    #[error("index creation failed: {0}")]
    IndexCreation(String),
    #[error("failed to add vector: {0}")]
    IndexAdd(String),
    #[error("search failed: {0}")]
    IndexSearch(String),
    #[error("index persistence failed: {0}")]
    IndexPersistence(String),
    #[error("invalid dimensions: expected {0}, got {1}")]
    InvalidDimensions(usize, usize),
}

#[derive(Debug, Clone)]
pub struct VectorIndexConfig {
    pub dimensions: usize,
    pub connectivity: usize,
    pub expansion_add: usize,
    pub expansion_search: usize,
    pub metric: MetricKind,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            dimensions: EMBEDDING_DIMENSIONS,
            connectivity: DEFAULT_CONNECTIVITY,
            expansion_add: DEFAULT_EXPANSION_ADD,
            expansion_search: DEFAULT_EXPANSION_SEARCH,
            metric: MetricKind::Cos,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VectorIndexStats {
    pub total_vectors: usize,
    pub dimensions: usize,
    pub connectivity: usize,
    pub memory_bytes: usize,
}

/// HNSW index over memory embeddings, keyed by `MemoryId` string.
pub struct VectorIndex {
    index: Index,
    config: VectorIndexConfig,
    key_to_id: HashMap<String, u64>,
    id_to_key: HashMap<u64, String>,
    next_id: u64,
}

fn build_index(config: &VectorIndexConfig) -> Result<Index, VectorSearchError> {
    let options = IndexOptions {
        dimensions: config.dimensions,
        metric: config.metric,
        quantization: ScalarKind::F32,
        connectivity: config.connectivity,
        expansion_add: config.expansion_add,
        expansion_search: config.expansion_search,
        multi: false,
    };
    Index::new(&options).map_err(|e| VectorSearchError::IndexCreation(e.to_string()))
}

/// Convert a USearch cosine distance (`[0,2]`) into a `[0,1]` similarity.
fn distance_to_similarity(distance: f32) -> f32 {
    (1.0 - distance / 2.0).clamp(0.0, 1.0)
}

impl VectorIndex {
    pub fn new() -> Result<Self, VectorSearchError> {
        Self::with_config(VectorIndexConfig::default())
    }

    pub fn with_config(config: VectorIndexConfig) -> Result<Self, VectorSearchError> {
        let index = build_index(&config)?;
        Ok(Self {
            index,
            config,
            key_to_id: HashMap::new(),
            id_to_key: HashMap::new(),
            next_id: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.index.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn reserve(&self, capacity: usize) -> Result<(), VectorSearchError> {
        self.index
            .reserve(capacity)
            .map_err(|e| VectorSearchError::IndexCreation(format!("reserve failed: {e}")))
    }

    /// Insert or overwrite the vector for `key`.
    pub fn upsert(&mut self, key: &str, vector: &[f32]) -> Result<(), VectorSearchError> {
        if vector.len() != self.config.dimensions {
            return Err(VectorSearchError::InvalidDimensions(self.config.dimensions, vector.len()));
        }

        if let Some(&existing_id) = self.key_to_id.get(key) {
            self.index
                .remove(existing_id)
                .map_err(|e| VectorSearchError::IndexAdd(e.to_string()))?;
            self.reserve(self.index.size() + 1)?;
            self.index
                .add(existing_id, vector)
                .map_err(|e| VectorSearchError::IndexAdd(e.to_string()))?;
            return Ok(());
        }

        let current_capacity = self.index.capacity();
        let current_size = self.index.size();
        if current_size >= current_capacity {
            let new_capacity = std::cmp::max(current_capacity * 2, 16);
            self.reserve(new_capacity)?;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.index
            .add(id, vector)
            .map_err(|e| VectorSearchError::IndexAdd(e.to_string()))?;
        self.key_to_id.insert(key.to_string(), id);
        self.id_to_key.insert(id, key.to_string());
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Result<bool, VectorSearchError> {
        if let Some(id) = self.key_to_id.remove(key) {
            self.id_to_key.remove(&id);
            self.index
                .remove(id)
                .map_err(|e| VectorSearchError::IndexAdd(e.to_string()))?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.key_to_id.contains_key(key)
    }

    /// k-NN search, returning `(key, similarity)` pairs with similarity
    /// in `[0,1]`, highest first.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<(String, f32)>, VectorSearchError> {
        if query.len() != self.config.dimensions {
            return Err(VectorSearchError::InvalidDimensions(self.config.dimensions, query.len()));
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let results = self
            .index
            .search(query, limit)
            .map_err(|e| VectorSearchError::IndexSearch(e.to_string()))?;

        let mut out = Vec::with_capacity(results.keys.len());
        for (key, distance) in results.keys.iter().zip(results.distances.iter()) {
            if let Some(string_key) = self.id_to_key.get(key) {
                out.push((string_key.clone(), distance_to_similarity(*distance)));
            }
        }
        Ok(out)
    }

    pub fn search_with_threshold(
        &self,
        query: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<(String, f32)>, VectorSearchError> {
        let results = self.search(query, limit)?;
        Ok(results.into_iter().filter(|(_, score)| *score >= min_similarity).collect())
    }

    pub fn save(&self, path: &Path) -> Result<(), VectorSearchError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| VectorSearchError::IndexPersistence("invalid path".into()))?;
        self.index
            .save(path_str)
            .map_err(|e| VectorSearchError::IndexPersistence(e.to_string()))?;

        let mappings_path = path.with_extension("mappings.json");
        let mappings = serde_json::json!({
            "key_to_id": self.key_to_id,
            "next_id": self.next_id,
        });
        let mappings_str = serde_json::to_string(&mappings)
            .map_err(|e| VectorSearchError::IndexPersistence(e.to_string()))?;
        std::fs::write(&mappings_path, mappings_str)
            .map_err(|e| VectorSearchError::IndexPersistence(e.to_string()))?;
        Ok(())
    }

    pub fn load(path: &Path, config: VectorIndexConfig) -> Result<Self, VectorSearchError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| VectorSearchError::IndexPersistence("invalid path".into()))?;
        let index = build_index(&config)?;
        index
            .load(path_str)
            .map_err(|e| VectorSearchError::IndexPersistence(e.to_string()))?;

        let mappings_path = path.with_extension("mappings.json");
        let mappings_str = std::fs::read_to_string(&mappings_path)
            .map_err(|e| VectorSearchError::IndexPersistence(e.to_string()))?;
        let mappings: serde_json::Value = serde_json::from_str(&mappings_str)
            .map_err(|e| VectorSearchError::IndexPersistence(e.to_string()))?;
        let key_to_id: HashMap<String, u64> = serde_json::from_value(mappings["key_to_id"].clone())
            .map_err(|e| VectorSearchError::IndexPersistence(e.to_string()))?;
        let next_id = mappings["next_id"]
            .as_u64()
            .ok_or_else(|| VectorSearchError::IndexPersistence("invalid next_id".into()))?;
        let id_to_key = key_to_id.iter().map(|(k, &v)| (v, k.clone())).collect();

        Ok(Self { index, config, key_to_id, id_to_key, next_id })
    }

    pub fn stats(&self) -> VectorIndexStats {
        VectorIndexStats {
            total_vectors: self.len(),
            dimensions: self.config.dimensions,
            connectivity: self.config.connectivity,
            memory_bytes: self.index.serialized_length(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vector(seed: f32) -> Vec<f32> {
        (0..EMBEDDING_DIMENSIONS).map(|i| ((i as f32 + seed) / EMBEDDING_DIMENSIONS as f32).sin()).collect()
    }

    #[test]
    fn new_index_is_empty() {
        let index = VectorIndex::new().unwrap();
        assert!(index.is_empty());
        assert_eq!(index.dimensions(), EMBEDDING_DIMENSIONS);
    }

    #[test]
    fn upsert_then_search_finds_self() {
        let mut index = VectorIndex::new().unwrap();
        let v1 = test_vector(1.0);
        let v2 = test_vector(100.0);
        index.upsert("mem-1", &v1).unwrap();
        index.upsert("mem-2", &v2).unwrap();

        let results = index.search(&v1, 2).unwrap();
        assert_eq!(results[0].0, "mem-1");
        assert!(results[0].1 > 0.9);
    }

    #[test]
    fn remove_drops_key() {
        let mut index = VectorIndex::new().unwrap();
        index.upsert("mem-1", &test_vector(1.0)).unwrap();
        assert!(index.remove("mem-1").unwrap());
        assert!(!index.contains("mem-1"));
    }

    #[test]
    fn rejects_wrong_dimensions() {
        let mut index = VectorIndex::new().unwrap();
        assert!(index.upsert("mem-1", &[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn similarity_is_bounded() {
        let mut index = VectorIndex::new().unwrap();
        index.upsert("mem-1", &test_vector(1.0)).unwrap();
        index.upsert("mem-2", &test_vector(500.0)).unwrap();
        let results = index.search(&test_vector(1.0), 2).unwrap();
        for (_, sim) in &results {
            assert!((0.0..=1.0).contains(sim));
        }
    }
}
