//! C8 — Health & conflict analyzer: per-memory status and pairwise
//! conflict detection over the current corpus (`spec.md` §4.5).

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::memory::{HealthStatus, Memory, MemoryId};
use crate::storage::{SemanticStore, StructuredStore};
use crate::error::Result;

const DEFAULT_STALE_DAYS: f64 = 90.0;
const DEFAULT_CONFLICT_THRESHOLD: f64 = 0.60;

/// Tuning knobs for a health scan (`config.rs`'s `health` section).
#[derive(Debug, Clone, Copy)]
pub struct HealthConfig {
    pub stale_days: f64,
    pub conflict_threshold: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { stale_days: DEFAULT_STALE_DAYS, conflict_threshold: DEFAULT_CONFLICT_THRESHOLD }
    }
}

/// A memory's status plus every condition that applies to it (not just
/// the one that decided `status`), for dashboard-style display.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub memory_id: MemoryId,
    pub status: HealthStatus,
    pub reasons: Vec<String>,
}

/// Every condition that applies to `memory`, independent of which one
/// wins the status priority order.
fn reasons_for(memory: &Memory, connection_count: usize, config: HealthConfig, now: chrono::DateTime<Utc>) -> Vec<String> {
    let mut reasons = Vec::new();
    if memory.superseded_by_id.is_some() {
        reasons.push("superseded by a newer memory".to_string());
    }
    if !memory.potential_conflicts.is_empty() {
        reasons.push(format!("{} potential conflict(s) flagged", memory.potential_conflicts.len()));
    }
    let days_since_accessed = memory.days_since_accessed(now);
    if days_since_accessed > config.stale_days {
        reasons.push(format!("not accessed in {days_since_accessed:.0} days"));
    }
    if connection_count == 0 {
        reasons.push("no linked entities".to_string());
    }
    reasons
}

/// A detected pairwise conflict between two same-domain memories.
#[derive(Debug, Clone)]
pub struct Conflict {
    pub memory_a: MemoryId,
    pub memory_b: MemoryId,
    pub overlap: f64,
    pub shared_concepts: Vec<String>,
    pub reason: String,
}

/// `at_risk > stale > orphan > healthy` (`spec.md` §4.5). Pure
/// function of the memory and its connection count — same inputs
/// always produce the same status.
#[must_use]
pub fn classify_status(memory: &Memory, connection_count: usize, config: HealthConfig, now: chrono::DateTime<Utc>) -> HealthStatus {
    if memory.superseded_by_id.is_some() || !memory.potential_conflicts.is_empty() {
        return HealthStatus::AtRisk;
    }
    if memory.days_since_accessed(now) > config.stale_days {
        return HealthStatus::Stale;
    }
    if connection_count == 0 {
        return HealthStatus::Orphan;
    }
    HealthStatus::Healthy
}

/// Jaccard overlap of two canonicalized concept sets.
#[must_use]
pub fn concept_overlap(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let set_a: HashSet<&String> = a.iter().collect();
    let set_b: HashSet<&String> = b.iter().collect();
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 { 0.0 } else { intersection as f64 / union as f64 }
}

/// Detect same-domain conflicts between every pair of `memories` whose
/// concept overlap meets `config.conflict_threshold`. Symmetric:
/// `(a, b)` and `(b, a)` never both appear. Monotone in the threshold:
/// raising it never grows the result (`spec.md` §4.5, §8 P6).
#[must_use]
pub fn detect_conflicts(memories: &[Memory], config: HealthConfig) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for i in 0..memories.len() {
        for j in (i + 1)..memories.len() {
            let (a, b) = (&memories[i], &memories[j]);
            if a.domain != b.domain {
                continue;
            }
            let overlap = concept_overlap(&a.concepts, &b.concepts);
            if overlap >= config.conflict_threshold {
                let shared_concepts: Vec<String> = a.concepts.iter().filter(|c| b.concepts.contains(c)).take(3).cloned().collect();
                conflicts.push(Conflict {
                    memory_a: a.id,
                    memory_b: b.id,
                    overlap,
                    shared_concepts,
                    reason: format!("shares {:.0}% of concepts within domain {}", overlap * 100.0, a.domain),
                });
            }
        }
    }
    conflicts
}

/// C8: runs a full health scan over the corpus, combining per-memory
/// status with pairwise conflict detection. Conflicts found here are
/// flags for human review, never an auto-assertion of which memory is
/// correct.
pub struct HealthAnalyzer {
    semantic: Arc<SemanticStore>,
    structured: Arc<StructuredStore>,
    config: HealthConfig,
}

impl HealthAnalyzer {
    #[must_use]
    pub fn new(semantic: Arc<SemanticStore>, structured: Arc<StructuredStore>) -> Self {
        Self { semantic, structured, config: HealthConfig::default() }
    }

    #[must_use]
    pub fn with_config(mut self, config: HealthConfig) -> Self {
        self.config = config;
        self
    }

    /// Status for every active memory.
    pub fn scan(&self) -> Result<Vec<HealthReport>> {
        let now = Utc::now();
        let memories = self.semantic.list_active()?;
        let mut reports = Vec::with_capacity(memories.len());
        for memory in &memories {
            let connection_count = self.structured.entities_for_memory(memory.id)?.len();
            reports.push(HealthReport {
                memory_id: memory.id,
                status: classify_status(memory, connection_count, self.config, now),
                reasons: reasons_for(memory, connection_count, self.config, now),
            });
        }
        Ok(reports)
    }

    /// All pairwise conflicts across the active corpus.
    pub fn conflicts(&self) -> Result<Vec<Conflict>> {
        let memories = self.semantic.list_active()?;
        Ok(detect_conflicts(&memories, self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Layer, MemoryType, Sublayer};

    fn memory(concepts: &[&str], domain: &str) -> Memory {
        let now = Utc::now();
        Memory {
            id: MemoryId::new(),
            content: "content".to_string(),
            title: "title".to_string(),
            summary: "summary".to_string(),
            concepts: concepts.iter().map(|s| s.to_string()).collect(),
            surfaces_when: Vec::new(),
            layer: Layer::World,
            sublayer: Sublayer::Fact,
            memory_type: MemoryType::Fact,
            domain: domain.to_string(),
            importance: 5,
            authority_score: 0.5,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            superseded_by_id: None,
            potential_conflicts: Vec::new(),
            archived: false,
            custom: None,
        }
    }

    #[test]
    fn superseded_memory_is_at_risk_even_if_fresh() {
        let mut m = memory(&["a"], "work");
        m.superseded_by_id = Some(MemoryId::new());
        assert_eq!(classify_status(&m, 3, HealthConfig::default(), Utc::now()), HealthStatus::AtRisk);
    }

    #[test]
    fn old_memory_without_conflicts_is_stale() {
        let mut m = memory(&["a"], "work");
        m.last_accessed = Utc::now() - chrono::Duration::days(100);
        assert_eq!(classify_status(&m, 3, HealthConfig::default(), Utc::now()), HealthStatus::Stale);
    }

    #[test]
    fn disconnected_fresh_memory_is_orphan() {
        let m = memory(&["a"], "work");
        assert_eq!(classify_status(&m, 0, HealthConfig::default(), Utc::now()), HealthStatus::Orphan);
    }

    #[test]
    fn connected_fresh_memory_is_healthy() {
        let m = memory(&["a"], "work");
        assert_eq!(classify_status(&m, 2, HealthConfig::default(), Utc::now()), HealthStatus::Healthy);
    }

    #[test]
    fn conflicts_require_same_domain() {
        let a = memory(&["rust", "ownership"], "work");
        let b = memory(&["rust", "ownership"], "personal");
        assert!(detect_conflicts(&[a, b], HealthConfig::default()).is_empty());
    }

    #[test]
    fn conflicts_are_symmetric_and_unique() {
        let a = memory(&["rust", "ownership", "borrowing"], "work");
        let b = memory(&["rust", "ownership", "lifetimes"], "work");
        let conflicts = detect_conflicts(&[a, b], HealthConfig { stale_days: 90.0, conflict_threshold: 0.3 });
        assert_eq!(conflicts.len(), 1);
    }

    #[test]
    fn reasons_list_every_applicable_condition_not_just_the_winner() {
        let mut m = memory(&["a"], "work");
        m.superseded_by_id = Some(MemoryId::new());
        m.last_accessed = Utc::now() - chrono::Duration::days(100);
        let reasons = reasons_for(&m, 0, HealthConfig::default(), Utc::now());
        assert_eq!(reasons.len(), 3);
    }

    #[test]
    fn healthy_memory_has_no_reasons() {
        let m = memory(&["a"], "work");
        let reasons = reasons_for(&m, 2, HealthConfig::default(), Utc::now());
        assert!(reasons.is_empty());
    }

    #[test]
    fn raising_threshold_never_grows_conflict_set() {
        let a = memory(&["rust", "ownership", "borrowing"], "work");
        let b = memory(&["rust", "ownership", "lifetimes"], "work");
        let loose = detect_conflicts(&[a.clone(), b.clone()], HealthConfig { stale_days: 90.0, conflict_threshold: 0.2 });
        let strict = detect_conflicts(&[a, b], HealthConfig { stale_days: 90.0, conflict_threshold: 0.9 });
        assert!(strict.len() <= loose.len());
    }
}
