//! C9 — Proactive surfacer: scans the corpus for memories whose
//! triggers match the current conversational context (`spec.md` §4.6).

use std::sync::Arc;

use crate::curator::canonicalize_label;
use crate::error::Result;
use crate::memory::{Memory, MemoryId};
use crate::storage::SemanticStore;

const DEFAULT_TEMPORAL_CONFIDENCE: f64 = 0.7;
const DEFAULT_DOMAIN_CONFIDENCE: f64 = 0.6;
const DEFAULT_CONCEPT_CONFIDENCE: f64 = 0.5;
const MIN_RECURRING_CONCEPT_OVERLAP: usize = 2;
const MAX_SUGGESTIONS: usize = 5;

/// Which rule surfaced a [`Suggestion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Temporal,
    Domain,
    RecurringConcept,
}

/// Tuning knobs for proactive surfacing (`config.rs`'s `proactive`
/// section).
#[derive(Debug, Clone, Copy)]
pub struct ProactiveConfig {
    pub temporal_confidence: f64,
    pub domain_confidence: f64,
    pub concept_confidence: f64,
}

impl Default for ProactiveConfig {
    fn default() -> Self {
        Self { temporal_confidence: DEFAULT_TEMPORAL_CONFIDENCE, domain_confidence: DEFAULT_DOMAIN_CONFIDENCE, concept_confidence: DEFAULT_CONCEPT_CONFIDENCE }
    }
}

/// A soft nudge toward a memory the caller may not have asked for
/// directly. The caller decides whether to surface it.
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub memory_id: MemoryId,
    pub trigger: Trigger,
    pub confidence: f64,
    pub reason: String,
}

/// First-match trigger for a single memory against the current
/// context: temporal > domain > recurring_concept (`spec.md` §4.6).
fn trigger_for(memory: &Memory, context_lower: &str, conversation_domain: Option<&str>, recent_concepts: &[String], config: ProactiveConfig) -> Option<Suggestion> {
    for pattern in &memory.surfaces_when {
        if context_lower.contains(&canonicalize_label(pattern)) {
            return Some(Suggestion {
                memory_id: memory.id,
                trigger: Trigger::Temporal,
                confidence: config.temporal_confidence,
                reason: format!("context matches trigger phrase \"{pattern}\""),
            });
        }
    }

    if let Some(domain) = conversation_domain {
        if domain == memory.domain {
            return Some(Suggestion {
                memory_id: memory.id,
                trigger: Trigger::Domain,
                confidence: config.domain_confidence,
                reason: format!("conversation domain matches memory domain {domain}"),
            });
        }
    }

    let overlap = memory.concepts.iter().filter(|c| recent_concepts.contains(c)).count();
    if overlap >= MIN_RECURRING_CONCEPT_OVERLAP {
        return Some(Suggestion {
            memory_id: memory.id,
            trigger: Trigger::RecurringConcept,
            confidence: config.concept_confidence,
            reason: format!("shares {overlap} recently discussed concept(s)"),
        });
    }

    None
}

/// C9: scans the active corpus for memories whose triggers match the
/// current context, returning at most [`MAX_SUGGESTIONS`] ordered by
/// confidence descending.
pub struct ProactiveSurfacer {
    semantic: Arc<SemanticStore>,
    config: ProactiveConfig,
}

impl ProactiveSurfacer {
    #[must_use]
    pub fn new(semantic: Arc<SemanticStore>) -> Self {
        Self { semantic, config: ProactiveConfig::default() }
    }

    #[must_use]
    pub fn with_config(mut self, config: ProactiveConfig) -> Self {
        self.config = config;
        self
    }

    pub fn surface(&self, context: &str, conversation_domain: Option<&str>, recent_concepts: &[String]) -> Result<Vec<Suggestion>> {
        let context_lower = canonicalize_label(context);
        let memories = self.semantic.list_active()?;

        let mut suggestions: Vec<Suggestion> = memories
            .iter()
            .filter_map(|m| trigger_for(m, &context_lower, conversation_domain, recent_concepts, self.config))
            .collect();

        suggestions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        suggestions.truncate(MAX_SUGGESTIONS);
        Ok(suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Layer, MemoryType, Sublayer};
    use chrono::Utc;

    fn memory(surfaces_when: &[&str], domain: &str, concepts: &[&str]) -> Memory {
        let now = Utc::now();
        Memory {
            id: MemoryId::new(),
            content: "content".to_string(),
            title: "title".to_string(),
            summary: "summary".to_string(),
            concepts: concepts.iter().map(|s| s.to_string()).collect(),
            surfaces_when: surfaces_when.iter().map(|s| s.to_string()).collect(),
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
    fn temporal_trigger_wins_even_with_matching_domain() {
        let m = memory(&["deploy friday"], "work", &[]);
        let suggestion = trigger_for(&m, "we deploy friday afternoon", Some("work"), &[], ProactiveConfig::default()).unwrap();
        assert_eq!(suggestion.trigger, Trigger::Temporal);
    }

    #[test]
    fn domain_trigger_fires_without_temporal_match() {
        let m = memory(&["nothing matches here"], "work", &[]);
        let suggestion = trigger_for(&m, "just chatting", Some("work"), &[], ProactiveConfig::default()).unwrap();
        assert_eq!(suggestion.trigger, Trigger::Domain);
    }

    #[test]
    fn recurring_concept_trigger_requires_two_shared_concepts() {
        let m = memory(&[], "general", &["rust", "ownership"]);
        assert!(trigger_for(&m, "unrelated", None, &["rust".to_string()], ProactiveConfig::default()).is_none());
        let suggestion = trigger_for(&m, "unrelated", None, &["rust".to_string(), "ownership".to_string()], ProactiveConfig::default()).unwrap();
        assert_eq!(suggestion.trigger, Trigger::RecurringConcept);
    }

    #[test]
    fn no_match_yields_no_suggestion() {
        let m = memory(&["something specific"], "general", &["foo"]);
        assert!(trigger_for(&m, "nothing in common", None, &[], ProactiveConfig::default()).is_none());
    }

    #[test]
    fn surface_orders_by_confidence_and_caps_at_five() {
        let store = SemanticStore::open_in_memory().unwrap();
        for i in 0..6 {
            let mut m = memory(&[], "work", &[]);
            m.content = format!("memory {i}");
            let embedding = crate::embeddings::Embedding::new(vec![0.1; crate::embeddings::EMBEDDING_DIMENSIONS]);
            store.upsert(&m, &embedding).unwrap();
        }
        let surfacer = ProactiveSurfacer::new(Arc::new(store));
        let suggestions = surfacer.surface("anything", Some("work"), &[]).unwrap();
        assert_eq!(suggestions.len(), MAX_SUGGESTIONS);
    }
}
