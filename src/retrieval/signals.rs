//! Six-signal composite scoring (`spec.md` §4.3 step 3). Formulas are
//! ported from `original_source/src/core/retrieval.py::CognitiveRetriever`
//! (`compute_concept_overlap`, `compute_domain_match`,
//! `compute_coactivation`, `compute_temporal_score`); authority reuses
//! the curator's stored `authority_score` rather than recomputing one
//! (`SPEC_FULL.md` §4.3, resolving `spec.md` §9 Open Question 2).

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::Memory;

use super::query::QueryAnalysis;

/// Weights for the six retrieval signals. Must sum to `1.0`; values
/// that don't are renormalized by [`SignalWeights::normalized`] (§8 P3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SignalWeights {
    pub vector: f64,
    pub concept: f64,
    pub domain: f64,
    pub coactivation: f64,
    pub authority: f64,
    pub temporal: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self { vector: 0.30, concept: 0.20, domain: 0.15, coactivation: 0.15, authority: 0.10, temporal: 0.10 }
    }
}

impl SignalWeights {
    /// Scale every weight so they sum to `1.0`. Falls back to
    /// [`SignalWeights::default`] if the sum is non-positive.
    #[must_use]
    pub fn normalized(self) -> Self {
        let sum = self.vector + self.concept + self.domain + self.coactivation + self.authority + self.temporal;
        if sum <= 0.0 {
            return Self::default();
        }
        Self {
            vector: self.vector / sum,
            concept: self.concept / sum,
            domain: self.domain / sum,
            coactivation: self.coactivation / sum,
            authority: self.authority / sum,
            temporal: self.temporal / sum,
        }
    }
}

/// One named contribution to a candidate's composite score.
#[derive(Debug, Clone, Serialize)]
pub struct Signal {
    pub name: &'static str,
    pub score: f64,
    pub weight: f64,
    pub weighted: f64,
    pub reason: String,
    pub details: serde_json::Value,
}

/// The full per-result explanation: exactly six signals whose
/// `weighted` values sum to `composite` within ±0.001 (§8 P1).
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub composite: f64,
    pub signals: Vec<Signal>,
}

/// `|Q∩M| / |Q∪M|` over canonicalized concept sets.
#[must_use]
pub fn concept_overlap(query_concepts: &[String], memory_concepts: &[String]) -> f64 {
    if query_concepts.is_empty() || memory_concepts.is_empty() {
        return 0.0;
    }
    let query_set: HashSet<&String> = query_concepts.iter().collect();
    let memory_set: HashSet<&String> = memory_concepts.iter().collect();
    let intersection = query_set.intersection(&memory_set).count();
    let union = query_set.union(&memory_set).count();
    if union == 0 { 0.0 } else { intersection as f64 / union as f64 }
}

/// 1 if equal; 0.3 if both `project:*`; 0 otherwise; 0.5 if the query
/// domain is unknown.
#[must_use]
pub fn domain_match(query_domain: Option<&str>, memory_domain: &str) -> f64 {
    let Some(query_domain) = query_domain else {
        return 0.5;
    };
    if query_domain == memory_domain {
        return 1.0;
    }
    if query_domain.starts_with("project:") && memory_domain.starts_with("project:") {
        return 0.3;
    }
    0.0
}

/// `min(1, Σ coact(m, r) / 10)` over the recent top-K.
#[must_use]
pub fn coactivation_score(total_coactivations: u32) -> f64 {
    (f64::from(total_coactivations) / 10.0).min(1.0)
}

/// `0.6·e^(-0.05·days_accessed) + 0.4·e^(-0.007·days_created)`.
#[must_use]
pub fn temporal_score(days_since_accessed: f64, days_since_created: f64) -> f64 {
    0.6 * (-0.05 * days_since_accessed).exp() + 0.4 * (-0.007 * days_since_created).exp()
}

/// Score a single candidate against the analyzed query, returning its
/// composite score and the explanation that justifies it. `vector_similarity`
/// and `coactivation_total` are supplied by the caller since they depend on
/// state (the embedding index, the co-activation matrix) this module
/// doesn't own.
#[must_use]
pub fn score_candidate(
    memory: &Memory,
    query: &QueryAnalysis,
    vector_similarity: f64,
    coactivation_total: u32,
    weights: SignalWeights,
    now: DateTime<Utc>,
) -> Explanation {
    let vector_similarity = vector_similarity.clamp(0.0, 1.0);
    let concept = concept_overlap(&query.concepts, &memory.concepts);
    let domain = domain_match(query.inferred_domain.as_deref(), &memory.domain);
    let coactivation = coactivation_score(coactivation_total);
    let authority = memory.authority_score.clamp(0.0, 1.0);
    let temporal = temporal_score(memory.days_since_accessed(now), memory.days_since_created(now));

    let matched: Vec<&String> = query
        .concepts
        .iter()
        .filter(|c| memory.concepts.contains(c))
        .collect();

    let signals = vec![
        Signal {
            name: "vector_similarity",
            score: vector_similarity,
            weight: weights.vector,
            weighted: weights.vector * vector_similarity,
            reason: format!("cosine similarity to query is {vector_similarity:.2}"),
            details: serde_json::json!({}),
        },
        Signal {
            name: "concept_overlap",
            score: concept,
            weight: weights.concept,
            weighted: weights.concept * concept,
            reason: if matched.is_empty() {
                "no shared concepts".to_string()
            } else {
                format!("shares {} concept(s) with the query", matched.len())
            },
            details: serde_json::json!({ "matched": matched }),
        },
        Signal {
            name: "domain_match",
            score: domain,
            weight: weights.domain,
            weighted: weights.domain * domain,
            reason: match query.inferred_domain.as_deref() {
                None => "query domain is unknown".to_string(),
                Some(d) if d == memory.domain => format!("domain matches ({d})"),
                Some(d) => format!("query domain {d} vs memory domain {}", memory.domain),
            },
            details: serde_json::json!({ "query_domain": query.inferred_domain, "memory_domain": memory.domain }),
        },
        Signal {
            name: "coactivation",
            score: coactivation,
            weight: weights.coactivation,
            weighted: weights.coactivation * coactivation,
            reason: format!("co-activated with {coactivation_total} recent result(s)"),
            details: serde_json::json!({ "total_coactivations": coactivation_total }),
        },
        Signal {
            name: "authority",
            score: authority,
            weight: weights.authority,
            weighted: weights.authority * authority,
            reason: format!("authority score {authority:.2}"),
            details: serde_json::json!({}),
        },
        Signal {
            name: "temporal",
            score: temporal,
            weight: weights.temporal,
            weighted: weights.temporal * temporal,
            reason: format!("last accessed {:.1} day(s) ago", memory.days_since_accessed(now)),
            details: serde_json::json!({}),
        },
    ];

    let composite = signals.iter().map(|s| s.weighted).sum();
    Explanation { composite, signals }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::Embedding;
    use crate::memory::{Layer, MemoryId, MemoryType, Sublayer};

    fn sample_memory() -> Memory {
        let now = Utc::now();
        Memory {
            id: MemoryId::new(),
            content: "User prefers tabs".to_string(),
            title: "self.preference: tabs".to_string(),
            summary: "User prefers tabs".to_string(),
            concepts: vec!["tabs".to_string(), "indentation".to_string()],
            surfaces_when: vec![],
            layer: Layer::Myself,
            sublayer: Sublayer::Preference,
            memory_type: MemoryType::Preference,
            domain: "work".to_string(),
            importance: 5,
            authority_score: 0.6,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            superseded_by_id: None,
            potential_conflicts: vec![],
            archived: false,
            custom: None,
        }
    }

    fn sample_query() -> QueryAnalysis {
        QueryAnalysis {
            raw_query: "how do I indent".to_string(),
            concepts: vec!["indentation".to_string()],
            inferred_domain: Some("work".to_string()),
            inferred_intent: super::super::query::Intent::Learn,
            embedding: Embedding::new(vec![0.0; 4]),
        }
    }

    #[test]
    fn weighted_sum_equals_composite() {
        let explanation = score_candidate(&sample_memory(), &sample_query(), 0.8, 2, SignalWeights::default(), Utc::now());
        let sum: f64 = explanation.signals.iter().map(|s| s.weighted).sum();
        assert!((sum - explanation.composite).abs() < 1e-9);
    }

    #[test]
    fn explanation_has_exactly_six_signals() {
        let explanation = score_candidate(&sample_memory(), &sample_query(), 0.8, 0, SignalWeights::default(), Utc::now());
        assert_eq!(explanation.signals.len(), 6);
    }

    #[test]
    fn concept_overlap_matched_is_nonempty_when_score_positive() {
        let explanation = score_candidate(&sample_memory(), &sample_query(), 0.8, 0, SignalWeights::default(), Utc::now());
        let concept_signal = explanation.signals.iter().find(|s| s.name == "concept_overlap").unwrap();
        assert!(concept_signal.score > 0.0);
        let matched = concept_signal.details["matched"].as_array().unwrap();
        assert!(!matched.is_empty());
    }

    #[test]
    fn weights_normalize_to_one() {
        let weights = SignalWeights { vector: 1.0, concept: 1.0, domain: 1.0, coactivation: 1.0, authority: 1.0, temporal: 1.0 }.normalized();
        let sum = weights.vector + weights.concept + weights.domain + weights.coactivation + weights.authority + weights.temporal;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn domain_match_scores() {
        assert_eq!(domain_match(None, "work"), 0.5);
        assert_eq!(domain_match(Some("work"), "work"), 1.0);
        assert_eq!(domain_match(Some("project:a"), "project:b"), 0.3);
        assert_eq!(domain_match(Some("work"), "personal"), 0.0);
    }
}
