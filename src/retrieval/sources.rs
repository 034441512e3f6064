//! Adaptive per-source reweighting (`spec.md` §4.3 step 4), ported
//! from `original_source/src/core/scoring.py::ScoreNormalizer`.
//! Distinct from the six [`super::signals::SignalWeights`]: this
//! reweights *which store found a candidate*, not the candidate's own
//! six-signal breakdown.

use serde::Serialize;

use super::SearchMode;

/// Where a candidate was found. `Hybrid` marks a candidate surfaced by
/// more than one source after merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Semantic,
    Graph,
    Conversation,
    Hybrid,
}

/// Per-source trust weights, always summing to `1.0`.
#[derive(Debug, Clone, Copy)]
pub struct SourceWeights {
    pub conversation: f64,
    pub semantic: f64,
    pub graph: f64,
}

impl SourceWeights {
    fn normalize(self) -> Self {
        let total = self.conversation + self.semantic + self.graph;
        if total <= 0.0 {
            return Self { conversation: 0.0, semantic: 0.0, graph: 0.0 };
        }
        Self { conversation: self.conversation / total, semantic: self.semantic / total, graph: self.graph / total }
    }

    /// Sum of the weights for every source in `sources` — used to scale
    /// a candidate's composite score by how much the query trusts the
    /// source(s) that surfaced it.
    #[must_use]
    pub fn trust(&self, sources: &[Source]) -> f64 {
        sources
            .iter()
            .map(|s| match s {
                Source::Conversation => self.conversation,
                Source::Semantic => self.semantic,
                Source::Graph => self.graph,
                Source::Hybrid => self.conversation.max(self.semantic).max(self.graph),
            })
            .fold(0.0_f64, f64::max)
            .clamp(0.0, 1.0)
    }
}

const PRONOUNS: &[&str] = &["it", "that", "this", "these", "those", "he", "she", "they"];
const SPECIFIC_TERMS: &[&str] = &["uuid", "id", "named", "called", "entity"];
const QUESTION_WORDS: &[&str] = &["what", "how", "why", "when", "where", "who", "which"];

fn tokenize(query_lower: &str) -> Vec<&str> {
    query_lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect()
}

/// Determine source weights for a query, matching
/// `scoring.py::adaptive_weights`'s priority order: pronouns > specific
/// identifiers > question words > session presence > default.
#[must_use]
pub fn adaptive_weights(query: &str, has_session: bool, mode: SearchMode) -> SourceWeights {
    match mode {
        SearchMode::Semantic => return SourceWeights { conversation: 0.0, semantic: 1.0, graph: 0.0 },
        SearchMode::Structured => return SourceWeights { conversation: 0.0, semantic: 0.0, graph: 1.0 },
        SearchMode::Hybrid => {}
    }

    let query_lower = query.to_lowercase();
    let words = tokenize(&query_lower);

    let weights = if PRONOUNS.iter().any(|p| words.contains(p)) {
        SourceWeights { conversation: 0.6, semantic: 0.25, graph: 0.15 }
    } else if SPECIFIC_TERMS.iter().any(|t| query_lower.contains(t)) {
        SourceWeights { conversation: 0.2, semantic: 0.3, graph: 0.5 }
    } else if QUESTION_WORDS.iter().any(|q| words.contains(q)) {
        SourceWeights { conversation: 0.25, semantic: 0.5, graph: 0.25 }
    } else if has_session {
        SourceWeights { conversation: 0.4, semantic: 0.35, graph: 0.25 }
    } else {
        SourceWeights { conversation: 0.3, semantic: 0.4, graph: 0.3 }
    };

    weights.normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pronouns_boost_conversation() {
        let weights = adaptive_weights("what did it say", false, SearchMode::Hybrid);
        assert!((weights.conversation - 0.6).abs() < 1e-9);
    }

    #[test]
    fn specific_terms_boost_graph() {
        let weights = adaptive_weights("find the entity named Rust", false, SearchMode::Hybrid);
        assert!((weights.graph - 0.5).abs() < 1e-9);
    }

    #[test]
    fn default_weights_sum_to_one() {
        let weights = adaptive_weights("tell me something", false, SearchMode::Hybrid);
        let sum = weights.conversation + weights.semantic + weights.graph;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn semantic_mode_forces_semantic_only() {
        let weights = adaptive_weights("it that this", false, SearchMode::Semantic);
        assert_eq!(weights.semantic, 1.0);
        assert_eq!(weights.conversation, 0.0);
    }
}
