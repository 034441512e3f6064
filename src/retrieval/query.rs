//! Query analysis: the first step of retrieval (`spec.md` §4.3 step 1).
//! Domain/intent keyword sets are ported verbatim from
//! `original_source/src/core/retrieval.py::analyze_query`.

use crate::curator;
use crate::embeddings::Embedding;

/// Inferred conversational intent behind a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Troubleshoot,
    Learn,
    Decide,
    Remember,
}

/// Signals extracted from a raw query string before candidate
/// gathering.
#[derive(Debug, Clone)]
pub struct QueryAnalysis {
    pub raw_query: String,
    pub concepts: Vec<String>,
    pub inferred_domain: Option<String>,
    pub inferred_intent: Intent,
    pub embedding: Embedding,
}

const WORK_KEYWORDS: &[&str] = &["work", "job", "meeting", "deadline"];
const PERSONAL_KEYWORDS: &[&str] = &["personal", "home", "family"];
const TROUBLESHOOT_KEYWORDS: &[&str] = &["error", "bug", "fix", "problem", "issue"];
const LEARN_KEYWORDS: &[&str] = &["how", "learn", "what is", "explain"];
const DECIDE_KEYWORDS: &[&str] = &["decide", "choose", "should i", "which"];

fn infer_domain(query_lower: &str) -> Option<String> {
    if query_lower.contains("elefante") {
        return Some("project:elefante".to_string());
    }
    if WORK_KEYWORDS.iter().any(|w| query_lower.contains(w)) {
        return Some("work".to_string());
    }
    if PERSONAL_KEYWORDS.iter().any(|w| query_lower.contains(w)) {
        return Some("personal".to_string());
    }
    None
}

fn infer_intent(query_lower: &str) -> Intent {
    if TROUBLESHOOT_KEYWORDS.iter().any(|w| query_lower.contains(w)) {
        Intent::Troubleshoot
    } else if LEARN_KEYWORDS.iter().any(|w| query_lower.contains(w)) {
        Intent::Learn
    } else if DECIDE_KEYWORDS.iter().any(|w| query_lower.contains(w)) {
        Intent::Decide
    } else {
        Intent::Remember
    }
}

/// Extract concepts, domain, and intent from `query`, pairing it with
/// its precomputed `embedding`.
#[must_use]
pub fn analyze_query(query: &str, embedding: Embedding) -> QueryAnalysis {
    let query_lower = query.to_lowercase();
    QueryAnalysis {
        raw_query: query.to_string(),
        concepts: curator::extract_concepts(query, 5),
        inferred_domain: infer_domain(&query_lower),
        inferred_intent: infer_intent(&query_lower),
        embedding,
    }
}
