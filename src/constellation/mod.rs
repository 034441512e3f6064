//! C7 — Constellation assembler: groups scored search results into
//! roles around a primary memory and produces a one-line synthesis
//! (`spec.md` §4.4), ported from
//! `original_source/src/core/retrieval.py::build_constellation` /
//! `_generate_synthesis`.

use std::collections::{HashMap, HashSet};

use crate::memory::{Memory, MemoryId};
use crate::retrieval::SearchResult;

const MAX_CANDIDATES: usize = 9;
const MAX_SUPPORTING: usize = 3;
const MAX_CONTRADICTING: usize = 2;
const MAX_CONTEXT: usize = 2;
const CONTEXT_CONCEPT_THRESHOLD: f64 = 0.3;
const SUPPORTING_COMPOSITE_THRESHOLD: f64 = 0.5;

/// A candidate's place in a [`Constellation`] relative to the primary
/// memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Primary,
    Supporting,
    Contradicting,
    Context,
}

/// One member of a constellation: the memory, its assigned role, and
/// the six-signal composite score it was assigned on.
#[derive(Debug, Clone)]
pub struct ConstellationMember {
    pub memory: Memory,
    pub role: Role,
    pub composite_score: f64,
}

/// The assembled answer to a single query: a primary memory plus
/// supporting, contradicting, and contextual companions, and a
/// human-readable synthesis string.
#[derive(Debug, Clone)]
pub struct Constellation {
    pub primary: Option<ConstellationMember>,
    pub supporting: Vec<ConstellationMember>,
    pub contradicting: Vec<ConstellationMember>,
    pub context: Vec<ConstellationMember>,
    pub synthesis: String,
}

/// `(composite, concept_overlap)` read off a result's explanation.
/// Results without an explanation (caller passed `include_explanation:
/// false`) fall back to the post-reweight `score` and zero overlap —
/// role assignment degrades to "never context, supporting only above
/// the composite threshold".
fn signals_of(result: &SearchResult) -> (f64, f64) {
    match &result.explanation {
        Some(explanation) => {
            let concept = explanation.signals.iter().find(|s| s.name == "concept_overlap").map_or(0.0, |s| s.score);
            (explanation.composite, concept)
        }
        None => (result.score, 0.0),
    }
}

/// Build a constellation from `results`, already sorted by relevance
/// descending. `contradictions`/`supports` map a memory id to the ids
/// of memories known to conflict with or corroborate it (from
/// [`crate::health`] conflict detection, or caller-supplied).
#[must_use]
pub fn assemble(results: &[SearchResult], contradictions: &HashMap<MemoryId, Vec<MemoryId>>, supports: &HashMap<MemoryId, Vec<MemoryId>>) -> Constellation {
    let Some(primary_result) = results.first() else {
        return Constellation { primary: None, supporting: Vec::new(), contradicting: Vec::new(), context: Vec::new(), synthesis: "No relevant memories found.".to_string() };
    };

    let (primary_composite, _) = signals_of(primary_result);
    let primary = ConstellationMember { memory: primary_result.memory.clone(), role: Role::Primary, composite_score: primary_composite };

    let empty = Vec::new();
    let primary_contradicts: HashSet<&MemoryId> = contradictions.get(&primary.memory.id).unwrap_or(&empty).iter().collect();
    let primary_supports: HashSet<&MemoryId> = supports.get(&primary.memory.id).unwrap_or(&empty).iter().collect();

    let mut supporting = Vec::new();
    let mut contradicting = Vec::new();
    let mut context = Vec::new();

    for result in results.iter().skip(1).take(MAX_CANDIDATES) {
        let (composite, concept_score) = signals_of(result);
        let member = |role| ConstellationMember { memory: result.memory.clone(), role, composite_score: composite };

        if primary_contradicts.contains(&result.memory.id) {
            contradicting.push(member(Role::Contradicting));
        } else if primary_supports.contains(&result.memory.id) {
            supporting.push(member(Role::Supporting));
        } else if concept_score > CONTEXT_CONCEPT_THRESHOLD {
            context.push(member(Role::Context));
        } else if composite > SUPPORTING_COMPOSITE_THRESHOLD {
            supporting.push(member(Role::Supporting));
        }
    }

    supporting.truncate(MAX_SUPPORTING);
    contradicting.truncate(MAX_CONTRADICTING);
    context.truncate(MAX_CONTEXT);

    let synthesis = generate_synthesis(&primary, &supporting, &contradicting, &context);

    Constellation { primary: Some(primary), supporting, contradicting, context, synthesis }
}

fn generate_synthesis(primary: &ConstellationMember, supporting: &[ConstellationMember], contradicting: &[ConstellationMember], context: &[ConstellationMember]) -> String {
    let mut parts = Vec::new();

    parts.push(format!("Primary: {} (confidence: {:.2})", primary.memory.title, primary.composite_score));

    if !supporting.is_empty() {
        let titles: Vec<&str> = supporting.iter().take(2).map(|m| m.memory.title.as_str()).collect();
        parts.push(format!("Supported by: {}", titles.join(", ")));
    }

    if !contradicting.is_empty() {
        let titles: Vec<&str> = contradicting.iter().take(2).map(|m| m.memory.title.as_str()).collect();
        parts.push(format!("Note: Conflicting info in: {}", titles.join(", ")));
    }

    if !context.is_empty() {
        let titles: Vec<&str> = context.iter().take(2).map(|m| m.memory.title.as_str()).collect();
        parts.push(format!("Related: {}", titles.join(", ")));
    }

    if parts.is_empty() { "No synthesis available.".to_string() } else { parts.join(" | ") }
}
