//! C4 — Curator: turns raw content into the enriched fields every other
//! component relies on (classification, concepts, triggers, title,
//! summary, authority). Purely deterministic, no I/O.

mod authority;
mod canonicalize;
mod classify;
mod concepts;
mod surfaces;
mod text;

pub use authority::compute_authority;
pub use canonicalize::{canonicalize, canonicalize_label};
pub use classify::{classify, classify_layer, compute_importance};
pub use concepts::extract_concepts;
pub use surfaces::infer_surfaces_when;
pub use text::{generate_summary, generate_title};

use chrono::{DateTime, Utc};

use crate::memory::{AddMemoryRequest, Classification, MemoryType};

const MAX_CONCEPTS: usize = 5;

/// Everything the curator derives from an [`AddMemoryRequest`]'s content,
/// ready to be assembled into a [`crate::memory::Memory`] by the write
/// coordinator.
#[derive(Debug, Clone)]
pub struct CuratedFields {
    pub title: String,
    pub summary: String,
    pub concepts: Vec<String>,
    pub surfaces_when: Vec<String>,
    pub classification: Classification,
    pub memory_type: MemoryType,
    pub domain: String,
    /// Authority score at creation time (access_count = 0).
    pub authority_score: f64,
}

/// Run the full curation pipeline over a single ingest request.
///
/// Caller-supplied overrides (`request.importance`, `request.memory_type`,
/// `request.metadata.domain`) take precedence over derived values.
#[must_use]
pub fn curate(request: &AddMemoryRequest, now: DateTime<Utc>) -> CuratedFields {
    let content = request.content.as_str();

    let (layer, sublayer) = classify::classify_layer(content);
    let derived_importance = classify::compute_importance((layer, sublayer), content);
    let importance = request.importance.unwrap_or(derived_importance).clamp(1, 10);
    let classification = Classification {
        layer,
        sublayer,
        importance,
    };

    let mut concepts = concepts::extract_concepts(content, MAX_CONCEPTS);
    concepts.extend(request.tags.iter().cloned());
    let concepts = canonicalize::canonicalize(&concepts)
        .into_iter()
        .take(MAX_CONCEPTS)
        .collect::<Vec<_>>();

    let surfaces_when = surfaces::infer_surfaces_when(content, &concepts);

    let title = text::generate_title(content, layer, sublayer);
    let summary = text::generate_summary(content);

    let memory_type = request.memory_type.unwrap_or(match sublayer {
        crate::memory::Sublayer::Rule => MemoryType::Rule,
        crate::memory::Sublayer::Preference => MemoryType::Preference,
        _ => MemoryType::Fact,
    });

    let domain = request
        .metadata
        .domain
        .clone()
        .unwrap_or_else(|| "general".to_string());

    // Freshly created: zero access history, zero age.
    let _ = now;
    let authority_score = authority::compute_authority(importance, 0, 0.0, 0.0);

    CuratedFields {
        title,
        summary,
        concepts,
        surfaces_when,
        classification,
        memory_type,
        domain,
        authority_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curate_secrets_rule_scenario() {
        let request = AddMemoryRequest::new("NEVER commit secrets to the repository");
        let fields = curate(&request, Utc::now());
        assert_eq!(fields.classification.layer, crate::memory::Layer::Intent);
        assert_eq!(fields.classification.sublayer, crate::memory::Sublayer::Rule);
        assert_eq!(fields.memory_type, MemoryType::Rule);
        assert!(fields.concepts.contains(&"secrets".to_string()));
        assert!(fields.title.starts_with("intent.rule: "));
        assert_eq!(fields.domain, "general");
    }

    #[test]
    fn explicit_overrides_win() {
        let mut request = AddMemoryRequest::new("The sky is blue");
        request.importance = Some(2);
        request.memory_type = Some(MemoryType::Decision);
        request.metadata.domain = Some("project:elefante".to_string());
        let fields = curate(&request, Utc::now());
        assert_eq!(fields.classification.importance, 2);
        assert_eq!(fields.memory_type, MemoryType::Decision);
        assert_eq!(fields.domain, "project:elefante");
    }

    #[test]
    fn tags_fold_into_concepts() {
        let mut request = AddMemoryRequest::new("Some unrelated prose about lunch plans");
        request.tags = vec!["onboarding".to_string()];
        let fields = curate(&request, Utc::now());
        assert!(fields.concepts.contains(&"onboarding".to_string()));
    }
}
