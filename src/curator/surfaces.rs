//! `surfaces_when` inference — short phrases declaring contexts in
//! which a memory should proactively resurface (`spec.md` §4.1, §4.6).

use super::canonicalize::canonicalize_label;

const MAX_SURFACES: usize = 8;

/// Pattern library keyed on question starters, error tokens, directive
/// verbs, and configuration verbs.
const PATTERN_LIBRARY: &[&str] = &[
    "how do i",
    "how to",
    "what is",
    "why does",
    "why is",
    "error",
    "fails",
    "broken",
    "always",
    "never",
    "must",
    "configure",
    "set up",
    "install",
];

fn content_lower_contains(lower: &str, pattern: &str) -> bool {
    lower.contains(pattern)
}

/// Infer up to [`MAX_SURFACES`] short trigger phrases from `content` and
/// its already-extracted `concepts`.
#[must_use]
pub fn infer_surfaces_when(content: &str, concepts: &[String]) -> Vec<String> {
    let lower = content.to_lowercase();
    let mut phrases: Vec<String> = Vec::new();

    for pattern in PATTERN_LIBRARY {
        if !content_lower_contains(&lower, pattern) {
            continue;
        }
        if let Some(concept) = concepts.first() {
            phrases.push(canonicalize_label(&format!("{pattern} {concept}")));
        } else {
            phrases.push(canonicalize_label(pattern));
        }
        if phrases.len() >= MAX_SURFACES {
            break;
        }
    }

    // Every concept is itself a plausible trigger phrase, so top up with
    // bare concepts if the pattern library came up short.
    for concept in concepts {
        if phrases.len() >= MAX_SURFACES {
            break;
        }
        if !phrases.contains(concept) {
            phrases.push(concept.clone());
        }
    }

    phrases.truncate(MAX_SURFACES);
    phrases
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_secrets_rule_includes_secrets_pattern() {
        let concepts = vec!["secrets".to_string(), "repository".to_string()];
        let surfaces = infer_surfaces_when("NEVER commit secrets to the repository", &concepts);
        assert!(
            surfaces.iter().any(|s| s.contains("secrets")),
            "expected a surface containing 'secrets', got {surfaces:?}"
        );
    }

    #[test]
    fn caps_at_eight() {
        let concepts: Vec<String> = (0..20).map(|i| format!("concept{i}")).collect();
        let surfaces = infer_surfaces_when(
            "how do i configure this error always never must set up install",
            &concepts,
        );
        assert!(surfaces.len() <= 8);
    }

    #[test]
    fn standup_meeting_scenario() {
        let surfaces = vec!["at standup meetings".to_string()];
        // direct canonicalized substring match used by the proactive surfacer
        let context = canonicalize_label("let's start the daily standup");
        assert!(canonicalize_label(&surfaces[0]).contains("standup"));
        assert!(context.contains("standup"));
    }
}
