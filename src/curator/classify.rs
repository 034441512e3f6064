//! Deterministic layer/sublayer/importance classification.
//!
//! Rule order is a literal ordered if-chain resolved from
//! `original_source/src/core/classifier.py`, extended with an importance
//! pass per `spec.md` §4.1 (see [`SPEC_FULL.md`] §4.1).

use crate::memory::{Classification, Layer, Sublayer};

/// Words whose uppercase form anywhere in the content forces `intent.rule`.
const RULE_WORDS: [&str; 3] = ["NEVER", "ALWAYS", "MUST"];

fn contains_uppercase_word(content: &str, words: &[&str]) -> bool {
    content
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|tok| !tok.is_empty() && words.contains(&tok))
}

fn contains_word_ci(lower: &str, words: &[&str]) -> bool {
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    words.iter().any(|w| tokens.contains(w))
}

fn contains_any_substr(lower: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| lower.contains(n))
}

/// Classify content into `(layer, sublayer)` per the ordered rule chain.
#[must_use]
pub fn classify_layer(content: &str) -> (Layer, Sublayer) {
    if contains_uppercase_word(content, &RULE_WORDS) {
        return (Layer::Intent, Sublayer::Rule);
    }

    let lower = content.to_lowercase();

    // SELF.identity: "is" + a reference to the user.
    if contains_word_ci(&lower, &["is"]) && contains_any_substr(&lower, &["user", "i am", "my name"]) {
        return (Layer::Myself, Sublayer::Identity);
    }

    if contains_any_substr(&lower, &["prefer", "like", "hate", "love", "value"]) {
        return (Layer::Myself, Sublayer::Preference);
    }

    if contains_word_ci(&lower, &["must", "never", "always"]) {
        return (Layer::Myself, Sublayer::Constraint);
    }

    if contains_any_substr(&lower, &["want", "need", "goal", "achieve", "will"]) {
        return (Layer::Intent, Sublayer::Goal);
    }

    if contains_any_substr(&lower, &["don't", "do not", "avoid", "stop"]) {
        return (Layer::Intent, Sublayer::AntiPattern);
    }

    if contains_any_substr(
        &lower,
        &["bug", "error", "fail", "problem", "issue", "crash", "break"],
    ) {
        return (Layer::World, Sublayer::Failure);
    }

    if contains_any_substr(
        &lower,
        &["technique", "protocol", "method", "process", "workflow", "framework"],
    ) {
        return (Layer::World, Sublayer::Method);
    }

    (Layer::World, Sublayer::Fact)
}

/// Tokens whose presence nudges importance upward — credential-like
/// content is worth remembering precisely and handling carefully.
const CREDENTIAL_TOKENS: [&str; 6] = ["key", "token", "password", "secret", "credential", "api_key"];
const DECISION_VERBS: [&str; 6] = ["decided", "chose", "will use", "going with", "picked", "settled on"];

/// Compute importance (1–10) from the resolved classification and content
/// signals, clamped to the documented range.
#[must_use]
pub fn compute_importance(classification: (Layer, Sublayer), content: &str) -> u8 {
    let (layer, sublayer) = classification;
    let lower = content.to_lowercase();

    let mut score: i32 = match (layer, sublayer) {
        (Layer::Intent, Sublayer::Rule) => 9,
        (Layer::Myself, Sublayer::Identity) => 8,
        (Layer::Myself, Sublayer::Constraint) => 7,
        (Layer::Myself, Sublayer::Preference) => 6,
        (Layer::Intent, Sublayer::Goal) => 6,
        (Layer::Intent, Sublayer::AntiPattern) => 6,
        (Layer::World, Sublayer::Failure) => 5,
        (Layer::World, Sublayer::Method) => 4,
        (Layer::World, Sublayer::Fact) => 3,
        _ => 3,
    };

    if content.len() >= 200 {
        score += 1;
    }
    if contains_any_substr(&lower, &DECISION_VERBS) {
        score += 1;
    }
    if contains_any_substr(&lower, &CREDENTIAL_TOKENS) {
        score += 2;
    }

    score.clamp(1, 10) as u8
}

/// Run classification end-to-end, producing a [`Classification`].
#[must_use]
pub fn classify(content: &str) -> Classification {
    let layer_sublayer = classify_layer(content);
    let importance = compute_importance(layer_sublayer, content);
    Classification {
        layer: layer_sublayer.0,
        sublayer: layer_sublayer.1,
        importance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_case_imperatives_force_intent_rule() {
        let c = classify("NEVER commit secrets to the repository");
        assert_eq!(c.layer, Layer::Intent);
        assert_eq!(c.sublayer, Sublayer::Rule);
        assert!(c.importance >= 9, "importance was {}", c.importance);
    }

    #[test]
    fn lowercase_never_does_not_force_rule() {
        let (layer, sublayer) = classify_layer("i never liked mondays");
        // "never" lowercase matches the SELF.constraint branch, not the
        // uppercase-only intent.rule branch.
        assert_eq!((layer, sublayer), (Layer::Myself, Sublayer::Constraint));
    }

    #[test]
    fn preference_detection() {
        let (layer, sublayer) = classify_layer("User prefers 4 spaces for Python indentation");
        assert_eq!((layer, sublayer), (Layer::Myself, Sublayer::Preference));
    }

    #[test]
    fn failure_detection() {
        let (layer, sublayer) = classify_layer("The deploy script crashes when the config is missing");
        assert_eq!((layer, sublayer), (Layer::World, Sublayer::Failure));
    }

    #[test]
    fn default_is_world_fact() {
        let (layer, sublayer) = classify_layer("The mitochondria is the powerhouse of the cell");
        assert_eq!((layer, sublayer), (Layer::World, Sublayer::Fact));
    }

    #[test]
    fn importance_is_clamped() {
        let huge = "MUST ".to_string() + &"secret token password ".repeat(50);
        let c = classify(&huge);
        assert!(c.importance <= 10);
    }
}
