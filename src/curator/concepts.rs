//! Concept extraction — tokenize, score, take the top few (`spec.md`
//! §4.1, scoring formula resolved verbatim).

use std::collections::HashMap;

use super::canonicalize::STOPWORDS;

/// Tokens that bump a candidate's score because they read as
/// technical/domain terms rather than ordinary prose.
const TECH_TERMS: &[&str] = &[
    "api", "database", "db", "python", "rust", "javascript", "typescript", "sql", "docker",
    "kubernetes", "git", "linux", "server", "client", "backend", "frontend", "cache", "queue",
    "token", "auth", "oauth", "schema", "migration", "endpoint", "webhook", "container", "cluster",
    "embedding", "vector", "index", "repository", "deployment", "pipeline", "config",
];

fn tokenize(content: &str) -> Vec<String> {
    content
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Extract up to `max_concepts` canonical concept labels from `content`.
#[must_use]
pub fn extract_concepts(content: &str, max_concepts: usize) -> Vec<String> {
    let tokens = tokenize(content);
    if tokens.is_empty() {
        return Vec::new();
    }
    let total = tokens.len();

    let mut frequency: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    for (idx, tok) in tokens.iter().enumerate() {
        if tok.len() < 3 || STOPWORDS.contains(&tok.as_str()) {
            continue;
        }
        *frequency.entry(tok.as_str()).or_insert(0) += 1;
        first_seen.entry(tok.as_str()).or_insert(idx);
    }

    let mut scored: Vec<(&str, f64, usize)> = frequency
        .iter()
        .map(|(&tok, &freq)| {
            let position = first_seen[tok];
            let relative_position = position as f64 / total as f64;
            let tech_bonus = if TECH_TERMS.contains(&tok) { 1.0 } else { 0.0 };
            let score = freq as f64 + 0.3 * (1.0 - relative_position) + 2.0 * tech_bonus;
            (tok, score, position)
        })
        .collect();

    // Highest score first; ties broken by first-occurrence order.
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.2.cmp(&b.2))
    });

    scored
        .into_iter()
        .take(max_concepts)
        .map(|(tok, _, _)| tok.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_tech_terms_over_plain_words() {
        let concepts = extract_concepts(
            "We discussed the database schema and then talked about lunch plans for a while",
            5,
        );
        assert!(concepts.contains(&"database".to_string()));
    }

    #[test]
    fn caps_at_max_concepts() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let concepts = extract_concepts(text, 5);
        assert!(concepts.len() <= 5);
    }

    #[test]
    fn scenario_secrets_and_repository_survive_stopword_removal() {
        let concepts = extract_concepts("NEVER commit secrets to the repository", 5);
        assert!(concepts.contains(&"secrets".to_string()));
        assert!(concepts.contains(&"repository".to_string()));
    }

    #[test]
    fn empty_content_yields_no_concepts() {
        assert!(extract_concepts("", 5).is_empty());
    }
}
