//! Label canonicalization: casefold → accent-strip → charset-filter →
//! whitespace-collapse → alias-resolve → stopword-drop → dedupe.
//!
//! No Unicode-normalization crate is pulled in (the teacher carries
//! none either) — accent stripping is a direct fold over the Latin-1
//! Supplement range, which covers the accented characters this spec's
//! inputs realistically contain.

use std::collections::HashSet;

/// Common English stopwords dropped during concept/label extraction.
pub const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "if", "then", "else", "for", "to", "of", "in", "on",
    "at", "by", "with", "from", "is", "are", "was", "were", "be", "been", "being", "this", "that",
    "these", "those", "it", "its", "as", "not", "no", "do", "does", "did", "has", "have", "had",
    "will", "would", "should", "could", "can", "may", "might", "must", "i", "you", "he", "she",
    "we", "they", "my", "your", "his", "her", "our", "their", "me", "him", "us", "them", "about",
    "into", "over", "under", "again", "further", "than", "so", "just", "also", "very", "never",
    "always",
];

/// Alias map applied during canonicalization (`js -> javascript`, etc.).
const ALIASES: &[(&str, &str)] = &[
    ("js", "javascript"),
    ("ts", "typescript"),
    ("db", "database"),
    ("k8s", "kubernetes"),
    ("py", "python"),
    ("rs", "rust"),
    ("repo", "repository"),
    ("config", "configuration"),
    ("auth", "authentication"),
];

fn strip_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => 'a',
        'è' | 'é' | 'ê' | 'ë' | 'ē' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'ī' => 'i',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ō' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' => 'u',
        'ý' | 'ÿ' => 'y',
        'ñ' => 'n',
        'ç' => 'c',
        'ß' => 's',
        other => other,
    }
}

fn casefold_and_strip_accents(s: &str) -> String {
    s.to_lowercase().chars().map(strip_accent).collect()
}

fn keep_allowed_chars(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || *c == ' ')
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn resolve_alias(label: &str) -> String {
    ALIASES
        .iter()
        .find(|(from, _)| *from == label)
        .map(|(_, to)| (*to).to_string())
        .unwrap_or_else(|| label.to_string())
}

/// Canonicalize a single label: casefold, accent-strip, charset-filter,
/// whitespace-collapse, alias-resolve. Idempotent — `canon(canon(x)) ==
/// canon(x)`.
#[must_use]
pub fn canonicalize_label(label: &str) -> String {
    let folded = casefold_and_strip_accents(label);
    let filtered = keep_allowed_chars(&folded);
    let collapsed = collapse_whitespace(&filtered);
    resolve_alias(&collapsed)
}

/// Canonicalize a list of labels: per-label canonicalization, stopword
/// drop, dedupe preserving first-seen order.
#[must_use]
pub fn canonicalize(labels: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for label in labels {
        let canon = canonicalize_label(label);
        if canon.is_empty() || STOPWORDS.contains(&canon.as_str()) {
            continue;
        }
        if seen.insert(canon.clone()) {
            out.push(canon);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotent() {
        let once = canonicalize_label("  Café  DB ");
        let twice = canonicalize_label(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn strips_accents_and_casefolds() {
        assert_eq!(canonicalize_label("Café"), "cafe");
    }

    #[test]
    fn resolves_aliases() {
        assert_eq!(canonicalize_label("js"), "javascript");
        assert_eq!(canonicalize_label("K8s"), "kubernetes");
    }

    #[test]
    fn dedupes_preserving_order() {
        let labels = vec!["Python".to_string(), "python".to_string(), "Rust".to_string()];
        assert_eq!(canonicalize(&labels), vec!["python".to_string(), "rust".to_string()]);
    }

    #[test]
    fn drops_stopwords() {
        let labels = vec!["the".to_string(), "database".to_string()];
        assert_eq!(canonicalize(&labels), vec!["database".to_string()]);
    }
}
