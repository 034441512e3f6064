//! Title/summary generation — direct port of
//! `original_source/src/utils/curation.py`'s truncation rules.

use crate::memory::{Layer, Sublayer};

const TITLE_MAX_LEN: usize = 90;
const TITLE_CORE_MAX_LEN: usize = 70;
const SUMMARY_MAX_LEN: usize = 200;

/// Collapse all runs of whitespace to single spaces and trim the ends.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove fenced code blocks (` ```...``` `, non-greedy, spanning lines).
#[must_use]
pub fn strip_codeblocks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("```") {
        out.push_str(&rest[..start]);
        out.push(' ');
        let after = &rest[start + 3..];
        match after.find("```") {
            Some(end) => rest = &after[end + 3..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Truncate `text` to at most `max_len` chars, appending an ellipsis if
/// truncated. Operates on `char`s, not bytes, so multi-byte UTF-8 is
/// never split mid-codepoint.
#[must_use]
pub fn truncate(text: &str, max_len: usize) -> String {
    let collapsed = collapse_whitespace(text);
    let chars: Vec<char> = collapsed.chars().collect();
    if chars.len() <= max_len {
        return collapsed;
    }
    if max_len == 0 {
        return String::new();
    }
    let cut: String = chars[..max_len - 1].iter().collect();
    format!("{}…", cut.trim_end())
}

/// The first sentence of `text`, splitting on `. `, `! `, `? ` boundaries.
#[must_use]
pub fn first_sentence(text: &str) -> String {
    let collapsed = collapse_whitespace(text);
    if collapsed.is_empty() {
        return String::new();
    }
    let cleaned = collapsed.replace("- ", "").replace("* ", "");

    let bytes = cleaned.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if matches!(b, b'.' | b'!' | b'?') {
            let boundary = i + 1;
            if cleaned[boundary..].starts_with(' ') || boundary == cleaned.len() {
                return cleaned[..boundary].trim().to_string();
            }
        }
    }
    cleaned.trim().to_string()
}

/// Generate a `<layer>.<sublayer>: <core>` title, truncated to 90 chars.
#[must_use]
pub fn generate_title(content: &str, layer: Layer, sublayer: Sublayer) -> String {
    let cleaned = collapse_whitespace(&strip_codeblocks(content));
    let words: Vec<&str> = cleaned.split(' ').filter(|w| !w.is_empty()).collect();
    let core_raw = if words.is_empty() {
        "Memory".to_string()
    } else {
        words.iter().take(10).copied().collect::<Vec<_>>().join(" ")
    };
    let core = truncate(&core_raw, TITLE_CORE_MAX_LEN);

    let title = if core.is_empty() {
        format!("{layer}.{sublayer}: Memory")
    } else {
        format!("{layer}.{sublayer}: {core}")
    };

    let truncated = truncate(&title, TITLE_MAX_LEN);
    if truncated.is_empty() {
        "Memory".to_string()
    } else {
        truncated
    }
}

/// Generate a first-sentence summary, truncated to 200 chars.
#[must_use]
pub fn generate_summary(content: &str) -> String {
    let cleaned = strip_codeblocks(content);
    let sentence = first_sentence(&cleaned);
    let basis = if sentence.is_empty() {
        collapse_whitespace(&cleaned)
    } else {
        sentence
    };
    truncate(&basis, SUMMARY_MAX_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_has_layer_sublayer_prefix() {
        let title = generate_title("Always write tests before shipping", Layer::Intent, Sublayer::Rule);
        assert!(title.starts_with("intent.rule: "));
        assert!(title.len() <= TITLE_MAX_LEN);
    }

    #[test]
    fn title_falls_back_to_memory_for_empty_content() {
        let title = generate_title("", Layer::World, Sublayer::Fact);
        assert_eq!(title, "world.fact: Memory");
    }

    #[test]
    fn summary_takes_first_sentence() {
        let summary = generate_summary("First sentence here. Second sentence should be dropped.");
        assert_eq!(summary, "First sentence here.");
    }

    #[test]
    fn summary_strips_code_fences() {
        let summary = generate_summary("Before. ```let x = 1;``` After.");
        assert_eq!(summary, "Before.");
    }

    #[test]
    fn truncate_adds_ellipsis() {
        let long = "a".repeat(300);
        let t = truncate(&long, 200);
        assert_eq!(t.chars().count(), 200);
        assert!(t.ends_with('…'));
    }

    #[test]
    fn truncate_is_noop_under_limit() {
        assert_eq!(truncate("short", 90), "short");
    }
}
