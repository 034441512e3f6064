//! Near-duplicate grouping (`spec.md` §4.3 step 5), ported from
//! `original_source/src/core/deduplication.py::_find_duplicate_groups`:
//! a single forward scan where each unvisited candidate seeds a group
//! and absorbs every later unvisited candidate within the threshold of
//! the *seed* — not a transitive closure.

use crate::embeddings::cosine_similarity;

const DUPLICATE_THRESHOLD: f32 = 0.95;

/// Group candidate indices `0..embeddings.len()` by cosine similarity
/// to a seed-anchored threshold. Every index appears in exactly one
/// group.
#[must_use]
pub fn find_duplicate_groups(embeddings: &[Vec<f32>]) -> Vec<Vec<usize>> {
    let n = embeddings.len();
    let mut visited = vec![false; n];
    let mut groups = Vec::new();

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;
        let mut group = vec![i];
        for j in (i + 1)..n {
            if visited[j] {
                continue;
            }
            if cosine_similarity(&embeddings[i], &embeddings[j]) >= DUPLICATE_THRESHOLD {
                visited[j] = true;
                group.push(j);
            }
        }
        groups.push(group);
    }

    groups
}
