//! Authority score — a decaying, access-reinforced confidence measure
//! fed straight into the retrieval engine's `authority` signal
//! (`spec.md` §4.1, §4.3; resolves Open Question 2).

/// Weight given to the curator's own importance rating.
const W_IMPORTANCE: f64 = 0.35;
/// Weight given to access frequency (log-compressed).
const W_ACCESS: f64 = 0.25;
/// Weight given to recency of creation.
const W_CREATED: f64 = 0.20;
/// Weight given to recency of last access.
const W_ACCESSED: f64 = 0.20;

/// Access count beyond which the access-frequency term saturates at 1.0.
const ACCESS_SATURATION: f64 = 50.0;
/// Decay rate applied to days since creation.
const CREATED_DECAY_RATE: f64 = 0.007;
/// Decay rate applied to days since last access.
const ACCESSED_DECAY_RATE: f64 = 0.05;

/// Compute an authority score in `[0, 1]`, rounded to 3 decimal places.
///
/// `0.35·(importance/10) + 0.25·min(1, ln(access_count+1)/ln(50)) +
/// 0.20·e^(-0.007·days_created) + 0.20·e^(-0.05·days_accessed)`
#[must_use]
pub fn compute_authority(
    importance: u8,
    access_count: u64,
    days_since_created: f64,
    days_since_accessed: f64,
) -> f64 {
    let importance_term = f64::from(importance) / 10.0;

    let access_term = (((access_count as f64) + 1.0).ln() / ACCESS_SATURATION.ln()).min(1.0);

    let created_term = (-CREATED_DECAY_RATE * days_since_created.max(0.0)).exp();
    let accessed_term = (-ACCESSED_DECAY_RATE * days_since_accessed.max(0.0)).exp();

    let score = W_IMPORTANCE * importance_term
        + W_ACCESS * access_term
        + W_CREATED * created_term
        + W_ACCESSED * accessed_term;

    (score.clamp(0.0, 1.0) * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_high_importance_memory_scores_highly() {
        let score = compute_authority(10, 0, 0.0, 0.0);
        assert!(score > 0.75, "score was {score}");
    }

    #[test]
    fn score_is_bounded() {
        let score = compute_authority(10, 10_000, 0.0, 0.0);
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn decays_with_age() {
        let fresh = compute_authority(5, 5, 0.0, 0.0);
        let stale = compute_authority(5, 5, 365.0, 365.0);
        assert!(stale < fresh);
    }

    #[test]
    fn access_frequency_saturates() {
        let at_saturation = compute_authority(5, 49, 10.0, 10.0);
        let beyond = compute_authority(5, 5_000, 10.0, 10.0);
        assert!(beyond >= at_saturation);
        assert!(beyond - at_saturation < 0.05);
    }

    #[test]
    fn never_negative() {
        let score = compute_authority(1, 0, 10_000.0, 10_000.0);
        assert!(score >= 0.0);
    }
}
