//! Agent trust score

use guardian_core::DEFAULT_TRUST_SCORE;

/// Trust is the complement of the mean of recent risk scores, rounded to two
/// decimals. With no history the agent keeps the default trust.
pub fn trust_from_scores(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return DEFAULT_TRUST_SCORE;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let trust = (1.0 - mean).clamp(0.0, 1.0);
    (trust * 100.0).round() / 100.0
}
