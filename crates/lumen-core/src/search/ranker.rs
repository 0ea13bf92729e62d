//! Threshold filtering and descending sort of scored candidates.

use std::cmp::Ordering;

use crate::types::{Candidate, ScoredCandidate};

/// Keep candidates scoring at least `min_score` and sort them best first.
///
/// The threshold is inclusive. NaN scores never pass. The sort is stable,
/// so equal scores keep the order they were scored in.
pub fn rank(scored: Vec<(Candidate, f64)>, min_score: f64) -> Vec<ScoredCandidate> {
    let mut results: Vec<ScoredCandidate> = scored
        .into_iter()
        .filter(|(_, score)| *score >= min_score)
        .map(|(candidate, score)| ScoredCandidate::new(candidate, score))
        .collect();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    results
}
