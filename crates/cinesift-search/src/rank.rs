//! Composite relevance scoring.
//!
//! Popularity and rating are min-max normalised over the candidate set,
//! similarity is used as returned by the store, and the three are combined
//! with fixed weights that sum to one.

use serde::{Deserialize, Serialize};

use cinesift_core::model::IndexMetadata;

pub const POPULARITY_WEIGHT: f64 = 0.5;
pub const RATING_WEIGHT: f64 = 0.2;
pub const SIMILARITY_WEIGHT: f64 = 0.3;

/// A displayable match awaiting a composite score.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub score: f64,
    pub metadata: IndexMetadata,
}

/// A match augmented with its composite rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub id: String,
    /// Similarity reported by the store, in `[0, 1]`.
    pub score: f64,
    pub metadata: IndexMetadata,
    pub total: f64,
}

/// Scale `values` to `[0, 1]` using `(v - min) / (max - min)`.
///
/// A degenerate range (every value equal, or no finite spread) maps every
/// value to 0.
#[must_use]
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    if !range.is_finite() || range <= 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

#[must_use]
pub fn composite_score(popularity: f64, rating: f64, similarity: f64) -> f64 {
    POPULARITY_WEIGHT * popularity + RATING_WEIGHT * rating + SIMILARITY_WEIGHT * similarity
}

/// Score and order candidates, best first.
///
/// The sort is stable, so candidates with equal totals keep the order the
/// store returned them in.
#[must_use]
pub fn rank(candidates: Vec<Candidate>) -> Vec<ScoredResult> {
    let popularity: Vec<f64> = candidates.iter().map(|c| c.metadata.popularity).collect();
    let rating: Vec<f64> = candidates.iter().map(|c| c.metadata.vote_average).collect();
    let popularity = min_max_normalize(&popularity);
    let rating = min_max_normalize(&rating);

    let mut results: Vec<ScoredResult> = candidates
        .into_iter()
        .zip(popularity.into_iter().zip(rating))
        .map(|(candidate, (pop, rate))| ScoredResult {
            total: composite_score(pop, rate, candidate.score),
            id: candidate.id,
            score: candidate.score,
            metadata: candidate.metadata,
        })
        .collect();

    results.sort_by(|a, b| b.total.total_cmp(&a.total));
    results
}
