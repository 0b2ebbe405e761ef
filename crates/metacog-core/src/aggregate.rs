//! Weighted aggregation with renormalization over present scores.
//!
//! The same rule applies at both levels of the hierarchy (metrics into a
//! dimension, dimensions into the framework score):
//!
//! ```text
//! score    = Σ wᵢ·sᵢ / Σ wᵢ      over items with a present score
//! coverage = Σ present wᵢ / Σ all wᵢ
//! ```
//!
//! When nothing is present the score is absent, never 0 or 1.

use serde::{Deserialize, Serialize};

/// Tolerance for a weight group summing to 1.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Result of aggregating a group of weighted, possibly absent scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    /// Renormalized weighted mean, or `None` if no item had a score.
    pub score: Option<f64>,
    /// Fraction of the group's weight backed by a present score.
    pub coverage: f64,
}

impl Aggregate {
    /// The aggregate of a group where nothing could be measured.
    pub const ABSENT: Aggregate = Aggregate {
        score: None,
        coverage: 0.0,
    };

    /// Returns `true` if every item in the group had a score.
    pub fn is_complete(&self) -> bool {
        self.score.is_some() && (self.coverage - 1.0).abs() <= WEIGHT_TOLERANCE
    }
}

/// Aggregate `(weight, score)` pairs.
///
/// Scores are expected in `[0, 1]`; the result is a convex combination of
/// them and therefore stays in `[0, 1]` as well.
pub fn aggregate<I>(items: I) -> Aggregate
where
    I: IntoIterator<Item = (f64, Option<f64>)>,
{
    let mut total_weight = 0.0;
    let mut present_weight = 0.0;
    let mut weighted_sum = 0.0;

    for (weight, score) in items {
        total_weight += weight;
        if let Some(score) = score {
            present_weight += weight;
            weighted_sum += weight * score;
        }
    }

    if present_weight <= 0.0 {
        // Zero-weight items may carry scores, but they cannot back an aggregate.
        return Aggregate::ABSENT;
    }

    let score = weighted_sum / present_weight;
    debug_assert!(
        (-WEIGHT_TOLERANCE..=1.0 + WEIGHT_TOLERANCE).contains(&score),
        "aggregate {score} escaped [0, 1]"
    );

    Aggregate {
        score: Some(score.clamp(0.0, 1.0)),
        coverage: (present_weight / total_weight).clamp(0.0, 1.0),
    }
}

/// Returns `true` if `sum` is within tolerance of 1.
pub fn sums_to_one(sum: f64) -> bool {
    (sum - 1.0).abs() <= WEIGHT_TOLERANCE
}
