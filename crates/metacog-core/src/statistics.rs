//! Summary statistics over a batch of evaluation results.
//!
//! Pure post-processing: nothing here feeds back into scoring.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::DimensionKind;
use crate::results::EvaluationResult;

/// Statistics over the overall scores of a batch.
///
/// Results with an absent overall score count towards `count` but are
/// excluded from the score moments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub count: usize,
    /// Results with a present overall score.
    pub scored: usize,
    /// Results whose LLM call failed.
    pub unavailable: usize,
    pub mean: Option<f64>,
    /// Population variance.
    pub variance: Option<f64>,
    pub std_dev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean_coverage: f64,
    pub per_dimension: BTreeMap<DimensionKind, DimensionStats>,
}

/// Per-dimension statistics over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionStats {
    pub scored: usize,
    pub mean: Option<f64>,
    pub mean_coverage: f64,
}

/// Summarize a batch of results.
pub fn summarize(results: &[EvaluationResult]) -> SummaryStats {
    let scores: Vec<f64> = results.iter().filter_map(|r| r.overall_score).collect();
    let (mean, variance) = match moments(&scores) {
        Some((mean, variance)) => (Some(mean), Some(variance)),
        None => (None, None),
    };

    let mut per_dimension = BTreeMap::new();
    for kind in DimensionKind::ALL {
        let dims: Vec<_> = results.iter().filter_map(|r| r.dimension(kind)).collect();
        if dims.is_empty() {
            continue;
        }
        let scores: Vec<f64> = dims.iter().filter_map(|d| d.score).collect();
        per_dimension.insert(
            kind,
            DimensionStats {
                scored: scores.len(),
                mean: moments(&scores).map(|(m, _)| m),
                mean_coverage: average(dims.iter().map(|d| d.coverage)),
            },
        );
    }

    SummaryStats {
        count: results.len(),
        scored: scores.len(),
        unavailable: results.iter().filter(|r| !r.response_available).count(),
        mean,
        variance,
        std_dev: variance.map(f64::sqrt),
        min: scores.iter().copied().reduce(f64::min),
        max: scores.iter().copied().reduce(f64::max),
        mean_coverage: average(results.iter().map(|r| r.coverage)),
        per_dimension,
    }
}

/// Mean and population variance, `None` for an empty sample.
fn moments(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance))
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}
