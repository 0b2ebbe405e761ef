//! Evaluation result types.
//!
//! These are produced fresh by every evaluation and never mutated by the
//! core afterwards.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate, Aggregate};
use crate::model::DimensionKind;

/// Score of one metric in one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    pub name: String,
    pub weight: f64,
    /// `None` when the metric could not be measured.
    pub score: Option<f64>,
}

/// Aggregated score of one dimension in one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionResult {
    pub dimension: DimensionKind,
    /// Top-level weight of this dimension.
    pub weight: f64,
    /// Renormalized metric aggregate, `None` if no metric was measured.
    pub score: Option<f64>,
    /// Fraction of metric weight backed by a present score.
    pub coverage: f64,
    /// Per-metric scores in declaration order.
    pub metrics: Vec<MetricScore>,
}

impl DimensionResult {
    /// Aggregate metric scores into a dimension result.
    pub fn from_metrics(dimension: DimensionKind, weight: f64, metrics: Vec<MetricScore>) -> Self {
        let Aggregate { score, coverage } = aggregate(metrics.iter().map(|m| (m.weight, m.score)));
        Self {
            dimension,
            weight,
            score,
            coverage,
            metrics,
        }
    }

    /// Look up a metric score by name.
    pub fn metric(&self, name: &str) -> Option<&MetricScore> {
        self.metrics.iter().find(|m| m.name == name)
    }
}

/// The full score report for one (problem, response) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub problem_id: String,
    /// Renormalized dimension aggregate, `None` if nothing was measurable.
    pub overall_score: Option<f64>,
    /// Fraction of dimension weight backed by a present dimension score.
    pub coverage: f64,
    /// Whether the LLM returned a response at all.
    pub response_available: bool,
    /// Per-dimension results in declaration order.
    pub dimensions: Vec<DimensionResult>,
    pub timestamp: DateTime<Utc>,
}

impl EvaluationResult {
    pub fn dimension(&self, kind: DimensionKind) -> Option<&DimensionResult> {
        self.dimensions.iter().find(|d| d.dimension == kind)
    }

    /// Dimension name → score.
    pub fn dimension_scores(&self) -> BTreeMap<DimensionKind, Option<f64>> {
        self.dimensions
            .iter()
            .map(|d| (d.dimension, d.score))
            .collect()
    }

    /// (dimension, metric) → score.
    pub fn metric_scores(&self) -> BTreeMap<(DimensionKind, String), Option<f64>> {
        self.dimensions
            .iter()
            .flat_map(|d| {
                d.metrics
                    .iter()
                    .map(move |m| ((d.dimension, m.name.clone()), m.score))
            })
            .collect()
    }

    /// Score of a single metric, `None` if unknown or absent.
    pub fn metric_score(&self, kind: DimensionKind, metric: &str) -> Option<f64> {
        self.dimension(kind)?.metric(metric)?.score
    }

    /// Coverage weighted down to the metric level: Σ wᵈ·coverageᵈ / Σ wᵈ.
    ///
    /// Unlike [`coverage`](Self::coverage) this distinguishes a dimension
    /// backed by one metric from one backed by all of them.
    pub fn metric_coverage(&self) -> f64 {
        let total: f64 = self.dimensions.iter().map(|d| d.weight).sum();
        if total <= 0.0 {
            return 0.0;
        }
        self.dimensions
            .iter()
            .map(|d| d.weight * d.coverage)
            .sum::<f64>()
            / total
    }
}
