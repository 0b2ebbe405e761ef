//! A weighted group of metrics.

use std::collections::HashSet;

use crate::aggregate::{sums_to_one, WEIGHT_TOLERANCE};
use crate::error::ConfigError;
use crate::metric::{check_weight, Metric};
use crate::model::{DimensionKind, Problem};
use crate::results::{DimensionResult, MetricScore};
use crate::signals::SignalSet;

/// One of the five dimensions together with its metrics.
///
/// Constructed once from the weights specification and immutable afterwards.
#[derive(Debug, Clone)]
pub struct Dimension {
    kind: DimensionKind,
    weight: f64,
    metrics: Vec<Metric>,
}

impl Dimension {
    /// Validate and build a dimension.
    ///
    /// Metric names must be unique, the group must be non-empty and the
    /// metric weights must sum to 1 within [`WEIGHT_TOLERANCE`].
    pub fn new(kind: DimensionKind, weight: f64, metrics: Vec<Metric>) -> Result<Self, ConfigError> {
        check_weight(kind.as_str(), weight)?;
        if metrics.is_empty() {
            return Err(ConfigError::EmptyDimension(kind.to_string()));
        }

        let mut seen = HashSet::new();
        for metric in &metrics {
            if !seen.insert(metric.name()) {
                return Err(ConfigError::DuplicateMetric {
                    dimension: kind.to_string(),
                    metric: metric.name().to_string(),
                });
            }
        }

        let sum: f64 = metrics.iter().map(Metric::weight).sum();
        if !sums_to_one(sum) {
            return Err(ConfigError::WeightSum {
                group: format!("{kind} metrics"),
                sum,
                tolerance: WEIGHT_TOLERANCE,
            });
        }

        Ok(Self {
            kind,
            weight,
            metrics,
        })
    }

    pub fn kind(&self) -> DimensionKind {
        self.kind
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Score every metric and aggregate them.
    pub fn score(&self, problem: &Problem, signals: &SignalSet) -> DimensionResult {
        let metrics = self
            .metrics
            .iter()
            .map(|metric| metric.score(problem, signals))
            .collect();
        DimensionResult::from_metrics(self.kind, self.weight, metrics)
    }

    /// A result where no metric could be measured.
    pub fn absent(&self) -> DimensionResult {
        let metrics = self
            .metrics
            .iter()
            .map(|metric| MetricScore {
                name: metric.name().to_string(),
                weight: metric.weight(),
                score: None,
            })
            .collect();
        DimensionResult::from_metrics(self.kind, self.weight, metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(name: &str, weight: f64, score: Option<f64>) -> Metric {
        Metric::new(name, weight, move |_, _| score).unwrap()
    }

    #[test]
    fn rejects_bad_metric_sums() {
        let err = Dimension::new(
            DimensionKind::SelfMonitoring,
            0.2,
            vec![fixed("a", 0.5, None), fixed("b", 0.49, None)],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::WeightSum { .. }));
    }

    #[test]
    fn rejects_duplicates_and_empty_groups() {
        let err = Dimension::new(
            DimensionKind::SelfMonitoring,
            0.2,
            vec![fixed("a", 0.5, None), fixed("a", 0.5, None)],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateMetric { .. }));

        let err = Dimension::new(DimensionKind::SelfMonitoring, 0.2, vec![]).unwrap_err();
        assert_eq!(err, ConfigError::EmptyDimension("self_monitoring".into()));
    }

    #[test]
    fn scores_in_declaration_order() {
        let dimension = Dimension::new(
            DimensionKind::ReasoningQuality,
            0.25,
            vec![fixed("z", 0.6, Some(0.8)), fixed("a", 0.4, None)],
        )
        .unwrap();
        let result = dimension.score(&Problem::default(), &SignalSet::new());
        let names: Vec<_> = result.metrics.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["z", "a"]);
        assert!((result.score.unwrap() - 0.8).abs() < 1e-12);
        assert!((result.coverage - 0.6).abs() < 1e-12);
    }

    #[test]
    fn absent_result_lists_every_metric() {
        let dimension = Dimension::new(
            DimensionKind::DomainAdaptation,
            0.15,
            vec![fixed("a", 0.5, Some(1.0)), fixed("b", 0.5, Some(1.0))],
        )
        .unwrap();
        let result = dimension.absent();
        assert_eq!(result.score, None);
        assert_eq!(result.coverage, 0.0);
        assert_eq!(result.metrics.len(), 2);
        assert!(result.metrics.iter().all(|m| m.score.is_none()));
    }
}
