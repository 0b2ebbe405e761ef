//! Per-dimension evaluators.
//!
//! Each evaluator owns a [`Dimension`], the signal kinds its metrics read,
//! and a shared [`SignalExtractor`]. The five built-in evaluators select
//! their metrics by name from a static catalog of measurement functions;
//! the weights specification decides which catalog entries participate.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::dimension::Dimension;
use crate::error::ConfigError;
use crate::extract::SignalExtractor;
use crate::metric::Metric;
use crate::model::{DimensionKind, Problem};
use crate::results::DimensionResult;
use crate::signals::{SignalKind, SignalSet};
use crate::weights::DimensionWeights;

mod calibration;
mod domain;
mod knowledge;
mod monitoring;
mod reasoning;

pub use calibration::UncertaintyCalibrationEvaluator;
pub use domain::DomainAdaptationEvaluator;
pub use knowledge::KnowledgeAwarenessEvaluator;
pub use monitoring::SelfMonitoringEvaluator;
pub use reasoning::ReasoningQualityEvaluator;

/// Common contract of all dimension evaluators.
pub trait DimensionEvaluator: Send + Sync {
    /// The dimension this evaluator scores, with its weights.
    fn dimension(&self) -> &Dimension;

    /// Signal kinds the participating metrics read.
    fn required_signals(&self) -> &[SignalKind];

    /// Score one (problem, response) pair.
    ///
    /// `None` or a blank response yields every metric absent and coverage 0.
    fn evaluate(&self, problem: &Problem, response: Option<&str>) -> DimensionResult;

    fn kind(&self) -> DimensionKind {
        self.dimension().kind()
    }
}

/// One entry in an evaluator's metric catalog.
#[derive(Debug, Clone, Copy)]
pub struct MetricSpec {
    pub name: &'static str,
    /// Signals the measurement reads.
    pub signals: &'static [SignalKind],
    pub measure: fn(&Problem, &SignalSet) -> Option<f64>,
}

/// Extract-then-score evaluator over an arbitrary [`Dimension`].
///
/// The built-in evaluators wrap one of these; it can also be used directly
/// to plug custom metrics into a [`Framework`](crate::framework::Framework).
pub struct SignalEvaluator {
    dimension: Dimension,
    signals: Vec<SignalKind>,
    extractor: Arc<dyn SignalExtractor>,
}

impl SignalEvaluator {
    pub fn new(
        dimension: Dimension,
        signals: impl IntoIterator<Item = SignalKind>,
        extractor: Arc<dyn SignalExtractor>,
    ) -> Self {
        let signals: BTreeSet<_> = signals.into_iter().collect();
        Self {
            dimension,
            signals: signals.into_iter().collect(),
            extractor,
        }
    }

    /// Select metrics from `catalog` by the names in `weights`.
    pub fn from_catalog(
        kind: DimensionKind,
        weights: &DimensionWeights,
        catalog: &[MetricSpec],
        extractor: Arc<dyn SignalExtractor>,
    ) -> Result<Self, ConfigError> {
        let mut metrics = Vec::with_capacity(weights.metrics.len());
        let mut signals = Vec::new();
        for (name, weight) in weights.metrics.iter() {
            let spec = catalog
                .iter()
                .find(|spec| spec.name == name)
                .ok_or_else(|| ConfigError::UnknownMetric {
                    dimension: kind.to_string(),
                    metric: name.to_string(),
                })?;
            metrics.push(Metric::new(spec.name, weight, spec.measure)?);
            signals.extend_from_slice(spec.signals);
        }
        let dimension = Dimension::new(kind, weights.weight, metrics)?;
        Ok(Self::new(dimension, signals, extractor))
    }
}

impl DimensionEvaluator for SignalEvaluator {
    fn dimension(&self) -> &Dimension {
        &self.dimension
    }

    fn required_signals(&self) -> &[SignalKind] {
        &self.signals
    }

    fn evaluate(&self, problem: &Problem, response: Option<&str>) -> DimensionResult {
        let Some(response) = response.filter(|r| !r.trim().is_empty()) else {
            tracing::debug!(dimension = %self.dimension.kind(), problem = %problem.id, "no response, all metrics absent");
            return self.dimension.absent();
        };
        let signals = self.extractor.extract(problem, response, &self.signals);
        self.dimension.score(problem, &signals)
    }
}

/// Build the built-in evaluator for `kind`.
pub fn build(
    kind: DimensionKind,
    weights: &DimensionWeights,
    extractor: Arc<dyn SignalExtractor>,
) -> Result<Box<dyn DimensionEvaluator>, ConfigError> {
    Ok(match kind {
        DimensionKind::KnowledgeAwareness => {
            Box::new(KnowledgeAwarenessEvaluator::new(weights, extractor)?)
        }
        DimensionKind::ReasoningQuality => {
            Box::new(ReasoningQualityEvaluator::new(weights, extractor)?)
        }
        DimensionKind::UncertaintyCalibration => {
            Box::new(UncertaintyCalibrationEvaluator::new(weights, extractor)?)
        }
        DimensionKind::SelfMonitoring => Box::new(SelfMonitoringEvaluator::new(weights, extractor)?),
        DimensionKind::DomainAdaptation => {
            Box::new(DomainAdaptationEvaluator::new(weights, extractor)?)
        }
    })
}

/// Names of every metric the built-in catalog offers for `kind`.
pub fn catalog_names(kind: DimensionKind) -> Vec<&'static str> {
    let catalog = match kind {
        DimensionKind::KnowledgeAwareness => knowledge::CATALOG,
        DimensionKind::ReasoningQuality => reasoning::CATALOG,
        DimensionKind::UncertaintyCalibration => calibration::CATALOG,
        DimensionKind::SelfMonitoring => monitoring::CATALOG,
        DimensionKind::DomainAdaptation => domain::CATALOG,
    };
    catalog.iter().map(|spec| spec.name).collect()
}

/// `count / target`, capped at 1.
pub(crate) fn saturate(count: u32, target: u32) -> f64 {
    if target == 0 {
        return 1.0;
    }
    (f64::from(count) / f64::from(target)).min(1.0)
}

pub(crate) fn indicator(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::HeuristicExtractor;
    use crate::weights::{MetricWeights, WeightsSpec};

    fn extractor() -> Arc<dyn SignalExtractor> {
        Arc::new(HeuristicExtractor::new())
    }

    #[test]
    fn default_weights_only_name_catalog_metrics() {
        let spec = WeightsSpec::default();
        for kind in DimensionKind::ALL {
            let names = catalog_names(kind);
            for (metric, _) in spec.dimension(kind).unwrap().metrics.iter() {
                assert!(names.contains(&metric), "{kind}: {metric}");
            }
        }
    }

    #[test]
    fn unknown_metric_is_a_config_error() {
        let weights = DimensionWeights {
            weight: 0.25,
            metrics: MetricWeights::from_iter([("telepathy", 1.0)]),
        };
        let err = build(DimensionKind::ReasoningQuality, &weights, extractor())
            .err()
            .unwrap();
        assert_eq!(
            err,
            ConfigError::UnknownMetric {
                dimension: "reasoning_quality".into(),
                metric: "telepathy".into()
            }
        );
    }

    #[test]
    fn subset_of_catalog_selects_signals() {
        let weights = DimensionWeights {
            weight: 0.25,
            metrics: MetricWeights::from_iter([("step_completeness", 1.0)]),
        };
        let evaluator = build(DimensionKind::ReasoningQuality, &weights, extractor()).unwrap();
        assert_eq!(evaluator.required_signals(), [SignalKind::ReasoningSteps]);
        assert_eq!(evaluator.kind(), DimensionKind::ReasoningQuality);
        assert_eq!(evaluator.dimension().metrics().len(), 1);
    }

    #[test]
    fn blank_response_is_fully_absent() {
        let spec = WeightsSpec::default();
        for kind in DimensionKind::ALL {
            let evaluator = build(kind, spec.dimension(kind).unwrap(), extractor()).unwrap();
            let problem = Problem::new("p", "q");
            for response in [None, Some(""), Some("   \n")] {
                let result = evaluator.evaluate(&problem, response);
                assert_eq!(result.score, None, "{kind}");
                assert_eq!(result.coverage, 0.0);
                assert!(result.metrics.iter().all(|m| m.score.is_none()));
            }
        }
    }

    #[test]
    fn custom_metric_through_signal_evaluator() {
        let metric = Metric::new("steps", 1.0, |_, signals: &SignalSet| {
            signals
                .count(SignalKind::ReasoningSteps)
                .map(|n| saturate(n, 2))
        })
        .unwrap();
        let dimension = Dimension::new(DimensionKind::ReasoningQuality, 1.0, vec![metric]).unwrap();
        let evaluator = SignalEvaluator::new(dimension, [SignalKind::ReasoningSteps], extractor());
        let result = evaluator.evaluate(
            &Problem::new("p", "q"),
            Some("First, add the numbers. Second, divide by two."),
        );
        assert_eq!(result.score, Some(1.0));
    }

    #[test]
    fn saturate_caps_at_one() {
        assert_eq!(saturate(0, 2), 0.0);
        assert_eq!(saturate(1, 2), 0.5);
        assert_eq!(saturate(5, 2), 1.0);
        assert_eq!(saturate(3, 0), 1.0);
    }
}
