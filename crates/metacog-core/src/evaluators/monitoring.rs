//! Self-monitoring: does the model check, question and correct its own work?

use std::sync::Arc;

use super::{indicator, saturate, DimensionEvaluator, MetricSpec, SignalEvaluator};
use crate::dimension::Dimension;
use crate::error::ConfigError;
use crate::extract::SignalExtractor;
use crate::model::{DimensionKind, Problem};
use crate::results::DimensionResult;
use crate::signals::{SignalKind, SignalSet};
use crate::weights::DimensionWeights;

pub(super) const CATALOG: &[MetricSpec] = &[
    MetricSpec {
        name: "error_detection_rate",
        signals: &[SignalKind::SelfCorrectionMarker],
        measure: error_detection_rate,
    },
    MetricSpec {
        name: "verification_attempts",
        signals: &[SignalKind::VerificationAttempt],
        measure: verification_attempts,
    },
    MetricSpec {
        name: "alternative_solution_exploration",
        signals: &[SignalKind::AlternativeExplored],
        measure: alternative_solution_exploration,
    },
    MetricSpec {
        name: "assumption_declaration",
        signals: &[SignalKind::AssumptionDeclared],
        measure: assumption_declaration,
    },
];

pub struct SelfMonitoringEvaluator {
    inner: SignalEvaluator,
}

impl SelfMonitoringEvaluator {
    pub fn new(
        weights: &DimensionWeights,
        extractor: Arc<dyn SignalExtractor>,
    ) -> Result<Self, ConfigError> {
        let inner = SignalEvaluator::from_catalog(
            DimensionKind::SelfMonitoring,
            weights,
            CATALOG,
            extractor,
        )?;
        Ok(Self { inner })
    }
}

impl DimensionEvaluator for SelfMonitoringEvaluator {
    fn dimension(&self) -> &Dimension {
        self.inner.dimension()
    }

    fn required_signals(&self) -> &[SignalKind] {
        self.inner.required_signals()
    }

    fn evaluate(&self, problem: &Problem, response: Option<&str>) -> DimensionResult {
        self.inner.evaluate(problem, response)
    }
}

/// Whether a planted error was caught. Without a planted error there is
/// nothing to detect, unless the model corrected something on its own.
fn error_detection_rate(problem: &Problem, signals: &SignalSet) -> Option<f64> {
    let corrected = signals.flag(SignalKind::SelfCorrectionMarker)?;
    match problem.reference.contains_error {
        Some(true) => Some(indicator(corrected)),
        Some(false) => None,
        None => corrected.then_some(1.0),
    }
}

fn verification_attempts(_problem: &Problem, signals: &SignalSet) -> Option<f64> {
    signals
        .count(SignalKind::VerificationAttempt)
        .map(|n| saturate(n, 2))
}

fn alternative_solution_exploration(_problem: &Problem, signals: &SignalSet) -> Option<f64> {
    signals
        .count(SignalKind::AlternativeExplored)
        .map(|n| saturate(n, 2))
}

fn assumption_declaration(_problem: &Problem, signals: &SignalSet) -> Option<f64> {
    signals
        .count(SignalKind::AssumptionDeclared)
        .map(|n| saturate(n, 1))
}
