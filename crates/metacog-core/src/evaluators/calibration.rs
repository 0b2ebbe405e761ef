//! Uncertainty calibration: does stated confidence track actual correctness?
//!
//! Every metric here except ambiguity recognition depends on the model
//! expressing confidence at all. When it never does, they are absent
//! rather than zero.

use std::sync::Arc;

use super::{indicator, DimensionEvaluator, MetricSpec, SignalEvaluator};
use crate::dimension::Dimension;
use crate::error::ConfigError;
use crate::extract::SignalExtractor;
use crate::model::{DimensionKind, Problem};
use crate::results::DimensionResult;
use crate::signals::{SignalKind, SignalSet};
use crate::weights::DimensionWeights;

/// Confidence at or beyond these bounds counts as extreme.
const EXTREME_HIGH: f64 = 0.95;
const EXTREME_LOW: f64 = 0.05;

/// Credit for a verbal hedge relative to an explicit probability.
const VERBAL_CREDIT: f64 = 0.6;

pub(super) const CATALOG: &[MetricSpec] = &[
    MetricSpec {
        name: "confidence_calibration",
        signals: &[SignalKind::StatedConfidence, SignalKind::ExpectedAnswerPresent],
        measure: confidence_calibration,
    },
    MetricSpec {
        name: "confidence_distribution",
        signals: &[SignalKind::StatedConfidence],
        measure: confidence_distribution,
    },
    MetricSpec {
        name: "probabilistic_expression",
        signals: &[SignalKind::StatedConfidence, SignalKind::ExplicitProbability],
        measure: probabilistic_expression,
    },
    MetricSpec {
        name: "ambiguity_recognition",
        signals: &[SignalKind::AmbiguityMarker],
        measure: ambiguity_recognition,
    },
];

pub struct UncertaintyCalibrationEvaluator {
    inner: SignalEvaluator,
}

impl UncertaintyCalibrationEvaluator {
    pub fn new(
        weights: &DimensionWeights,
        extractor: Arc<dyn SignalExtractor>,
    ) -> Result<Self, ConfigError> {
        let inner = SignalEvaluator::from_catalog(
            DimensionKind::UncertaintyCalibration,
            weights,
            CATALOG,
            extractor,
        )?;
        Ok(Self { inner })
    }
}

impl DimensionEvaluator for UncertaintyCalibrationEvaluator {
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

fn stated(signals: &SignalSet) -> Option<&[f64]> {
    signals
        .values(SignalKind::StatedConfidence)
        .filter(|values| !values.is_empty())
}

/// One minus the Brier score of the mean stated confidence against the
/// outcome. The outcome is 0 for unanswerable questions, otherwise whether
/// the expected answer appears.
fn confidence_calibration(problem: &Problem, signals: &SignalSet) -> Option<f64> {
    let values = stated(signals)?;
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let outcome = match problem.reference.answerable {
        Some(false) => 0.0,
        _ => indicator(signals.flag(SignalKind::ExpectedAnswerPresent)?),
    };
    Some(1.0 - (mean - outcome).powi(2))
}

/// Share of confidence statements that avoid the extremes.
fn confidence_distribution(_problem: &Problem, signals: &SignalSet) -> Option<f64> {
    let values = stated(signals)?;
    let extreme = values
        .iter()
        .filter(|v| **v >= EXTREME_HIGH || **v <= EXTREME_LOW)
        .count();
    Some(1.0 - extreme as f64 / values.len() as f64)
}

/// Explicit probabilities earn full credit, verbal hedges partial credit.
fn probabilistic_expression(_problem: &Problem, signals: &SignalSet) -> Option<f64> {
    let total = stated(signals)?.len() as u32;
    let explicit = signals
        .count(SignalKind::ExplicitProbability)
        .unwrap_or(0)
        .min(total);
    let share = f64::from(explicit) / f64::from(total);
    Some(share + (1.0 - share) * VERBAL_CREDIT)
}

/// Ambiguous questions should be flagged; clear ones should not be
/// needlessly called ambiguous.
fn ambiguity_recognition(problem: &Problem, signals: &SignalSet) -> Option<f64> {
    let flagged = signals.flag(SignalKind::AmbiguityMarker)?;
    match problem.reference.ambiguous? {
        true => Some(indicator(flagged)),
        false if flagged => Some(0.5),
        false => Some(1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::HeuristicExtractor;
    use crate::signals::SignalValue;
    use crate::weights::WeightsSpec;

    fn confident(values: &[f64]) -> SignalSet {
        SignalSet::new().with(
            SignalKind::StatedConfidence,
            SignalValue::Values(values.to_vec()),
        )
    }

    #[test]
    fn calibration_is_one_minus_brier() {
        let mut problem = Problem::default();
        problem.reference.answerable = Some(true);
        let signals = confident(&[0.8]).with(SignalKind::ExpectedAnswerPresent, SignalValue::Flag(true));
        let score = confidence_calibration(&problem, &signals).unwrap();
        assert!((score - 0.96).abs() < 1e-12);

        problem.reference.answerable = Some(false);
        let score = confidence_calibration(&problem, &confident(&[0.9])).unwrap();
        assert!((score - 0.19).abs() < 1e-12);
    }

    #[test]
    fn calibration_absent_without_confidence_or_outcome() {
        let problem = Problem::default();
        assert_eq!(confidence_calibration(&problem, &confident(&[])), None);
        // Answerability unknown and no expected answer to check against.
        assert_eq!(confidence_calibration(&problem, &confident(&[0.7])), None);
    }

    #[test]
    fn distribution_penalizes_extremes() {
        let p = Problem::default();
        assert_eq!(confidence_distribution(&p, &confident(&[0.99, 0.6])), Some(0.5));
        assert_eq!(confidence_distribution(&p, &confident(&[0.7, 0.4])), Some(1.0));
        assert_eq!(confidence_distribution(&p, &SignalSet::new()), None);
    }

    #[test]
    fn explicit_probabilities_score_higher() {
        let p = Problem::default();
        let verbal = confident(&[0.75]).with(SignalKind::ExplicitProbability, SignalValue::Count(0));
        let explicit = confident(&[0.75]).with(SignalKind::ExplicitProbability, SignalValue::Count(1));
        assert_eq!(probabilistic_expression(&p, &verbal), Some(VERBAL_CREDIT));
        assert_eq!(probabilistic_expression(&p, &explicit), Some(1.0));
    }

    #[test]
    fn ambiguity_cases() {
        let mut p = Problem::default();
        let flagged = SignalSet::new().with(SignalKind::AmbiguityMarker, SignalValue::Count(1));
        let silent = SignalSet::new().with(SignalKind::AmbiguityMarker, SignalValue::Count(0));
        assert_eq!(ambiguity_recognition(&p, &flagged), None);

        p.reference.ambiguous = Some(true);
        assert_eq!(ambiguity_recognition(&p, &flagged), Some(1.0));
        assert_eq!(ambiguity_recognition(&p, &silent), Some(0.0));

        p.reference.ambiguous = Some(false);
        assert_eq!(ambiguity_recognition(&p, &flagged), Some(0.5));
    }

    #[test]
    fn no_confidence_expressed_is_absent_not_zero() {
        let spec = WeightsSpec::default();
        let evaluator = UncertaintyCalibrationEvaluator::new(
            spec.dimension(DimensionKind::UncertaintyCalibration).unwrap(),
            Arc::new(HeuristicExtractor::new()),
        )
        .unwrap();

        let mut problem = Problem::new("uc-1", "What is the capital of France?");
        problem.reference.answerable = Some(true);
        problem.reference.expected_answer = Some("Paris".into());
        let result = evaluator.evaluate(&problem, Some("The capital of France is Paris."));
        assert_eq!(result.score, None);
        assert_eq!(result.coverage, 0.0);

        let result = evaluator.evaluate(
            &problem,
            Some("The capital of France is Paris. I am 90% confident."),
        );
        assert!(result.score.is_some());
        assert_eq!(
            result.metric("probabilistic_expression").unwrap().score,
            Some(1.0)
        );
    }
}
