//! Reasoning quality: is the answer reached through explicit, connected steps?

use std::sync::Arc;

use super::{saturate, DimensionEvaluator, MetricSpec, SignalEvaluator};
use crate::dimension::Dimension;
use crate::error::ConfigError;
use crate::extract::SignalExtractor;
use crate::model::{DimensionKind, Problem};
use crate::results::DimensionResult;
use crate::signals::{SignalKind, SignalSet};
use crate::weights::DimensionWeights;

/// Steps expected when the problem does not say.
const DEFAULT_EXPECTED_STEPS: u32 = 3;

pub(super) const CATALOG: &[MetricSpec] = &[
    MetricSpec {
        name: "logical_consistency",
        signals: &[SignalKind::ConflictingVerdicts, SignalKind::SelfCorrectionMarker],
        measure: logical_consistency,
    },
    MetricSpec {
        name: "inference_validity",
        signals: &[
            SignalKind::ReasoningSteps,
            SignalKind::CausalConnective,
            SignalKind::Conditional,
        ],
        measure: inference_validity,
    },
    MetricSpec {
        name: "step_completeness",
        signals: &[SignalKind::ReasoningSteps],
        measure: step_completeness,
    },
    MetricSpec {
        name: "evidence_utilization",
        signals: &[SignalKind::EvidenceMarker, SignalKind::CitationPresent],
        measure: evidence_utilization,
    },
    MetricSpec {
        name: "causal_reasoning",
        signals: &[SignalKind::CausalConnective],
        measure: causal_reasoning,
    },
];

pub struct ReasoningQualityEvaluator {
    inner: SignalEvaluator,
}

impl ReasoningQualityEvaluator {
    pub fn new(
        weights: &DimensionWeights,
        extractor: Arc<dyn SignalExtractor>,
    ) -> Result<Self, ConfigError> {
        let inner = SignalEvaluator::from_catalog(
            DimensionKind::ReasoningQuality,
            weights,
            CATALOG,
            extractor,
        )?;
        Ok(Self { inner })
    }
}

impl DimensionEvaluator for ReasoningQualityEvaluator {
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

/// A response that both affirms and denies loses the point, unless it
/// visibly corrects itself.
fn logical_consistency(_problem: &Problem, signals: &SignalSet) -> Option<f64> {
    let conflicting = signals.flag(SignalKind::ConflictingVerdicts)?;
    if !conflicting {
        return Some(1.0);
    }
    let corrected = signals
        .flag(SignalKind::SelfCorrectionMarker)
        .unwrap_or(false);
    Some(if corrected { 0.5 } else { 0.0 })
}

/// Explicit inferential links per step transition.
fn inference_validity(_problem: &Problem, signals: &SignalSet) -> Option<f64> {
    let steps = signals.count(SignalKind::ReasoningSteps)?;
    let links = signals.count(SignalKind::CausalConnective)?
        + signals.count(SignalKind::Conditional).unwrap_or(0);
    Some(saturate(links, steps.saturating_sub(1).max(1)))
}

fn step_completeness(problem: &Problem, signals: &SignalSet) -> Option<f64> {
    let steps = signals.count(SignalKind::ReasoningSteps)?;
    let expected = problem
        .reference
        .expected_steps
        .unwrap_or(DEFAULT_EXPECTED_STEPS)
        .max(1);
    Some(saturate(steps, expected))
}

fn evidence_utilization(_problem: &Problem, signals: &SignalSet) -> Option<f64> {
    let evidence = signals.count(SignalKind::EvidenceMarker)?;
    let citations = signals.count(SignalKind::CitationPresent).unwrap_or(0);
    Some(saturate(evidence + citations, 2))
}

fn causal_reasoning(_problem: &Problem, signals: &SignalSet) -> Option<f64> {
    signals
        .count(SignalKind::CausalConnective)
        .map(|n| saturate(n, 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::HeuristicExtractor;
    use crate::signals::SignalValue;
    use crate::weights::WeightsSpec;

    fn counts(pairs: &[(SignalKind, u32)]) -> SignalSet {
        pairs.iter().fold(SignalSet::new(), |set, (kind, n)| {
            set.with(*kind, SignalValue::Count(*n))
        })
    }

    #[test]
    fn consistency_penalizes_unrepaired_contradiction() {
        let p = Problem::default();
        let clean = SignalSet::new().with(SignalKind::ConflictingVerdicts, SignalValue::Flag(false));
        assert_eq!(logical_consistency(&p, &clean), Some(1.0));

        let conflicted = SignalSet::new().with(SignalKind::ConflictingVerdicts, SignalValue::Flag(true));
        assert_eq!(logical_consistency(&p, &conflicted), Some(0.0));

        let repaired = conflicted.with(SignalKind::SelfCorrectionMarker, SignalValue::Count(1));
        assert_eq!(logical_consistency(&p, &repaired), Some(0.5));
    }

    #[test]
    fn inference_needs_links_between_steps() {
        let p = Problem::default();
        let signals = counts(&[
            (SignalKind::ReasoningSteps, 5),
            (SignalKind::CausalConnective, 1),
            (SignalKind::Conditional, 1),
        ]);
        assert_eq!(inference_validity(&p, &signals), Some(0.5));

        let single = counts(&[
            (SignalKind::ReasoningSteps, 1),
            (SignalKind::CausalConnective, 0),
        ]);
        assert_eq!(inference_validity(&p, &single), Some(0.0));
    }

    #[test]
    fn step_completeness_uses_expected_steps() {
        let mut p = Problem::default();
        let signals = counts(&[(SignalKind::ReasoningSteps, 2)]);
        assert!((step_completeness(&p, &signals).unwrap() - 2.0 / 3.0).abs() < 1e-12);

        p.reference.expected_steps = Some(2);
        assert_eq!(step_completeness(&p, &signals), Some(1.0));

        p.reference.expected_steps = Some(0);
        assert_eq!(step_completeness(&p, &signals), Some(1.0));
    }

    #[test]
    fn evidence_and_causal_saturate() {
        let p = Problem::default();
        let signals = counts(&[
            (SignalKind::EvidenceMarker, 1),
            (SignalKind::CitationPresent, 4),
            (SignalKind::CausalConnective, 1),
        ]);
        assert_eq!(evidence_utilization(&p, &signals), Some(1.0));
        assert_eq!(causal_reasoning(&p, &signals), Some(0.5));
        assert_eq!(causal_reasoning(&p, &SignalSet::new()), None);
    }

    #[test]
    fn evaluates_stepwise_answer() {
        let spec = WeightsSpec::default();
        let evaluator = ReasoningQualityEvaluator::new(
            spec.dimension(DimensionKind::ReasoningQuality).unwrap(),
            Arc::new(HeuristicExtractor::new()),
        )
        .unwrap();

        let problem = Problem::new("rq-1", "A train covers 120 km in 2 hours. What is its speed?");
        let response = "1. The distance is 120 km.\n\
                        2. The time is 2 hours, therefore we divide distance by time.\n\
                        3. Because 120 / 2 = 60, the speed is 60 km/h.";
        let result = evaluator.evaluate(&problem, Some(response));

        assert_eq!(result.metric("step_completeness").unwrap().score, Some(1.0));
        assert_eq!(result.metric("logical_consistency").unwrap().score, Some(1.0));
        assert_eq!(result.metric("causal_reasoning").unwrap().score, Some(1.0));
        assert_eq!(result.coverage, 1.0);
        let score = result.score.unwrap();
        assert!(score > 0.7 && score <= 1.0, "{score}");
    }
}
