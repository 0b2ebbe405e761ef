//! Domain adaptation: does the model answer like a practitioner of the field?

use std::sync::Arc;

use super::{indicator, DimensionEvaluator, MetricSpec, SignalEvaluator};
use crate::dimension::Dimension;
use crate::error::ConfigError;
use crate::extract::SignalExtractor;
use crate::model::{DimensionKind, Problem};
use crate::results::DimensionResult;
use crate::signals::{SignalKind, SignalSet};
use crate::weights::DimensionWeights;

pub(super) const CATALOG: &[MetricSpec] = &[
    MetricSpec {
        name: "domain_recognition",
        signals: &[SignalKind::DomainMentioned],
        measure: domain_recognition,
    },
    MetricSpec {
        name: "terminology_precision",
        signals: &[SignalKind::DomainTermsUsed],
        measure: terminology_precision,
    },
    MetricSpec {
        name: "method_selection",
        signals: &[SignalKind::MethodsMentioned],
        measure: method_selection,
    },
    MetricSpec {
        name: "expert_mimicry",
        signals: &[
            SignalKind::DomainTermsUsed,
            SignalKind::ReasoningSteps,
            SignalKind::CausalConnective,
        ],
        measure: expert_mimicry,
    },
];

pub struct DomainAdaptationEvaluator {
    inner: SignalEvaluator,
}

impl DomainAdaptationEvaluator {
    pub fn new(
        weights: &DimensionWeights,
        extractor: Arc<dyn SignalExtractor>,
    ) -> Result<Self, ConfigError> {
        let inner = SignalEvaluator::from_catalog(
            DimensionKind::DomainAdaptation,
            weights,
            CATALOG,
            extractor,
        )?;
        Ok(Self { inner })
    }
}

impl DimensionEvaluator for DomainAdaptationEvaluator {
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

fn domain_recognition(_problem: &Problem, signals: &SignalSet) -> Option<f64> {
    signals.flag(SignalKind::DomainMentioned).map(indicator)
}

fn share_of(found: &[String], expected: &[String]) -> Option<f64> {
    if expected.is_empty() {
        return None;
    }
    Some((found.len() as f64 / expected.len() as f64).min(1.0))
}

/// Share of the reference vocabulary the response uses.
fn terminology_precision(problem: &Problem, signals: &SignalSet) -> Option<f64> {
    let used = signals.terms(SignalKind::DomainTermsUsed)?;
    share_of(used, &problem.reference.domain_terms)
}

fn method_selection(problem: &Problem, signals: &SignalSet) -> Option<f64> {
    let mentioned = signals.terms(SignalKind::MethodsMentioned)?;
    share_of(mentioned, &problem.reference.expected_methods)
}

/// Share of three expert traits present: field vocabulary, more than one
/// reasoning step, and explicit causal links.
fn expert_mimicry(_problem: &Problem, signals: &SignalSet) -> Option<f64> {
    let terms = signals.count(SignalKind::DomainTermsUsed)?;
    let steps = signals.count(SignalKind::ReasoningSteps)?;
    let causal = signals.count(SignalKind::CausalConnective)?;
    let traits = [terms >= 1, steps >= 2, causal >= 1];
    let present = traits.iter().filter(|t| **t).count();
    Some(present as f64 / traits.len() as f64)
}
