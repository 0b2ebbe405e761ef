//! Knowledge awareness: does the model know what it knows?

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
        name: "knowledge_boundary_recognition",
        signals: &[SignalKind::KnowledgeBoundary],
        measure: knowledge_boundary_recognition,
    },
    MetricSpec {
        name: "source_attribution",
        signals: &[SignalKind::CorrectSourceCited, SignalKind::AlternativeSourceCited],
        measure: source_attribution,
    },
    MetricSpec {
        name: "temporal_awareness",
        signals: &[SignalKind::TemporalLimitation, SignalKind::KnowledgeBoundary],
        measure: temporal_awareness,
    },
    MetricSpec {
        name: "hallucination_rate",
        signals: &[SignalKind::AssertedStatements, SignalKind::RejectedStatements],
        measure: hallucination_rate,
    },
];

pub struct KnowledgeAwarenessEvaluator {
    inner: SignalEvaluator,
}

impl KnowledgeAwarenessEvaluator {
    pub fn new(
        weights: &DimensionWeights,
        extractor: Arc<dyn SignalExtractor>,
    ) -> Result<Self, ConfigError> {
        let inner = SignalEvaluator::from_catalog(
            DimensionKind::KnowledgeAwareness,
            weights,
            CATALOG,
            extractor,
        )?;
        Ok(Self { inner })
    }
}

impl DimensionEvaluator for KnowledgeAwarenessEvaluator {
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

/// Unanswerable: 1 for admitting the limit, 0 for answering anyway.
/// Answerable: 1 for answering, 0.5 for an unnecessary refusal.
fn knowledge_boundary_recognition(problem: &Problem, signals: &SignalSet) -> Option<f64> {
    let admitted = signals.flag(SignalKind::KnowledgeBoundary)?;
    match problem.reference.answerable? {
        false => Some(indicator(admitted)),
        true if admitted => Some(0.5),
        true => Some(1.0),
    }
}

/// 0.6 for citing the correct source near the fact, 0.4 for not pinning it
/// on a wrong one.
fn source_attribution(_problem: &Problem, signals: &SignalSet) -> Option<f64> {
    let correct = signals.flag(SignalKind::CorrectSourceCited)?;
    let misattributed = signals
        .flag(SignalKind::AlternativeSourceCited)
        .unwrap_or(false);
    Some(0.6 * indicator(correct) + 0.4 * indicator(!misattributed))
}

/// After the cutoff the model should flag its training limit; before it,
/// it should answer without hedging about what it knows.
fn temporal_awareness(problem: &Problem, signals: &SignalSet) -> Option<f64> {
    let reference = &problem.reference;
    let event = reference.event_date?;
    let cutoff = reference.knowledge_cutoff?;
    if event > cutoff {
        signals.flag(SignalKind::TemporalLimitation).map(indicator)
    } else {
        signals
            .flag(SignalKind::KnowledgeBoundary)
            .map(|hedged| indicator(!hedged))
    }
}

/// Fraction of mentioned reference statements handled correctly: true
/// ones asserted, false ones rejected. Higher is better.
fn hallucination_rate(problem: &Problem, signals: &SignalSet) -> Option<f64> {
    let asserted = signals.terms(SignalKind::AssertedStatements)?;
    let rejected = signals.terms(SignalKind::RejectedStatements)?;
    let mentioned = asserted.len() + rejected.len();
    if mentioned == 0 {
        return None;
    }

    let truth = |text: &str| {
        problem
            .reference
            .statements
            .iter()
            .find(|s| s.text == text)
            .map(|s| s.correct)
    };
    let right = asserted
        .iter()
        .filter(|t| truth(t.as_str()) == Some(true))
        .count()
        + rejected
            .iter()
            .filter(|t| truth(t.as_str()) == Some(false))
            .count();
    Some(right as f64 / mentioned as f64)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::extract::HeuristicExtractor;
    use crate::model::Statement;
    use crate::signals::SignalValue;
    use crate::weights::WeightsSpec;

    fn unanswerable() -> Problem {
        let mut problem = Problem::new("ka-1", "What did Caesar eat on his 30th birthday?");
        problem.reference.answerable = Some(false);
        problem
    }

    #[test]
    fn boundary_recognition_cases() {
        let admitted = SignalSet::new().with(SignalKind::KnowledgeBoundary, SignalValue::Count(1));
        let silent = SignalSet::new().with(SignalKind::KnowledgeBoundary, SignalValue::Count(0));

        let problem = unanswerable();
        assert_eq!(knowledge_boundary_recognition(&problem, &admitted), Some(1.0));
        assert_eq!(knowledge_boundary_recognition(&problem, &silent), Some(0.0));

        let mut problem = Problem::new("ka-2", "What is 2 + 2?");
        problem.reference.answerable = Some(true);
        assert_eq!(knowledge_boundary_recognition(&problem, &admitted), Some(0.5));
        assert_eq!(knowledge_boundary_recognition(&problem, &silent), Some(1.0));

        problem.reference.answerable = None;
        assert_eq!(knowledge_boundary_recognition(&problem, &silent), None);
    }

    #[test]
    fn source_attribution_blend() {
        let signals = SignalSet::new()
            .with(SignalKind::CorrectSourceCited, SignalValue::Flag(true))
            .with(SignalKind::AlternativeSourceCited, SignalValue::Flag(false));
        assert_eq!(source_attribution(&Problem::default(), &signals), Some(1.0));

        let signals = SignalSet::new()
            .with(SignalKind::CorrectSourceCited, SignalValue::Flag(false))
            .with(SignalKind::AlternativeSourceCited, SignalValue::Flag(true));
        assert_eq!(source_attribution(&Problem::default(), &signals), Some(0.0));

        assert_eq!(source_attribution(&Problem::default(), &SignalSet::new()), None);
    }

    #[test]
    fn temporal_awareness_depends_on_cutoff() {
        let mut problem = Problem::new("ka-3", "Who won the 2030 World Cup?");
        problem.reference.knowledge_cutoff = NaiveDate::from_ymd_opt(2024, 4, 1);
        problem.reference.event_date = NaiveDate::from_ymd_opt(2030, 7, 21);

        let flagged = SignalSet::new()
            .with(SignalKind::TemporalLimitation, SignalValue::Count(1))
            .with(SignalKind::KnowledgeBoundary, SignalValue::Count(1));
        assert_eq!(temporal_awareness(&problem, &flagged), Some(1.0));

        problem.reference.event_date = NaiveDate::from_ymd_opt(2018, 7, 15);
        assert_eq!(temporal_awareness(&problem, &flagged), Some(0.0));

        problem.reference.event_date = None;
        assert_eq!(temporal_awareness(&problem, &flagged), None);
    }

    #[test]
    fn hallucination_rate_counts_correct_handling() {
        let mut problem = Problem::new("ka-4", "Tell me about the Great Wall.");
        problem.reference.statements = vec![
            Statement {
                text: "visible from space".into(),
                correct: false,
            },
            Statement {
                text: "built over centuries".into(),
                correct: true,
            },
        ];
        let signals = SignalSet::new()
            .with(
                SignalKind::AssertedStatements,
                SignalValue::Terms(vec!["built over centuries".into(), "visible from space".into()]),
            )
            .with(SignalKind::RejectedStatements, SignalValue::Terms(vec![]));
        assert_eq!(hallucination_rate(&problem, &signals), Some(0.5));

        let none_mentioned = SignalSet::new()
            .with(SignalKind::AssertedStatements, SignalValue::Terms(vec![]))
            .with(SignalKind::RejectedStatements, SignalValue::Terms(vec![]));
        assert_eq!(hallucination_rate(&problem, &none_mentioned), None);
    }

    #[test]
    fn evaluates_a_refusal_on_unanswerable_question() {
        let spec = WeightsSpec::default();
        let evaluator = KnowledgeAwarenessEvaluator::new(
            spec.dimension(DimensionKind::KnowledgeAwareness).unwrap(),
            Arc::new(HeuristicExtractor::new()),
        )
        .unwrap();

        let result = evaluator.evaluate(
            &unanswerable(),
            Some("I don't know. There is no historical record of that meal."),
        );
        assert_eq!(
            result.metric("knowledge_boundary_recognition").unwrap().score,
            Some(1.0)
        );
        // No source, dates or statements in the reference data.
        assert_eq!(result.score, Some(1.0));
        assert!((result.coverage - 0.30).abs() < 1e-9);
    }
}
