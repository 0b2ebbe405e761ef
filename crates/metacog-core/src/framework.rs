//! The top of the scoring hierarchy.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::aggregate::{aggregate, sums_to_one, WEIGHT_TOLERANCE};
use crate::error::ConfigError;
use crate::evaluators::{self, DimensionEvaluator};
use crate::extract::{HeuristicExtractor, SignalExtractor};
use crate::model::{DimensionKind, Problem};
use crate::results::EvaluationResult;
use crate::weights::{DimensionWeights, WeightsSpec};

/// Owns the five dimension evaluators and combines their scores.
///
/// Built once from a validated [`WeightsSpec`] and shared read-only,
/// typically behind an `Arc`, across every evaluation in a batch.
pub struct Framework {
    evaluators: BTreeMap<DimensionKind, Box<dyn DimensionEvaluator>>,
}

impl Framework {
    /// Build the built-in evaluators from a weights specification.
    pub fn new(
        weights: &WeightsSpec,
        extractor: Arc<dyn SignalExtractor>,
    ) -> Result<Self, ConfigError> {
        weights.validate()?;
        let evaluators = DimensionKind::ALL
            .into_iter()
            .map(|kind| {
                let dimension = weights
                    .dimension(kind)
                    .ok_or_else(|| ConfigError::MissingDimension(kind.to_string()))?;
                evaluators::build(kind, dimension, Arc::clone(&extractor))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_evaluators(evaluators)
    }

    /// Default weights with the heuristic extractor.
    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::new(&WeightsSpec::default(), Arc::new(HeuristicExtractor::new()))
    }

    /// Assemble a framework from arbitrary evaluators.
    ///
    /// Exactly one evaluator per dimension is required and their dimension
    /// weights must sum to 1.
    pub fn from_evaluators(
        evaluators: Vec<Box<dyn DimensionEvaluator>>,
    ) -> Result<Self, ConfigError> {
        let mut map = BTreeMap::new();
        for evaluator in evaluators {
            let kind = evaluator.kind();
            if map.insert(kind, evaluator).is_some() {
                return Err(ConfigError::DuplicateDimension(kind.to_string()));
            }
        }
        if let Some(missing) = DimensionKind::ALL.iter().find(|k| !map.contains_key(*k)) {
            return Err(ConfigError::MissingDimension(missing.to_string()));
        }

        let sum: f64 = map.values().map(|e| e.dimension().weight()).sum();
        if !sums_to_one(sum) {
            return Err(ConfigError::WeightSum {
                group: "dimensions".into(),
                sum,
                tolerance: WEIGHT_TOLERANCE,
            });
        }

        Ok(Self { evaluators: map })
    }

    /// Evaluators in dimension order.
    pub fn evaluators(&self) -> impl Iterator<Item = &dyn DimensionEvaluator> {
        self.evaluators.values().map(|e| e.as_ref())
    }

    /// The effective weight tree.
    pub fn weights(&self) -> WeightsSpec {
        let dimensions = self
            .evaluators
            .iter()
            .map(|(kind, evaluator)| {
                let dimension = evaluator.dimension();
                (
                    kind.as_str().to_string(),
                    DimensionWeights {
                        weight: dimension.weight(),
                        metrics: dimension
                            .metrics()
                            .iter()
                            .map(|m| (m.name().to_string(), m.weight()))
                            .collect(),
                    },
                )
            })
            .collect();
        WeightsSpec { dimensions }
    }

    /// Score one pair, stamped with the current time.
    ///
    /// `response` is `None` when the LLM could not be reached.
    pub fn evaluate(&self, problem: &Problem, response: Option<&str>) -> EvaluationResult {
        self.evaluate_at(problem, response, Utc::now())
    }

    /// Score one pair with an explicit timestamp.
    ///
    /// Identical inputs give identical results.
    pub fn evaluate_at(
        &self,
        problem: &Problem,
        response: Option<&str>,
        timestamp: DateTime<Utc>,
    ) -> EvaluationResult {
        let dimensions: Vec<_> = self
            .evaluators
            .values()
            .map(|evaluator| evaluator.evaluate(problem, response))
            .collect();
        let overall = aggregate(dimensions.iter().map(|d| (d.weight, d.score)));

        tracing::debug!(
            problem = %problem.id,
            overall = ?overall.score,
            coverage = overall.coverage,
            "evaluated"
        );

        EvaluationResult {
            problem_id: problem.id.clone(),
            overall_score: overall.score,
            coverage: overall.coverage,
            response_available: response.is_some(),
            dimensions,
            timestamp,
        }
    }

    /// Score a batch of pairs that already have responses.
    pub fn evaluate_all<'a, I>(&self, pairs: I) -> Vec<EvaluationResult>
    where
        I: IntoIterator<Item = (&'a Problem, Option<&'a str>)>,
    {
        pairs
            .into_iter()
            .map(|(problem, response)| self.evaluate(problem, response))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::Dimension;
    use crate::evaluators::SignalEvaluator;
    use crate::metric::Metric;

    const WEIGHTS: [f64; 5] = [0.25, 0.25, 0.20, 0.15, 0.15];

    /// Five dimensions, each with one metric returning `score`.
    fn fixed_framework(weights: [f64; 5], scores: [Option<f64>; 5]) -> Result<Framework, ConfigError> {
        let extractor: Arc<dyn SignalExtractor> = Arc::new(HeuristicExtractor::new());
        let evaluators = DimensionKind::ALL
            .into_iter()
            .zip(weights)
            .zip(scores)
            .map(|((kind, weight), score)| {
                let metric = Metric::new("only", 1.0, move |_, _| score)?;
                let dimension = Dimension::new(kind, weight, vec![metric])?;
                let evaluator: Box<dyn DimensionEvaluator> =
                    Box::new(SignalEvaluator::new(dimension, [], Arc::clone(&extractor)));
                Ok(evaluator)
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Framework::from_evaluators(evaluators)
    }

    fn problem() -> Problem {
        Problem::new("p-1", "Is the Great Wall of China visible from space?")
    }

    #[test]
    fn all_ones_and_all_zeros() {
        let ones = fixed_framework(WEIGHTS, [Some(1.0); 5]).unwrap();
        let result = ones.evaluate(&problem(), Some("anything"));
        assert_eq!(result.overall_score, Some(1.0));
        assert_eq!(result.coverage, 1.0);

        let zeros = fixed_framework(WEIGHTS, [Some(0.0); 5]).unwrap();
        assert_eq!(
            zeros.evaluate(&problem(), Some("anything")).overall_score,
            Some(0.0)
        );
    }

    #[test]
    fn renormalizes_over_absent_dimensions() {
        let framework =
            fixed_framework(WEIGHTS, [Some(0.8), None, None, None, Some(0.4)]).unwrap();
        let result = framework.evaluate(&problem(), Some("anything"));
        let expected = (0.25 * 0.8 + 0.15 * 0.4) / 0.40;
        assert!((result.overall_score.unwrap() - expected).abs() < 1e-12);
        assert!((result.coverage - 0.40).abs() < 1e-12);
    }

    #[test]
    fn dimension_weight_tolerance() {
        let err = fixed_framework([0.25, 0.25, 0.20, 0.15, 0.14], [None; 5])
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::WeightSum { .. }));

        fixed_framework([0.25, 0.25, 0.20, 0.15, 0.1500001], [None; 5]).unwrap();
    }

    #[test]
    fn requires_every_dimension_once() {
        let extractor: Arc<dyn SignalExtractor> = Arc::new(HeuristicExtractor::new());
        let spec = WeightsSpec::default();
        let build = |kind| {
            evaluators::build(kind, spec.dimension(kind).unwrap(), Arc::clone(&extractor)).unwrap()
        };

        let err = Framework::from_evaluators(vec![build(DimensionKind::KnowledgeAwareness)])
            .err()
            .unwrap();
        assert_eq!(err, ConfigError::MissingDimension("reasoning_quality".into()));

        let mut all: Vec<_> = DimensionKind::ALL.into_iter().map(build).collect();
        all.push(build(DimensionKind::SelfMonitoring));
        let err = Framework::from_evaluators(all).err().unwrap();
        assert_eq!(err, ConfigError::DuplicateDimension("self_monitoring".into()));
    }

    #[test]
    fn unavailable_response_is_fully_absent() {
        let framework = Framework::with_defaults().unwrap();
        let result = framework.evaluate(&problem(), None);
        assert!(!result.response_available);
        assert_eq!(result.overall_score, None);
        assert_eq!(result.coverage, 0.0);
        assert_eq!(result.dimensions.len(), 5);
        assert!(result.dimensions.iter().all(|d| d.coverage == 0.0));
    }

    #[test]
    fn evaluation_is_idempotent() {
        let framework = Framework::with_defaults().unwrap();
        let mut problem = problem();
        problem.reference.answerable = Some(true);
        problem.reference.expected_answer = Some("no".into());
        let response = "No, it is a common misconception. I'm 90% confident, \
                        because the wall is narrow and similar in colour to its surroundings.";
        let at = Utc::now();
        let first = framework.evaluate_at(&problem, Some(response), at);
        let second = framework.evaluate_at(&problem, Some(response), at);
        assert_eq!(first, second);
    }

    #[test]
    fn results_follow_dimension_order() {
        let framework = Framework::with_defaults().unwrap();
        let result = framework.evaluate(&problem(), Some("Yes."));
        let order: Vec<_> = result.dimensions.iter().map(|d| d.dimension).collect();
        assert_eq!(order, DimensionKind::ALL);
    }

    #[test]
    fn weights_round_trip_through_framework() {
        let framework = Framework::with_defaults().unwrap();
        assert_eq!(framework.weights(), WeightsSpec::default());
    }

    #[test]
    fn invalid_spec_is_rejected() {
        let mut spec = WeightsSpec::default();
        spec.dimensions
            .get_mut("knowledge_awareness")
            .unwrap()
            .metrics
            .insert("telepathy", 0.0);
        let err = Framework::new(&spec, Arc::new(HeuristicExtractor::new()))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::UnknownMetric { .. }));
    }

    #[test]
    fn batch_scores_each_pair() {
        let framework = fixed_framework(WEIGHTS, [Some(0.5); 5]).unwrap();
        let a = Problem::new("a", "q");
        let b = Problem::new("b", "q");
        let results = framework.evaluate_all([(&a, Some("x")), (&b, None)]);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].overall_score, Some(0.5));
        assert_eq!(results[1].overall_score, None);
    }
}
