//! Weights specification: dimension → weight, and within each dimension,
//! metric → weight.
//!
//! ```toml
//! [dimensions.knowledge_awareness]
//! weight = 0.25
//!
//! [dimensions.knowledge_awareness.metrics]
//! knowledge_boundary_recognition = 0.30
//! source_attribution = 0.25
//! ```
//!
//! Metric order in the file is the declaration order used in reports.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::aggregate::{sums_to_one, WEIGHT_TOLERANCE};
use crate::error::ConfigError;
use crate::metric::check_weight;
use crate::model::DimensionKind;

/// The full weight tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightsSpec {
    pub dimensions: BTreeMap<String, DimensionWeights>,
}

/// Weight of one dimension and of each of its metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionWeights {
    pub weight: f64,
    pub metrics: MetricWeights,
}

/// Metric name → weight, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricWeights(IndexMap<String, f64>);

impl MetricWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a metric's weight. A new name goes last; an existing one keeps its place.
    pub fn insert(&mut self, name: impl Into<String>, weight: f64) {
        self.0.insert(name.into(), weight);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(n, w)| (n.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.0.values().sum()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for MetricWeights {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(n, w)| (n.into(), w)).collect())
    }
}

impl WeightsSpec {
    /// Parse a weights specification from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse weights TOML")
    }

    /// Load a weights specification from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read weights file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("invalid weights file: {}", path.display()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize weights")
    }

    pub fn dimension(&self, kind: DimensionKind) -> Option<&DimensionWeights> {
        self.dimensions.get(kind.as_str())
    }

    /// Check the structure of the tree.
    ///
    /// Every one of the five dimensions must be present exactly once, every
    /// weight must lie in `[0, 1]` and each sibling group must sum to 1.
    /// Metric names are checked against the evaluator catalogs later, when
    /// the framework is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (name, dimension) in &self.dimensions {
            let kind: DimensionKind = name
                .parse()
                .map_err(|_| ConfigError::UnknownDimension(name.clone()))?;
            if !seen.insert(kind) {
                return Err(ConfigError::DuplicateDimension(name.clone()));
            }
            check_weight(name, dimension.weight)?;
            if dimension.metrics.is_empty() {
                return Err(ConfigError::EmptyDimension(name.clone()));
            }
            for (metric, weight) in dimension.metrics.iter() {
                check_weight(&format!("{name}.{metric}"), weight)?;
            }
            let sum = dimension.metrics.sum();
            if !sums_to_one(sum) {
                return Err(ConfigError::WeightSum {
                    group: format!("{name} metrics"),
                    sum,
                    tolerance: WEIGHT_TOLERANCE,
                });
            }
        }

        if let Some(missing) = DimensionKind::ALL.iter().find(|k| !seen.contains(*k)) {
            return Err(ConfigError::MissingDimension(missing.to_string()));
        }

        let sum: f64 = self.dimensions.values().map(|d| d.weight).sum();
        if !sums_to_one(sum) {
            return Err(ConfigError::WeightSum {
                group: "dimensions".into(),
                sum,
                tolerance: WEIGHT_TOLERANCE,
            });
        }
        Ok(())
    }
}

impl Default for WeightsSpec {
    fn default() -> Self {
        let table: [(DimensionKind, f64, &[(&str, f64)]); 5] = [
            (
                DimensionKind::KnowledgeAwareness,
                0.25,
                &[
                    ("knowledge_boundary_recognition", 0.30),
                    ("source_attribution", 0.25),
                    ("temporal_awareness", 0.25),
                    ("hallucination_rate", 0.20),
                ],
            ),
            (
                DimensionKind::ReasoningQuality,
                0.25,
                &[
                    ("logical_consistency", 0.25),
                    ("inference_validity", 0.25),
                    ("step_completeness", 0.20),
                    ("evidence_utilization", 0.15),
                    ("causal_reasoning", 0.15),
                ],
            ),
            (
                DimensionKind::UncertaintyCalibration,
                0.20,
                &[
                    ("confidence_calibration", 0.35),
                    ("confidence_distribution", 0.25),
                    ("probabilistic_expression", 0.25),
                    ("ambiguity_recognition", 0.15),
                ],
            ),
            (
                DimensionKind::SelfMonitoring,
                0.15,
                &[
                    ("error_detection_rate", 0.30),
                    ("verification_attempts", 0.25),
                    ("alternative_solution_exploration", 0.25),
                    ("assumption_declaration", 0.20),
                ],
            ),
            (
                DimensionKind::DomainAdaptation,
                0.15,
                &[
                    ("domain_recognition", 0.25),
                    ("terminology_precision", 0.25),
                    ("method_selection", 0.25),
                    ("expert_mimicry", 0.25),
                ],
            ),
        ];

        let dimensions = table
            .into_iter()
            .map(|(kind, weight, metrics)| {
                (
                    kind.as_str().to_string(),
                    DimensionWeights {
                        weight,
                        metrics: metrics.iter().copied().collect(),
                    },
                )
            })
            .collect();
        Self { dimensions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let spec = WeightsSpec::default();
        spec.validate().unwrap();
        assert_eq!(spec.dimensions.len(), 5);
        let ka = spec.dimension(DimensionKind::KnowledgeAwareness).unwrap();
        assert_eq!(ka.metrics.get("source_attribution"), Some(0.25));
    }

    #[test]
    fn toml_preserves_metric_order() {
        let spec = WeightsSpec::default();
        let text = spec.to_toml_string().unwrap();
        assert!(text.contains("[dimensions.knowledge_awareness.metrics]"));

        let parsed = WeightsSpec::from_toml_str(&text).unwrap();
        assert_eq!(parsed, spec);
        let names: Vec<_> = parsed
            .dimension(DimensionKind::ReasoningQuality)
            .unwrap()
            .metrics
            .iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(
            names,
            [
                "logical_consistency",
                "inference_validity",
                "step_completeness",
                "evidence_utilization",
                "causal_reasoning"
            ]
        );
    }

    #[test]
    fn rejects_dimension_sum_off_by_a_hundredth() {
        let mut spec = WeightsSpec::default();
        spec.dimensions.get_mut("domain_adaptation").unwrap().weight = 0.14;
        let err = spec.validate().unwrap_err();
        assert!(matches!(err, ConfigError::WeightSum { ref group, .. } if group == "dimensions"));
    }

    #[test]
    fn accepts_sum_within_tolerance() {
        let mut spec = WeightsSpec::default();
        spec.dimensions.get_mut("domain_adaptation").unwrap().weight = 0.1500001;
        spec.validate().unwrap();
    }

    #[test]
    fn rejects_unknown_and_missing_dimensions() {
        let mut spec = WeightsSpec::default();
        let moved = spec.dimensions.remove("self_monitoring").unwrap();
        assert_eq!(
            spec.validate().unwrap_err(),
            ConfigError::MissingDimension("self_monitoring".into())
        );

        spec.dimensions.insert("telepathy".into(), moved);
        assert_eq!(
            spec.validate().unwrap_err(),
            ConfigError::UnknownDimension("telepathy".into())
        );
    }

    #[test]
    fn rejects_out_of_range_metric_weight() {
        let toml = r#"
            [dimensions.knowledge_awareness]
            weight = 0.25
            [dimensions.knowledge_awareness.metrics]
            knowledge_boundary_recognition = 1.5
            source_attribution = -0.5
        "#;
        let mut spec = WeightsSpec::default();
        let parsed = WeightsSpec::from_toml_str(toml).unwrap();
        spec.dimensions.extend(parsed.dimensions);
        assert!(matches!(
            spec.validate().unwrap_err(),
            ConfigError::WeightOutOfRange { .. }
        ));
    }

    #[test]
    fn load_reports_path_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.toml");
        std::fs::write(&path, "dimensions = 3").unwrap();
        let err = WeightsSpec::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("weights.toml"));
    }
}
