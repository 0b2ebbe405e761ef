//! Core data model types for metacog.
//!
//! Problems, the reference data metrics score against, problem sets, and the
//! five fixed dimensions of metacognitive competence.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One of the five weighted facets of metacognitive competence.
///
/// The derived ordering is the declaration order and is used wherever
/// dimensions are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    KnowledgeAwareness,
    ReasoningQuality,
    UncertaintyCalibration,
    SelfMonitoring,
    DomainAdaptation,
}

impl DimensionKind {
    /// All dimensions in declaration order.
    pub const ALL: [DimensionKind; 5] = [
        DimensionKind::KnowledgeAwareness,
        DimensionKind::ReasoningQuality,
        DimensionKind::UncertaintyCalibration,
        DimensionKind::SelfMonitoring,
        DimensionKind::DomainAdaptation,
    ];

    /// The configuration key for this dimension.
    pub fn as_str(self) -> &'static str {
        match self {
            DimensionKind::KnowledgeAwareness => "knowledge_awareness",
            DimensionKind::ReasoningQuality => "reasoning_quality",
            DimensionKind::UncertaintyCalibration => "uncertainty_calibration",
            DimensionKind::SelfMonitoring => "self_monitoring",
            DimensionKind::DomainAdaptation => "domain_adaptation",
        }
    }

    /// Human-readable title used in tables.
    pub fn title(self) -> &'static str {
        match self {
            DimensionKind::KnowledgeAwareness => "Knowledge Awareness",
            DimensionKind::ReasoningQuality => "Reasoning Quality",
            DimensionKind::UncertaintyCalibration => "Uncertainty Calibration",
            DimensionKind::SelfMonitoring => "Self-Monitoring",
            DimensionKind::DomainAdaptation => "Domain Adaptation",
        }
    }
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DimensionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        DimensionKind::ALL
            .into_iter()
            .find(|d| d.as_str() == normalized)
            .ok_or_else(|| format!("unknown dimension: {s}"))
    }
}

/// A single question or task put to the model under evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    /// Unique identifier for this problem.
    pub id: String,
    /// The prompt sent to the LLM.
    pub prompt: String,
    /// Optional system prompt override for this problem.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Subject domain (e.g. "physics"), used by domain adaptation metrics.
    #[serde(default)]
    pub domain: Option<String>,
    /// Tags for filtering.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Ground truth and expectations the metrics score against.
    #[serde(default)]
    pub reference: Reference,
}

impl Problem {
    /// Create a problem with no reference data.
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }
}

/// Reference data injected into metric measurement.
///
/// Every field is optional; a metric whose reference data is missing
/// reports its score as absent rather than guessing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    /// Whether the question can be answered at all.
    #[serde(default)]
    pub answerable: Option<bool>,
    /// Ground-truth answer text, matched case-insensitively.
    #[serde(default)]
    pub expected_answer: Option<String>,
    /// A fact the response is expected to attribute.
    #[serde(default)]
    pub fact: Option<String>,
    /// The correct source for `fact`.
    #[serde(default)]
    pub correct_source: Option<String>,
    /// Plausible but wrong sources; citing one of these near the fact is a fabrication.
    #[serde(default)]
    pub alternative_sources: Vec<String>,
    /// Date of the event the question is about.
    #[serde(default)]
    pub event_date: Option<NaiveDate>,
    /// Knowledge cutoff of the model under test.
    #[serde(default)]
    pub knowledge_cutoff: Option<NaiveDate>,
    /// Statements with known truth values, used for hallucination checks.
    #[serde(default)]
    pub statements: Vec<Statement>,
    /// Whether the prompt is deliberately ambiguous.
    #[serde(default)]
    pub ambiguous: Option<bool>,
    /// Whether the prompt contains a planted error the model should catch.
    #[serde(default)]
    pub contains_error: Option<bool>,
    /// Number of reasoning steps a complete answer needs.
    #[serde(default)]
    pub expected_steps: Option<u32>,
    /// Terminology an expert in the domain would use.
    #[serde(default)]
    pub domain_terms: Vec<String>,
    /// Methods appropriate for solving the problem.
    #[serde(default)]
    pub expected_methods: Vec<String>,
}

impl Reference {
    /// Returns `true` if no field carries any data.
    pub fn is_empty(&self) -> bool {
        *self == Reference::default()
    }
}

/// A statement with a known truth value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub text: String,
    pub correct: bool,
}

/// A collection of problems.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemSet {
    /// Unique identifier for this problem set.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Description of this problem set.
    #[serde(default)]
    pub description: String,
    /// The problems in this set.
    #[serde(default)]
    pub problems: Vec<Problem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_display_and_parse() {
        assert_eq!(
            DimensionKind::UncertaintyCalibration.to_string(),
            "uncertainty_calibration"
        );
        assert_eq!(
            "self-monitoring".parse::<DimensionKind>().unwrap(),
            DimensionKind::SelfMonitoring
        );
        assert_eq!(
            "Domain Adaptation".parse::<DimensionKind>().unwrap(),
            DimensionKind::DomainAdaptation
        );
        assert!("creativity".parse::<DimensionKind>().is_err());
    }

    #[test]
    fn dimension_order_is_declaration_order() {
        let mut shuffled = vec![
            DimensionKind::DomainAdaptation,
            DimensionKind::KnowledgeAwareness,
            DimensionKind::SelfMonitoring,
        ];
        shuffled.sort();
        assert_eq!(shuffled[0], DimensionKind::KnowledgeAwareness);
        assert_eq!(shuffled[2], DimensionKind::DomainAdaptation);
    }

    #[test]
    fn empty_reference() {
        assert!(Reference::default().is_empty());
        let reference = Reference {
            answerable: Some(false),
            ..Default::default()
        };
        assert!(!reference.is_empty());
    }

    #[test]
    fn problem_serde_roundtrip() {
        let problem = Problem {
            id: "kb-1".into(),
            prompt: "Who will win the 2040 World Cup?".into(),
            domain: Some("sports".into()),
            reference: Reference {
                answerable: Some(false),
                event_date: NaiveDate::from_ymd_opt(2040, 7, 1),
                ..Default::default()
            },
            ..Default::default()
        };
        let json = serde_json::to_string(&problem).unwrap();
        let back: Problem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, problem);
    }
}
