//! Structured signals lifted out of a model's free-text response.
//!
//! Metrics consume a [`SignalSet`] and never look at raw text. A kind that
//! is missing from the set means the signal could not be extracted, which
//! metrics report as an absent score.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The named kinds of signal an extractor can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Admissions of not knowing ("I don't know", "beyond my knowledge").
    KnowledgeBoundary,
    /// References to a training or knowledge cutoff.
    TemporalLimitation,
    /// Stated confidence values in `[0, 1]`, explicit or verbal.
    StatedConfidence,
    /// Confidence statements given as explicit percentages.
    ExplicitProbability,
    /// Remarks that the question admits several readings.
    AmbiguityMarker,
    /// Number of identifiable reasoning steps.
    ReasoningSteps,
    /// Causal connectives ("because", "therefore").
    CausalConnective,
    /// Conditional framing ("if", "assuming").
    Conditional,
    /// Appeals to evidence ("for example", "studies show").
    EvidenceMarker,
    /// The response both affirms and denies the same verdict.
    ConflictingVerdicts,
    /// Self-correction markers ("actually", "let me correct").
    SelfCorrectionMarker,
    /// Verification attempts ("let me verify", "double-check").
    VerificationAttempt,
    /// Exploration of alternative approaches.
    AlternativeExplored,
    /// Explicitly declared assumptions.
    AssumptionDeclared,
    /// Generic citation markers ("according to", "source").
    CitationPresent,
    /// The reference's correct source is cited near the fact.
    CorrectSourceCited,
    /// One of the reference's alternative sources is cited near the fact.
    AlternativeSourceCited,
    /// The reference's expected answer appears in the response.
    ExpectedAnswerPresent,
    /// Reference statements the response asserts.
    AssertedStatements,
    /// Reference statements the response rejects as false.
    RejectedStatements,
    /// The problem's domain is named or evidently recognised.
    DomainMentioned,
    /// Reference domain terms used in the response.
    DomainTermsUsed,
    /// Reference methods mentioned in the response.
    MethodsMentioned,
}

/// The value carried by one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SignalValue {
    Flag(bool),
    Count(u32),
    Values(Vec<f64>),
    Terms(Vec<String>),
}

/// Mapping from signal kind to extracted value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSet {
    signals: BTreeMap<SignalKind, SignalValue>,
}

impl SignalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a signal, replacing any previous value of the same kind.
    pub fn insert(&mut self, kind: SignalKind, value: SignalValue) {
        self.signals.insert(kind, value);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, kind: SignalKind, value: SignalValue) -> Self {
        self.insert(kind, value);
        self
    }

    pub fn get(&self, kind: SignalKind) -> Option<&SignalValue> {
        self.signals.get(&kind)
    }

    pub fn contains(&self, kind: SignalKind) -> bool {
        self.signals.contains_key(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Boolean view of a signal. Counts are true when non-zero.
    pub fn flag(&self, kind: SignalKind) -> Option<bool> {
        match self.get(kind)? {
            SignalValue::Flag(b) => Some(*b),
            SignalValue::Count(n) => Some(*n > 0),
            _ => None,
        }
    }

    /// Count view of a signal. Flags count as 0 or 1, lists by length.
    pub fn count(&self, kind: SignalKind) -> Option<u32> {
        match self.get(kind)? {
            SignalValue::Flag(b) => Some(u32::from(*b)),
            SignalValue::Count(n) => Some(*n),
            SignalValue::Values(v) => Some(v.len() as u32),
            SignalValue::Terms(t) => Some(t.len() as u32),
        }
    }

    pub fn values(&self, kind: SignalKind) -> Option<&[f64]> {
        match self.get(kind)? {
            SignalValue::Values(v) => Some(v),
            _ => None,
        }
    }

    pub fn terms(&self, kind: SignalKind) -> Option<&[String]> {
        match self.get(kind)? {
            SignalValue::Terms(t) => Some(t),
            _ => None,
        }
    }

    /// Iterate over signals in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (SignalKind, &SignalValue)> {
        self.signals.iter().map(|(k, v)| (*k, v))
    }
}
