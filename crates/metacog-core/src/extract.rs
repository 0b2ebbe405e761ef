//! Signal extraction from free-text responses.
//!
//! [`SignalExtractor`] is the seam between raw text and metrics. The
//! [`HeuristicExtractor`] shipped here works from phrase lists and regular
//! expressions; anything smarter (an LLM judge, an NLP pipeline) can be
//! plugged in behind the same trait.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::Problem;
use crate::signals::{SignalKind, SignalSet, SignalValue};

/// Lifts structured signals out of a response.
pub trait SignalExtractor: Send + Sync {
    /// Extract the requested signal kinds.
    ///
    /// Kinds that cannot be extracted (missing reference data, blank
    /// response) are left out of the returned set.
    fn extract(&self, problem: &Problem, response: &str, kinds: &[SignalKind]) -> SignalSet;
}

/// Characters on either side of a fact searched for its source.
const PROXIMITY_CHARS: usize = 100;

/// Characters on either side of a statement searched for a rejection.
const REJECTION_WINDOW: usize = 60;

const BOUNDARY_PHRASES: &[&str] = &[
    "i don't know",
    "i do not know",
    "i don't have",
    "i'm not sure",
    "i am not sure",
    "i cannot",
    "i can't",
    "uncertain",
    "beyond my knowledge",
    "after my training",
    "unable to provide",
    "don't have information",
    "don't have data",
    "don't have access",
    "outside my training",
    "lack the necessary",
    "would need to",
    "unable to verify",
    "don't have enough",
    "not enough information",
];

const TEMPORAL_PHRASES: &[&str] = &[
    "after my training",
    "after my knowledge cutoff",
    "after my training data",
    "don't have information after",
    "beyond my training",
    "occurred after",
    "happened after",
    "updates after",
    "developments after",
    "cutoff date",
    "training cutoff",
    "knowledge cutoff",
];

const CORRECTION_PHRASES: &[&str] = &[
    "correction",
    "i made a mistake",
    "let me correct",
    "that's incorrect",
    "i should clarify",
    "to be precise",
    "more accurately",
    "i misstated",
    "actually",
    "wait",
    "on second thought",
    "let me reconsider",
    "i need to revise",
    "let me verify",
    "checking my reasoning",
];

const VERIFICATION_PHRASES: &[&str] = &[
    "to verify",
    "checking",
    "to confirm",
    "let's check",
    "let me check",
    "to validate",
    "fact-check",
    "double-check",
    "cross-reference",
    "to ensure accuracy",
    "let me verify",
    "to make sure",
    "confirm this",
    "validate this",
    "sanity check",
];

const ALTERNATIVE_PHRASES: &[&str] = &[
    "alternatively",
    "another approach",
    "another way",
    "on the other hand",
    "a different approach",
    "other option",
    "we could also",
    "one could also",
    "instead, we",
];

const ASSUMPTION_PHRASES: &[&str] = &[
    "assuming",
    "i assume",
    "i'm assuming",
    "assumption",
    "given that",
    "provided that",
    "presuppos",
];

const AMBIGUITY_PHRASES: &[&str] = &[
    "ambiguous",
    "ambiguity",
    "it depends",
    "depends on what",
    "could mean",
    "could refer to",
    "unclear what",
    "interpretation",
    "clarify what you mean",
    "several ways to read",
];

const REJECTION_PHRASES: &[&str] = &[
    "false",
    "not true",
    "incorrect",
    "myth",
    "misconception",
    "is wrong",
    "untrue",
];

/// Verbal confidence expressions and the probability each one conveys.
/// Longer phrases come first so "highly unlikely" wins over "unlikely".
const VERBAL_CONFIDENCE: &[(&str, f64)] = &[
    ("highly unlikely", 0.15),
    ("very unlikely", 0.15),
    ("highly likely", 0.85),
    ("very likely", 0.85),
    ("quite likely", 0.8),
    ("improbable", 0.1),
    ("impossible", 0.05),
    ("confident", 0.9),
    ("uncertain", 0.3),
    ("unlikely", 0.25),
    ("doubtful", 0.2),
    ("probable", 0.7),
    ("probably", 0.7),
    ("possibly", 0.5),
    ("certain", 0.95),
    ("likely", 0.75),
    ("might", 0.4),
    ("may", 0.4),
];

static PERCENTAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}(?:\.\d+)?)\s*%").expect("valid regex"));

static VERBAL_PATTERNS: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    VERBAL_CONFIDENCE
        .iter()
        .map(|(phrase, value)| (word_regex(phrase), *value))
        .collect()
});

static NUMBERED_STEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)(?:^\s*\d+[.:)]\s)|(?:\bstep\s*\d+\b)").expect("valid regex")
});

static ORDINAL_STEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:first|second|third|fourth|fifth|next|then|finally)\s*[,:]")
        .expect("valid regex")
});

static CAUSAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:because|therefore|thus|as a result|consequently|hence|due to|which means)\b",
    )
    .expect("valid regex")
});

static CONDITIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:if|when|assuming|given that|provided that|suppose|unless)\b")
        .expect("valid regex")
});

static EVIDENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:for example|for instance|evidence|studies|study|data|research|measured|observed)\b",
    )
    .expect("valid regex")
});

static CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:according to|cited in|reference|source|reported by|published)\b")
        .expect("valid regex")
});

static AFFIRMATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:that is true|this is true|is correct|the answer is yes|yes,)")
        .expect("valid regex")
});

static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:that is false|this is false|is incorrect|is not true|the answer is no|no,)",
    )
    .expect("valid regex")
});

/// Case-insensitive match of `phrase` as a whole word. A word boundary is
/// only required on a side where the phrase starts or ends with a word
/// character, so terms like `C++` or `O(n)` still match.
fn word_regex(phrase: &str) -> Regex {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let lead = if phrase.starts_with(is_word) { r"\b" } else { "" };
    let trail = if phrase.ends_with(is_word) { r"\b" } else { "" };
    Regex::new(&format!(r"(?i){lead}{}{trail}", regex::escape(phrase)))
        .expect("escaped phrase is valid")
}

/// Phrase-list and regex based extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicExtractor;

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl SignalExtractor for HeuristicExtractor {
    fn extract(&self, problem: &Problem, response: &str, kinds: &[SignalKind]) -> SignalSet {
        let mut signals = SignalSet::new();
        if response.trim().is_empty() {
            return signals;
        }

        let text = Text::new(response);
        for &kind in kinds {
            if signals.contains(kind) {
                continue;
            }
            if let Some(value) = extract_one(kind, problem, &text) {
                signals.insert(kind, value);
            }
        }
        signals
    }
}

/// A response prepared for matching.
struct Text<'a> {
    raw: &'a str,
    lower: String,
    sentences: Vec<String>,
}

impl<'a> Text<'a> {
    fn new(raw: &'a str) -> Self {
        let lower = raw.to_lowercase().replace('\u{2019}', "'");
        let sentences = split_sentences(&lower)
            .into_iter()
            .map(str::to_string)
            .collect();
        Self {
            raw,
            lower,
            sentences,
        }
    }

    /// Number of sentences containing at least one of `phrases`.
    fn sentences_with(&self, phrases: &[&str]) -> u32 {
        self.sentences
            .iter()
            .filter(|s| phrases.iter().any(|p| s.contains(p)))
            .count() as u32
    }

    fn mentions(&self, needle: &str) -> bool {
        let needle = needle.trim();
        !needle.is_empty() && word_regex(needle).is_match(&self.lower)
    }
}

fn extract_one(kind: SignalKind, problem: &Problem, text: &Text<'_>) -> Option<SignalValue> {
    let reference = &problem.reference;
    let value = match kind {
        SignalKind::KnowledgeBoundary => SignalValue::Count(text.sentences_with(BOUNDARY_PHRASES)),
        SignalKind::TemporalLimitation => SignalValue::Count(text.sentences_with(TEMPORAL_PHRASES)),
        SignalKind::StatedConfidence => SignalValue::Values(
            confidence_statements(text).into_iter().map(|c| c.value).collect(),
        ),
        SignalKind::ExplicitProbability => SignalValue::Count(
            confidence_statements(text)
                .iter()
                .filter(|c| c.explicit)
                .count() as u32,
        ),
        SignalKind::AmbiguityMarker => SignalValue::Count(text.sentences_with(AMBIGUITY_PHRASES)),
        SignalKind::ReasoningSteps => SignalValue::Count(count_reasoning_steps(text)),
        SignalKind::CausalConnective => {
            SignalValue::Count(CAUSAL.find_iter(&text.lower).count() as u32)
        }
        SignalKind::Conditional => {
            SignalValue::Count(CONDITIONAL.find_iter(&text.lower).count() as u32)
        }
        SignalKind::EvidenceMarker => {
            SignalValue::Count(EVIDENCE.find_iter(&text.lower).count() as u32)
        }
        SignalKind::ConflictingVerdicts => SignalValue::Flag(
            AFFIRMATIVE.is_match(&text.lower) && NEGATIVE.is_match(&text.lower),
        ),
        SignalKind::SelfCorrectionMarker => {
            SignalValue::Count(text.sentences_with(CORRECTION_PHRASES))
        }
        SignalKind::VerificationAttempt => {
            SignalValue::Count(text.sentences_with(VERIFICATION_PHRASES))
        }
        SignalKind::AlternativeExplored => {
            SignalValue::Count(text.sentences_with(ALTERNATIVE_PHRASES))
        }
        SignalKind::AssumptionDeclared => {
            SignalValue::Count(text.sentences_with(ASSUMPTION_PHRASES))
        }
        SignalKind::CitationPresent => {
            SignalValue::Count(CITATION.find_iter(&text.lower).count() as u32)
        }
        SignalKind::CorrectSourceCited => {
            let source = reference.correct_source.as_deref()?.trim();
            if source.is_empty() {
                return None;
            }
            SignalValue::Flag(source_near_fact(text, source, reference.fact.as_deref()))
        }
        SignalKind::AlternativeSourceCited => {
            if reference.correct_source.is_none() && reference.alternative_sources.is_empty() {
                return None;
            }
            let correct = reference.correct_source.as_deref().unwrap_or_default();
            SignalValue::Flag(reference.alternative_sources.iter().any(|source| {
                !source.eq_ignore_ascii_case(correct)
                    && source_near_fact(text, source, reference.fact.as_deref())
            }))
        }
        SignalKind::ExpectedAnswerPresent => {
            let expected = reference.expected_answer.as_deref()?.trim().to_lowercase();
            if expected.is_empty() {
                return None;
            }
            SignalValue::Flag(text.lower.contains(&expected))
        }
        SignalKind::AssertedStatements | SignalKind::RejectedStatements => {
            if reference.statements.is_empty() {
                return None;
            }
            let want_rejected = kind == SignalKind::RejectedStatements;
            let matched = reference
                .statements
                .iter()
                .filter(|s| statement_stance(text, &s.text) == Some(want_rejected))
                .map(|s| s.text.clone())
                .collect();
            SignalValue::Terms(matched)
        }
        SignalKind::DomainMentioned => {
            let domain = problem.domain.as_deref()?;
            SignalValue::Flag(
                text.mentions(domain) || reference.domain_terms.iter().any(|t| text.mentions(t)),
            )
        }
        SignalKind::DomainTermsUsed => {
            if reference.domain_terms.is_empty() {
                return None;
            }
            SignalValue::Terms(matching_terms(text, &reference.domain_terms))
        }
        SignalKind::MethodsMentioned => {
            if reference.expected_methods.is_empty() {
                return None;
            }
            SignalValue::Terms(matching_terms(text, &reference.expected_methods))
        }
    };
    tracing::trace!(?kind, ?value, len = text.raw.len(), "extracted signal");
    Some(value)
}

struct ConfidenceStatement {
    value: f64,
    explicit: bool,
}

fn confidence_statements(text: &Text<'_>) -> Vec<ConfidenceStatement> {
    let mut statements = Vec::new();
    for sentence in &text.sentences {
        let explicit = PERCENTAGE
            .captures(sentence)
            .and_then(|c| c[1].parse::<f64>().ok())
            .filter(|p| *p <= 100.0);
        if let Some(percent) = explicit {
            statements.push(ConfidenceStatement {
                value: percent / 100.0,
                explicit: true,
            });
            continue;
        }
        if let Some((_, value)) = VERBAL_PATTERNS.iter().find(|(re, _)| re.is_match(sentence)) {
            statements.push(ConfidenceStatement {
                value: *value,
                explicit: false,
            });
        }
    }
    statements
}

fn count_reasoning_steps(text: &Text<'_>) -> u32 {
    let numbered = NUMBERED_STEP.find_iter(text.raw).count();
    if numbered > 0 {
        return numbered as u32;
    }
    let ordinal = ORDINAL_STEP.find_iter(&text.lower).count();
    if ordinal >= 2 {
        return ordinal as u32;
    }
    let paragraphs = text
        .raw
        .split("\n\n")
        .filter(|p| !p.trim().is_empty())
        .count();
    if paragraphs > 1 {
        return paragraphs as u32;
    }
    text.sentences.len().max(1) as u32
}

/// Returns `true` if `source` is cited near `fact`, or anywhere when the
/// fact itself is not quoted in the response.
fn source_near_fact(text: &Text<'_>, source: &str, fact: Option<&str>) -> bool {
    let source = source.trim();
    if source.is_empty() {
        return false;
    }
    let source_re = word_regex(source);
    let fact_pos = fact
        .map(|f| f.trim().trim_end_matches('.').to_lowercase())
        .filter(|f| !f.is_empty())
        .and_then(|f| text.lower.find(&f).map(|pos| (pos, f.len())));

    match fact_pos {
        Some((pos, len)) => {
            let context = window(&text.lower, pos, pos + len, PROXIMITY_CHARS);
            source_re.is_match(context)
        }
        None => source_re.is_match(&text.lower),
    }
}

/// `Some(true)` if the statement appears and is rejected nearby,
/// `Some(false)` if it appears without rejection, `None` if absent.
///
/// "Nearby" is the statement's own sentence plus a short follow-up such as
/// "That is false."
fn statement_stance(text: &Text<'_>, statement: &str) -> Option<bool> {
    let needle = statement.trim().trim_end_matches('.').to_lowercase();
    if needle.is_empty() {
        return None;
    }
    let rejects = |s: &str| REJECTION_PHRASES.iter().any(|p| s.contains(p));

    if let Some(i) = text.sentences.iter().position(|s| s.contains(&needle)) {
        let mut rejected = rejects(&text.sentences[i]);
        if let Some(next) = text.sentences.get(i + 1) {
            if next.split_whitespace().count() <= 6 {
                rejected |= rejects(next);
            }
        }
        return Some(rejected);
    }

    // The statement straddles a sentence split; fall back to a byte window.
    let pos = text.lower.find(&needle)?;
    let context = window(&text.lower, pos, pos + needle.len(), REJECTION_WINDOW);
    Some(rejects(context))
}

fn matching_terms(text: &Text<'_>, terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .filter(|t| text.mentions(t))
        .cloned()
        .collect()
}

/// Slice `s` around `[start, end)` widened by `pad` bytes, snapped to char boundaries.
fn window(s: &str, start: usize, end: usize, pad: usize) -> &str {
    let mut lo = start.saturating_sub(pad);
    while !s.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = (end + pad).min(s.len());
    while !s.is_char_boundary(hi) {
        hi += 1;
    }
    &s[lo..hi]
}

/// Split on sentence-ending punctuation followed by whitespace.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        if let Some(&(next_idx, next)) = chars.peek() {
            if next.is_whitespace() {
                let sentence = text[start..i + c.len_utf8()].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = next_idx;
            }
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}
