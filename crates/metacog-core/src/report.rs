//! Batch report with JSON persistence and regression detection.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::ProblemSet;
use crate::results::EvaluationResult;
use crate::statistics::SummaryStats;
use crate::traits::TokenUsage;

/// Everything produced by one batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub provider: String,
    pub model: String,
    pub problem_set: ProblemSetSummary,
    /// One result per evaluated problem, in problem-set order.
    pub results: Vec<EvaluationResult>,
    pub summary: SummaryStats,
    #[serde(default)]
    pub token_usage: TokenUsage,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// The run was stopped before every problem was evaluated.
    #[serde(default)]
    pub cancelled: bool,
}

/// A problem set without its problems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemSetSummary {
    pub id: String,
    pub name: String,
    pub problem_count: usize,
}

impl From<&ProblemSet> for ProblemSetSummary {
    fn from(set: &ProblemSet) -> Self {
        Self {
            id: set.id.clone(),
            name: set.name.clone(),
            problem_count: set.problems.len(),
        }
    }
}

impl BatchReport {
    /// Save the report as pretty-printed JSON, creating parent directories.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse report JSON in {}", path.display()))
    }

    /// Compare per-problem overall scores against a baseline.
    ///
    /// A change larger than `threshold` in either direction is reported.
    /// Problems scored in only one report, or absent in either, are counted
    /// separately and never flagged.
    pub fn compare(&self, baseline: &BatchReport, threshold: f64) -> RegressionReport {
        let scores = |report: &BatchReport| -> BTreeMap<String, Option<f64>> {
            report
                .results
                .iter()
                .map(|r| (r.problem_id.clone(), r.overall_score))
                .collect()
        };
        let baseline_scores = scores(baseline);
        let current_scores = scores(self);

        let mut report = RegressionReport::default();
        for (problem_id, current) in &current_scores {
            let Some(previous) = baseline_scores.get(problem_id) else {
                report.new_problems += 1;
                continue;
            };
            let (Some(previous), Some(current)) = (*previous, *current) else {
                report.unscored += 1;
                continue;
            };

            let change = ScoreChange {
                problem_id: problem_id.clone(),
                baseline_score: previous,
                current_score: current,
                delta: current - previous,
            };
            if change.delta < -threshold {
                report.regressions.push(change);
            } else if change.delta > threshold {
                report.improvements.push(change);
            } else {
                report.unchanged += 1;
            }
        }
        report.removed_problems = baseline_scores
            .keys()
            .filter(|id| !current_scores.contains_key(*id))
            .count();

        report.baseline_mean = baseline.summary.mean;
        report.current_mean = self.summary.mean;
        report
    }
}

/// Result of comparing two reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    pub regressions: Vec<ScoreChange>,
    pub improvements: Vec<ScoreChange>,
    pub unchanged: usize,
    /// Problems without a score in one of the reports.
    pub unscored: usize,
    pub new_problems: usize,
    pub removed_problems: usize,
    pub baseline_mean: Option<f64>,
    pub current_mean: Option<f64>,
}

/// A per-problem change in overall score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreChange {
    pub problem_id: String,
    pub baseline_score: f64,
    pub current_score: f64,
    pub delta: f64,
}

impl RegressionReport {
    pub fn has_regressions(&self) -> bool {
        !self.regressions.is_empty()
    }

    /// Format the comparison as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Summary:** {} regressions, {} improvements, {} unchanged\n\n",
            self.regressions.len(),
            self.improvements.len(),
            self.unchanged
        ));
        if let (Some(before), Some(after)) = (self.baseline_mean, self.current_mean) {
            md.push_str(&format!(
                "**Mean score:** {:.1}% → {:.1}%\n\n",
                before * 100.0,
                after * 100.0
            ));
        }

        for (title, changes) in [
            ("Regressions", &self.regressions),
            ("Improvements", &self.improvements),
        ] {
            if changes.is_empty() {
                continue;
            }
            md.push_str(&format!("### {title}\n\n"));
            md.push_str("| Problem | Baseline | Current | Delta |\n");
            md.push_str("|---------|----------|---------|-------|\n");
            for c in changes {
                md.push_str(&format!(
                    "| {} | {:.1}% | {:.1}% | {:+.1}% |\n",
                    c.problem_id,
                    c.baseline_score * 100.0,
                    c.current_score * 100.0,
                    c.delta * 100.0
                ));
            }
            md.push('\n');
        }

        md
    }
}
