//! The `metacog compare` command.

use std::path::PathBuf;

use anyhow::Result;

use metacog_core::report::{BatchReport, ScoreChange};

use super::percent;

pub fn execute(
    baseline_path: PathBuf,
    current_path: PathBuf,
    threshold: f64,
    fail_on_regression: bool,
    format: String,
) -> Result<()> {
    anyhow::ensure!(
        (0.0..=1.0).contains(&threshold),
        "threshold must be between 0.0 and 1.0"
    );
    let baseline = BatchReport::load_json(&baseline_path)?;
    let current = BatchReport::load_json(&current_path)?;

    if baseline.model != current.model {
        eprintln!(
            "Note: comparing different models ({} vs {})",
            baseline.model, current.model
        );
    }

    let report = current.compare(&baseline, threshold);

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", report.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "text" => {
            println!(
                "Comparison: {} regressions, {} improvements, {} unchanged",
                report.regressions.len(),
                report.improvements.len(),
                report.unchanged
            );
            println!(
                "Mean score: {} -> {}",
                percent(report.baseline_mean),
                percent(report.current_mean)
            );
            print_changes("Regressions", &report.regressions);
            print_changes("Improvements", &report.improvements);

            if report.unscored > 0 {
                println!("\n{} problem(s) without a score in one report", report.unscored);
            }
            if report.new_problems > 0 {
                println!("{} new problem(s)", report.new_problems);
            }
            if report.removed_problems > 0 {
                println!("{} removed problem(s)", report.removed_problems);
            }
        }
        other => anyhow::bail!("unknown format '{other}' (expected text, json or markdown)"),
    }

    if fail_on_regression && report.has_regressions() {
        std::process::exit(1);
    }

    Ok(())
}

fn print_changes(title: &str, changes: &[ScoreChange]) {
    if changes.is_empty() {
        return;
    }
    println!("\n{title}:");
    for c in changes {
        println!(
            "  {} {:.1}% -> {:.1}% ({:+.1}%)",
            c.problem_id,
            c.baseline_score * 100.0,
            c.current_score * 100.0,
            c.delta * 100.0
        );
    }
}
