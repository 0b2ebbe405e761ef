//! The `metacog run` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use metacog_core::engine::{BatchEngine, EngineConfig, ProgressReporter};
use metacog_core::parser;
use metacog_core::report::BatchReport;
use metacog_core::traits::DEFAULT_SYSTEM_PROMPT;
use metacog_core::{DimensionKind, EvaluationResult, Framework};
use metacog_providers::{create_provider, load_config_from};

use super::{load_framework, percent};

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_problem_start(&self, problem_id: &str) {
        tracing::debug!("starting {problem_id}");
    }

    fn on_problem_complete(&self, result: &EvaluationResult) {
        eprintln!(
            "  Done: {} score {} (coverage {:.0}%)",
            result.problem_id,
            percent(result.overall_score),
            result.coverage * 100.0
        );
    }

    fn on_problem_error(&self, problem_id: &str, error: &str) {
        eprintln!("  ERROR: {problem_id}: {error}");
    }

    fn on_batch_complete(&self, total: usize, unavailable: usize, elapsed: Duration) {
        eprintln!(
            "\nComplete: {total} evaluated, {unavailable} without a response ({:.1}s)",
            elapsed.as_secs_f64()
        );
    }
}

pub struct RunArgs {
    pub problem_set: PathBuf,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub weights: Option<PathBuf>,
    pub parallelism: Option<usize>,
    pub temperature: Option<f64>,
    pub output: Option<PathBuf>,
    pub filter: Option<String>,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;

    let parallelism = args.parallelism.unwrap_or(config.parallelism);
    let temperature = args.temperature.unwrap_or(config.default_temperature);
    anyhow::ensure!(parallelism >= 1, "parallelism must be at least 1");
    anyhow::ensure!(
        (0.0..=1.0).contains(&temperature),
        "temperature must be between 0.0 and 1.0"
    );

    let weights_path = args.weights.or_else(|| config.weights.clone());
    let framework = Arc::new(load_framework(weights_path.as_deref())?);

    let mut set = parser::load_problems(&args.problem_set)?;
    if let Some(filter) = &args.filter {
        let tags: Vec<String> = filter
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        set = parser::filter_by_tags(&set, &tags);
    }
    anyhow::ensure!(
        !set.problems.is_empty(),
        "no problems to run in {}",
        args.problem_set.display()
    );

    let provider_name = args.provider.unwrap_or_else(|| config.default_provider.clone());
    let provider = create_provider(&config.provider(&provider_name)?, config.retry_policy())?;
    let model = args.model.unwrap_or_else(|| config.default_model.clone());

    eprintln!(
        "Running {} problem(s) from '{}' on {provider_name}/{model}",
        set.problems.len(),
        set.name
    );

    let engine = BatchEngine::new(
        provider,
        Arc::clone(&framework),
        EngineConfig {
            model,
            parallelism,
            temperature,
            max_tokens: config.max_tokens,
            system_prompt: Some(
                config
                    .system_prompt
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            ),
        },
    );

    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let report = engine.run_until(&set, &ConsoleReporter, ctrl_c).await?;

    print_summary(&report, &framework);

    let output = args.output.unwrap_or(config.output_dir);
    let timestamp = report.created_at.format("%Y%m%d-%H%M%S");
    let path = output.join(format!("report-{timestamp}.json"));
    report.save_json(&path)?;
    eprintln!("Results saved to: {}", path.display());

    if report.cancelled {
        eprintln!(
            "Run cancelled: {} of {} problems evaluated",
            report.results.len(),
            report.problem_set.problem_count
        );
    }

    Ok(())
}

fn print_summary(report: &BatchReport, framework: &Framework) {
    use comfy_table::{Cell, Table};

    let summary = &report.summary;
    let mut table = Table::new();
    table.set_header(vec!["Dimension", "Weight", "Mean score", "Coverage", "Scored"]);

    for evaluator in framework.evaluators() {
        let kind: DimensionKind = evaluator.kind();
        let stats = summary.per_dimension.get(&kind);
        table.add_row(vec![
            Cell::new(kind.title()),
            Cell::new(format!("{:.2}", evaluator.dimension().weight())),
            Cell::new(percent(stats.and_then(|s| s.mean))),
            Cell::new(format!(
                "{:.0}%",
                stats.map_or(0.0, |s| s.mean_coverage) * 100.0
            )),
            Cell::new(stats.map_or(0, |s| s.scored)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Overall"),
        Cell::new("1.00"),
        Cell::new(percent(summary.mean)),
        Cell::new(format!("{:.0}%", summary.mean_coverage * 100.0)),
        Cell::new(summary.scored),
    ]);

    eprintln!("\n{table}");
    if let (Some(std_dev), Some(min), Some(max)) = (summary.std_dev, summary.min, summary.max) {
        eprintln!(
            "Overall std-dev {:.3}, min {}, max {}",
            std_dev,
            percent(Some(min)),
            percent(Some(max))
        );
    }
    eprintln!(
        "Tokens: {} prompt, {} completion",
        report.token_usage.prompt_tokens, report.token_usage.completion_tokens
    );
}
