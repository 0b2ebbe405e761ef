//! metacog CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "metacog", version, about = "Metacognition evaluation harness for LLMs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a model on a problem set
    Run {
        /// Path to a .toml problem set or a directory of them
        #[arg(long)]
        problem_set: PathBuf,

        /// Provider name from the config (default: config's default_provider)
        #[arg(long)]
        provider: Option<String>,

        /// Model identifier (default: config's default_model)
        #[arg(long)]
        model: Option<String>,

        /// Weights file (default: config's weights, else built-in weights)
        #[arg(long)]
        weights: Option<PathBuf>,

        /// Max concurrent LLM calls
        #[arg(long)]
        parallelism: Option<usize>,

        /// Generation temperature
        #[arg(long)]
        temperature: Option<f64>,

        /// Output directory for the JSON report
        #[arg(long)]
        output: Option<PathBuf>,

        /// Only run problems with one of these tags (comma-separated)
        #[arg(long)]
        filter: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate problem sets and, optionally, a weights file
    Validate {
        /// Path to a problem set file or directory
        #[arg(long)]
        problem_set: PathBuf,

        /// Weights file to check
        #[arg(long)]
        weights: Option<PathBuf>,
    },

    /// Compare two reports
    Compare {
        /// Baseline report JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Current report JSON
        #[arg(long)]
        current: PathBuf,

        /// Score change that counts as a regression or improvement
        #[arg(long, default_value = "0.05")]
        threshold: f64,

        /// Exit code 1 if regressions found
        #[arg(long)]
        fail_on_regression: bool,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Print the effective weight tree
    Weights {
        /// Weights file (default: built-in weights)
        #[arg(long)]
        weights: Option<PathBuf>,

        /// Output format: table, toml
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Create starter config, weights, and an example problem set
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("metacog=info".parse().expect("valid directive")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            problem_set,
            provider,
            model,
            weights,
            parallelism,
            temperature,
            output,
            filter,
            config,
        } => {
            commands::run::execute(commands::run::RunArgs {
                problem_set,
                provider,
                model,
                weights,
                parallelism,
                temperature,
                output,
                filter,
                config,
            })
            .await
        }
        Commands::Validate {
            problem_set,
            weights,
        } => commands::validate::execute(problem_set, weights),
        Commands::Compare {
            baseline,
            current,
            threshold,
            fail_on_regression,
            format,
        } => commands::compare::execute(baseline, current, threshold, fail_on_regression, format),
        Commands::Weights { weights, format } => commands::weights::execute(weights, format),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
