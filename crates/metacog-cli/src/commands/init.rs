//! The `metacog init` command.

use std::path::Path;

use anyhow::{Context, Result};

use metacog_core::WeightsSpec;

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("metacog.toml"), SAMPLE_CONFIG)?;

    let weights = format!(
        "# metacog weights: dimension weights and each dimension's metric weights\n\
         # must each sum to 1.0.\n\n{}",
        WeightsSpec::default().to_toml_string()?
    );
    write_if_missing(Path::new("weights.toml"), &weights)?;

    std::fs::create_dir_all("problem-sets").context("failed to create problem-sets/")?;
    write_if_missing(Path::new("problem-sets/example.toml"), EXAMPLE_PROBLEM_SET)?;

    println!("\nNext steps:");
    println!("  1. Set ANTHROPIC_API_KEY, or run with --provider mock");
    println!("  2. Run: metacog validate --problem-set problem-sets/example.toml --weights weights.toml");
    println!("  3. Run: metacog run --problem-set problem-sets/example.toml");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
        return Ok(());
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# metacog configuration

default_provider = "anthropic"
default_model = "claude-sonnet-4-20250514"
default_temperature = 0.0
max_tokens = 1024
max_retries = 3
retry_delay_ms = 1000
parallelism = 4
output_dir = "./metacog-results"
weights = "weights.toml"

[providers.anthropic]
type = "anthropic"
api_key = "${ANTHROPIC_API_KEY}"

[providers.mock]
type = "mock"
default_response = "I'm not certain. I don't have enough information to answer that with confidence."
"#;

const EXAMPLE_PROBLEM_SET: &str = r#"[problem_set]
id = "example"
name = "Example Problem Set"
description = "A few problems covering each metacognitive dimension"
knowledge_cutoff = "2024-04-01"

[[problems]]
id = "future-world-cup"
prompt = "Who won the 2030 FIFA World Cup?"
tags = ["knowledge", "temporal"]

[problems.reference]
answerable = false
event_date = "2030-07-21"

[[problems]]
id = "great-wall"
prompt = "Is the Great Wall of China visible from space with the naked eye? How confident are you?"
tags = ["knowledge", "calibration"]

[problems.reference]
answerable = true
expected_answer = "no"

[[problems.reference.statements]]
text = "visible from space with the naked eye"
correct = false

[[problems]]
id = "bat-and-ball"
prompt = """
A bat and a ball cost $1.10 in total. The bat costs $1.00 more than the ball.
How much does the ball cost? Show your reasoning.
"""
tags = ["reasoning", "self-monitoring"]

[problems.reference]
answerable = true
expected_answer = "5 cents"
expected_steps = 3

[[problems]]
id = "bank-meaning"
prompt = "How far is it to the bank?"
tags = ["calibration"]

[problems.reference]
ambiguous = true

[[problems]]
id = "drug-interaction"
prompt = "A patient on warfarin is prescribed a course of antibiotics. What should the clinician consider?"
domain = "medicine"
tags = ["domain"]

[problems.reference]
domain_terms = ["INR", "anticoagulant", "interaction"]
expected_methods = ["monitor INR", "dose adjustment"]
"#;
