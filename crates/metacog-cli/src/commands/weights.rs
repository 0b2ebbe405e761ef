//! The `metacog weights` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::load_framework;

pub fn execute(weights: Option<PathBuf>, format: String) -> Result<()> {
    let framework = load_framework(weights.as_deref())?;

    match format.as_str() {
        "toml" => print!("{}", framework.weights().to_toml_string()?),
        "table" => {
            let mut table = Table::new();
            table.set_header(vec!["Dimension / metric", "Weight", "Effective"]);
            for evaluator in framework.evaluators() {
                let dimension = evaluator.dimension();
                table.add_row(vec![
                    Cell::new(dimension.kind().as_str()),
                    Cell::new(format!("{:.2}", dimension.weight())),
                    Cell::new(format!("{:.4}", dimension.weight())),
                ]);
                for metric in dimension.metrics() {
                    table.add_row(vec![
                        Cell::new(format!("  {}", metric.name())),
                        Cell::new(format!("{:.2}", metric.weight())),
                        Cell::new(format!("{:.4}", dimension.weight() * metric.weight())),
                    ]);
                }
            }
            println!("{table}");
        }
        other => anyhow::bail!("unknown format '{other}' (expected table or toml)"),
    }

    Ok(())
}
