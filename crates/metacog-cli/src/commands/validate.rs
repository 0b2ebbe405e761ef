//! The `metacog validate` command.

use std::path::PathBuf;

use anyhow::Result;

use metacog_core::parser;

use super::load_framework;

pub fn execute(problem_set_path: PathBuf, weights: Option<PathBuf>) -> Result<()> {
    let sets = if problem_set_path.is_dir() {
        parser::load_problem_directory(&problem_set_path)?
    } else {
        vec![parser::parse_problem_set(&problem_set_path)?]
    };
    anyhow::ensure!(
        !sets.is_empty(),
        "no problem sets found in {}",
        problem_set_path.display()
    );

    let mut total_warnings = 0;
    for set in &sets {
        println!("Problem set: {} ({} problems)", set.name, set.problems.len());

        let warnings = parser::validate_problem_set(set);
        for w in &warnings {
            let prefix = w
                .problem_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if let Some(path) = &weights {
        load_framework(Some(path))?;
        println!("Weights valid: {}", path.display());
    }

    if total_warnings == 0 {
        println!("All problem sets valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
