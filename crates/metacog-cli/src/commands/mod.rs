//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use metacog_core::extract::HeuristicExtractor;
use metacog_core::{Framework, WeightsSpec};

pub mod compare;
pub mod init;
pub mod run;
pub mod validate;
pub mod weights;

/// Build the framework from a weights file, or the built-in weights.
fn load_framework(weights: Option<&Path>) -> Result<Framework> {
    let (spec, source) = match weights {
        Some(path) => (WeightsSpec::load(path)?, path.display().to_string()),
        None => (WeightsSpec::default(), "built-in weights".to_string()),
    };
    Framework::new(&spec, Arc::new(HeuristicExtractor::new()))
        .with_context(|| format!("invalid weights in {source}"))
}

fn percent(score: Option<f64>) -> String {
    score.map_or_else(|| "-".to_string(), |s| format!("{:.1}%", s * 100.0))
}
