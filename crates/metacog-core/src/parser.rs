//! TOML problem-set parser.
//!
//! Loads problem sets from TOML files and directories, and validates them.
//! Dates are written as quoted ISO strings (`"2024-04-01"`).

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::model::{Problem, ProblemSet};

/// Intermediate TOML structure for problem-set files.
#[derive(Debug, Deserialize)]
struct TomlProblemFile {
    problem_set: TomlProblemSetHeader,
    #[serde(default)]
    problems: Vec<Problem>,
}

#[derive(Debug, Deserialize)]
struct TomlProblemSetHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    /// Applied to every problem that does not set its own.
    #[serde(default)]
    knowledge_cutoff: Option<NaiveDate>,
    /// Applied to every problem that does not set its own.
    #[serde(default)]
    domain: Option<String>,
}

/// Parse a single TOML file into a `ProblemSet`.
pub fn parse_problem_set(path: &Path) -> Result<ProblemSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read problem set file: {}", path.display()))?;
    parse_problem_set_str(&content, path)
}

/// Parse TOML text into a `ProblemSet`; `source_path` is only used in errors.
pub fn parse_problem_set_str(content: &str, source_path: &Path) -> Result<ProblemSet> {
    let parsed: TomlProblemFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;
    let header = parsed.problem_set;

    let problems = parsed
        .problems
        .into_iter()
        .map(|mut problem| {
            if problem.reference.knowledge_cutoff.is_none() {
                problem.reference.knowledge_cutoff = header.knowledge_cutoff;
            }
            if problem.domain.is_none() {
                problem.domain.clone_from(&header.domain);
            }
            problem
        })
        .collect();

    Ok(ProblemSet {
        id: header.id,
        name: header.name,
        description: header.description,
        problems,
    })
}

/// Recursively load every `.toml` problem set under `dir`.
///
/// Files that fail to parse are skipped with a warning. Entries are visited
/// in name order.
pub fn load_problem_directory(dir: &Path) -> Result<Vec<ProblemSet>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("failed to list directory: {}", dir.display()))?;
    entries.sort();

    let mut sets = Vec::new();
    for path in entries {
        if path.is_dir() {
            sets.extend(load_problem_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_problem_set(&path) {
                Ok(set) => sets.push(set),
                Err(e) => tracing::warn!("skipping {}: {e:#}", path.display()),
            }
        }
    }
    Ok(sets)
}

/// Load a file, or every set in a directory merged into one.
pub fn load_problems(path: &Path) -> Result<ProblemSet> {
    if !path.is_dir() {
        return parse_problem_set(path);
    }

    let sets = load_problem_directory(path)?;
    if sets.is_empty() {
        anyhow::bail!("no problem sets found in {}", path.display());
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let description = sets
        .iter()
        .map(|s| s.id.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    Ok(ProblemSet {
        id: name.clone(),
        name,
        description,
        problems: sets.into_iter().flat_map(|s| s.problems).collect(),
    })
}

/// Keep only problems carrying at least one of `tags`. An empty filter keeps all.
pub fn filter_by_tags(set: &ProblemSet, tags: &[String]) -> ProblemSet {
    if tags.is_empty() {
        return set.clone();
    }
    ProblemSet {
        problems: set
            .problems
            .iter()
            .filter(|p| p.tags.iter().any(|t| tags.contains(t)))
            .cloned()
            .collect(),
        ..set.clone()
    }
}

/// A warning from problem-set validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
    /// The problem ID, if the warning concerns one problem.
    pub problem_id: Option<String>,
    pub message: String,
}

impl ValidationWarning {
    fn problem(id: &str, message: impl Into<String>) -> Self {
        Self {
            problem_id: Some(id.to_string()),
            message: message.into(),
        }
    }
}

/// Validate a problem set for common issues.
pub fn validate_problem_set(set: &ProblemSet) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if set.problems.is_empty() {
        warnings.push(ValidationWarning {
            problem_id: None,
            message: "problem set contains no problems".into(),
        });
    }

    let mut seen_ids = HashSet::new();
    for problem in &set.problems {
        let id = problem.id.as_str();
        let reference = &problem.reference;

        if !seen_ids.insert(id) {
            warnings.push(ValidationWarning::problem(id, format!("duplicate problem ID: {id}")));
        }
        if problem.prompt.trim().is_empty() {
            warnings.push(ValidationWarning::problem(id, "prompt is empty"));
        }
        if reference.event_date.is_some() && reference.knowledge_cutoff.is_none() {
            warnings.push(ValidationWarning::problem(
                id,
                "event_date without a knowledge_cutoff cannot be scored",
            ));
        }
        if reference.fact.is_some() && reference.correct_source.is_none() {
            warnings.push(ValidationWarning::problem(
                id,
                "fact is set but correct_source is missing",
            ));
        }
        if reference
            .correct_source
            .as_deref()
            .is_some_and(|s| s.trim().is_empty())
        {
            warnings.push(ValidationWarning::problem(id, "correct_source is empty"));
        }
        if reference.alternative_sources.iter().any(|s| s.trim().is_empty()) {
            warnings.push(ValidationWarning::problem(id, "alternative source is empty"));
        }
        if reference.statements.iter().any(|s| s.text.trim().is_empty()) {
            warnings.push(ValidationWarning::problem(id, "reference statement with empty text"));
        }
        if reference.is_empty() && problem.domain.is_none() {
            warnings.push(ValidationWarning::problem(
                id,
                "no reference data; most metrics will be absent",
            ));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    const VALID_TOML: &str = r#"
[problem_set]
id = "knowledge-basics"
name = "Knowledge Basics"
description = "Boundary and temporal awareness"
knowledge_cutoff = "2024-04-01"

[[problems]]
id = "future-event"
prompt = "Who won the 2030 FIFA World Cup?"
tags = ["temporal"]

[problems.reference]
answerable = false
event_date = "2030-07-21"

[[problems]]
id = "great-wall"
prompt = "Is the Great Wall of China visible from space with the naked eye?"
domain = "astronomy"
tags = ["hallucination"]

[problems.reference]
answerable = true
expected_answer = "no"
knowledge_cutoff = "2023-01-01"

[[problems.reference.statements]]
text = "visible from space"
correct = false
"#;

    #[test]
    fn parse_valid_toml() {
        let set = parse_problem_set_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(set.id, "knowledge-basics");
        assert_eq!(set.problems.len(), 2);

        let future = &set.problems[0];
        assert_eq!(future.reference.answerable, Some(false));
        assert_eq!(future.reference.event_date, NaiveDate::from_ymd_opt(2030, 7, 21));
        // Inherited from the set header.
        assert_eq!(future.reference.knowledge_cutoff, NaiveDate::from_ymd_opt(2024, 4, 1));

        let wall = &set.problems[1];
        assert_eq!(wall.reference.knowledge_cutoff, NaiveDate::from_ymd_opt(2023, 1, 1));
        assert_eq!(wall.reference.statements.len(), 1);
        assert!(!wall.reference.statements[0].correct);
        assert_eq!(wall.domain.as_deref(), Some("astronomy"));
    }

    #[test]
    fn parse_minimal_problem() {
        let toml = r#"
[problem_set]
id = "minimal"
name = "Minimal"

[[problems]]
id = "p1"
prompt = "What is 2 + 2?"
"#;
        let set = parse_problem_set_str(toml, &PathBuf::from("test.toml")).unwrap();
        assert!(set.problems[0].reference.is_empty());
        assert!(set.problems[0].tags.is_empty());
    }

    #[test]
    fn parse_malformed_toml() {
        let err = parse_problem_set_str("this is not [valid toml }{", &PathBuf::from("bad.toml"))
            .unwrap_err();
        assert!(format!("{err:#}").contains("bad.toml"));
    }

    #[test]
    fn parse_bad_date() {
        let toml = r#"
[problem_set]
id = "dates"
name = "Dates"
knowledge_cutoff = "April 2024"
"#;
        assert!(parse_problem_set_str(toml, &PathBuf::from("dates.toml")).is_err());
    }

    #[test]
    fn validate_reports_common_issues() {
        let toml = r#"
[problem_set]
id = "issues"
name = "Issues"

[[problems]]
id = "same"
prompt = "   "

[[problems]]
id = "same"
prompt = "When did it happen?"

[problems.reference]
event_date = "2020-01-01"

[[problems]]
id = "blank-source"
prompt = "How many moons does Jupiter have?"

[problems.reference]
fact = "Jupiter has 95 moons"
correct_source = ""
"#;
        let set = parse_problem_set_str(toml, &PathBuf::from("test.toml")).unwrap();
        let warnings = validate_problem_set(&set);
        let messages: Vec<_> = warnings.iter().map(|w| w.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("duplicate")));
        assert!(messages.iter().any(|m| m.contains("prompt is empty")));
        assert!(messages.iter().any(|m| m.contains("knowledge_cutoff")));
        assert!(messages.iter().any(|m| m.contains("no reference data")));
        assert!(warnings
            .iter()
            .any(|w| w.problem_id.as_deref() == Some("blank-source")
                && w.message == "correct_source is empty"));
    }

    #[test]
    fn validate_clean_set() {
        let set = parse_problem_set_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        assert!(validate_problem_set(&set).is_empty());
    }

    #[test]
    fn load_directory_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not = [toml").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(
            nested.join("b.toml"),
            VALID_TOML.replace("knowledge-basics", "nested-set"),
        )
        .unwrap();

        let sets = load_problem_directory(dir.path()).unwrap();
        let ids: Vec<_> = sets.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["knowledge-basics", "nested-set"]);

        let merged = load_problems(dir.path()).unwrap();
        assert_eq!(merged.problems.len(), 4);
    }

    #[test]
    fn filter_by_tags_keeps_matching() {
        let set = parse_problem_set_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        let filtered = filter_by_tags(&set, &["temporal".to_string()]);
        assert_eq!(filtered.problems.len(), 1);
        assert_eq!(filtered.problems[0].id, "future-event");
        assert_eq!(filter_by_tags(&set, &[]).problems.len(), 2);
    }
}
