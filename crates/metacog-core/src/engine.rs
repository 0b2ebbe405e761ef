//! Batch engine.
//!
//! Fetches a response for every problem in a set through an
//! [`LlmProvider`], scores each one with a shared [`Framework`], and
//! assembles a [`BatchReport`]. Provider failures never abort the batch:
//! the affected problem is scored as "response unavailable".

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::framework::Framework;
use crate::model::{Problem, ProblemSet};
use crate::report::BatchReport;
use crate::results::EvaluationResult;
use crate::statistics::summarize;
use crate::traits::{GenerateRequest, GenerateResponse, LlmProvider, TokenUsage};

/// Configuration for the batch engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Model identifier passed to the provider.
    pub model: String,
    /// Maximum concurrent LLM requests.
    pub parallelism: usize,
    pub temperature: f64,
    pub max_tokens: u32,
    /// System prompt for problems that do not carry their own.
    pub system_prompt: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            parallelism: 4,
            temperature: 0.0,
            max_tokens: 1024,
            system_prompt: Some(crate::traits::DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_problem_start(&self, problem_id: &str);
    fn on_problem_complete(&self, result: &EvaluationResult);
    fn on_problem_error(&self, problem_id: &str, error: &str);
    fn on_batch_complete(&self, total: usize, unavailable: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_problem_start(&self, _: &str) {}
    fn on_problem_complete(&self, _: &EvaluationResult) {}
    fn on_problem_error(&self, _: &str, _: &str) {}
    fn on_batch_complete(&self, _: usize, _: usize, _: Duration) {}
}

/// Results of evaluating a list of problems.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// One result per completed problem, in input order.
    pub results: Vec<EvaluationResult>,
    pub token_usage: TokenUsage,
    /// The batch was cancelled before every problem completed.
    pub cancelled: bool,
}

/// Runs a problem set against one provider and model.
pub struct BatchEngine {
    provider: Arc<dyn LlmProvider>,
    framework: Arc<Framework>,
    config: EngineConfig,
}

impl BatchEngine {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        framework: Arc<Framework>,
        config: EngineConfig,
    ) -> Self {
        Self {
            provider,
            framework,
            config,
        }
    }

    /// Evaluate every problem in `set` and build a report.
    pub async fn run(
        &self,
        set: &ProblemSet,
        progress: &dyn ProgressReporter,
    ) -> Result<BatchReport> {
        self.run_until(set, progress, std::future::pending()).await
    }

    /// Like [`run`](Self::run), but stops when `cancel` resolves.
    ///
    /// Problems completed before cancellation are kept and the report is
    /// marked as cancelled.
    pub async fn run_until(
        &self,
        set: &ProblemSet,
        progress: &dyn ProgressReporter,
        cancel: impl Future<Output = ()>,
    ) -> Result<BatchReport> {
        let start = Instant::now();
        tracing::info!(
            set = %set.id,
            problems = set.problems.len(),
            provider = self.provider.name(),
            model = %self.config.model,
            "starting batch"
        );

        let outcome = self.evaluate_problems(&set.problems, progress, cancel).await;
        let elapsed = start.elapsed();
        let summary = summarize(&outcome.results);
        progress.on_batch_complete(outcome.results.len(), summary.unavailable, elapsed);
        tracing::info!(
            completed = outcome.results.len(),
            unavailable = summary.unavailable,
            cancelled = outcome.cancelled,
            elapsed_ms = elapsed.as_millis() as u64,
            "batch finished"
        );

        Ok(BatchReport {
            id: Uuid::new_v4(),
            created_at: chrono::Utc::now(),
            provider: self.provider.name().to_string(),
            model: self.config.model.clone(),
            problem_set: set.into(),
            results: outcome.results,
            summary,
            token_usage: outcome.token_usage,
            duration_ms: elapsed.as_millis() as u64,
            cancelled: outcome.cancelled,
        })
    }

    /// Fetch and score `problems` concurrently.
    pub async fn evaluate_problems(
        &self,
        problems: &[Problem],
        progress: &dyn ProgressReporter,
        cancel: impl Future<Output = ()>,
    ) -> BatchOutcome {
        let semaphore = Semaphore::new(self.config.parallelism.max(1));
        let mut futures = FuturesUnordered::new();

        for (index, problem) in problems.iter().enumerate() {
            let semaphore = &semaphore;
            futures.push(async move {
                let fetched = self.fetch(problem, semaphore, progress).await;
                let (response, usage) = match fetched {
                    Ok(response) => (Some(response.content), response.token_usage),
                    Err(e) => {
                        tracing::warn!(problem = %problem.id, "response unavailable: {e:#}");
                        progress.on_problem_error(&problem.id, &format!("{e:#}"));
                        (None, TokenUsage::default())
                    }
                };
                let result = self.framework.evaluate(problem, response.as_deref());
                (index, result, usage)
            });
        }

        let mut completed = Vec::with_capacity(problems.len());
        let mut token_usage = TokenUsage::default();
        let mut cancelled = false;
        tokio::pin!(cancel);

        loop {
            tokio::select! {
                biased;
                () = &mut cancel => {
                    cancelled = true;
                    break;
                }
                next = futures.next() => match next {
                    Some((index, result, usage)) => {
                        progress.on_problem_complete(&result);
                        token_usage += usage;
                        completed.push((index, result));
                    }
                    None => break,
                },
            }
        }

        // A cancel that arrives after the last problem finished changes nothing.
        let cancelled = cancelled && !futures.is_empty();
        if cancelled {
            tracing::warn!(pending = futures.len(), "batch cancelled");
        }

        completed.sort_by_key(|(index, _)| *index);
        BatchOutcome {
            results: completed.into_iter().map(|(_, result)| result).collect(),
            token_usage,
            cancelled,
        }
    }

    async fn fetch(
        &self,
        problem: &Problem,
        semaphore: &Semaphore,
        progress: &dyn ProgressReporter,
    ) -> Result<GenerateResponse> {
        let _permit = semaphore
            .acquire()
            .await
            .map_err(|_| anyhow::anyhow!("semaphore closed"))?;
        progress.on_problem_start(&problem.id);

        let request = GenerateRequest::for_problem(
            problem,
            &self.config.model,
            self.config.system_prompt.as_deref(),
            self.config.max_tokens,
            self.config.temperature,
        );
        self.provider.generate(&request).await
    }
}
