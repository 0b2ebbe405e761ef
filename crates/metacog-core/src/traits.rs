//! The LLM access seam.
//!
//! Implemented by the `metacog-providers` crate; the batch engine only ever
//! sees `dyn LlmProvider`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::Problem;

/// An LLM backend that answers prompts.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "anthropic").
    fn name(&self) -> &str;

    /// Send one prompt and wait for the complete answer.
    ///
    /// Errors should be (or wrap) a [`ProviderError`](crate::error::ProviderError)
    /// so callers can classify them.
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse>;

    /// Models this provider is known to serve.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// One prompt for an LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. "claude-sonnet-4-20250514").
    pub model: String,
    pub prompt: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl GenerateRequest {
    /// Build the request for `problem`, preferring the problem's own system
    /// prompt over `default_system`.
    pub fn for_problem(
        problem: &Problem,
        model: &str,
        default_system: Option<&str>,
        max_tokens: u32,
        temperature: f64,
    ) -> Self {
        Self {
            model: model.to_string(),
            prompt: problem.prompt.clone(),
            system_prompt: problem
                .system_prompt
                .clone()
                .or_else(|| default_system.map(str::to_string)),
            max_tokens,
            temperature,
        }
    }
}

/// The model's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub content: String,
    /// Model that actually produced the answer.
    pub model: String,
    pub token_usage: TokenUsage,
    pub latency_ms: u64,
}

/// Token counts reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub provider: String,
    /// Context window in tokens.
    pub max_context: u32,
}

/// System prompt sent when neither the problem nor the configuration
/// provides one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer the question. \
If you are unsure, say so and state how confident you are.";
