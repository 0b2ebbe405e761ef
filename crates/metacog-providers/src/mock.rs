//! Deterministic provider for tests and offline runs.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use async_trait::async_trait;

use metacog_core::traits::{GenerateRequest, GenerateResponse, LlmProvider, ModelInfo, TokenUsage};
use metacog_core::ProviderError;

const MOCK_MODEL: &str = "mock-model";
const DEFAULT_RESPONSE: &str =
    "I don't have enough information to answer that with confidence.";

/// An LLM stand-in that answers from fixed tables.
///
/// Lookup order for a prompt: failure triggers, exact prompt, the first
/// substring rule that matches (in insertion order), then the default.
pub struct MockProvider {
    exact: HashMap<String, String>,
    substrings: Vec<(String, String)>,
    default_response: String,
    failures: Vec<String>,
    call_count: AtomicU32,
    last_request: Mutex<Option<GenerateRequest>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::with_fixed_response(DEFAULT_RESPONSE)
    }
}

impl MockProvider {
    /// A mock that answers every prompt with `response`.
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            exact: HashMap::new(),
            substrings: Vec::new(),
            default_response: response.to_string(),
            failures: Vec::new(),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// A mock answering prompts that contain a key with its value.
    pub fn with_substring_responses<K, V>(responses: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut mock = Self::default();
        for (key, value) in responses {
            mock = mock.with_substring_response(key, value);
        }
        mock
    }

    /// Answer exactly `prompt` with `response`.
    pub fn with_response(mut self, prompt: impl Into<String>, response: impl Into<String>) -> Self {
        self.exact.insert(prompt.into(), response.into());
        self
    }

    /// Answer any prompt containing `needle` with `response`.
    pub fn with_substring_response(
        mut self,
        needle: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.substrings.push((needle.into(), response.into()));
        self
    }

    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    /// Fail any prompt containing `needle` with [`ProviderError::Rejected`].
    pub fn failing_on(mut self, needle: impl Into<String>) -> Self {
        self.failures.push(needle.into());
        self
    }

    /// Add exact-prompt responses from every `*.json` file in `dir`.
    ///
    /// Each file holds one JSON object mapping prompt to response. Files are
    /// read in name order, so later files override earlier ones.
    pub fn with_responses_dir(mut self, dir: &Path) -> Result<Self> {
        let mut files = std::fs::read_dir(dir)
            .with_context(|| format!("failed to read responses directory: {}", dir.display()))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()
            .with_context(|| format!("failed to list responses directory: {}", dir.display()))?;
        files.retain(|p| p.extension().is_some_and(|ext| ext == "json"));
        files.sort();

        for path in files {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let responses: HashMap<String, String> = serde_json::from_str(&content)
                .with_context(|| format!("failed to parse responses in {}", path.display()))?;
            tracing::debug!(file = %path.display(), count = responses.len(), "loaded mock responses");
            self.exact.extend(responses);
        }
        Ok(self)
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn respond(&self, prompt: &str) -> Option<&str> {
        if self.failures.iter().any(|f| prompt.contains(f.as_str())) {
            return None;
        }
        let content = self
            .exact
            .get(prompt)
            .or_else(|| {
                self.substrings
                    .iter()
                    .find(|(needle, _)| prompt.contains(needle.as_str()))
                    .map(|(_, response)| response)
            })
            .unwrap_or(&self.default_response);
        Some(content)
    }
}

fn word_count(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(request.clone());

        let Some(content) = self.respond(&request.prompt) else {
            return Err(ProviderError::Rejected(format!(
                "mock configured to fail on prompt: {}",
                request.prompt
            ))
            .into());
        };

        Ok(GenerateResponse {
            content: content.to_string(),
            model: request.model.clone(),
            token_usage: TokenUsage::new(word_count(&request.prompt), word_count(content)),
            latency_ms: 0,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: MOCK_MODEL.into(),
            name: "Mock Model".into(),
            provider: "mock".into(),
            max_context: 100_000,
        }]
    }
}
