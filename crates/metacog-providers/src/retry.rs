//! Retrying decorator for any [`LlmProvider`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use metacog_core::traits::{GenerateRequest, GenerateResponse, LlmProvider, ModelInfo};
use metacog_core::ProviderError;

const MAX_DELAY: Duration = Duration::from_secs(60);

/// How often and how patiently to retry transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; 0 disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each following one.
    pub initial_delay: Duration,
    /// Upper bound on any single delay, including provider hints.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            ..Self::default()
        }
    }

    /// Backoff before retry number `retry` (1-based), ignoring provider hints.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Wraps a provider and retries failures that are not permanent.
///
/// Authentication failures, unknown models and rejected requests are
/// returned at once. A rate-limit hint replaces the computed backoff for
/// that retry.
pub struct RetryingProvider {
    inner: Arc<dyn LlmProvider>,
    policy: RetryPolicy,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let mut retry = 0;
        loop {
            let err = match self.inner.generate(request).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            let classified = err.downcast_ref::<ProviderError>();
            if classified.is_some_and(ProviderError::is_permanent) || retry >= self.policy.max_retries
            {
                return Err(err);
            }

            retry += 1;
            let delay = classified
                .and_then(ProviderError::retry_after_ms)
                .map(|ms| Duration::from_millis(ms).min(self.policy.max_delay))
                .unwrap_or_else(|| self.policy.backoff(retry));
            tracing::warn!(
                provider = self.inner.name(),
                model = %request.model,
                retry,
                delay_ms = delay.as_millis() as u64,
                "provider call failed, retrying: {err:#}"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        self.inner.available_models()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use tokio::time::Instant;

    use super::*;
    use metacog_core::traits::TokenUsage;

    /// Fails with the queued errors, then succeeds.
    struct Flaky {
        errors: Mutex<VecDeque<ProviderError>>,
        calls: Mutex<u32>,
    }

    impl Flaky {
        fn new(errors: impl IntoIterator<Item = ProviderError>) -> Arc<Self> {
            Arc::new(Self {
                errors: Mutex::new(errors.into_iter().collect()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl LlmProvider for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
            *self.calls.lock().unwrap() += 1;
            if let Some(err) = self.errors.lock().unwrap().pop_front() {
                return Err(err.into());
            }
            Ok(GenerateResponse {
                content: "ok".into(),
                model: request.model.clone(),
                token_usage: TokenUsage::default(),
                latency_ms: 0,
            })
        }

        fn available_models(&self) -> Vec<ModelInfo> {
            vec![]
        }
    }

    fn request() -> GenerateRequest {
        GenerateRequest {
            model: "m".into(),
            prompt: "p".into(),
            system_prompt: None,
            max_tokens: 16,
            temperature: 0.0,
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(10, Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(4), Duration::from_secs(8));
        assert_eq!(policy.backoff(7), MAX_DELAY);
        assert_eq!(policy.backoff(40), MAX_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_with_backoff() {
        let flaky = Flaky::new([
            ProviderError::NetworkError("reset".into()),
            ProviderError::Timeout(30),
        ]);
        let provider = RetryingProvider::new(flaky.clone(), RetryPolicy::default());

        let start = Instant::now();
        let response = provider.generate(&request()).await.unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(flaky.calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_hint_is_honoured() {
        let flaky = Flaky::new([ProviderError::RateLimited {
            retry_after_ms: 7000,
        }]);
        let provider = RetryingProvider::new(flaky.clone(), RetryPolicy::default());

        let start = Instant::now();
        provider.generate(&request()).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_hint_is_capped() {
        let flaky = Flaky::new([ProviderError::RateLimited {
            retry_after_ms: 600_000,
        }]);
        let provider = RetryingProvider::new(flaky.clone(), RetryPolicy::default());

        let start = Instant::now();
        provider.generate(&request()).await.unwrap();
        assert_eq!(start.elapsed(), MAX_DELAY);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let flaky = Flaky::new([ProviderError::AuthenticationFailed("bad key".into())]);
        let provider = RetryingProvider::new(flaky.clone(), RetryPolicy::default());

        let err = provider.generate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("authentication failed"));
        assert_eq!(flaky.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let flaky = Flaky::new((0..5).map(|_| ProviderError::NetworkError("down".into())));
        let provider = RetryingProvider::new(flaky.clone(), RetryPolicy::new(2, Duration::from_millis(10)));

        let err = provider.generate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("down"));
        assert_eq!(flaky.calls(), 3);
    }

    #[tokio::test]
    async fn zero_retries_means_one_attempt() {
        let flaky = Flaky::new([ProviderError::NetworkError("down".into())]);
        let provider = RetryingProvider::new(flaky.clone(), RetryPolicy::new(0, Duration::ZERO));
        assert!(provider.generate(&request()).await.is_err());
        assert_eq!(flaky.calls(), 1);
        assert_eq!(provider.name(), "flaky");
    }
}
