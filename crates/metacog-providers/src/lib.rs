//! metacog-providers — LLM backends for metacog.
//!
//! Implements [`LlmProvider`](metacog_core::traits::LlmProvider) for the
//! Anthropic Messages API and a deterministic mock, wraps any provider in a
//! retrying decorator, and loads the tool configuration.

pub mod anthropic;
pub mod config;
pub mod mock;
pub mod retry;

pub use config::{create_provider, load_config, load_config_from, MetacogConfig, ProviderConfig};
pub use metacog_core::ProviderError;
pub use mock::MockProvider;
pub use retry::{RetryPolicy, RetryingProvider};
