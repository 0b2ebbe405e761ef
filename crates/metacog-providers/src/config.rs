//! Tool configuration and provider factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use metacog_core::traits::LlmProvider;

use crate::anthropic::AnthropicProvider;
use crate::mock::MockProvider;
use crate::retry::{RetryPolicy, RetryingProvider};

const CONFIG_FILE: &str = "metacog.toml";
const ANTHROPIC_KEY_VAR: &str = "METACOG_ANTHROPIC_KEY";

/// Configuration for a single LLM provider.
///
/// `Debug` masks API keys.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Anthropic {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        /// Request timeout in seconds.
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    Mock {
        /// Directory of JSON files mapping exact prompts to responses.
        #[serde(default)]
        responses_dir: Option<PathBuf>,
        /// Prompt substring to response.
        #[serde(default)]
        responses: HashMap<String, String>,
        #[serde(default)]
        default_response: Option<String>,
        /// Prompts containing any of these fail.
        #[serde(default)]
        fail_on: Vec<String>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Anthropic {
                api_key: _,
                base_url,
                timeout_secs,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("timeout_secs", timeout_secs)
                .finish(),
            ProviderConfig::Mock {
                responses_dir,
                responses,
                default_response,
                fail_on,
            } => f
                .debug_struct("Mock")
                .field("responses_dir", responses_dir)
                .field("responses", &responses.len())
                .field("default_response", default_response)
                .field("fail_on", fail_on)
                .finish(),
        }
    }
}

/// Top-level metacog configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetacogConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default = "default_provider")]
    pub default_provider: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default)]
    pub default_temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Retries on transient provider errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Max concurrent LLM calls.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Weights file; the built-in weights are used when unset.
    #[serde(default)]
    pub weights: Option<PathBuf>,
    /// System prompt for problems that do not carry their own.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_provider() -> String {
    "anthropic".to_string()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_parallelism() -> usize {
    4
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./metacog-results")
}

impl Default for MetacogConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: 0.0,
            max_tokens: default_max_tokens(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            parallelism: default_parallelism(),
            output_dir: default_output_dir(),
            weights: None,
            system_prompt: None,
        }
    }
}

impl MetacogConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: MetacogConfig = toml::from_str(content)?;
        config.resolve_env();
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_delay_ms))
    }

    /// Look up a configured provider. `mock` is always available, with
    /// default responses, even when not configured.
    pub fn provider(&self, name: &str) -> Result<ProviderConfig> {
        if let Some(config) = self.providers.get(name) {
            return Ok(config.clone());
        }
        if name == "mock" {
            return Ok(ProviderConfig::Mock {
                responses_dir: None,
                responses: HashMap::new(),
                default_response: None,
                fail_on: Vec::new(),
            });
        }
        let mut known: Vec<_> = self.providers.keys().map(String::as_str).collect();
        known.sort_unstable();
        anyhow::bail!(
            "provider '{name}' is not configured (configured: {})",
            if known.is_empty() {
                "none".to_string()
            } else {
                known.join(", ")
            }
        )
    }

    /// Apply `METACOG_ANTHROPIC_KEY` and expand `${VAR}` references.
    fn resolve_env(&mut self) {
        if let Ok(key) = std::env::var(ANTHROPIC_KEY_VAR) {
            let entry = self
                .providers
                .entry("anthropic".into())
                .or_insert_with(|| ProviderConfig::Anthropic {
                    api_key: String::new(),
                    base_url: None,
                    timeout_secs: None,
                });
            if let ProviderConfig::Anthropic { api_key, .. } = entry {
                *api_key = key;
            }
        }

        for config in self.providers.values_mut() {
            match config {
                ProviderConfig::Anthropic {
                    api_key, base_url, ..
                } => {
                    *api_key = resolve_env_vars(api_key);
                    if let Some(url) = base_url {
                        *url = resolve_env_vars(url);
                    }
                }
                ProviderConfig::Mock { responses_dir, .. } => {
                    if let Some(dir) = responses_dir {
                        *dir = PathBuf::from(resolve_env_vars(&dir.to_string_lossy()));
                    }
                }
            }
        }
    }
}

/// Expand `${VAR_NAME}` references; unset variables expand to nothing.
fn resolve_env_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&std::env::var(&rest[start + 2..start + len]).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    out
}

/// Load configuration from the well-known locations.
///
/// Search order:
/// 1. `metacog.toml` in the current directory
/// 2. `~/.config/metacog/config.toml`
///
/// Built-in defaults apply when neither exists.
pub fn load_config() -> Result<MetacogConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<MetacogConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => [Some(PathBuf::from(CONFIG_FILE)), global_config_path()]
            .into_iter()
            .flatten()
            .find(|p| p.exists()),
    };

    let Some(path) = config_path else {
        let mut config = MetacogConfig::default();
        config.resolve_env();
        return Ok(config);
    };

    tracing::debug!(path = %path.display(), "loading config");
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    MetacogConfig::from_toml_str(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

fn global_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|h| {
        PathBuf::from(h)
            .join(".config")
            .join("metacog")
            .join("config.toml")
    })
}

/// Create a provider from its configuration, wrapped in the retry policy.
pub fn create_provider(
    config: &ProviderConfig,
    retry: RetryPolicy,
) -> Result<Arc<dyn LlmProvider>> {
    let inner: Arc<dyn LlmProvider> = match config {
        ProviderConfig::Anthropic {
            api_key,
            base_url,
            timeout_secs,
        } => {
            if api_key.is_empty() {
                anyhow::bail!("anthropic api_key is empty; set it in the config or {ANTHROPIC_KEY_VAR}");
            }
            let provider = match timeout_secs {
                Some(secs) => AnthropicProvider::with_timeout(api_key, base_url.clone(), *secs)?,
                None => AnthropicProvider::new(api_key, base_url.clone())?,
            };
            Arc::new(provider)
        }
        ProviderConfig::Mock {
            responses_dir,
            responses,
            default_response,
            fail_on,
        } => {
            let mut substrings: Vec<_> = responses.iter().collect();
            substrings.sort();
            let mut mock = MockProvider::with_substring_responses(
                substrings.into_iter().map(|(k, v)| (k.clone(), v.clone())),
            );
            if let Some(response) = default_response {
                mock = mock.with_default_response(response.clone());
            }
            for needle in fail_on {
                mock = mock.failing_on(needle.clone());
            }
            if let Some(dir) = responses_dir {
                mock = mock.with_responses_dir(dir)?;
            }
            Arc::new(mock)
        }
    };
    Ok(Arc::new(RetryingProvider::new(inner, retry)))
}
