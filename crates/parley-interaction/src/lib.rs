//! Language-model backends for Parley.
//!
//! A single capability interface ([`LanguageModel`]) with implementations
//! selected by configuration: an OpenAI-compatible HTTP agent for real
//! providers and deterministic simulated agents for offline use.

pub mod json_output;
pub mod metrics;
pub mod openai_agent;
pub mod simulated_agent;

use async_trait::async_trait;
use parley_core::ParleyError;
use parley_core::config::{ModelConfig, SecretConfig};
use thiserror::Error;

pub use metrics::MetricsCollector;
pub use openai_agent::OpenAiAgent;
pub use simulated_agent::SimulatedAgent;

/// Error from a language-model backend.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The agent could not run at all (missing key, bad payload).
    #[error("Agent execution failed: {0}")]
    ExecutionFailed(String),

    /// The provider returned an error or was unreachable.
    #[error("Provider error (status: {status_code:?}): {message}")]
    ProcessError {
        status_code: Option<u16>,
        message: String,
        is_retryable: bool,
    },

    /// Anything else (malformed response body, invalid JSON output).
    #[error("{0}")]
    Other(String),
}

impl From<AgentError> for ParleyError {
    fn from(err: AgentError) -> Self {
        ParleyError::Generation(err.to_string())
    }
}

/// Single capability interface for text generation.
///
/// One user turn maps to exactly one `generate` call; failures are
/// recoverable at the turn level and never corrupt the journal (the
/// user's message is recorded before this is invoked).
#[async_trait]
pub trait LanguageModel: Send + Sync + std::fmt::Debug {
    /// Stable backend name, used for metrics and display.
    fn name(&self) -> &str;

    /// Generates a completion for the prompt.
    async fn generate(&self, prompt: &str) -> Result<String, AgentError>;
}

/// Backend names that resolve to local simulated agents.
const SIMULATED_BACKENDS: &[&str] = &["deepseek", "llama-2"];

/// Selects a backend from configuration.
///
/// "deepseek" and "llama-2" resolve to simulated stand-ins; any other
/// name is treated as an OpenAI-compatible model id and requires an API
/// key in secret.json.
pub fn model_for(
    config: &ModelConfig,
    secrets: &SecretConfig,
) -> Result<Box<dyn LanguageModel>, AgentError> {
    if SIMULATED_BACKENDS.contains(&config.name.as_str()) {
        return Ok(Box::new(SimulatedAgent::new(config.name.clone())));
    }
    let agent = OpenAiAgent::from_secrets(config, secrets)?;
    Ok(Box::new(agent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::config::ProviderConfig;

    #[test]
    fn test_factory_selects_simulated_backend_without_a_key() {
        let config = ModelConfig {
            name: "deepseek".to_string(),
            ..ModelConfig::default()
        };
        let model = model_for(&config, &SecretConfig::default()).unwrap();
        assert_eq!(model.name(), "deepseek");
    }

    #[test]
    fn test_factory_requires_key_for_api_backend() {
        let config = ModelConfig::default();
        let err = model_for(&config, &SecretConfig::default()).unwrap_err();
        assert!(matches!(err, AgentError::ExecutionFailed(_)));
    }

    #[test]
    fn test_factory_builds_api_backend_with_key() {
        let config = ModelConfig::default();
        let secrets = SecretConfig {
            openai: Some(ProviderConfig {
                api_key: "sk-test".to_string(),
                model_name: None,
                base_url: None,
            }),
        };
        let model = model_for(&config, &secrets).unwrap();
        assert_eq!(model.name(), "gpt-3.5-turbo");
    }
}
