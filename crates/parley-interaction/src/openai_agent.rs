//! OpenAiAgent - Direct REST API implementation for OpenAI-compatible
//! chat-completion endpoints.
//!
//! This agent calls the chat completions API directly. Configuration is
//! loaded from secret.json; sampling parameters come from config.toml.

use async_trait::async_trait;
use parley_core::config::{ModelConfig, SecretConfig};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{AgentError, LanguageModel};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Agent implementation that talks to an OpenAI-compatible HTTP API.
#[derive(Clone, Debug)]
pub struct OpenAiAgent {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiAgent {
    /// Creates a new agent with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let defaults = ModelConfig::default();
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
        }
    }

    /// Builds an agent from the model config and secret.json contents.
    ///
    /// The secret's `model_name` overrides the configured name; the
    /// secret's `base_url` points the agent at a compatible endpoint.
    pub fn from_secrets(config: &ModelConfig, secrets: &SecretConfig) -> Result<Self, AgentError> {
        let provider = secrets.openai.as_ref().ok_or_else(|| {
            AgentError::ExecutionFailed(
                "OpenAI configuration not found in secret.json".to_string(),
            )
        })?;
        if provider.api_key.is_empty() {
            return Err(AgentError::ExecutionFailed(
                "OpenAI API key in secret.json is empty".to_string(),
            ));
        }

        let model = provider
            .model_name
            .clone()
            .unwrap_or_else(|| config.name.clone());

        let mut agent = Self::new(provider.api_key.clone(), model)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens);
        if let Some(base_url) = &provider.base_url {
            agent = agent.with_base_url(base_url.clone());
        }
        Ok(agent)
    }

    /// Overrides the sampling temperature after construction.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Overrides the reply token budget after construction.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Points the agent at an OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn send_request(&self, body: &ChatCompletionRequest) -> Result<String, AgentError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| AgentError::ProcessError {
                status_code: None,
                message: format!("Chat completion request failed: {err}"),
                is_retryable: err.is_connect() || err.is_timeout(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| AgentError::Other(format!("Failed to parse chat completion response: {err}")))?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl LanguageModel for OpenAiAgent {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        self.send_request(&request).await
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String, AgentError> {
    response
        .choices
        .and_then(|mut choices| {
            if choices.is_empty() {
                None
            } else {
                choices.swap_remove(0).message
            }
        })
        .and_then(|message| message.content)
        .ok_or_else(|| {
            AgentError::ExecutionFailed("Chat completion returned no message content".into())
        })
}

fn map_http_error(status: StatusCode, body: String) -> AgentError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let kind = wrapper.error.kind.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if kind.is_empty() {
                msg
            } else {
                format!("{kind}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    AgentError::ProcessError {
        status_code: Some(status.as_u16()),
        message,
        is_retryable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_response() {
        let response = ChatCompletionResponse {
            choices: Some(vec![Choice {
                message: Some(ChoiceMessage {
                    content: Some("hello".to_string()),
                }),
            }]),
        };
        assert_eq!(extract_text_response(response).unwrap(), "hello");
    }

    #[test]
    fn test_extract_text_response_empty_choices() {
        let response = ChatCompletionResponse {
            choices: Some(vec![]),
        };
        assert!(extract_text_response(response).is_err());
    }

    #[test]
    fn test_rate_limit_is_retryable() {
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error": {"message": "slow down", "type": "rate_limit_exceeded"}}"#.to_string(),
        );
        match err {
            AgentError::ProcessError {
                status_code,
                message,
                is_retryable,
            } => {
                assert_eq!(status_code, Some(429));
                assert!(is_retryable);
                assert!(message.contains("slow down"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bad_request_is_not_retryable() {
        let err = map_http_error(StatusCode::BAD_REQUEST, "nope".to_string());
        match err {
            AgentError::ProcessError { is_retryable, .. } => assert!(!is_retryable),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
