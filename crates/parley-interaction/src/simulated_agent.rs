//! Deterministic stand-in backends.
//!
//! Useful for demos and tests: no API key, no network, and the reply is
//! a pure function of the prompt.

use async_trait::async_trait;

use crate::{AgentError, LanguageModel};

/// Agent that echoes the prompt back under a provider name.
#[derive(Debug)]
pub struct SimulatedAgent {
    name: String,
}

impl SimulatedAgent {
    /// Creates a simulated agent answering as `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl LanguageModel for SimulatedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
        Ok(format!("Simulated {} reply: {}", self.name, prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reply_is_deterministic() {
        let agent = SimulatedAgent::new("deepseek");
        let first = agent.generate("hola").await.unwrap();
        let second = agent.generate("hola").await.unwrap();
        assert_eq!(first, second);
        assert!(first.contains("hola"));
    }
}
