//! JSON post-processing for model output.
//!
//! Models asked for JSON often wrap it in prose. `filter_to_json` cuts
//! the object out of the surrounding text; `generate_json` keeps asking
//! until the reply parses, hardening the prompt after each failure.

use serde_json::Value;

use crate::{AgentError, LanguageModel};

const STRICT_JSON_INSTRUCTION: &str =
    "\nReturn only valid JSON. Do not include any additional text.";

/// Filters invalid content and tries to parse the valid json string.
///
/// Takes the span from the first `{` to the last `}` and parses it,
/// so a reply like `Here you go: {"a": 1}` still yields the object.
pub fn filter_to_json(text: &str) -> Result<Value, AgentError> {
    match (text.find('{'), text.rfind('}')) {
        (Some(left), Some(right)) if left < right => {
            serde_json::from_str(&text[left..=right])
                .map_err(|e| AgentError::Other(format!("Invalid JSON in model output: {e}")))
        }
        _ => Err(AgentError::Other(
            "No JSON object found in model output".to_string(),
        )),
    }
}

/// Calls the model until its reply parses as JSON.
///
/// After each parse failure the prompt is extended with a strict-JSON
/// instruction and the model is called again, up to `max_retries`
/// attempts in total. Transport errors are not retried here; they
/// propagate immediately.
pub async fn generate_json(
    model: &dyn LanguageModel,
    prompt: &str,
    max_retries: u32,
) -> Result<Value, AgentError> {
    let mut prompt = prompt.to_string();

    for attempt in 1..=max_retries {
        let reply = model.generate(&prompt).await?;
        match filter_to_json(&reply) {
            Ok(value) => {
                tracing::debug!(attempt, "valid JSON received");
                return Ok(value);
            }
            Err(_) => {
                tracing::warn!(attempt, "model reply was not valid JSON, retrying");
                prompt.push_str(STRICT_JSON_INSTRUCTION);
            }
        }
    }

    Err(AgentError::Other(format!(
        "No valid JSON after {max_retries} attempts"
    )))
}
