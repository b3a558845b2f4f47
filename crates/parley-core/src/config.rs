//! Configuration types.
//!
//! `RootConfig` is what config.toml deserializes into; `SecretConfig`
//! holds API keys and lives in a separate secret.json so the main config
//! can be shared freely.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cache::CacheSettings;

/// Root configuration loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct RootConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub journal: JournalConfig,
}

/// Language-model selection and sampling parameters.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ModelConfig {
    /// Backend name. "deepseek" and "llama-2" resolve to local simulated
    /// backends; anything else is treated as an OpenAI-compatible model id.
    pub name: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 150,
        }
    }
}

/// Recency-cache sizing.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached interactions.
    pub capacity: usize,
    /// Minutes after which a cached interaction expires.
    pub expiry_minutes: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 3,
            expiry_minutes: 30,
        }
    }
}

impl CacheConfig {
    /// Converts to the cache's own settings type.
    pub fn settings(&self) -> CacheSettings {
        CacheSettings {
            capacity: self.capacity,
            expiry: chrono::Duration::minutes(self.expiry_minutes),
        }
    }
}

/// Journal store location.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct JournalConfig {
    /// Overrides the default journal file location when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Secrets (API keys), stored in secret.json.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SecretConfig {
    pub openai: Option<ProviderConfig>,
}

/// Credentials and endpoint for one provider.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    /// Overrides the configured model id for this provider when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    /// OpenAI-compatible endpoints other than api.openai.com.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}
