//! Secret service implementation.
//!
//! This module provides a service for managing secret configuration (API
//! keys) stored in secret.json.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use parley_core::config::SecretConfig;
use parley_core::error::{ParleyError, Result};

use crate::paths::ParleyPaths;

/// Service for managing secret configuration.
///
/// This implementation reads secret configuration from secret.json and
/// caches it to avoid repeated file I/O operations. The file is created
/// from a template (with 600 permissions on Unix) when absent, so users
/// always have a skeleton to fill in.
#[derive(Debug, Clone)]
pub struct SecretService {
    /// File the secrets are read from.
    path: PathBuf,
    /// Cached secret config loaded from storage.
    secrets: Arc<RwLock<Option<SecretConfig>>>,
}

impl SecretService {
    /// Creates a SecretService over the default secret.json location,
    /// creating the template file if it does not exist yet.
    pub fn new() -> Result<Self> {
        let path = ParleyPaths::ensure_secret_file()?;
        Ok(Self::with_file(path))
    }

    /// Creates a SecretService over an explicit file path.
    pub fn with_file(path: PathBuf) -> Self {
        Self {
            path,
            secrets: Arc::new(RwLock::new(None)),
        }
    }

    /// Loads the secrets, reading the file on first access.
    ///
    /// # Errors
    ///
    /// Returns [`ParleyError::CorruptData`] when the file exists but is
    /// not valid JSON. A missing file yields the empty config.
    pub fn load_secrets(&self) -> Result<SecretConfig> {
        {
            let read_lock = self.secrets.read().unwrap();
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let loaded = if self.path.exists() {
            let raw = std::fs::read_to_string(&self.path)?;
            serde_json::from_str(&raw).map_err(|e| {
                ParleyError::corrupt_data(format!("{}: {}", self.path.display(), e))
            })?
        } else {
            SecretConfig::default()
        };

        {
            let mut write_lock = self.secrets.write().unwrap();
            *write_lock = Some(loaded.clone());
        }

        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_empty_config() {
        let temp_dir = TempDir::new().unwrap();
        let service = SecretService::with_file(temp_dir.path().join("secret.json"));
        let secrets = service.load_secrets().unwrap();
        assert!(secrets.openai.is_none());
    }

    #[test]
    fn test_loads_api_key() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secret.json");
        std::fs::write(&path, r#"{"openai": {"api_key": "sk-test"}}"#).unwrap();

        let service = SecretService::with_file(path);
        let secrets = service.load_secrets().unwrap();
        assert_eq!(secrets.openai.unwrap().api_key, "sk-test");
    }

    #[test]
    fn test_unparsable_file_is_corrupt_data() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secret.json");
        std::fs::write(&path, "not json").unwrap();

        let service = SecretService::with_file(path);
        let err = service.load_secrets().unwrap_err();
        assert!(err.is_corrupt_data());
    }
}
