//! Unified path management for parley configuration and data files.
//!
//! All parley configuration, secrets, and journal data live under a
//! single per-user configuration directory so every storage component
//! resolves locations the same way.

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Unified path management for parley.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/parley/            # Config directory
/// ├── config.toml              # Application configuration
/// ├── secret.json              # API keys
/// ├── journal/
/// │   └── conversations.json   # The conversation journal
/// └── logs/                    # Application logs
/// ```
pub struct ParleyPaths;

impl ParleyPaths {
    /// Returns the parley configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory (e.g., `~/.config/parley/`)
    /// - `Err(PathError::HomeDirNotFound)`: Could not determine directory
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join("parley"))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// # Security Note
    ///
    /// Ensure this file has appropriate permissions (e.g., 600) to prevent
    /// unauthorized access.
    pub fn secret_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("secret.json"))
    }

    /// Returns the path to the conversation journal file.
    pub fn journal_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("journal").join("conversations.json"))
    }

    /// Returns the path to the logs directory.
    pub fn logs_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("logs"))
    }

    /// Ensures the secret file exists, creating it with a template if it
    /// doesn't.
    ///
    /// The template contains an empty `openai` entry so the expected
    /// structure is visible to whoever fills it in.
    ///
    /// # Security Note
    ///
    /// This function sets file permissions to 600 (user read/write only)
    /// on Unix systems.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to the secret file (existing or newly created)
    /// - `Err(std::io::Error)`: If file creation or permission setting fails
    pub fn ensure_secret_file() -> Result<PathBuf, std::io::Error> {
        let secret_path = Self::secret_file()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()))?;

        if secret_path.exists() {
            return Ok(secret_path);
        }

        if let Some(parent) = secret_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        use parley_core::config::{ProviderConfig, SecretConfig};

        let template_config = SecretConfig {
            openai: Some(ProviderConfig {
                api_key: String::new(),
                model_name: Some("gpt-3.5-turbo".to_string()),
                base_url: None,
            }),
        };

        let template_json = serde_json::to_string_pretty(&template_config)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        std::fs::write(&secret_path, template_json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&secret_path, permissions)?;
        }

        Ok(secret_path)
    }
}
