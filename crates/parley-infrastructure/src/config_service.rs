//! Configuration service implementation.
//!
//! This module provides a ConfigService that loads the root configuration
//! from the configuration file (~/.config/parley/config.toml).

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use parley_core::config::RootConfig;
use parley_core::error::{ParleyError, Result};

use crate::paths::ParleyPaths;

/// Configuration service that loads and caches the root configuration.
///
/// This implementation reads the configuration from config.toml
/// and caches it to avoid repeated file I/O operations. A missing file
/// is populated with the defaults on first load, so a fresh install
/// always ends up with an editable config on disk.
#[derive(Debug, Clone)]
pub struct ConfigService {
    /// File the configuration is read from.
    path: PathBuf,
    /// Cached configuration loaded from file.
    /// Uses RwLock for thread-safe lazy loading.
    config: Arc<RwLock<Option<RootConfig>>>,
}

impl ConfigService {
    /// Creates a ConfigService over the default config.toml location.
    pub fn new() -> Result<Self> {
        let path = ParleyPaths::config_file()
            .map_err(|e| ParleyError::config(format!("Failed to resolve config path: {}", e)))?;
        Ok(Self::with_file(path))
    }

    /// Creates a ConfigService over an explicit file path.
    pub fn with_file(path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the root configuration, loading from file if not cached.
    ///
    /// An unreadable or unparsable file falls back to the defaults; the
    /// failure is logged rather than propagated so a broken config never
    /// prevents startup.
    pub fn get_config(&self) -> RootConfig {
        {
            let read_lock = self.config.read().unwrap();
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = match self.load_config() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to load config, using defaults");
                RootConfig::default()
            }
        };

        {
            let mut write_lock = self.config.write().unwrap();
            *write_lock = Some(loaded.clone());
        }

        loaded
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap();
        *write_lock = None;
    }

    /// Loads RootConfig from the config file, writing the defaults when
    /// the file does not exist yet.
    fn load_config(&self) -> Result<RootConfig> {
        if !self.path.exists() {
            let default_config = RootConfig::default();
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let raw = toml::to_string_pretty(&default_config)
                .map_err(|e| ParleyError::internal(format!("Failed to serialize default config: {}", e)))?;
            std::fs::write(&self.path, raw)?;
            return Ok(default_config);
        }

        let raw = std::fs::read_to_string(&self.path)?;
        let config: RootConfig = toml::from_str(&raw)?;
        Ok(config)
    }
}
