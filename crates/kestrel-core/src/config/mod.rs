//! Configuration types for Kestrel.
//!
//! A single YAML file (conventionally `kestrel.yaml`) configures logging, the
//! profile store and the translation engine. Every section is optional, so an
//! empty file yields the defaults.
//!
//! ```yaml
//! logging:
//!   level: debug
//!   format: compact
//! store:
//!   backend: file
//!   directory: data/profiles
//! translation:
//!   max_include_depth: 8
//!   system_profiles_dir: profiles/system
//! ```

pub mod logging;
pub mod store;
pub mod translation;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use logging::{LogFormat, LoggingConfig};
pub use store::{StoreBackend, StoreConfig};
pub use translation::TranslationConfig;

/// Complete Kestrel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KestrelConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub translation: TranslationConfig,
}

/// Error loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl KestrelConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // serde_yaml rejects an empty document for a struct
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration and resolve relative paths against the file's directory.
    pub fn load_with_context(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_file(path)?;

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        if config.store.directory.is_relative() {
            config.store.directory = base_dir.join(&config.store.directory);
        }
        if let Some(dir) = &config.translation.system_profiles_dir {
            if dir.is_relative() {
                config.translation.system_profiles_dir = Some(base_dir.join(dir));
            }
        }

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.translation.max_include_depth == 0 {
            return Err(ConfigError::Config(
                "translation.max_include_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
