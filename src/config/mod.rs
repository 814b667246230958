//! Application configuration.
//!
//! Loaded from YAML files and environment variables into a single
//! [`Config`] struct.

mod storage;

pub use storage::{StorageConfig, IN_MEMORY_PATH};

use serde::Deserialize;
use uuid::Uuid;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "bookstore.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "BOOKSTORE_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "BOOKSTORE";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "BOOKSTORE_LOG";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Data key configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DataKeyConfig {
    /// Key used for every context the binary opens. When unset each context
    /// gets a fresh random key.
    pub fixed: Option<Uuid>,
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Data key configuration.
    pub data_key: DataKeyConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `bookstore.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Create config for testing: an in-memory database.
    pub fn for_test() -> Self {
        Self {
            storage: StorageConfig {
                path: IN_MEMORY_PATH.to_string(),
                ..StorageConfig::default()
            },
            data_key: DataKeyConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.storage.path, "bookstore.db");
        assert!(config.data_key.fixed.is_none());
    }

    #[test]
    fn test_config_for_test() {
        let config = Config::for_test();
        assert!(config.storage.is_in_memory());
    }

    #[test]
    fn test_config_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("create temp config");
        writeln!(
            file,
            "storage:\n  path: /tmp/books.db\n  max_connections: 2\ndata_key:\n  fixed: 6f1c2a3b-4d5e-4f60-8a7b-9c0d1e2f3a4b"
        )
        .expect("write temp config");

        let path = file.path().to_str().expect("utf-8 path");
        let config = Config::load(Some(path)).expect("load config");

        assert_eq!(config.storage.path, "/tmp/books.db");
        assert_eq!(config.storage.max_connections, 2);
        assert!(config.storage.create_if_missing);
        assert_eq!(
            config.data_key.fixed.map(|k| k.to_string()).as_deref(),
            Some("6f1c2a3b-4d5e-4f60-8a7b-9c0d1e2f3a4b")
        );
    }

    #[test]
    fn test_config_load_missing_explicit_file_fails() {
        assert!(Config::load(Some("/nonexistent/bookstore-config.yaml")).is_err());
    }
}
