//! Configuration management for mentorlink.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::collections::HashSet;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "mentorlink";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `MENTORLINK_`, nested keys split on `__`)
/// 2. TOML config file at `~/.config/mentorlink/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Account configuration.
    pub auth: AuthConfig,
}

/// Which [`RecordTable`](crate::storage::RecordTable) implementation backs the tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One flat CSV file per table.
    #[default]
    Csv,
    /// One `SQLite` database holding every table.
    Sqlite,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the tables.
    /// Defaults to `~/.local/share/mentorlink`
    pub data_dir: Option<PathBuf>,
    /// Storage backend.
    pub backend: StorageBackend,
    /// Accounts table file name (CSV backend).
    pub accounts_file: String,
    /// Profiles table file name (CSV backend).
    pub profiles_file: String,
    /// Feedback table file name (CSV backend).
    pub feedback_file: String,
    /// Database file name (`SQLite` backend).
    pub database_file: String,
}

/// Account-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Refuse a signup whose username is already registered.
    pub unique_usernames: bool,
    /// Refuse a login whose claimed role differs from the role chosen at signup.
    pub verify_role: bool,
    /// Regex every new username must match.
    pub username_pattern: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None, // Will be resolved to default at runtime
            backend: StorageBackend::Csv,
            accounts_file: "user_data.csv".to_string(),
            profiles_file: "students_data.csv".to_string(),
            feedback_file: "feedback_data.csv".to_string(),
            database_file: "mentorlink.db".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            unique_usernames: true,
            verify_role: false,
            username_pattern: r"^\S+$".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("MENTORLINK_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let files = [
            ("accounts_file", &self.storage.accounts_file),
            ("profiles_file", &self.storage.profiles_file),
            ("feedback_file", &self.storage.feedback_file),
            ("database_file", &self.storage.database_file),
        ];

        let mut seen = HashSet::new();
        for (key, name) in files {
            if name.trim().is_empty() {
                return Err(Error::ConfigValidation {
                    message: format!("{key} must not be empty"),
                });
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::ConfigValidation {
                    message: format!("{key} ({name}) is used by more than one table"),
                });
            }
        }

        if regex::Regex::new(&self.auth.username_pattern).is_err() {
            return Err(Error::ConfigValidation {
                message: format!(
                    "invalid username_pattern regex: {}",
                    self.auth.username_pattern
                ),
            });
        }

        Ok(())
    }

    /// Get the data directory, resolving defaults if not set.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Path of the accounts CSV file.
    #[must_use]
    pub fn accounts_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.accounts_file)
    }

    /// Path of the profiles CSV file.
    #[must_use]
    pub fn profiles_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.profiles_file)
    }

    /// Path of the feedback CSV file.
    #[must_use]
    pub fn feedback_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.feedback_file)
    }

    /// Path of the `SQLite` database file.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.database_file)
    }
}
