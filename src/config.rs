use crate::core::{ProdevError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Database name used when neither the file nor the environment names one.
pub const DEFAULT_DATABASE: &str = "ALX_prodev";

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub database: DbConfig,
    pub stream: StreamConfig,
    pub retry: RetryConfig,
}

/// Where the user_data table lives and who is asking for it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DbConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            host: "localhost".to_string(),
            user: "root".to_string(),
            password: String::new(),
            database: DEFAULT_DATABASE.to_string(),
        }
    }
}

impl DbConfig {
    /// Builds the database settings from `DB_HOST`, `DB_USER`, `DB_PASS` and `DB_NAME`.
    pub fn from_env() -> Self {
        let mut config = DbConfig::default();
        config.apply_env_with(|key| std::env::var(key).ok());
        config
    }

    /// Overrides fields with whatever the lookup returns for the known variables.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("DB_HOST") {
            self.host = host;
        }
        if let Some(user) = lookup("DB_USER") {
            self.user = user;
        }
        if let Some(password) = lookup("DB_PASS") {
            self.password = password;
        }
        if let Some(database) = lookup("DB_NAME") {
            self.database = database;
        }
    }
}

/// Defaults for the streaming commands.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    pub batch_size: usize,
    pub page_size: usize,
    pub age_threshold: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            batch_size: 1000,
            page_size: 100,
            age_threshold: 25,
        }
    }
}

/// Bounded retry with exponential backoff for page fetches.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: usize,
    /// Exponent base in milliseconds; the n-th delay is `base_ms^n * factor`
    pub base_ms: u64,
    /// Multiplier applied to every delay
    pub factor: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            base_ms: 500,
            factor: 2,
            max_delay_ms: 15_000,
        }
    }
}

impl Config {
    /// Lets `DB_*` environment variables win over the file's `[database]` section.
    pub fn apply_env(mut self) -> Self {
        self.database.apply_env_with(|key| std::env::var(key).ok());
        self
    }

    fn validate(self) -> Result<Self> {
        if self.stream.batch_size == 0 {
            return Err(ProdevError::Config("stream.batch_size must be at least 1".to_string()));
        }
        if self.stream.page_size == 0 {
            return Err(ProdevError::Config("stream.page_size must be at least 1".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ProdevError::Config("retry.max_attempts must be at least 1".to_string()));
        }
        Ok(self)
    }
}

/// Parses configuration from TOML text. Missing sections fall back to defaults.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).map_err(|e| ProdevError::Config(e.to_string()))?;
    config.validate()
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
///
/// # Example
///
/// ```no_run
/// let config = prodev::config::load_config("prodev.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| ProdevError::Config(format!("{}: {}", path.display(), e)))?;
    parse_config(&content)
}
