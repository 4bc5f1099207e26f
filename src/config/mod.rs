//! Configuration loading for the ingester.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `PCRE_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::ingest::{DEFAULT_BATCH_SIZE, DEFAULT_POINTS_PER_SAMPLE, FileErrorPolicy, ImportOptions};

/// Upper bound on rows per insert. Four bind parameters per row keeps a full
/// batch well under Postgres' 65535-parameter limit.
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Application configuration derived from `PCRE_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    /// Rows per insert statement (default: 250)
    ///
    /// Environment variable: `PCRE_BATCH_SIZE`
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Sample points per waveform (default: 400)
    ///
    /// Environment variable: `PCRE_POINTS_PER_SAMPLE`
    #[serde(default = "default_points_per_sample")]
    pub points_per_sample: usize,
    /// Per-file failure handling, `continue` or `abort` (default: continue)
    ///
    /// Environment variable: `PCRE_ON_FILE_ERROR`
    #[serde(default)]
    pub on_file_error: FileErrorPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            batch_size: default_batch_size(),
            points_per_sample: default_points_per_sample(),
            on_file_error: FileErrorPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Ingestion tunables carried by this configuration.
    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            batch_size: self.batch_size,
            points_per_sample: self.points_per_sample,
            on_file_error: self.on_file_error,
        }
    }

    /// Applies command-line overrides. Call [`AppConfig::validate`] afterwards.
    pub fn with_overrides(
        mut self,
        batch_size: Option<usize>,
        on_file_error: Option<FileErrorPolicy>,
    ) -> Self {
        if let Some(batch_size) = batch_size {
            self.batch_size = batch_size;
        }
        if let Some(policy) = on_file_error {
            self.on_file_error = policy;
        }
        self
    }

    /// Returns a redacted JSON representation (the database password is masked).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        config.database_url = redact_database_url(&config.database_url);
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::InvalidBatchSize {
                value: self.batch_size,
            });
        }

        if self.points_per_sample == 0 {
            return Err(ConfigError::InvalidPointsPerSample {
                value: self.points_per_sample,
            });
        }

        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidDbMaxConnections {
                value: self.db_max_connections,
            });
        }

        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        Ok(())
    }
}

/// Masks the password component of a database URL. Unparseable values are
/// masked entirely.
pub fn redact_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() && url.set_password(Some("[REDACTED]")).is_err() {
                return "[REDACTED]".to_string();
            }
            url.to_string()
        }
        Err(_) => "[REDACTED]".to_string(),
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "postgresql://postgres@localhost:5432/PCRE".to_string()
}

fn default_db_max_connections() -> u32 {
    5
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_points_per_sample() -> usize {
    DEFAULT_POINTS_PER_SAMPLE
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("database URL is missing; set PCRE_DATABASE_URL")]
    MissingDatabaseUrl,
    #[error("batch size must be between 1 and {MAX_BATCH_SIZE}, got {value}")]
    InvalidBatchSize { value: usize },
    #[error("points per sample must be positive, got {value}")]
    InvalidPointsPerSample { value: usize },
    #[error("database max connections must be positive, got {value}")]
    InvalidDbMaxConnections { value: u32 },
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error("invalid file error policy: {message}")]
    InvalidFileErrorPolicy { message: String },
    #[error("PCRE_{key} must be a non-negative integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
}

/// Removes `key` and parses it. Unset or empty keys take the default; any
/// other unparseable value is an error rather than a silent fallback.
fn take_number<T: std::str::FromStr>(
    layered: &mut BTreeMap<String, String>,
    key: &'static str,
    default: impl FnOnce() -> T,
) -> Result<T, ConfigError> {
    match layered.remove(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
        _ => Ok(default()),
    }
}

/// Loads configuration using layered `.env` files and `PCRE_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads and validates configuration.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let config = self.read()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration without range checks. Callers that apply their
    /// own overrides (the CLI) validate the result afterwards.
    pub fn read(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("PCRE_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let database_url = layered
            .remove("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_database_url);
        let db_max_connections =
            take_number(&mut layered, "DB_MAX_CONNECTIONS", default_db_max_connections)?;
        let db_acquire_timeout_ms =
            take_number(&mut layered, "DB_ACQUIRE_TIMEOUT_MS", default_db_acquire_timeout_ms)?;
        let batch_size = take_number(&mut layered, "BATCH_SIZE", default_batch_size)?;
        let points_per_sample =
            take_number(&mut layered, "POINTS_PER_SAMPLE", default_points_per_sample)?;

        // A misspelled policy must not silently fall back to a different behavior.
        let on_file_error = match layered.remove("ON_FILE_ERROR").filter(|v| !v.is_empty()) {
            Some(value) => value
                .parse::<FileErrorPolicy>()
                .map_err(|message| ConfigError::InvalidFileErrorPolicy { message })?,
            None => FileErrorPolicy::default(),
        };

        Ok(AppConfig {
            profile,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            batch_size,
            points_per_sample,
            on_file_error,
        })
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("PCRE_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix("PCRE_") {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
