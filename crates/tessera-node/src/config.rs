//! Pool configuration types
//!
//! Read from a TOML file and layered with `TESSERA_*` environment
//! variables, e.g. `TESSERA_STORAGE__SNAPSHOT_PATH=/var/lib/tessera.snap`.

use crate::journal::DEFAULT_JOURNAL_RETENTION;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tessera_core::{GovernanceParameters, ParameterStore, PoolError, Timestamp};
use thiserror::Error;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "TESSERA";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config load error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid genesis parameters: {0}")]
    Genesis(#[from] PoolError),
}

/// Complete pool configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Genesis parameters and time
    #[serde(default)]
    pub genesis: GenesisConfig,

    /// Snapshot settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl PoolConfig {
    /// Load a TOML file with environment overrides
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: PoolConfig = settings.try_deserialize()?;
        cfg.validate()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(cfg)
    }

    /// Parse from a TOML string, without environment overrides
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: PoolConfig = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject genesis parameters outside their bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.genesis.parameters.validate()?;
        Ok(())
    }

    /// Parameter store seeded from the genesis section
    pub fn parameter_store(&self) -> Result<ParameterStore, ConfigError> {
        Ok(ParameterStore::new(
            self.genesis.parameters.clone(),
            self.genesis.genesis_time,
        )?)
    }
}

/// Genesis configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Timestamp recorded as the parameter store's creation time
    #[serde(default)]
    pub genesis_time: Timestamp,

    /// Initial governed parameters
    #[serde(default)]
    pub parameters: GovernanceParameters,
}

/// Snapshot storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Snapshot file path
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    /// fsync the temp file before renaming it into place
    #[serde(default = "default_true")]
    pub fsync: bool,

    /// Journal entries kept in the snapshot; 0 keeps all
    #[serde(default = "default_journal_retention")]
    pub journal_retention: usize,
}

fn default_snapshot_path() -> String {
    "./tessera.snapshot".to_string()
}

fn default_true() -> bool {
    true
}

fn default_journal_retention() -> usize {
    DEFAULT_JOURNAL_RETENTION
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            fsync: true,
            journal_retention: default_journal_retention(),
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Metrics configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metric name prefix
    #[serde(default = "default_metrics_namespace")]
    pub namespace: String,
}

fn default_metrics_namespace() -> String {
    "tessera".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: default_metrics_namespace(),
        }
    }
}
