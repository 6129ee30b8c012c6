//! Runtime settings for catalog hosts.
//!
//! Loaded from `PAPERCAT_*` environment variables through the `config`
//! crate, e.g. `PAPERCAT_BUSY_TIMEOUT_MS=250`. Unset or empty variables fall
//! back to the serde defaults below.

use crate::db::DbOpenOptions;
use crate::logging::default_log_level;
use config::{Config, Environment, Map};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub use config::ConfigError;

pub const ENV_PREFIX: &str = "PAPERCAT";

/// Settings a host needs to open the catalog and start logging.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default = "default_level")]
    pub log_level: String,
    /// Logging stays off when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_busy_timeout_ms() -> u64 {
    DbOpenOptions::default().busy_timeout.as_millis() as u64
}

fn default_level() -> String {
    default_log_level().to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            log_level: default_level(),
            log_dir: None,
        }
    }
}

impl CatalogConfig {
    /// Reads `PAPERCAT_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Environment::with_prefix(ENV_PREFIX))
    }

    /// Reads `PAPERCAT_*` entries from `vars` instead of the process environment.
    pub fn from_vars(vars: Map<String, String>) -> Result<Self, ConfigError> {
        Self::load(Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
    }

    fn load(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(environment.try_parsing(true).ignore_empty(true))
            .build()?
            .try_deserialize()
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn db_options(&self) -> DbOpenOptions {
        DbOpenOptions {
            busy_timeout: self.busy_timeout(),
        }
    }
}
