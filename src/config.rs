//! Configuration file for the dashboard

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::settings::DEFAULT_REFRESH_INTERVAL_MS;

/// Settings storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// No persistence
    Memory,

    /// SQLite database file
    Sqlite {
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pulseboard")
        .join("settings.db")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backend base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Poll interval in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// How long an alert stays displayed, in seconds
    #[serde(default = "default_alert_display")]
    pub alert_display_secs: u64,

    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_interval_ms() -> u64 {
    DEFAULT_REFRESH_INTERVAL_MS
}

fn default_request_timeout() -> u64 {
    10
}

fn default_alert_display() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            interval_ms: default_interval_ms(),
            request_timeout_secs: default_request_timeout(),
            alert_display_secs: default_alert_display(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, or use defaults if no file exists
    ///
    /// Without an explicit path, `~/.config/pulseboard/config.toml` is used
    /// when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).or_else(|| {
            let default_path = dirs::config_dir()?.join("pulseboard").join("config.toml");
            default_path.exists().then_some(default_path)
        });

        let Some(path) = config_path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        trace!("loaded config: {config:?}");
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn alert_display_timeout(&self) -> Duration {
        Duration::from_secs(self.alert_display_secs)
    }
}

/// Poll interval by precedence: CLI, environment, persisted setting, config file
pub fn resolve_interval_ms(
    cli: Option<u64>,
    env: Option<u64>,
    persisted: Option<u64>,
    config: u64,
) -> u64 {
    [cli, env, persisted, Some(config)]
        .into_iter()
        .flatten()
        .find(|ms| *ms > 0)
        .unwrap_or(DEFAULT_REFRESH_INTERVAL_MS)
}
