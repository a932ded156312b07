//! Typed access to persisted dashboard settings
//!
//! Reading never fails: a missing key yields the default, and a corrupt value
//! or an unavailable backend is logged and replaced with the default.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::alerts::AlertThresholds;
use crate::storage::{MemoryBackend, SettingsBackend, StorageError};

pub const ALERT_THRESHOLDS_KEY: &str = "alertThresholds";
pub const REFRESH_INTERVAL_KEY: &str = "refreshInterval";
pub const THEME_KEY: &str = "theme";
pub const LAYOUT_KEY: &str = "layout";
pub const HIGH_CONTRAST_KEY: &str = "highContrast";

/// Poll interval used when nothing else is configured
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 2000;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("refresh interval must be greater than zero")]
    ZeroInterval,

    #[error("failed to encode {key}: {source}")]
    Encode {
        key: &'static str,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("unknown theme {other:?}")),
        }
    }
}

/// Settings store shared by the scheduler and the binary
#[derive(Clone)]
pub struct Settings {
    backend: Arc<dyn SettingsBackend>,
}

impl Settings {
    pub fn new(backend: Arc<dyn SettingsBackend>) -> Self {
        Self { backend }
    }

    /// Settings without persistence
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn backend(&self) -> &Arc<dyn SettingsBackend> {
        &self.backend
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("failed to read setting {key}, using default: {e}");
                None
            }
        }
    }

    /// Persisted thresholds merged over the defaults
    #[instrument(skip(self))]
    pub async fn thresholds(&self) -> AlertThresholds {
        let Some(raw) = self.read(ALERT_THRESHOLDS_KEY).await else {
            return AlertThresholds::default();
        };

        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => AlertThresholds::from_persisted(&value),
            Err(e) => {
                warn!("corrupt {ALERT_THRESHOLDS_KEY} ({e}), using defaults");
                AlertThresholds::default()
            }
        }
    }

    pub async fn save_thresholds(&self, thresholds: &AlertThresholds) -> Result<(), SettingsError> {
        let encoded = serde_json::to_string(thresholds).map_err(|source| SettingsError::Encode {
            key: ALERT_THRESHOLDS_KEY,
            source,
        })?;

        self.backend.set(ALERT_THRESHOLDS_KEY, &encoded).await?;
        debug!("saved thresholds {encoded}");
        Ok(())
    }

    /// Persisted poll interval, if one was stored and is usable
    pub async fn stored_refresh_interval_ms(&self) -> Option<u64> {
        let raw = self.read(REFRESH_INTERVAL_KEY).await?;

        match raw.trim().parse::<u64>() {
            Ok(0) | Err(_) => {
                warn!("ignoring invalid {REFRESH_INTERVAL_KEY} {raw:?}");
                None
            }
            Ok(ms) => Some(ms),
        }
    }

    pub async fn refresh_interval_ms(&self) -> u64 {
        self.stored_refresh_interval_ms()
            .await
            .unwrap_or(DEFAULT_REFRESH_INTERVAL_MS)
    }

    pub async fn save_refresh_interval_ms(&self, interval_ms: u64) -> Result<(), SettingsError> {
        if interval_ms == 0 {
            return Err(SettingsError::ZeroInterval);
        }

        self.backend
            .set(REFRESH_INTERVAL_KEY, &interval_ms.to_string())
            .await?;
        Ok(())
    }

    pub async fn theme(&self) -> Theme {
        let Some(raw) = self.read(THEME_KEY).await else {
            return Theme::default();
        };

        raw.parse().unwrap_or_else(|e| {
            warn!("{e}, using {}", Theme::default());
            Theme::default()
        })
    }

    pub async fn save_theme(&self, theme: Theme) -> Result<(), SettingsError> {
        self.backend.set(THEME_KEY, theme.as_str()).await?;
        Ok(())
    }

    /// Section ids in display order; empty means the default layout
    pub async fn layout(&self) -> Vec<String> {
        let Some(raw) = self.read(LAYOUT_KEY).await else {
            return Vec::new();
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("corrupt {LAYOUT_KEY} ({e}), using default layout");
            Vec::new()
        })
    }

    pub async fn save_layout(&self, order: &[String]) -> Result<(), SettingsError> {
        let encoded = serde_json::to_string(order).map_err(|source| SettingsError::Encode {
            key: LAYOUT_KEY,
            source,
        })?;

        self.backend.set(LAYOUT_KEY, &encoded).await?;
        Ok(())
    }

    pub async fn high_contrast(&self) -> bool {
        match self.read(HIGH_CONTRAST_KEY).await.as_deref().map(str::trim) {
            None => false,
            Some("true") => true,
            Some("false") => false,
            Some(other) => {
                warn!("ignoring invalid {HIGH_CONTRAST_KEY} {other:?}");
                false
            }
        }
    }

    pub async fn save_high_contrast(&self, enabled: bool) -> Result<(), SettingsError> {
        self.backend
            .set(HIGH_CONTRAST_KEY, if enabled { "true" } else { "false" })
            .await?;
        Ok(())
    }
}
