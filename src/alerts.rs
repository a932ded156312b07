//! Threshold evaluation and alert lifecycle
//!
//! ## Alert State Machine
//!
//! Every alert id moves through two states:
//!
//! ```text
//! Inactive ──(condition true)──────────────────────▶ Active   (reported in `to_show`)
//! Active   ──(condition true)──────────────────────▶ Active   (deduplicated, nothing reported)
//! Active   ──(condition false on a later evaluate)──▶ Inactive (reported in `to_clear`)
//! Active   ──(display timeout elapsed)─────────────▶ Inactive (reported by `expire_at`)
//! ```
//!
//! Re-entering `Active` after either exit is a fresh occurrence and is shown again.
//! The engine exclusively owns the active set; renderers only react to the deltas.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, instrument, trace};

use crate::snapshot::{Section, Snapshot};

/// How long an alert stays displayed regardless of its condition
pub const DEFAULT_DISPLAY_TIMEOUT: Duration = Duration::from_secs(10);

pub const CPU_HIGH_USAGE: &str = "cpu_high_usage";
pub const MEMORY_HIGH_USAGE: &str = "memory_high_usage";
pub const HIGH_TEMPERATURE: &str = "high_temperature";
pub const DISK_LOW_PREFIX: &str = "disk_low_";

/// Alert id of the low-disk-space alert for a pool key
pub fn disk_alert_id(pool_key: &str) -> String {
    format!("{DISK_LOW_PREFIX}{pool_key}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdKey {
    Cpu,
    Memory,
    Temperature,
    Disk,
}

impl ThresholdKey {
    pub const ALL: [ThresholdKey; 4] = [
        ThresholdKey::Cpu,
        ThresholdKey::Memory,
        ThresholdKey::Temperature,
        ThresholdKey::Disk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdKey::Cpu => "cpu",
            ThresholdKey::Memory => "memory",
            ThresholdKey::Temperature => "temperature",
            ThresholdKey::Disk => "disk",
        }
    }
}

impl fmt::Display for ThresholdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert limits: percentages for cpu, memory and disk, °C for temperature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertThresholds {
    pub cpu: u32,
    pub memory: u32,
    pub temperature: u32,
    pub disk: u32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            cpu: 90,
            memory: 85,
            temperature: 80,
            disk: 90,
        }
    }
}

impl AlertThresholds {
    pub fn get(&self, key: ThresholdKey) -> u32 {
        match key {
            ThresholdKey::Cpu => self.cpu,
            ThresholdKey::Memory => self.memory,
            ThresholdKey::Temperature => self.temperature,
            ThresholdKey::Disk => self.disk,
        }
    }

    pub fn set(&mut self, key: ThresholdKey, value: u32) {
        match key {
            ThresholdKey::Cpu => self.cpu = value,
            ThresholdKey::Memory => self.memory = value,
            ThresholdKey::Temperature => self.temperature = value,
            ThresholdKey::Disk => self.disk = value,
        }
    }

    /// Merge a persisted JSON object over the defaults
    ///
    /// Missing keys, and keys whose value is not an unsigned 32-bit integer,
    /// keep their default.
    pub fn from_persisted(value: &serde_json::Value) -> Self {
        let mut thresholds = Self::default();

        let Some(object) = value.as_object() else {
            return thresholds;
        };

        for key in ThresholdKey::ALL {
            let parsed = object
                .get(key.as_str())
                .and_then(serde_json::Value::as_u64)
                .and_then(|v| u32::try_from(v).ok());

            if let Some(v) = parsed {
                thresholds.set(key, v);
            }
        }

        thresholds
    }
}

/// A partial, unvalidated threshold edit (e.g. straight from a settings form)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThresholdUpdate {
    values: BTreeMap<ThresholdKey, String>,
}

impl ThresholdUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: ThresholdKey, value: impl Into<String>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ThresholdKey, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// A threshold field that did not parse as an integer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {key} threshold {value:?}: expected a non-negative integer")]
pub struct ThresholdRejection {
    pub key: ThresholdKey,
    pub value: String,
}

/// Result of applying a [`ThresholdUpdate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdOutcome {
    /// Thresholds in effect after the update
    pub thresholds: AlertThresholds,
    pub applied: Vec<ThresholdKey>,
    pub rejected: Vec<ThresholdRejection>,
}

impl ThresholdOutcome {
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub message: String,
    pub severity: AlertSeverity,
}

/// Changes produced by one evaluation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertDelta {
    /// Newly activated alerts, in evaluation order
    pub to_show: Vec<Alert>,
    /// Ids whose condition is no longer true
    pub to_clear: BTreeSet<String>,
}

impl AlertDelta {
    pub fn is_empty(&self) -> bool {
        self.to_show.is_empty() && self.to_clear.is_empty()
    }

    pub fn shown_ids(&self) -> BTreeSet<String> {
        self.to_show.iter().map(|a| a.id.clone()).collect()
    }
}

#[derive(Debug, Clone)]
struct ActiveAlert {
    alert: Alert,
    raised_at: Instant,
}

/// Evaluates snapshots against thresholds and owns the active-alert set
#[derive(Debug, Clone)]
pub struct AlertEngine {
    thresholds: AlertThresholds,
    active: BTreeMap<String, ActiveAlert>,
    display_timeout: Duration,
}

impl AlertEngine {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self {
            thresholds,
            active: BTreeMap::new(),
            display_timeout: DEFAULT_DISPLAY_TIMEOUT,
        }
    }

    pub fn with_display_timeout(mut self, timeout: Duration) -> Self {
        self.display_timeout = timeout;
        self
    }

    pub fn thresholds(&self) -> AlertThresholds {
        self.thresholds
    }

    /// Validate and apply a partial threshold edit
    ///
    /// Each field is parsed on its own: valid fields take effect immediately,
    /// invalid ones are rejected and leave their current value in place.
    #[instrument(skip(self))]
    pub fn set_thresholds(&mut self, update: &ThresholdUpdate) -> ThresholdOutcome {
        let mut applied = Vec::new();
        let mut rejected = Vec::new();

        for (key, raw) in update.iter() {
            match raw.trim().parse::<u32>() {
                Ok(value) => {
                    self.thresholds.set(key, value);
                    applied.push(key);
                }
                Err(_) => {
                    debug!("rejecting {key} threshold {raw:?}");
                    rejected.push(ThresholdRejection {
                        key,
                        value: raw.to_string(),
                    });
                }
            }
        }

        ThresholdOutcome {
            thresholds: self.thresholds,
            applied,
            rejected,
        }
    }

    pub fn evaluate(&mut self, snapshot: &Snapshot) -> AlertDelta {
        self.evaluate_at(snapshot, Instant::now())
    }

    /// Evaluate all conditions of a snapshot, using `now` as activation time
    ///
    /// Conditions of a failed section are unknown and leave their alerts as they are.
    pub fn evaluate_at(&mut self, snapshot: &Snapshot, now: Instant) -> AlertDelta {
        let mut delta = AlertDelta::default();

        for (id, condition) in self.conditions(snapshot) {
            match condition {
                Some(alert) => {
                    if self.active.contains_key(&id) {
                        trace!("{id}: already active");
                        continue;
                    }
                    debug!("{id}: raised ({})", alert.message);
                    self.active.insert(
                        id,
                        ActiveAlert {
                            alert: alert.clone(),
                            raised_at: now,
                        },
                    );
                    delta.to_show.push(alert);
                }
                None => {
                    if self.active.remove(&id).is_some() {
                        debug!("{id}: condition cleared");
                        delta.to_clear.insert(id);
                    }
                }
            }
        }

        delta
    }

    /// Drop every alert displayed for at least the display timeout
    pub fn expire_at(&mut self, now: Instant) -> Vec<String> {
        let timeout = self.display_timeout;
        let expired: Vec<String> = self
            .active
            .iter()
            .filter(|(_, active)| now.saturating_duration_since(active.raised_at) >= timeout)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            self.active.remove(id);
            debug!("{id}: display timeout elapsed");
        }

        expired
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.contains_key(id)
    }

    pub fn active_ids(&self) -> BTreeSet<String> {
        self.active.keys().cloned().collect()
    }

    pub fn active_alerts(&self) -> Vec<Alert> {
        self.active.values().map(|a| a.alert.clone()).collect()
    }

    /// Condition state per tracked id: `Some(alert)` when true, `None` when false
    fn conditions(&self, snapshot: &Snapshot) -> Vec<(String, Option<Alert>)> {
        let thresholds = self.thresholds;
        let mut conditions = Vec::new();

        if let Section::Ok(cpu) = &snapshot.cpu {
            let usage_alert = (cpu.usage > thresholds.cpu as f64).then(|| Alert {
                id: CPU_HIGH_USAGE.to_string(),
                message: format!("High CPU usage: {}%", cpu.usage),
                severity: AlertSeverity::Warning,
            });
            conditions.push((CPU_HIGH_USAGE.to_string(), usage_alert));

            let temperature_alert = cpu
                .temperature
                .filter(|t| *t > thresholds.temperature as f64)
                .map(|t| Alert {
                    id: HIGH_TEMPERATURE.to_string(),
                    message: format!("High temperature: {t:.0}°C"),
                    severity: AlertSeverity::Error,
                });
            conditions.push((HIGH_TEMPERATURE.to_string(), temperature_alert));
        }

        if let Section::Ok(memory) = &snapshot.memory {
            let alert = (memory.percent > thresholds.memory as f64).then(|| Alert {
                id: MEMORY_HIGH_USAGE.to_string(),
                message: format!("High memory usage: {:.1}%", memory.percent),
                severity: AlertSeverity::Warning,
            });
            conditions.push((MEMORY_HIGH_USAGE.to_string(), alert));
        }

        if let Section::Ok(pools) = &snapshot.pools {
            let mut pool_conditions: BTreeMap<String, Option<Alert>> = BTreeMap::new();

            for pool in pools {
                let id = disk_alert_id(pool.key());
                let alert = (pool.percent > thresholds.disk as f64).then(|| Alert {
                    id: id.clone(),
                    message: format!("Low disk space on {}: {:.1}%", pool.name, pool.percent),
                    severity: AlertSeverity::Warning,
                });

                // duplicate keys: any exceeding entry wins
                let entry = pool_conditions.entry(id).or_insert(None);
                if entry.is_none() {
                    *entry = alert;
                }
            }

            // pools that disappeared have no active condition any more
            for id in self.active.keys() {
                if id.starts_with(DISK_LOW_PREFIX) && !pool_conditions.contains_key(id) {
                    pool_conditions.insert(id.clone(), None);
                }
            }

            conditions.extend(pool_conditions);
        }

        conditions
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new(AlertThresholds::default())
    }
}
