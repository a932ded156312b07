//! Message types for the scheduler actor and its subscribers
//!
//! 1. **Commands**: request/response messages sent to the scheduler via mpsc
//! 2. **Events**: broadcast notifications for rendering collaborators

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::alerts::{Alert, AlertThresholds, ThresholdOutcome, ThresholdUpdate};
use crate::dashboard::ChartData;
use crate::settings::SettingsError;
use crate::snapshot::{Endpoint, Snapshot};
use crate::sync::error::SyncError;

/// What started a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Scheduled,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient user-facing message (toast)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Why an alert left the active set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearReason {
    /// Condition observed false
    Resolved,
    /// Display timeout elapsed
    Expired,
}

/// Event published to rendering collaborators
///
/// Slow subscribers may lag and lose events; the next `Snapshot` event
/// carries the full state again.
#[derive(Debug, Clone)]
pub enum DashboardEvent {
    /// A validated snapshot was applied
    Snapshot {
        snapshot: Arc<Snapshot>,
        charts: Arc<ChartData>,
    },

    AlertRaised(Alert),

    AlertCleared { id: String, reason: ClearReason },

    Notification(Notification),
}

/// Summary of one applied cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub trigger: Trigger,
    pub taken_at: DateTime<Utc>,
    /// Optional sections that failed this cycle
    pub failed: Vec<Endpoint>,
    pub raised: BTreeSet<String>,
    pub cleared: BTreeSet<String>,
    pub elapsed: Duration,
}

/// Read-only state of the dashboard
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub latest: Option<Arc<Snapshot>>,
    pub last_update: Option<DateTime<Utc>>,
    pub active_alerts: Vec<Alert>,
    pub thresholds: AlertThresholds,
    pub charts: ChartData,
    pub interval: Duration,
    /// Rolling average over the last cycles, if any ran
    pub average_cycle: Option<Duration>,
    pub cycles: u64,
}

/// Commands that can be sent to the scheduler
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Run a manual cycle once the in-flight one (if any) is done
    RefreshNow {
        respond_to: oneshot::Sender<Result<CycleOutcome, SyncError>>,
    },

    /// Change, persist and re-arm the poll interval
    UpdateInterval {
        interval_ms: u64,
        respond_to: oneshot::Sender<Result<(), SettingsError>>,
    },

    /// Validate and apply a threshold edit
    UpdateThresholds {
        update: ThresholdUpdate,
        respond_to: oneshot::Sender<ThresholdOutcome>,
    },

    GetState {
        respond_to: oneshot::Sender<DashboardView>,
    },

    /// Stop the timer; no further cycles are issued
    Shutdown,
}
