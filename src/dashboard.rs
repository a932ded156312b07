//! Application state shared by the sync cycle and the renderers
//!
//! [`Dashboard`] is owned by the scheduler task; nothing else mutates it.
//! Renderers only see it through [`DashboardEvent`]s and
//! [`DashboardView`](crate::actors::messages::DashboardView) queries.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, instrument, trace, warn};

use crate::actors::messages::{ClearReason, DashboardEvent, Notification, NotificationLevel};
use crate::alerts::{AlertDelta, AlertEngine, AlertThresholds, ThresholdOutcome, ThresholdUpdate};
use crate::history::{
    CPU_SPARKLINE, CPU_USAGE, HistoryBuffers, MEMORY_PERCENT, NETWORK_DOWNLOAD, NETWORK_UPLOAD,
};
use crate::settings::Settings;
use crate::snapshot::{Section, Snapshot};
use crate::sync::rates::NetworkRates;

/// Height of a full sparkline bar
pub const SPARKLINE_HEIGHT: f64 = 100.0;

const EVENT_CAPACITY: usize = 64;

/// Chart series as rendered, oldest value first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub cpu_usage: Vec<f64>,
    pub memory_percent: Vec<f64>,
    /// MiB/s
    pub network_download: Vec<f64>,
    /// MiB/s
    pub network_upload: Vec<f64>,
    /// Bar heights in `0..=SPARKLINE_HEIGHT`
    pub cpu_sparkline: Vec<f64>,
}

pub struct Dashboard {
    history: HistoryBuffers,
    alerts: AlertEngine,
    latest: Option<Arc<Snapshot>>,
    last_update: Option<DateTime<Utc>>,
    settings: Settings,
    events: broadcast::Sender<DashboardEvent>,
}

impl Dashboard {
    pub fn new(settings: Settings, alerts: AlertEngine) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            history: HistoryBuffers::new(),
            alerts,
            latest: None,
            last_update: None,
            settings,
            events,
        }
    }

    /// Dashboard with thresholds restored from the settings store
    pub async fn load(settings: Settings, alert_display: Duration) -> Self {
        let thresholds = settings.thresholds().await;
        debug!("restored thresholds {thresholds:?}");

        let alerts = AlertEngine::new(thresholds).with_display_timeout(alert_display);
        Self::new(settings, alerts)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    pub fn event_sender(&self) -> broadcast::Sender<DashboardEvent> {
        self.events.clone()
    }

    pub fn history(&self) -> &HistoryBuffers {
        &self.history
    }

    pub fn alerts(&self) -> &AlertEngine {
        &self.alerts
    }

    pub fn thresholds(&self) -> AlertThresholds {
        self.alerts.thresholds()
    }

    pub fn latest(&self) -> Option<&Arc<Snapshot>> {
        self.latest.as_ref()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Apply a validated snapshot to history, alerts and renderers
    #[instrument(skip_all, fields(taken_at = %snapshot.taken_at))]
    pub fn apply(&mut self, snapshot: Snapshot, rates: Option<NetworkRates>) -> AlertDelta {
        let at = snapshot.taken_at;

        if let Section::Ok(cpu) = &snapshot.cpu {
            self.history.append(CPU_USAGE, at, cpu.usage);
            self.history.append(CPU_SPARKLINE, at, cpu.usage);
        }
        if let Section::Ok(memory) = &snapshot.memory {
            self.history.append(MEMORY_PERCENT, at, memory.percent);
        }
        if let Some(rates) = rates {
            self.history.append(NETWORK_DOWNLOAD, at, rates.download);
            self.history.append(NETWORK_UPLOAD, at, rates.upload);
        }

        let delta = self.alerts.evaluate(&snapshot);
        for alert in &delta.to_show {
            self.publish(DashboardEvent::AlertRaised(alert.clone()));
        }
        for id in &delta.to_clear {
            self.publish(DashboardEvent::AlertCleared {
                id: id.clone(),
                reason: ClearReason::Resolved,
            });
        }

        let snapshot = Arc::new(snapshot);
        self.latest = Some(snapshot.clone());
        self.last_update = Some(at);

        self.publish(DashboardEvent::Snapshot {
            snapshot,
            charts: Arc::new(self.charts()),
        });

        delta
    }

    pub fn expire_alerts(&mut self) -> Vec<String> {
        self.expire_alerts_at(Instant::now())
    }

    pub fn expire_alerts_at(&mut self, now: Instant) -> Vec<String> {
        let expired = self.alerts.expire_at(now);
        for id in &expired {
            self.publish(DashboardEvent::AlertCleared {
                id: id.clone(),
                reason: ClearReason::Expired,
            });
        }
        expired
    }

    /// Apply a threshold edit and persist the result if anything changed
    #[instrument(skip(self))]
    pub async fn update_thresholds(&mut self, update: &ThresholdUpdate) -> ThresholdOutcome {
        let outcome = self.alerts.set_thresholds(update);

        for rejection in &outcome.rejected {
            self.notify(NotificationLevel::Warning, rejection.to_string());
        }

        if outcome.changed() {
            if let Err(e) = self.settings.save_thresholds(&outcome.thresholds).await {
                warn!("failed to persist thresholds: {e}");
                self.notify(NotificationLevel::Error, "Failed to save alert thresholds");
            } else {
                self.notify(NotificationLevel::Success, "Alert thresholds saved");
            }
        }

        outcome
    }

    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        self.publish(DashboardEvent::Notification(Notification::new(level, message)));
    }

    pub fn charts(&self) -> ChartData {
        ChartData {
            cpu_usage: self.history.snapshot(CPU_USAGE),
            memory_percent: self.history.snapshot(MEMORY_PERCENT),
            network_download: self.history.snapshot(NETWORK_DOWNLOAD),
            network_upload: self.history.snapshot(NETWORK_UPLOAD),
            cpu_sparkline: self.history.sparkline_heights(SPARKLINE_HEIGHT),
        }
    }

    fn publish(&self, event: DashboardEvent) {
        // no subscribers is fine
        if self.events.send(event).is_err() {
            trace!("no receivers for dashboard event");
        }
    }
}
