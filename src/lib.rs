//! Polling telemetry dashboard core
//!
//! A [`SchedulerHandle`] drives a [`SyncOrchestrator`] on a fixed interval.
//! Each cycle fetches the nine metric endpoints concurrently, assembles a
//! [`Snapshot`], and, if the snapshot is valid, feeds the chart history, the
//! alert engine and every subscribed renderer.

pub mod actors;
pub mod alerts;
pub mod config;
pub mod dashboard;
pub mod history;
pub mod render;
pub mod settings;
pub mod snapshot;
pub mod storage;
pub mod sync;
pub mod util;

pub use actors::SchedulerHandle;
pub use actors::messages::{CycleOutcome, DashboardEvent, DashboardView, Notification, Trigger};
pub use alerts::{Alert, AlertEngine, AlertSeverity, AlertThresholds, ThresholdKey, ThresholdUpdate};
pub use dashboard::{ChartData, Dashboard};
pub use history::{HistoryBuffers, TimeSeries};
pub use settings::Settings;
pub use snapshot::{Endpoint, Section, Snapshot};
pub use sync::{EndpointFailure, HttpSource, MetricsSource, SyncError, SyncOrchestrator};
