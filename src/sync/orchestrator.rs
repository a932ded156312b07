//! SyncOrchestrator - one consistent snapshot per cycle
//!
//! ## Cycle
//!
//! ```text
//! fan-out (9 concurrent fetches) → fan-in barrier → assemble Snapshot → validate
//!     valid   → history + alerts + renderers (+ success toast if manual)
//!     invalid → warning toast, nothing else touched
//!     nothing answered → connection-error toast
//! ```
//!
//! Per-endpoint failures never abort a cycle. Cycle-level failures are
//! reported and returned, and the next cycle runs as usual.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, error, instrument, trace, warn};

use crate::actors::messages::{CycleOutcome, DashboardView, NotificationLevel, Trigger};
use crate::dashboard::Dashboard;
use crate::snapshot::{Endpoint, Section, Snapshot};

use super::error::{EndpointFailure, SyncError};
use super::rates::RateTracker;
use super::source::{MetricsSource, check_body, decode_section};

/// Number of cycle durations kept for the rolling average
pub const TIMING_WINDOW: usize = 50;

/// Average cycle duration above which a warning is logged
pub const SLOW_CYCLE_THRESHOLD: Duration = Duration::from_millis(1000);

pub const MSG_UPDATED: &str = "Data updated successfully";
pub const MSG_PARTIAL: &str = "Some data failed to load";
pub const MSG_CONNECTION: &str = "Connection error";

#[derive(Debug, Clone, Default)]
struct CycleTimings {
    samples: VecDeque<Duration>,
}

impl CycleTimings {
    fn record(&mut self, elapsed: Duration) {
        self.samples.push_back(elapsed);
        while self.samples.len() > TIMING_WINDOW {
            self.samples.pop_front();
        }
    }

    fn average(&self) -> Option<Duration> {
        let count = u32::try_from(self.samples.len()).ok().filter(|n| *n > 0)?;
        Some(self.samples.iter().sum::<Duration>() / count)
    }
}

pub struct SyncOrchestrator {
    source: Arc<dyn MetricsSource>,
    dashboard: Dashboard,
    rates: RateTracker,
    timings: CycleTimings,
    cycles: u64,
}

impl SyncOrchestrator {
    pub fn new(source: Arc<dyn MetricsSource>, dashboard: Dashboard) -> Self {
        Self {
            source,
            dashboard,
            rates: RateTracker::new(),
            timings: CycleTimings::default(),
            cycles: 0,
        }
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn dashboard_mut(&mut self) -> &mut Dashboard {
        &mut self.dashboard
    }

    /// Number of cycles run so far, including failed ones
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn average_cycle(&self) -> Option<Duration> {
        self.timings.average()
    }

    /// Run one fetch-validate-apply cycle
    ///
    /// Errors are already reported as notifications when this returns.
    #[instrument(skip(self))]
    pub async fn run_cycle(&mut self, trigger: Trigger) -> Result<CycleOutcome, SyncError> {
        let started = Instant::now();
        let result = self.fetch_snapshot().await;
        let elapsed = started.elapsed();

        self.cycles += 1;
        self.record_timing(elapsed);

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.report(&err);
                return Err(err);
            }
        };

        let rates = snapshot
            .network
            .ok()
            .map(|network| self.rates.observe(network, Instant::now()));

        let failed: Vec<Endpoint> = snapshot.failures().into_iter().map(|(e, _)| e).collect();
        let taken_at = snapshot.taken_at;

        // alerts whose display time ran out during the fetch count as fresh occurrences
        self.dashboard.expire_alerts();
        let delta = self.dashboard.apply(snapshot, rates);

        if trigger == Trigger::Manual {
            self.dashboard.notify(NotificationLevel::Success, MSG_UPDATED);
        }

        debug!(
            "cycle applied in {elapsed:?} ({} optional sections failed)",
            failed.len()
        );

        Ok(CycleOutcome {
            trigger,
            taken_at,
            failed,
            raised: delta.shown_ids(),
            cleared: delta.to_clear,
            elapsed,
        })
    }

    /// Fan out to every endpoint, wait for all, assemble and validate
    pub async fn fetch_snapshot(&self) -> Result<Snapshot, SyncError> {
        let source = &self.source;
        let results = join_all(
            Endpoint::ALL
                .into_iter()
                .map(|endpoint| async move { (endpoint, source.fetch(endpoint).await) }),
        )
        .await;

        if let Some(reason) = unreachable_reason(&results) {
            return Err(SyncError::Unreachable {
                attempted: results.len(),
                reason,
            });
        }

        let snapshot = assemble(results);

        for (endpoint, reason) in snapshot.failures() {
            debug!("{endpoint} section failed: {reason}");
        }

        let missing = snapshot.missing_required();
        if !missing.is_empty() {
            return Err(SyncError::Invalid { missing });
        }

        Ok(snapshot)
    }

    pub fn expire_alerts(&mut self) -> Vec<String> {
        self.dashboard.expire_alerts()
    }

    pub fn view(&self, interval: Duration) -> DashboardView {
        DashboardView {
            latest: self.dashboard.latest().cloned(),
            last_update: self.dashboard.last_update(),
            active_alerts: self.dashboard.alerts().active_alerts(),
            thresholds: self.dashboard.thresholds(),
            charts: self.dashboard.charts(),
            interval,
            average_cycle: self.average_cycle(),
            cycles: self.cycles,
        }
    }

    fn record_timing(&mut self, elapsed: Duration) {
        self.timings.record(elapsed);

        if let Some(average) = self.timings.average()
            && average > SLOW_CYCLE_THRESHOLD
        {
            warn!(
                "slow sync cycles: average {average:?} over the last {} cycles",
                self.timings.samples.len()
            );
        }
    }

    fn report(&self, err: &SyncError) {
        match err {
            SyncError::Invalid { .. } => {
                warn!("{err}");
                self.dashboard.notify(NotificationLevel::Warning, MSG_PARTIAL);
            }
            SyncError::Unreachable { .. } => {
                error!("{err}");
                self.dashboard.notify(NotificationLevel::Error, MSG_CONNECTION);
            }
        }
    }
}

/// `Some(reason)` when no endpoint answered at all
fn unreachable_reason(results: &[(Endpoint, Result<Value, EndpointFailure>)]) -> Option<String> {
    let all_transport = !results.is_empty()
        && results
            .iter()
            .all(|(_, result)| matches!(result, Err(failure) if failure.is_transport()));

    if !all_transport {
        return None;
    }

    results.iter().find_map(|(_, result)| match result {
        Err(failure) => Some(failure.to_string()),
        Ok(_) => None,
    })
}

/// Build a snapshot from the settled fetch results
pub fn assemble(results: Vec<(Endpoint, Result<Value, EndpointFailure>)>) -> Snapshot {
    let mut results: HashMap<Endpoint, Result<Value, EndpointFailure>> =
        results.into_iter().collect();

    let snapshot = Snapshot {
        taken_at: Utc::now(),
        system: section(&mut results, Endpoint::System),
        cpu: section(&mut results, Endpoint::Cpu),
        memory: section(&mut results, Endpoint::Memory),
        gpu: section(&mut results, Endpoint::Gpu),
        network: section(&mut results, Endpoint::Network),
        disk_io: section(&mut results, Endpoint::DiskIo),
        pools: section(&mut results, Endpoint::Pools),
        temperatures: section(&mut results, Endpoint::Temperatures),
        processes: section(&mut results, Endpoint::Processes),
    };

    if snapshot.failures().is_empty() {
        trace!("all sections loaded");
    }

    snapshot
}

fn section<T: DeserializeOwned>(
    results: &mut HashMap<Endpoint, Result<Value, EndpointFailure>>,
    endpoint: Endpoint,
) -> Section<T> {
    results
        .remove(&endpoint)
        .unwrap_or_else(|| Err(EndpointFailure::Transport("no response".to_string())))
        .and_then(check_body)
        .and_then(decode_section::<T>)
        .into()
}
