//! SchedulerActor - drives the sync cycle
//!
//! Owns the [`SyncOrchestrator`] (and through it the whole dashboard state),
//! so every cycle and every mutation runs on this one task.
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick ──────┐
//! RefreshNow ──────┼──▶ run_cycle ──▶ DashboardEvent broadcast ──▶ [renderers, ...]
//! Expiry sweep ────┘
//!     ↑
//!     └─── Commands (RefreshNow, UpdateInterval, UpdateThresholds, GetState, Shutdown)
//! ```
//!
//! Commands are handled between cycles: a manual refresh arriving while a
//! scheduled cycle is in flight waits for it, then runs. After a manual
//! cycle the timer restarts, so two cycles are never issued back to back.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval, interval_at};
use tracing::{debug, info, instrument, warn};

use crate::alerts::{ThresholdOutcome, ThresholdUpdate};
use crate::settings::{DEFAULT_REFRESH_INTERVAL_MS, SettingsError};
use crate::sync::SyncOrchestrator;

use super::messages::{
    CycleOutcome, DashboardEvent, DashboardView, NotificationLevel, SchedulerCommand, Trigger,
};

/// Cadence of the alert display-timeout sweep
pub const EXPIRY_SWEEP: Duration = Duration::from_secs(1);

pub struct SchedulerActor {
    orchestrator: SyncOrchestrator,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<SchedulerCommand>,

    /// Current poll interval
    interval_duration: Duration,
}

impl SchedulerActor {
    pub fn new(
        orchestrator: SyncOrchestrator,
        command_rx: mpsc::Receiver<SchedulerCommand>,
        interval_duration: Duration,
    ) -> Self {
        let interval_duration = if interval_duration.is_zero() {
            Duration::from_millis(DEFAULT_REFRESH_INTERVAL_MS)
        } else {
            interval_duration
        };

        Self {
            orchestrator,
            command_rx,
            interval_duration,
        }
    }

    /// Run until a Shutdown command arrives or every handle is dropped
    ///
    /// The first cycle starts immediately.
    #[instrument(skip(self), fields(interval = ?self.interval_duration))]
    pub async fn run(mut self) {
        debug!("starting scheduler");

        let mut ticker = interval(self.interval_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut sweeper = interval(EXPIRY_SWEEP);
        sweeper.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // failures are already reported to subscribers
                    let _ = self.orchestrator.run_cycle(Trigger::Scheduled).await;
                }

                _ = sweeper.tick() => {
                    self.orchestrator.expire_alerts();
                }

                cmd = self.command_rx.recv() => {
                    // every handle dropped
                    let Some(cmd) = cmd else {
                        warn!("command channel closed, shutting down");
                        break;
                    };

                    match cmd {
                        SchedulerCommand::RefreshNow { respond_to } => {
                            debug!("received RefreshNow command");
                            let result = self.orchestrator.run_cycle(Trigger::Manual).await;
                            ticker.reset();
                            let _ = respond_to.send(result);
                        }

                        SchedulerCommand::UpdateInterval { interval_ms, respond_to } => {
                            let result = self.update_interval(interval_ms, &mut ticker).await;
                            let _ = respond_to.send(result);
                        }

                        SchedulerCommand::UpdateThresholds { update, respond_to } => {
                            let outcome = self
                                .orchestrator
                                .dashboard_mut()
                                .update_thresholds(&update)
                                .await;
                            let _ = respond_to.send(outcome);
                        }

                        SchedulerCommand::GetState { respond_to } => {
                            let _ = respond_to.send(self.orchestrator.view(self.interval_duration));
                        }

                        SchedulerCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }
            }
        }

        debug!("scheduler stopped");
    }

    /// Re-arm the timer with a new interval and persist it
    ///
    /// The new interval is in effect even if persisting it fails.
    async fn update_interval(
        &mut self,
        interval_ms: u64,
        ticker: &mut Interval,
    ) -> Result<(), SettingsError> {
        if interval_ms == 0 {
            return Err(SettingsError::ZeroInterval);
        }

        info!("updating poll interval to {interval_ms}ms");
        self.interval_duration = Duration::from_millis(interval_ms);

        *ticker = interval_at(Instant::now() + self.interval_duration, self.interval_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let dashboard = self.orchestrator.dashboard();
        dashboard.notify(
            NotificationLevel::Info,
            format!("Refresh interval set to {interval_ms} ms"),
        );

        dashboard
            .settings()
            .save_refresh_interval_ms(interval_ms)
            .await
    }
}

/// Handle for controlling a SchedulerActor
///
/// Can be cloned and shared across tasks.
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerCommand>,
    events: broadcast::Sender<DashboardEvent>,
}

impl SchedulerHandle {
    /// Spawn the scheduler as a tokio task
    pub fn spawn(orchestrator: SyncOrchestrator, interval: Duration) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let events = orchestrator.dashboard().event_sender();

        let actor = SchedulerActor::new(orchestrator, cmd_rx, interval);
        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            events,
        }
    }

    /// Subscribe to dashboard events
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    /// Run a manual cycle and wait for its outcome
    pub async fn refresh_now(&self) -> Result<CycleOutcome> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::RefreshNow { respond_to: tx })
            .await
            .context("failed to send RefreshNow command")?;

        let outcome = rx.await.context("failed to receive response")??;
        Ok(outcome)
    }

    pub async fn update_interval(&self, interval_ms: u64) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::UpdateInterval {
                interval_ms,
                respond_to: tx,
            })
            .await
            .context("failed to send UpdateInterval command")?;

        rx.await.context("failed to receive response")??;
        Ok(())
    }

    pub async fn update_thresholds(&self, update: ThresholdUpdate) -> Result<ThresholdOutcome> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::UpdateThresholds {
                update,
                respond_to: tx,
            })
            .await
            .context("failed to send UpdateThresholds command")?;

        rx.await.context("failed to receive response")
    }

    pub async fn state(&self) -> Result<DashboardView> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::GetState { respond_to: tx })
            .await
            .context("failed to send GetState command")?;

        rx.await.context("failed to receive response")
    }

    /// Gracefully shut down the scheduler
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(SchedulerCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
