//! Integration tests for the sync pipeline
//!
//! These tests drive a real `HttpSource` against a mock backend:
//! - Snapshot → history → alerts → events
//! - Optional sections failing without blocking the cycle
//! - Chart history bounds across many cycles

use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use pulseboard::actors::messages::{ClearReason, NotificationLevel};
use pulseboard::alerts::{CPU_HIGH_USAGE, disk_alert_id};
use pulseboard::history::CHART_CAPACITY;
use pulseboard::{DashboardEvent, Endpoint, EndpointFailure, Section, Settings, Trigger};
use tokio_test::assert_ok;

use crate::helpers::*;

#[tokio::test]
async fn test_healthy_backend_produces_full_snapshot() {
    let backend = FakeBackend::default();
    let server = start_backend(&backend).await;

    let mut orchestrator = http_orchestrator(&server.uri(), Settings::in_memory());
    let mut events = orchestrator.dashboard().subscribe();

    let outcome = assert_ok!(orchestrator.run_cycle(Trigger::Scheduled).await);
    assert!(outcome.failed.is_empty());
    assert!(outcome.raised.is_empty());

    let latest = orchestrator.dashboard().latest().cloned().unwrap();
    assert_eq!(latest.system.ok().unwrap().hostname, "tower");
    assert_eq!(latest.cpu.ok().unwrap().usage, 25.0);
    assert_eq!(latest.gpu.ok().unwrap().len(), 1);
    assert_eq!(latest.processes.ok().unwrap().len(), 2);

    let charts = orchestrator.dashboard().charts();
    assert_eq!(charts.cpu_usage, vec![25.0]);
    assert_eq!(charts.memory_percent, vec![40.0]);
    // current_recv is 2 MiB/s, current_sent 1 MiB/s
    assert_eq!(charts.network_download, vec![2.0]);
    assert_eq!(charts.network_upload, vec![1.0]);

    let published = drain(&mut events);
    assert!(
        published
            .iter()
            .any(|event| matches!(event, DashboardEvent::Snapshot { .. }))
    );
    // scheduled cycles stay quiet
    assert!(
        !published
            .iter()
            .any(|event| matches!(event, DashboardEvent::Notification(_)))
    );
}

#[tokio::test]
async fn test_optional_gpu_failure_still_applies() {
    let backend = FakeBackend::default()
        .with_cpu(97.0)
        .failing(Endpoint::Gpu, 500);
    let server = start_backend(&backend).await;

    let mut orchestrator = http_orchestrator(&server.uri(), Settings::in_memory());

    let outcome = orchestrator.run_cycle(Trigger::Scheduled).await.unwrap();
    assert_eq!(outcome.failed, vec![Endpoint::Gpu]);
    assert!(outcome.raised.contains(CPU_HIGH_USAGE));

    let latest = orchestrator.dashboard().latest().cloned().unwrap();
    assert_eq!(latest.gpu, Section::Failed(EndpointFailure::Status(500)));
    assert_eq!(orchestrator.dashboard().charts().cpu_usage, vec![97.0]);
}

#[tokio::test]
async fn test_alert_lifecycle_across_cycles() {
    let server = start_backend(&FakeBackend::default().with_cpu(95.0)).await;

    let mut orchestrator = http_orchestrator(&server.uri(), Settings::in_memory());
    let mut events = orchestrator.dashboard().subscribe();

    // First hot cycle raises, second one is deduplicated
    let first = orchestrator.run_cycle(Trigger::Scheduled).await.unwrap();
    let second = orchestrator.run_cycle(Trigger::Scheduled).await.unwrap();
    assert!(first.raised.contains(CPU_HIGH_USAGE));
    assert!(second.raised.is_empty());

    // Load drops, the alert clears
    FakeBackend::default().with_cpu(20.0).mount(&server).await;
    let third = orchestrator.run_cycle(Trigger::Scheduled).await.unwrap();
    assert!(third.cleared.contains(CPU_HIGH_USAGE));

    let published = drain(&mut events);
    let raised = published
        .iter()
        .filter(|event| {
            matches!(event, DashboardEvent::AlertRaised(alert) if alert.id == CPU_HIGH_USAGE)
        })
        .count();
    assert_eq!(raised, 1);
    assert!(published.iter().any(|event| matches!(
        event,
        DashboardEvent::AlertCleared { id, reason: ClearReason::Resolved } if id == CPU_HIGH_USAGE
    )));
}

#[tokio::test]
async fn test_pool_alerts_follow_pool_set() {
    let backend = FakeBackend::default().with_pools(&[("A", 95.0), ("B", 50.0), ("C", 92.0)]);
    let server = start_backend(&backend).await;

    let mut orchestrator = http_orchestrator(&server.uri(), Settings::in_memory());

    let outcome = orchestrator.run_cycle(Trigger::Scheduled).await.unwrap();
    assert_eq!(
        outcome.raised,
        [disk_alert_id("/mnt/a"), disk_alert_id("/mnt/c")]
            .into_iter()
            .collect::<BTreeSet<_>>()
    );

    // A recovers, C is unmounted
    FakeBackend::default()
        .with_pools(&[("A", 40.0), ("B", 50.0)])
        .mount(&server)
        .await;
    let outcome = orchestrator.run_cycle(Trigger::Scheduled).await.unwrap();
    assert_eq!(
        outcome.cleared,
        [disk_alert_id("/mnt/a"), disk_alert_id("/mnt/c")]
            .into_iter()
            .collect::<BTreeSet<_>>()
    );
    assert!(orchestrator.dashboard().alerts().active_ids().is_empty());
}

#[tokio::test]
async fn test_manual_cycle_notifies_success() {
    let server = start_backend(&FakeBackend::default()).await;

    let mut orchestrator = http_orchestrator(&server.uri(), Settings::in_memory());
    let mut events = orchestrator.dashboard().subscribe();

    orchestrator.run_cycle(Trigger::Manual).await.unwrap();

    let notifications: Vec<_> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            DashboardEvent::Notification(notification) => Some(notification),
            _ => None,
        })
        .collect();

    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, NotificationLevel::Success);
    assert_eq!(notifications[0].message, "Data updated successfully");
}

#[tokio::test]
async fn test_chart_history_is_bounded() {
    let server = start_backend(&FakeBackend::default()).await;

    let mut orchestrator = http_orchestrator(&server.uri(), Settings::in_memory());

    for _ in 0..CHART_CAPACITY + 5 {
        orchestrator.run_cycle(Trigger::Scheduled).await.unwrap();
    }

    let charts = orchestrator.dashboard().charts();
    assert_eq!(charts.cpu_usage.len(), CHART_CAPACITY);
    assert_eq!(charts.memory_percent.len(), CHART_CAPACITY);
    assert_eq!(orchestrator.cycles(), (CHART_CAPACITY + 5) as u64);
}
