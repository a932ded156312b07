//! Failure scenario tests
//!
//! These tests verify the dashboard degrades instead of breaking:
//! - Required sections failing
//! - Backends reporting errors with a 200 status
//! - Unreachable and hanging backends

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use pulseboard::actors::messages::NotificationLevel;
use pulseboard::{
    AlertEngine, Dashboard, DashboardEvent, Endpoint, HttpSource, Settings, SyncError,
    SyncOrchestrator, Trigger,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

fn notifications(events: Vec<DashboardEvent>) -> Vec<(NotificationLevel, String)> {
    events
        .into_iter()
        .filter_map(|event| match event {
            DashboardEvent::Notification(n) => Some((n.level, n.message)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_required_section_failure_keeps_previous_state() {
    let server = start_backend(&FakeBackend::default().with_cpu(30.0)).await;

    let mut orchestrator = http_orchestrator(&server.uri(), Settings::in_memory());
    orchestrator.run_cycle(Trigger::Scheduled).await.unwrap();
    let before = orchestrator.dashboard().latest().cloned().unwrap();

    FakeBackend::default()
        .with_cpu(99.0)
        .failing(Endpoint::Cpu, 500)
        .mount(&server)
        .await;

    let mut events = orchestrator.dashboard().subscribe();
    let result = orchestrator.run_cycle(Trigger::Scheduled).await;

    assert_matches!(result, Err(SyncError::Invalid { missing }) if missing == vec![Endpoint::Cpu]);
    // Charts, alerts and the latest snapshot are untouched
    assert_eq!(orchestrator.dashboard().latest().cloned().unwrap(), before);
    assert_eq!(orchestrator.dashboard().charts().cpu_usage, vec![30.0]);
    assert!(orchestrator.dashboard().alerts().active_ids().is_empty());

    assert_eq!(
        notifications(drain(&mut events)),
        vec![(NotificationLevel::Warning, "Some data failed to load".to_string())]
    );
}

#[tokio::test]
async fn test_error_body_on_memory_invalidates_cycle() {
    let backend = FakeBackend::default().reporting_error(Endpoint::Memory, "psutil unavailable");
    let server = start_backend(&backend).await;

    let mut orchestrator = http_orchestrator(&server.uri(), Settings::in_memory());
    let result = orchestrator.run_cycle(Trigger::Scheduled).await;

    assert_matches!(
        result,
        Err(SyncError::Invalid { missing }) if missing == vec![Endpoint::Memory]
    );
    assert!(orchestrator.dashboard().latest().is_none());
}

#[tokio::test]
async fn test_empty_temperatures_are_optional() {
    let mut backend = FakeBackend::default();
    backend
        .overrides
        .insert(Endpoint::Temperatures, (200, serde_json::json!({})));
    let server = start_backend(&backend).await;

    let mut orchestrator = http_orchestrator(&server.uri(), Settings::in_memory());
    let outcome = orchestrator.run_cycle(Trigger::Scheduled).await.unwrap();

    assert_eq!(outcome.failed, vec![Endpoint::Temperatures]);
}

#[tokio::test]
async fn test_unreachable_backend_reports_connection_error() {
    // Nothing listens on the discard port
    let source = HttpSource::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
    let dashboard = Dashboard::new(Settings::in_memory(), AlertEngine::default());
    let mut orchestrator = SyncOrchestrator::new(Arc::new(source), dashboard);
    let mut events = orchestrator.dashboard().subscribe();

    let result = orchestrator.run_cycle(Trigger::Manual).await;

    assert_matches!(result, Err(SyncError::Unreachable { attempted: 9, .. }));
    assert_eq!(
        notifications(drain(&mut events)),
        vec![(NotificationLevel::Error, "Connection error".to_string())]
    );
    assert_eq!(orchestrator.cycles(), 1);
}

#[tokio::test]
async fn test_hanging_endpoint_times_out_as_failed_section() {
    let server = MockServer::start().await;
    let backend = FakeBackend::default();

    for endpoint in Endpoint::ALL {
        let mut response = ResponseTemplate::new(200).set_body_json(backend.body(endpoint));
        if endpoint == Endpoint::Processes {
            response = response.set_delay(Duration::from_secs(5));
        }

        Mock::given(method("GET"))
            .and(path(endpoint.path()))
            .respond_with(response)
            .mount(&server)
            .await;
    }

    let source = HttpSource::new(server.uri(), Duration::from_millis(300)).unwrap();
    let dashboard = Dashboard::new(Settings::in_memory(), AlertEngine::default());
    let mut orchestrator = SyncOrchestrator::new(Arc::new(source), dashboard);

    let outcome = orchestrator.run_cycle(Trigger::Scheduled).await.unwrap();

    assert_eq!(outcome.failed, vec![Endpoint::Processes]);
    assert!(outcome.elapsed < Duration::from_secs(5));
}

#[tokio::test]
async fn test_scheduler_survives_backend_outage() {
    let server = start_backend(&FakeBackend::default()).await;
    let handle = spawn_scheduler(&server.uri(), Settings::in_memory());

    handle.refresh_now().await.unwrap();

    FakeBackend::default()
        .failing(Endpoint::System, 503)
        .mount(&server)
        .await;
    let err = handle.refresh_now().await.unwrap_err();
    assert_matches!(
        err.downcast_ref::<SyncError>(),
        Some(SyncError::Invalid { .. })
    );

    // Recovery on the next cycle
    FakeBackend::default().mount(&server).await;
    let outcome = handle.refresh_now().await.unwrap();
    assert_eq!(outcome.trigger, Trigger::Manual);

    handle.shutdown().await.unwrap();
}
