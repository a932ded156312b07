//! Concurrency tests
//!
//! These tests verify the single-owner scheduler under concurrent use:
//! - Manual refreshes from many handle clones
//! - Several subscribers seeing the same event stream
//! - State queries interleaved with cycles

use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use pulseboard::{DashboardEvent, Endpoint, Settings, ThresholdKey, ThresholdUpdate, Trigger};

use crate::helpers::*;

#[tokio::test]
async fn test_concurrent_refreshes_are_serialized() {
    let server = start_backend(&FakeBackend::default()).await;
    let handle = spawn_settled_scheduler(&server.uri(), Settings::in_memory()).await;

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let handle = handle.clone();
            tokio::spawn(async move { handle.refresh_now().await })
        })
        .collect();

    for task in tasks {
        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome.trigger, Trigger::Manual);
    }

    let view = handle.state().await.unwrap();
    // 8 manual cycles plus the initial scheduled one
    assert_eq!(view.cycles, 9);

    // Every cycle hit every endpoint exactly once
    let counts: BTreeSet<usize> = futures::future::join_all(
        Endpoint::ALL
            .into_iter()
            .map(|endpoint| request_count(&server, endpoint)),
    )
    .await
    .into_iter()
    .collect();
    assert_eq!(counts, BTreeSet::from([view.cycles as usize]));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_subscribers_see_same_snapshots() {
    let server = start_backend(&FakeBackend::default().with_cpu(93.0)).await;
    let handle = spawn_scheduler(&server.uri(), Settings::in_memory());

    let mut first = handle.subscribe();
    let mut second = handle.subscribe();

    handle.refresh_now().await.unwrap();
    // let any in-flight scheduled cycle finish as well
    handle.state().await.unwrap();

    let snapshots = |events: Vec<DashboardEvent>| -> Vec<_> {
        events
            .into_iter()
            .filter_map(|event| match event {
                DashboardEvent::Snapshot { snapshot, .. } => Some(snapshot.taken_at),
                _ => None,
            })
            .collect()
    };

    let seen_first = snapshots(drain(&mut first));
    let seen_second = snapshots(drain(&mut second));

    assert!(!seen_first.is_empty());
    assert_eq!(seen_first, seen_second);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_state_and_threshold_queries_during_refreshes() {
    let server = start_backend(&FakeBackend::default()).await;
    let handle = spawn_scheduler(&server.uri(), Settings::in_memory());

    let refresher = {
        let handle = handle.clone();
        tokio::spawn(async move {
            for _ in 0..5 {
                handle.refresh_now().await.unwrap();
            }
        })
    };

    let editor = {
        let handle = handle.clone();
        tokio::spawn(async move {
            handle
                .update_thresholds(ThresholdUpdate::new().with(ThresholdKey::Cpu, "70"))
                .await
                .unwrap()
        })
    };

    for _ in 0..5 {
        handle.state().await.unwrap();
    }

    refresher.await.unwrap();
    let outcome = editor.await.unwrap();
    assert_eq!(outcome.thresholds.cpu, 70);

    let view = handle.state().await.unwrap();
    assert_eq!(view.thresholds.cpu, 70);
    assert!(view.latest.is_some());

    handle.shutdown().await.unwrap();
}
