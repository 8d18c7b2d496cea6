//! Integration tests for telemetry initialization and span helpers.

mod common;

use std::time::Duration;

use common::{fake_sessions, item_info, link, wait_available, wait_requests};
use inspect_rs::model::RequestId;
use inspect_rs::pool::{PoolBuilder, WorkerSettings};
use opentelemetry::KeyValue;

#[test]
fn telemetry_initializes_without_endpoint() {
    // The global subscriber can only be set once per process; a second
    // init in the same binary returns Err, which is fine here.
    let config = inspect_rs::telemetry::TelemetryConfig {
        endpoint: None,
        service_name: "inspect-test".to_string(),
        default_filter: "debug".to_string(),
    };
    let _guard = inspect_rs::telemetry::init_telemetry(config);
}

#[test]
fn inspect_span_creates_and_records_transition() {
    let id = RequestId::new();
    let span = inspect_rs::telemetry::inspect::start_inspect_span(&id, 698323590, 2);
    inspect_rs::telemetry::inspect::record_transition(&span, "queued", "dispatched");
    inspect_rs::telemetry::inspect::record_transition(&span, "dispatched", "resolved");
}

#[test]
fn metric_instruments_are_noops_without_provider() {
    inspect_rs::telemetry::metrics::inspections().add(1, &[KeyValue::new("result", "ok")]);
    inspect_rs::telemetry::metrics::cache_operations().add(
        1,
        &[
            KeyValue::new("operation", "lookup"),
            KeyValue::new("result", "miss"),
        ],
    );
    inspect_rs::telemetry::metrics::worker_transitions().add(1, &[KeyValue::new("to", "ready")]);
    inspect_rs::telemetry::metrics::inspect_duration_ms()
        .record(12.5, &[KeyValue::new("result", "ok")]);
}

#[test]
fn default_guard_flushes_and_drops_quietly() {
    let guard = inspect_rs::telemetry::TelemetryGuard::default();
    guard.force_flush();
    drop(guard);
}

/// Runs one inspection with spans and metrics exported over OTLP. Needs a
/// collector on `localhost:4317`:
/// `cargo test --test telemetry_test -- --ignored`
#[tokio::test(flavor = "multi_thread")]
#[ignore]
async fn inspection_exports_to_collector() {
    let guard = inspect_rs::telemetry::init_telemetry(inspect_rs::telemetry::TelemetryConfig {
        endpoint: Some("http://localhost:4317".to_string()),
        service_name: "inspect-test".to_string(),
        default_filter: "debug".to_string(),
    })
    .unwrap();

    let (sessions, links) = fake_sessions(1);
    let dispatcher = PoolBuilder::new(WorkerSettings {
        request_delay: Duration::ZERO,
        request_ttl: Duration::from_secs(5),
        login_delay: Duration::ZERO,
        relog_interval: None,
    })
    .start(links);
    sessions[0].ready();
    wait_available(&dispatcher, 1).await;

    let task = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.inspect(&link(31), false).await })
    };
    wait_requests(&sessions[0], 1).await;
    sessions[0].respond(item_info(31));
    assert_eq!(task.await.unwrap().unwrap().a, 31);

    guard.force_flush();
}
