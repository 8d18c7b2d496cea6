//! Metric instrument factories for inspect-rs.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without a provider the instruments are no-ops.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("inspect-rs")
}

/// Counter: finished inspect requests.
/// Labels: `result` ("ok" | "cache_hit" | "deadline" | "no_workers" | "error").
pub fn inspections() -> Counter<u64> {
    meter()
        .u64_counter("inspect.requests")
        .with_description("Number of finished inspect requests")
        .build()
}

/// Counter: dedup cache operations.
/// Labels: `operation` ("lookup" | "store"), `result`.
pub fn cache_operations() -> Counter<u64> {
    meter()
        .u64_counter("inspect.cache.operations")
        .with_description("Number of dedup cache operations")
        .build()
}

/// Counter: worker readiness transitions.
/// Labels: `to` ("ready" | "unready").
pub fn worker_transitions() -> Counter<u64> {
    meter()
        .u64_counter("inspect.worker.transitions")
        .with_description("Worker readiness transitions")
        .build()
}

/// Histogram: time from dispatch to outcome, in milliseconds.
/// Labels: `result`.
pub fn inspect_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("inspect.duration_ms")
        .with_description("Time from dispatch to outcome")
        .with_unit("ms")
        .build()
}
