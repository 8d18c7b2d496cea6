//! Span helpers for requests moving through the pool.

use tracing::Span;

use crate::model::RequestId;

/// Start a span covering one dispatched request.
pub fn start_inspect_span(request_id: &RequestId, asset_id: u64, worker: usize) -> Span {
    tracing::info_span!(
        "inspect.dispatch",
        "inspect.request_id" = %request_id,
        "inspect.asset_id" = asset_id,
        "inspect.worker" = worker,
    )
}

/// Record a request state transition on its span.
pub fn record_transition(span: &Span, from: &str, to: &str) {
    span.in_scope(|| {
        tracing::info!(from = from, to = to, "state_transition");
    });
}
