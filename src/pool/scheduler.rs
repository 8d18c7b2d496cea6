//! Dispatch loop: pool accounting, FIFO queue and request correlation.
//!
//! Every piece of scheduler state is owned by this one task. Cache I/O and
//! worker round trips run in spawned tasks that report back through the
//! command inbox, so nothing here needs a lock.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{Span, debug, info, warn};

use super::PoolStats;
use super::worker::{WorkerEvent, WorkerEventKind, WorkerHandle};
use crate::cache::InspectCache;
use crate::error::{Error, Result};
use crate::model::{InspectRequest, ItemData, RequestId};
use crate::telemetry::inspect::{record_transition, start_inspect_span};
use crate::telemetry::metrics;

pub(crate) type Reply = oneshot::Sender<Result<ItemData>>;

pub(crate) enum Command {
    /// New request from a caller.
    Inspect {
        request: InspectRequest,
        reply: Reply,
    },
    /// Cache lookup came back empty; queue for upstream.
    CacheMiss {
        request: InspectRequest,
        reply: Reply,
    },
    /// A worker finished with a dispatched request.
    Settled {
        id: RequestId,
        result: Result<ItemData>,
    },
    Stats {
        reply: oneshot::Sender<PoolStats>,
    },
}

/// The scheduler's view of one worker.
struct PoolSlot {
    handle: WorkerHandle,
    ready: bool,
    busy: bool,
}

struct Queued {
    request: InspectRequest,
    reply: Reply,
}

struct InFlight {
    worker: usize,
    request: InspectRequest,
    reply: Reply,
    span: Span,
    dispatched_at: Instant,
}

struct Metrics {
    inspections: Counter<u64>,
    cache_operations: Counter<u64>,
    worker_transitions: Counter<u64>,
    duration_ms: Histogram<f64>,
}

impl Metrics {
    fn new() -> Self {
        Self {
            inspections: metrics::inspections(),
            cache_operations: metrics::cache_operations(),
            worker_transitions: metrics::worker_transitions(),
            duration_ms: metrics::inspect_duration_ms(),
        }
    }

    fn inspection(&self, result: &'static str) {
        self.inspections
            .add(1, &[KeyValue::new("result", result)]);
    }
}

pub(crate) struct DispatchLoop {
    slots: Vec<PoolSlot>,
    /// Workers that are ready.
    available: usize,
    /// Workers whose busy flag is clear.
    idle: usize,
    queue: VecDeque<Queued>,
    in_flight: HashMap<RequestId, InFlight>,
    cache: Option<Arc<dyn InspectCache>>,
    commands: mpsc::UnboundedReceiver<Command>,
    // Weak so dropping every `Dispatcher` handle stops the loop.
    loopback: mpsc::WeakUnboundedSender<Command>,
    worker_events: mpsc::UnboundedReceiver<WorkerEvent>,
    metrics: Metrics,
}

impl DispatchLoop {
    pub(crate) fn new(
        workers: Vec<WorkerHandle>,
        cache: Option<Arc<dyn InspectCache>>,
        commands: mpsc::UnboundedReceiver<Command>,
        loopback: mpsc::WeakUnboundedSender<Command>,
        worker_events: mpsc::UnboundedReceiver<WorkerEvent>,
    ) -> Self {
        let idle = workers.len();
        let slots = workers
            .into_iter()
            .map(|handle| PoolSlot {
                handle,
                ready: false,
                busy: false,
            })
            .collect();

        Self {
            slots,
            available: 0,
            idle,
            queue: VecDeque::new(),
            in_flight: HashMap::new(),
            cache,
            commands,
            loopback,
            worker_events,
            metrics: Metrics::new(),
        }
    }

    pub(crate) async fn run(mut self) {
        info!(workers = self.slots.len(), "dispatcher started");

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some(event) = self.worker_events.recv() => self.handle_worker_event(event),
            }
        }

        if !self.queue.is_empty() || !self.in_flight.is_empty() {
            warn!(
                queued = self.queue.len(),
                in_flight = self.in_flight.len(),
                "dispatcher stopped with outstanding requests"
            );
        }
        info!("dispatcher stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Inspect { request, reply } => self.accept(request, reply),
            Command::CacheMiss { request, reply } => self.enqueue(request, reply),
            Command::Settled { id, result } => self.settle(id, result),
            Command::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
    }

    fn accept(&mut self, request: InspectRequest, reply: Reply) {
        if self.available == 0 {
            self.metrics.inspection("no_workers");
            let _ = reply.send(Err(Error::NoWorkersAvailable));
            return;
        }

        let Some(cache) = self.cache.clone() else {
            self.enqueue(request, reply);
            return;
        };

        let loopback = self.loopback.clone();
        let inspections = self.metrics.inspections.clone();
        let cache_operations = self.metrics.cache_operations.clone();

        tokio::spawn(async move {
            let key = request.key();
            match cache.lookup(&key).await {
                Ok(Some(item)) => {
                    debug!(request_id = %request.id, %key, "cache hit");
                    cache_operations.add(
                        1,
                        &[
                            KeyValue::new("operation", "lookup"),
                            KeyValue::new("result", "hit"),
                        ],
                    );
                    inspections.add(1, &[KeyValue::new("result", "cache_hit")]);
                    let _ = reply.send(Ok(item));
                    return;
                }
                Ok(None) => {
                    cache_operations.add(
                        1,
                        &[
                            KeyValue::new("operation", "lookup"),
                            KeyValue::new("result", "miss"),
                        ],
                    );
                }
                Err(e) => {
                    warn!(request_id = %request.id, %key, error = %e, "cache lookup failed, treating as miss");
                    cache_operations.add(
                        1,
                        &[
                            KeyValue::new("operation", "lookup"),
                            KeyValue::new("result", "error"),
                        ],
                    );
                }
            }

            if let Some(tx) = loopback.upgrade() {
                let _ = tx.send(Command::CacheMiss { request, reply });
            }
        });
    }

    /// Queue a request that has passed the cache.
    ///
    /// Fails with `NoWorkersAvailable` if every worker went unready during
    /// the lookup. Queued requests have no timeout of their own and wait for
    /// a worker to become ready.
    fn enqueue(&mut self, request: InspectRequest, reply: Reply) {
        if self.available == 0 {
            debug!(request_id = %request.id, asset_id = request.asset_id, "no workers after cache miss");
            self.metrics.inspection("no_workers");
            let _ = reply.send(Err(Error::NoWorkersAvailable));
            return;
        }

        debug!(request_id = %request.id, asset_id = request.asset_id, "queued");
        self.queue.push_back(Queued { request, reply });
        self.drain();
    }

    /// Hand queued requests to free workers, oldest first.
    fn drain(&mut self) {
        while self.available > 0 && self.idle > 0 && !self.queue.is_empty() {
            let Some(index) = self.slots.iter().position(|s| s.ready && !s.busy) else {
                break;
            };
            let Some(Queued { request, reply }) = self.queue.pop_front() else {
                break;
            };
            self.dispatch(index, request, reply);
        }
    }

    fn dispatch(&mut self, index: usize, request: InspectRequest, reply: Reply) {
        let slot = &mut self.slots[index];
        slot.busy = true;
        self.idle -= 1;

        let rx = match slot.handle.dispatch(request) {
            Ok(rx) => rx,
            Err(e) => {
                // The actor is gone for good: keep the slot busy so it is never
                // picked again and give the request to someone else.
                warn!(worker = index, error = %e, "worker unreachable");
                if slot.ready {
                    slot.ready = false;
                    self.available -= 1;
                }
                self.queue.push_front(Queued { request, reply });
                return;
            }
        };

        let span = start_inspect_span(&request.id, request.asset_id, index);
        record_transition(&span, "queued", "dispatched");

        self.in_flight.insert(
            request.id,
            InFlight {
                worker: index,
                request,
                reply,
                span,
                dispatched_at: Instant::now(),
            },
        );

        let loopback = self.loopback.clone();
        let id = request.id;
        tokio::spawn(async move {
            let result = rx.await.unwrap_or(Err(Error::WorkerGone(index)));
            if let Some(tx) = loopback.upgrade() {
                let _ = tx.send(Command::Settled { id, result });
            }
        });
    }

    fn settle(&mut self, id: RequestId, result: Result<ItemData>) {
        let Some(flight) = self.in_flight.remove(&id) else {
            return;
        };
        let InFlight {
            worker,
            request,
            reply,
            span,
            dispatched_at,
        } = flight;

        match result {
            Ok(item) => {
                record_transition(&span, "dispatched", "resolved");
                self.metrics.inspection("ok");
                self.metrics.duration_ms.record(
                    dispatched_at.elapsed().as_secs_f64() * 1000.0,
                    &[KeyValue::new("result", "ok")],
                );
                self.persist(&request, &item);
                let _ = reply.send(Ok(item));
            }
            Err(Error::NotReady(_)) => {
                // The worker never took the request; it stays first in line.
                record_transition(&span, "dispatched", "requeued");
                self.release(worker);
                self.queue.push_front(Queued { request, reply });
                self.drain();
            }
            Err(Error::AlreadyBusy(_)) => {
                // The worker announces `Free` itself when its slot clears.
                record_transition(&span, "dispatched", "requeued");
                self.queue.push_front(Queued { request, reply });
            }
            Err(Error::WorkerGone(_)) => {
                record_transition(&span, "dispatched", "requeued");
                let slot = &mut self.slots[worker];
                if slot.ready {
                    slot.ready = false;
                    self.available -= 1;
                }
                self.queue.push_front(Queued { request, reply });
                self.drain();
            }
            Err(e @ Error::Upstream(_)) => {
                record_transition(&span, "dispatched", "failed");
                self.metrics.inspection("error");
                self.release(worker);
                let _ = reply.send(Err(e));
                self.drain();
            }
            Err(e) => {
                // Deadline and the like: the worker frees itself.
                record_transition(&span, "dispatched", "failed");
                let result = if matches!(e, Error::DeadlineExceeded { .. }) {
                    "deadline"
                } else {
                    "error"
                };
                self.metrics.inspection(result);
                self.metrics.duration_ms.record(
                    dispatched_at.elapsed().as_secs_f64() * 1000.0,
                    &[KeyValue::new("result", result)],
                );
                let _ = reply.send(Err(e));
            }
        }
    }

    /// Fire-and-forget cache write. Failures never reach the caller.
    fn persist(&self, request: &InspectRequest, item: &ItemData) {
        let Some(cache) = self.cache.clone() else {
            return;
        };
        let item = item.clone();
        let owner = request.owner;
        let cache_operations = self.metrics.cache_operations.clone();

        tokio::spawn(async move {
            let result = match cache.store(&item, owner.token(), owner.is_market()).await {
                Ok(()) => "ok",
                Err(e) => {
                    warn!(asset_id = item.a, error = %e, "cache store failed");
                    "error"
                }
            };
            cache_operations.add(
                1,
                &[
                    KeyValue::new("operation", "store"),
                    KeyValue::new("result", result),
                ],
            );
        });
    }

    fn handle_worker_event(&mut self, event: WorkerEvent) {
        let Some(slot) = self.slots.get_mut(event.worker) else {
            return;
        };

        match event.kind {
            WorkerEventKind::Ready => {
                if !slot.ready {
                    slot.ready = true;
                    self.available += 1;
                    self.metrics
                        .worker_transitions
                        .add(1, &[KeyValue::new("to", "ready")]);
                    info!(worker = event.worker, available = self.available, "worker ready");
                    self.drain();
                }
            }
            WorkerEventKind::Unready => {
                if slot.ready {
                    slot.ready = false;
                    self.available -= 1;
                    self.metrics
                        .worker_transitions
                        .add(1, &[KeyValue::new("to", "unready")]);
                    info!(worker = event.worker, available = self.available, "worker unready");
                }
            }
            WorkerEventKind::Free => {
                self.release(event.worker);
                self.drain();
            }
        }
    }

    /// Clear the scheduler's busy mark for a worker.
    fn release(&mut self, worker: usize) {
        let slot = &mut self.slots[worker];
        if slot.busy {
            slot.busy = false;
            self.idle += 1;
        }
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.slots.len(),
            available: self.available,
            idle: self.idle,
            queued: self.queue.len(),
            in_flight: self.in_flight.len(),
        }
    }
}
