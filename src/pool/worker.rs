//! Session worker: wraps one upstream session and owns its single request slot.
//!
//! Each worker is an actor. Its inbox carries submissions and status probes;
//! its session stream carries readiness changes and inspect responses. The
//! deadline, cooldown, log-on and relog timers are owned by the actor and
//! dropped (cancelled) on the path that completes them.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep, interval_at, sleep};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{InspectRequest, ItemData, ItemInfo};
use crate::session::{GameCoordinator, SessionEvent, SessionLink};

/// Per-worker timing.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Minimum spacing the upstream wants between requests from one session.
    pub request_delay: Duration,
    /// How long to wait for a response before giving up on a request.
    pub request_ttl: Duration,
    /// Delay before the worker starts logging on.
    pub login_delay: Duration,
    /// Periodic relog; `None` disables it.
    pub relog_interval: Option<Duration>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            request_delay: Duration::from_millis(1100),
            request_ttl: Duration::from_millis(5000),
            login_delay: Duration::ZERO,
            relog_interval: None,
        }
    }
}

/// What a worker tells the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerEventKind {
    Ready,
    Unready,
    /// Busy flag cleared: the slot is empty and any cooldown has elapsed.
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerEvent {
    pub worker: usize,
    pub kind: WorkerEventKind,
}

/// Point-in-time view of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStatus {
    pub ready: bool,
    pub busy: bool,
    /// Asset id of the pending request, if any.
    pub pending: Option<u64>,
}

type Reply = oneshot::Sender<Result<ItemData>>;

enum WorkerMsg {
    Submit {
        request: InspectRequest,
        reply: Reply,
    },
    Status {
        reply: oneshot::Sender<WorkerStatus>,
    },
}

/// Cloneable handle to a running worker actor.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    index: usize,
    tx: mpsc::UnboundedSender<WorkerMsg>,
}

impl WorkerHandle {
    /// Spawn the worker actor on the current runtime.
    pub fn spawn(
        index: usize,
        link: SessionLink,
        settings: WorkerSettings,
        notify: mpsc::UnboundedSender<WorkerEvent>,
    ) -> Self {
        let (tx, inbox) = mpsc::unbounded_channel();

        let relog = settings.relog_interval.map(|period| {
            let mut relog = interval_at(Instant::now() + period, period);
            relog.set_missed_tick_behavior(MissedTickBehavior::Delay);
            relog
        });

        let worker = SessionWorker {
            index,
            coordinator: link.coordinator,
            events: link.events,
            events_open: true,
            inbox,
            notify,
            ready: false,
            busy: false,
            pending: None,
            cooldown: None,
            login: Some(Box::pin(sleep(settings.login_delay))),
            relog,
            settings,
        };
        tokio::spawn(worker.run());

        Self { index, tx }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Submit a request and wait for its outcome.
    ///
    /// Fails with [`Error::NotReady`] before the session is connected and with
    /// [`Error::AlreadyBusy`] while another request occupies the slot.
    pub async fn submit(&self, request: InspectRequest) -> Result<ItemData> {
        let rx = self.dispatch(request)?;
        rx.await.map_err(|_| Error::WorkerGone(self.index))?
    }

    /// Hand a request to the actor without waiting for the outcome.
    pub(crate) fn dispatch(
        &self,
        request: InspectRequest,
    ) -> Result<oneshot::Receiver<Result<ItemData>>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WorkerMsg::Submit { request, reply })
            .map_err(|_| Error::WorkerGone(self.index))?;
        Ok(rx)
    }

    pub async fn status(&self) -> Result<WorkerStatus> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WorkerMsg::Status { reply })
            .map_err(|_| Error::WorkerGone(self.index))?;
        rx.await.map_err(|_| Error::WorkerGone(self.index))
    }
}

/// The request occupying a worker's slot.
struct Pending {
    request: InspectRequest,
    reply: Reply,
    deadline: Pin<Box<Sleep>>,
}

struct SessionWorker {
    index: usize,
    coordinator: Arc<dyn GameCoordinator>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    events_open: bool,
    inbox: mpsc::UnboundedReceiver<WorkerMsg>,
    notify: mpsc::UnboundedSender<WorkerEvent>,
    settings: WorkerSettings,
    ready: bool,
    busy: bool,
    pending: Option<Pending>,
    cooldown: Option<Pin<Box<Sleep>>>,
    login: Option<Pin<Box<Sleep>>>,
    relog: Option<Interval>,
}

impl SessionWorker {
    async fn run(mut self) {
        debug!(worker = self.index, "worker started");

        loop {
            // Session events first: a submit never overtakes an unready
            // that arrived before it.
            tokio::select! {
                biased;
                event = self.events.recv(), if self.events_open => match event {
                    Some(event) => self.handle_session_event(event),
                    None => {
                        self.events_open = false;
                        self.set_ready(false, "session closed");
                    }
                },
                msg = self.inbox.recv() => match msg {
                    Some(msg) => self.handle_message(msg),
                    None => break,
                },
                _ = expire(self.pending.as_mut().map(|p| &mut p.deadline)) => self.expire_pending(),
                _ = expire(self.cooldown.as_mut()) => self.finish_cooldown(),
                _ = expire(self.login.as_mut()) => self.log_on(),
                _ = tick(self.relog.as_mut()) => self.relog(),
            }
        }

        debug!(worker = self.index, "worker stopped");
    }

    fn handle_message(&mut self, msg: WorkerMsg) {
        match msg {
            WorkerMsg::Submit { request, reply } => self.submit(request, reply),
            WorkerMsg::Status { reply } => {
                let _ = reply.send(WorkerStatus {
                    ready: self.ready,
                    busy: self.busy,
                    pending: self.pending.as_ref().map(|p| p.request.asset_id),
                });
            }
        }
    }

    fn submit(&mut self, request: InspectRequest, reply: Reply) {
        if !self.ready {
            let _ = reply.send(Err(Error::NotReady(self.index)));
            return;
        }
        if self.busy {
            let _ = reply.send(Err(Error::AlreadyBusy(self.index)));
            return;
        }

        debug!(worker = self.index, asset_id = request.asset_id, "fetching");

        if let Err(e) = self.coordinator.request_inspect(
            request.owner.token(),
            request.asset_id,
            request.signature,
        ) {
            warn!(worker = self.index, asset_id = request.asset_id, error = %e, "inspect send failed");
            let _ = reply.send(Err(e));
            return;
        }

        self.busy = true;
        self.pending = Some(Pending {
            request,
            reply,
            deadline: Box::pin(sleep(self.settings.request_ttl)),
        });
    }

    fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Ready => self.set_ready(true, "connected"),
            SessionEvent::Unready { reason } => self.set_ready(false, &reason),
            SessionEvent::ItemResolved(info) => self.resolve(info),
        }
    }

    fn resolve(&mut self, info: ItemInfo) {
        let Some(pending) = self
            .pending
            .take_if(|p| p.request.asset_id == info.item_id)
        else {
            debug!(worker = self.index, item_id = info.item_id, "ignoring unmatched response");
            return;
        };

        // Dropping `pending` cancels its deadline.
        let Pending { request, reply, .. } = pending;
        let elapsed = request.enqueued_at.elapsed();
        let delay = self.settings.request_delay.saturating_sub(elapsed);

        debug!(
            worker = self.index,
            asset_id = request.asset_id,
            elapsed_ms = elapsed.as_millis() as u64,
            delay_ms = delay.as_millis() as u64,
            "resolved"
        );

        let _ = reply.send(Ok(ItemData::resolve(info, &request, delay)));

        // Busy clears only once the cooldown timer fires, even for a zero delay.
        self.cooldown = Some(Box::pin(sleep(delay)));
    }

    fn expire_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        let ttl_ms = self.settings.request_ttl.as_millis() as u64;
        warn!(worker = self.index, asset_id = pending.request.asset_id, ttl_ms, "request ttl exceeded");

        self.busy = false;
        let _ = pending.reply.send(Err(Error::DeadlineExceeded {
            asset_id: pending.request.asset_id,
            ttl_ms,
        }));
        self.emit(WorkerEventKind::Free);
    }

    fn finish_cooldown(&mut self) {
        self.cooldown = None;
        self.busy = false;
        self.emit(WorkerEventKind::Free);
    }

    fn log_on(&mut self) {
        self.login = None;
        info!(worker = self.index, "logging in");
        if let Err(e) = self.coordinator.log_on() {
            warn!(worker = self.index, error = %e, "log on failed");
        }
    }

    fn relog(&mut self) {
        if !self.ready {
            return;
        }
        info!(worker = self.index, "relogging");
        if let Err(e) = self.coordinator.relog() {
            warn!(worker = self.index, error = %e, "relog failed");
        }
    }

    fn set_ready(&mut self, ready: bool, reason: &str) {
        if self.ready == ready {
            return;
        }
        self.ready = ready;

        if ready {
            info!(worker = self.index, "game coordinator ready");
            self.emit(WorkerEventKind::Ready);
        } else {
            warn!(worker = self.index, reason, "game coordinator unready");
            self.emit(WorkerEventKind::Unready);
        }
    }

    fn emit(&self, kind: WorkerEventKind) {
        let _ = self.notify.send(WorkerEvent {
            worker: self.index,
            kind,
        });
    }
}

async fn expire(timer: Option<&mut Pin<Box<Sleep>>>) {
    match timer {
        Some(timer) => timer.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn tick(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
