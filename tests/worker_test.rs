mod common;

use std::time::Duration;

use common::{assert_close, fake_session, item_info, key, market_key, wait_worker_ready};
use inspect_rs::error::Error;
use inspect_rs::model::InspectRequest;
use inspect_rs::pool::{WorkerEvent, WorkerEventKind, WorkerHandle, WorkerSettings};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

fn settings(delay_ms: u64, ttl_ms: u64) -> WorkerSettings {
    WorkerSettings {
        request_delay: Duration::from_millis(delay_ms),
        request_ttl: Duration::from_millis(ttl_ms),
        login_delay: Duration::ZERO,
        relog_interval: None,
    }
}

struct Harness {
    session: common::FakeSession,
    worker: WorkerHandle,
    events: mpsc::UnboundedReceiver<WorkerEvent>,
}

impl Harness {
    fn new(settings: WorkerSettings) -> Self {
        let (session, link) = fake_session();
        let (tx, events) = mpsc::unbounded_channel();
        let worker = WorkerHandle::spawn(0, link, settings, tx);
        Self {
            session,
            worker,
            events,
        }
    }

    async fn ready(settings: WorkerSettings) -> Self {
        let mut harness = Self::new(settings);
        harness.session.ready();
        wait_worker_ready(&harness.worker).await;
        assert_eq!(harness.next_event().await, WorkerEventKind::Ready);
        harness
    }

    async fn next_event(&mut self) -> WorkerEventKind {
        let event = self.events.recv().await.unwrap();
        assert_eq!(event.worker, 0);
        event.kind
    }
}

#[tokio::test(start_paused = true)]
async fn submit_before_ready_is_rejected() {
    let harness = Harness::new(settings(1000, 5000));

    let result = harness.worker.submit(InspectRequest::new(key(1))).await;

    assert!(matches!(result, Err(Error::NotReady(0))));
    assert!(harness.session.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unready_queued_before_submit_is_seen_first() {
    let harness = Harness::ready(settings(1000, 5000)).await;

    harness.session.unready();
    let result = harness.worker.submit(InspectRequest::new(key(1))).await;

    assert!(matches!(result, Err(Error::NotReady(0))));
    assert!(harness.session.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn sends_inventory_owner_or_market_listing() {
    let harness = Harness::ready(settings(0, 5000)).await;

    let worker = harness.worker.clone();
    let task = tokio::spawn(async move { worker.submit(InspectRequest::new(key(11))).await });
    common::wait_requests(&harness.session, 1).await;
    harness.session.respond(item_info(11));
    let item = task.await.unwrap().unwrap();
    assert_eq!((item.s, item.a, item.m), (common::OWNER, 11, 0));

    // Zero cooldown still clears on the timer.
    sleep(Duration::from_millis(1)).await;

    let worker = harness.worker.clone();
    let task =
        tokio::spawn(async move { worker.submit(InspectRequest::new(market_key(12))).await });
    common::wait_requests(&harness.session, 2).await;
    harness.session.respond(item_info(12));
    let item = task.await.unwrap().unwrap();
    assert_eq!((item.s, item.a, item.m), (0, 12, common::LISTING));

    let requests = harness.session.requests();
    assert_eq!(requests[0], (common::OWNER, 11, key(11).signature));
    assert_eq!(requests[1], (common::LISTING, 12, market_key(12).signature));
}

#[tokio::test(start_paused = true)]
async fn busy_worker_rejects_without_touching_pending() {
    let harness = Harness::ready(settings(1000, 1000)).await;
    let start = Instant::now();

    let worker = harness.worker.clone();
    let first = tokio::spawn(async move { worker.submit(InspectRequest::new(key(1))).await });

    sleep(Duration::from_millis(500)).await;
    let second = harness.worker.submit(InspectRequest::new(key(2))).await;
    assert!(matches!(second, Err(Error::AlreadyBusy(0))));

    let status = harness.worker.status().await.unwrap();
    assert!(status.busy);
    assert_eq!(status.pending, Some(1));

    // The rejected submission must not have re-armed the deadline.
    let result = first.await.unwrap();
    assert!(matches!(
        result,
        Err(Error::DeadlineExceeded {
            asset_id: 1,
            ttl_ms: 1000
        })
    ));
    assert_close(start.elapsed(), Duration::from_millis(1000));
    assert_eq!(harness.session.requested_assets(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn deadline_frees_worker_without_cooldown() {
    let mut harness = Harness::ready(settings(10_000, 1000)).await;
    let start = Instant::now();

    let result = harness.worker.submit(InspectRequest::new(key(1))).await;
    assert!(matches!(result, Err(Error::DeadlineExceeded { .. })));

    assert_eq!(harness.next_event().await, WorkerEventKind::Free);
    assert_close(start.elapsed(), Duration::from_millis(1000));

    let status = harness.worker.status().await.unwrap();
    assert!(!status.busy);
    assert_eq!(status.pending, None);
}

#[tokio::test(start_paused = true)]
async fn cooldown_covers_rest_of_request_delay() {
    let mut harness = Harness::ready(settings(1000, 5000)).await;
    let start = Instant::now();

    let worker = harness.worker.clone();
    let task = tokio::spawn(async move { worker.submit(InspectRequest::new(key(7))).await });
    sleep(Duration::from_millis(300)).await;
    harness.session.respond(item_info(7));

    let item = task.await.unwrap().unwrap();
    assert!((699..=700).contains(&item.delay_ms), "delay {}", item.delay_ms);

    let status = harness.worker.status().await.unwrap();
    assert!(status.busy);
    assert_eq!(status.pending, None);

    assert_eq!(harness.next_event().await, WorkerEventKind::Free);
    assert_close(start.elapsed(), Duration::from_millis(1000));
    assert!(!harness.worker.status().await.unwrap().busy);
}

#[tokio::test(start_paused = true)]
async fn slow_response_gets_zero_delay() {
    let mut harness = Harness::ready(settings(100, 5000)).await;

    let worker = harness.worker.clone();
    let task = tokio::spawn(async move { worker.submit(InspectRequest::new(key(7))).await });
    sleep(Duration::from_millis(300)).await;
    harness.session.respond(item_info(7));

    let item = task.await.unwrap().unwrap();
    assert_eq!(item.delay_ms, 0);
    assert_eq!(harness.next_event().await, WorkerEventKind::Free);
}

#[tokio::test(start_paused = true)]
async fn unmatched_response_is_ignored() {
    let harness = Harness::ready(settings(0, 5000)).await;

    let worker = harness.worker.clone();
    let task = tokio::spawn(async move { worker.submit(InspectRequest::new(key(7))).await });
    common::wait_requests(&harness.session, 1).await;

    harness.session.respond(item_info(8));
    let status = harness.worker.status().await.unwrap();
    assert_eq!(status.pending, Some(7));
    assert!(!task.is_finished());

    harness.session.respond(item_info(7));
    let item = task.await.unwrap().unwrap();
    assert_eq!(item.a, 7);
    assert_eq!(item.item_id, 7);
}

#[tokio::test(start_paused = true)]
async fn upstream_send_failure_leaves_worker_idle() {
    let harness = Harness::ready(settings(1000, 5000)).await;
    harness.session.fail_requests(true);

    let result = harness.worker.submit(InspectRequest::new(key(1))).await;
    assert!(matches!(result, Err(Error::Upstream(_))));

    let status = harness.worker.status().await.unwrap();
    assert!(!status.busy);
    assert_eq!(status.pending, None);
}

#[tokio::test(start_paused = true)]
async fn readiness_is_reported_on_transitions_only() {
    let mut harness = Harness::ready(settings(0, 5000)).await;

    harness.session.ready();
    harness.session.unready();
    harness.session.unready();
    harness.session.ready();

    assert_eq!(harness.next_event().await, WorkerEventKind::Unready);
    assert_eq!(harness.next_event().await, WorkerEventKind::Ready);
    assert!(harness.events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn logs_on_after_login_delay() {
    let harness = Harness::new(WorkerSettings {
        login_delay: Duration::from_secs(2),
        ..settings(0, 5000)
    });

    sleep(Duration::from_secs(1)).await;
    assert_eq!(harness.session.log_ons(), 0);

    sleep(Duration::from_millis(1001)).await;
    assert_eq!(harness.session.log_ons(), 1);

    sleep(Duration::from_secs(60)).await;
    assert_eq!(harness.session.log_ons(), 1);
}

#[tokio::test(start_paused = true)]
async fn relogs_only_while_ready() {
    let harness = Harness::new(WorkerSettings {
        relog_interval: Some(Duration::from_secs(10)),
        ..settings(0, 5000)
    });

    sleep(Duration::from_millis(10_500)).await;
    assert_eq!(harness.session.relogs(), 0);

    harness.session.ready();
    wait_worker_ready(&harness.worker).await;
    sleep(Duration::from_secs(10)).await;
    assert_eq!(harness.session.relogs(), 1);
}
