//! Fake upstream sessions and helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use inspect_rs::error::{Error, Result};
use inspect_rs::model::{InspectKey, ItemInfo, OwnerContext, to_link};
use inspect_rs::pool::{Dispatcher, PoolStats, WorkerHandle};
use inspect_rs::session::{GameCoordinator, SessionEvent, SessionLink};
use tokio::sync::mpsc;

pub const OWNER: u64 = 76561198084749846;
pub const LISTING: u64 = 625254122282020305;

/// Records every outbound call instead of talking to a game coordinator.
#[derive(Default)]
pub struct FakeCoordinator {
    requests: Mutex<Vec<(u64, u64, u64)>>,
    log_ons: AtomicUsize,
    relogs: AtomicUsize,
    fail_requests: AtomicBool,
    crash_on_request: AtomicBool,
    crash_on_relog: AtomicBool,
}

impl GameCoordinator for FakeCoordinator {
    fn log_on(&self) -> Result<()> {
        self.log_ons.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn relog(&self) -> Result<()> {
        self.relogs.fetch_add(1, Ordering::SeqCst);
        if self.crash_on_relog.load(Ordering::SeqCst) {
            panic!("session crashed during relog");
        }
        Ok(())
    }

    fn request_inspect(&self, owner: u64, asset_id: u64, signature: u64) -> Result<()> {
        if self.crash_on_request.load(Ordering::SeqCst) {
            panic!("session crashed during request");
        }
        if self.fail_requests.load(Ordering::SeqCst) {
            return Err(Error::Upstream("socket closed".to_string()));
        }
        self.requests
            .lock()
            .unwrap()
            .push((owner, asset_id, signature));
        Ok(())
    }
}

/// Test-side end of a fake session.
pub struct FakeSession {
    pub coordinator: Arc<FakeCoordinator>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl FakeSession {
    pub fn ready(&self) {
        self.events.send(SessionEvent::Ready).unwrap();
    }

    pub fn unready(&self) {
        self.events
            .send(SessionEvent::Unready {
                reason: "gc disconnected".to_string(),
            })
            .unwrap();
    }

    pub fn respond(&self, info: ItemInfo) {
        self.events.send(SessionEvent::ItemResolved(info)).unwrap();
    }

    pub fn requests(&self) -> Vec<(u64, u64, u64)> {
        self.coordinator.requests.lock().unwrap().clone()
    }

    pub fn requested_assets(&self) -> Vec<u64> {
        self.requests().into_iter().map(|(_, a, _)| a).collect()
    }

    pub fn log_ons(&self) -> usize {
        self.coordinator.log_ons.load(Ordering::SeqCst)
    }

    pub fn relogs(&self) -> usize {
        self.coordinator.relogs.load(Ordering::SeqCst)
    }

    pub fn fail_requests(&self, fail: bool) {
        self.coordinator.fail_requests.store(fail, Ordering::SeqCst);
    }

    /// Panic inside the worker actor on the next inspect request.
    pub fn crash_on_request(&self) {
        self.coordinator.crash_on_request.store(true, Ordering::SeqCst);
    }

    /// Panic inside the worker actor on the next relog.
    pub fn crash_on_relog(&self) {
        self.coordinator.crash_on_relog.store(true, Ordering::SeqCst);
    }
}

pub fn fake_session() -> (FakeSession, SessionLink) {
    let coordinator = Arc::new(FakeCoordinator::default());
    let (tx, rx) = mpsc::unbounded_channel();
    let link = SessionLink::new(coordinator.clone(), rx);
    (
        FakeSession {
            coordinator,
            events: tx,
        },
        link,
    )
}

pub fn fake_sessions(n: usize) -> (Vec<FakeSession>, Vec<SessionLink>) {
    (0..n).map(|_| fake_session()).unzip()
}

pub fn key(asset_id: u64) -> InspectKey {
    InspectKey::new(OwnerContext::Inventory(OWNER), asset_id, 7935523998312483177)
}

pub fn market_key(asset_id: u64) -> InspectKey {
    InspectKey::new(OwnerContext::Market(LISTING), asset_id, 30614827701953021)
}

pub fn link(asset_id: u64) -> String {
    to_link(&key(asset_id))
}

/// A plausible response for `asset_id`; the def index echoes the asset id
/// so cross-delivery is easy to spot.
pub fn item_info(asset_id: u64) -> ItemInfo {
    ItemInfo {
        item_id: asset_id,
        defindex: (asset_id % 1000) as u32,
        paintindex: 282,
        rarity: 5,
        quality: 4,
        killeater_score_type: None,
        killeater_value: None,
        paintseed: 525,
        paintwear: 0.25,
        stickers: Vec::new(),
    }
}

/// Let spawned actors run until `ready` reports success.
pub async fn eventually<F, Fut>(mut ready: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..1000 {
        if ready().await {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

pub async fn wait_available(dispatcher: &Dispatcher, n: usize) {
    eventually(|| async move { dispatcher.stats().await.unwrap().available == n }).await;
}

pub async fn wait_stats(dispatcher: &Dispatcher, check: impl Fn(PoolStats) -> bool) {
    let check = &check;
    eventually(|| async move { check(dispatcher.stats().await.unwrap()) }).await;
}

pub async fn wait_worker_ready(worker: &WorkerHandle) {
    eventually(|| async move { worker.status().await.unwrap().ready }).await;
}

pub async fn wait_requests(session: &FakeSession, n: usize) {
    eventually(|| async move { session.requests().len() >= n }).await;
}

/// `actual` within a millisecond or two above `expected` (timer granularity).
pub fn assert_close(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual <= expected + Duration::from_millis(2),
        "expected ~{expected:?}, got {actual:?}"
    );
}
