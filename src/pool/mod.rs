//! Worker pool: session workers plus the dispatcher that feeds them.
//!
//! [`PoolBuilder`] spawns one [`WorkerHandle`] per session and a single
//! dispatch loop; [`Dispatcher`] is the cloneable caller-facing handle.

mod scheduler;
pub mod worker;

pub use worker::{WorkerEvent, WorkerEventKind, WorkerHandle, WorkerSettings, WorkerStatus};

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

use crate::cache::InspectCache;
use crate::config::LoginRegistry;
use crate::enrich::Enricher;
use crate::error::{Error, Result};
use crate::model::{InspectKey, InspectRequest, ItemData, parse_link};
use crate::session::{SessionConnector, SessionLink};
use scheduler::{Command, DispatchLoop};

/// Snapshot of pool accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    /// Workers connected to the game coordinator.
    pub available: usize,
    /// Workers with a clear busy flag.
    pub idle: usize,
    pub queued: usize,
    pub in_flight: usize,
}

/// Builder for a running pool.
pub struct PoolBuilder {
    settings: WorkerSettings,
    login_stagger: Duration,
    cache: Option<Arc<dyn InspectCache>>,
    enricher: Option<Arc<dyn Enricher>>,
}

impl PoolBuilder {
    pub fn new(settings: WorkerSettings) -> Self {
        Self {
            settings,
            login_stagger: Duration::ZERO,
            cache: None,
            enricher: None,
        }
    }

    /// Spread log-ons (and relog variance) over up to this long.
    pub fn login_stagger(mut self, stagger: Duration) -> Self {
        self.login_stagger = stagger;
        self
    }

    pub fn cache(mut self, cache: Arc<dyn InspectCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Open a session per login through `connector`, then start the pool.
    pub fn connect(
        self,
        connector: &dyn SessionConnector,
        logins: &LoginRegistry,
    ) -> Result<Dispatcher> {
        if logins.is_empty() {
            return Err(Error::Config("no logins configured".to_string()));
        }
        let links = logins
            .iter()
            .map(|login| connector.open(login))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.start(links))
    }

    /// Spawn a worker per session and the dispatch loop. Needs a Tokio runtime.
    ///
    /// The first worker logs on immediately; the rest wait a random delay up
    /// to the login stagger so the accounts do not all connect at once.
    pub fn start(self, links: Vec<SessionLink>) -> Dispatcher {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut rng = rand::rng();

        let workers: Vec<WorkerHandle> = links
            .into_iter()
            .enumerate()
            .map(|(index, link)| {
                let mut settings = self.settings.clone();
                if index > 0 {
                    settings.login_delay = jitter(&mut rng, self.login_stagger);
                }
                settings.relog_interval = settings
                    .relog_interval
                    .map(|period| period + jitter(&mut rng, self.login_stagger));
                WorkerHandle::spawn(index, link, settings, event_tx.clone())
            })
            .collect();

        info!(workers = workers.len(), "starting pool");

        let (tx, rx) = mpsc::unbounded_channel();
        let dispatch = DispatchLoop::new(workers, self.cache, rx, tx.downgrade(), event_rx);
        tokio::spawn(dispatch.run());

        Dispatcher {
            tx,
            enricher: self.enricher,
        }
    }
}

fn jitter(rng: &mut impl Rng, max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    Duration::from_millis(rng.random_range(0..=max_ms))
}

/// Caller-facing handle to the pool.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<Command>,
    enricher: Option<Arc<dyn Enricher>>,
}

impl Dispatcher {
    /// Inspect the item behind an inspect link.
    ///
    /// With `enrich` set, the configured enricher (if any) decorates the result.
    pub async fn inspect(&self, link: &str, enrich: bool) -> Result<ItemData> {
        let key = parse_link(link)?;
        self.inspect_key(key, enrich).await
    }

    pub async fn inspect_key(&self, key: InspectKey, enrich: bool) -> Result<ItemData> {
        let item = self.inspect_request(InspectRequest::new(key)).await?;
        Ok(self.finish(item, enrich))
    }

    /// Run a prepared request through the pool: cache first, then a worker.
    pub async fn inspect_request(&self, request: InspectRequest) -> Result<ItemData> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Inspect { request, reply })
            .map_err(|_| Error::DispatcherGone)?;
        rx.await.map_err(|_| Error::DispatcherGone)?
    }

    /// Inspect several links one after another; results follow input order.
    ///
    /// Every link is parsed before any work starts, so a malformed link fails
    /// the batch without queueing anything. The first failed inspection fails
    /// the batch.
    pub async fn inspect_bulk<S: AsRef<str>>(
        &self,
        links: &[S],
        enrich: bool,
    ) -> Result<Vec<ItemData>> {
        let keys = links
            .iter()
            .map(|link| parse_link(link.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            items.push(self.inspect_key(key, enrich).await?);
        }
        Ok(items)
    }

    pub async fn stats(&self) -> Result<PoolStats> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Stats { reply })
            .map_err(|_| Error::DispatcherGone)?;
        rx.await.map_err(|_| Error::DispatcherGone)
    }

    fn finish(&self, item: ItemData, enrich: bool) -> ItemData {
        match (&self.enricher, enrich) {
            (Some(enricher), true) => enricher.enrich(item),
            _ => item,
        }
    }
}
