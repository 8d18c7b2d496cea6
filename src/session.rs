//! Boundary to the upstream session and game-coordinator clients.
//!
//! The pool never speaks the upstream protocol itself. A connector opens a
//! session for one login and hands back a [`SessionLink`]: a handle for
//! outbound calls plus the stream of events that session emits. Events carry
//! no delivery guarantee; a request may simply never be answered.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::LoginConfig;
use crate::error::Result;
use crate::model::ItemInfo;

/// Something the upstream session reported.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Connected to the game coordinator; inspect requests may be sent.
    Ready,
    /// Lost the game-coordinator connection. The session reconnects on its own.
    Unready { reason: String },
    /// An inspect response. Not necessarily for the request in flight.
    ItemResolved(ItemInfo),
}

/// Outbound half of a session.
pub trait GameCoordinator: Send + Sync {
    /// Begin logging on. Readiness is reported later through [`SessionEvent::Ready`].
    fn log_on(&self) -> Result<()>;

    /// Drop and re-establish the upstream session.
    fn relog(&self) -> Result<()>;

    /// Fire an inspect request. `owner` is the `s` token when set, else `m`.
    fn request_inspect(&self, owner: u64, asset_id: u64, signature: u64) -> Result<()>;
}

/// An opened session: outbound handle plus its event stream.
pub struct SessionLink {
    pub coordinator: Arc<dyn GameCoordinator>,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionLink {
    pub fn new(
        coordinator: Arc<dyn GameCoordinator>,
        events: mpsc::UnboundedReceiver<SessionEvent>,
    ) -> Self {
        Self {
            coordinator,
            events,
        }
    }
}

/// Opens upstream sessions for configured logins.
pub trait SessionConnector: Send + Sync {
    fn open(&self, login: &LoginConfig) -> Result<SessionLink>;
}
