//! Error types for inspect-rs.

use thiserror::Error;

use crate::identity::IdentityError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid inspect link: {0}")]
    InvalidLink(String),

    #[error("no workers available")]
    NoWorkersAvailable,

    #[error("worker {0} is not ready")]
    NotReady(usize),

    #[error("worker {0} already has a request in flight")]
    AlreadyBusy(usize),

    #[error("no response for asset {asset_id} within {ttl_ms}ms")]
    DeadlineExceeded { asset_id: u64, ttl_ms: u64 },

    #[error("worker {0} stopped")]
    WorkerGone(usize),

    #[error("dispatcher stopped")]
    DispatcherGone,

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
