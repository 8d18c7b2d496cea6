//! Core data model.
//!
//! An inspect request names one item through its owner context (inventory
//! owner or market listing), asset id and signature. Requests are resolved
//! into [`ItemData`] by a worker or straight from the dedup cache.

pub mod item;
pub mod link;

pub use item::{ItemData, ItemInfo, ItemMetadata};
pub use link::{parse_link, to_link};

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Request ID
// ---------------------------------------------------------------------------

/// Newtype for request IDs. Keys the dispatcher's correlation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Owner context
// ---------------------------------------------------------------------------

/// Who the item belongs to: an inventory owner (`s`) or a market listing (`m`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerContext {
    Inventory(u64),
    Market(u64),
}

impl OwnerContext {
    /// Build from raw `s`/`m` tokens. `s` wins when non-zero; both zero is invalid.
    pub fn from_tokens(s: u64, m: u64) -> Option<Self> {
        match (s, m) {
            (0, 0) => None,
            (0, m) => Some(Self::Market(m)),
            (s, _) => Some(Self::Inventory(s)),
        }
    }

    /// The token sent upstream as the owner argument.
    pub fn token(self) -> u64 {
        match self {
            Self::Inventory(s) | Self::Market(s) => s,
        }
    }

    pub fn is_market(self) -> bool {
        matches!(self, Self::Market(_))
    }

    /// `s` token, `0` for market listings.
    pub fn s(self) -> u64 {
        match self {
            Self::Inventory(s) => s,
            Self::Market(_) => 0,
        }
    }

    /// `m` token, `0` for inventory items.
    pub fn m(self) -> u64 {
        match self {
            Self::Inventory(_) => 0,
            Self::Market(m) => m,
        }
    }
}

// ---------------------------------------------------------------------------
// Inspect key
// ---------------------------------------------------------------------------

/// Canonical `{owner, a, d}` triple. The dedup cache lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InspectKey {
    pub owner: OwnerContext,
    pub asset_id: u64,
    pub signature: u64,
}

impl InspectKey {
    pub fn new(owner: OwnerContext, asset_id: u64, signature: u64) -> Self {
        Self {
            owner,
            asset_id,
            signature,
        }
    }
}

impl std::fmt::Display for InspectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = if self.owner.is_market() { 'M' } else { 'S' };
        write!(
            f,
            "{prefix}{}A{}D{}",
            self.owner.token(),
            self.asset_id,
            self.signature
        )
    }
}

// ---------------------------------------------------------------------------
// Inspect request
// ---------------------------------------------------------------------------

/// A request in flight through the pool.
///
/// `enqueued_at` anchors the per-worker rate limit: a worker's cooldown is
/// measured from here, not from the moment it was handed the request.
#[derive(Debug, Clone, Copy)]
pub struct InspectRequest {
    pub id: RequestId,
    pub owner: OwnerContext,
    pub asset_id: u64,
    pub signature: u64,
    pub enqueued_at: Instant,
}

impl InspectRequest {
    pub fn new(key: InspectKey) -> Self {
        Self {
            id: RequestId::new(),
            owner: key.owner,
            asset_id: key.asset_id,
            signature: key.signature,
            enqueued_at: Instant::now(),
        }
    }

    pub fn key(&self) -> InspectKey {
        InspectKey::new(self.owner, self.asset_id, self.signature)
    }
}
