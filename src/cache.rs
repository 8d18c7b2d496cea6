//! Dedup cache of resolved items.
//!
//! The dispatcher consults the cache before any upstream work and writes
//! every fresh result back without waiting. Implementations must tolerate
//! concurrent use from several dispatchers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::error::{Error, Result};
use crate::model::{InspectKey, ItemData, OwnerContext};

#[async_trait]
pub trait InspectCache: Send + Sync {
    /// Find a previously resolved item for this request key.
    async fn lookup(&self, key: &InspectKey) -> Result<Option<ItemData>>;

    /// Record a resolved item under its owner. `is_market` selects whether
    /// `owner_key` is a market listing id or an inventory owner id.
    async fn store(&self, item: &ItemData, owner_key: u64, is_market: bool) -> Result<()>;
}

#[derive(Debug, Clone)]
struct CachedItem {
    item: ItemData,
    identity: String,
    stored_at: DateTime<Utc>,
}

/// In-process cache keyed by request, with a secondary index on item
/// identity.
///
/// Items are kept whole. The identity only serves the index, so fields it
/// cannot hold (four-digit defindex, wear at the clamp edges) come back as
/// they were stored.
#[derive(Debug, Default)]
pub struct MemoryCache {
    items: DashMap<InspectKey, CachedItem>,
    by_identity: DashMap<String, InspectKey>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The request key most recently stored with this item identity.
    pub fn find_by_identity(&self, identity: &str) -> Option<InspectKey> {
        self.by_identity.get(identity).map(|key| *key)
    }

    /// The item identity stored for `key`.
    pub fn identity(&self, key: &InspectKey) -> Option<String> {
        self.items.get(key).map(|entry| entry.identity.clone())
    }

    /// When the entry for `key` was written.
    pub fn stored_at(&self, key: &InspectKey) -> Option<DateTime<Utc>> {
        self.items.get(key).map(|entry| entry.stored_at)
    }
}

#[async_trait]
impl InspectCache for MemoryCache {
    async fn lookup(&self, key: &InspectKey) -> Result<Option<ItemData>> {
        let Some(mut item) = self.items.get(key).map(|entry| entry.item.clone()) else {
            return Ok(None);
        };
        // Hits report no wait and carry the caller's key.
        item.delay_ms = 0;
        item.s = key.owner.s();
        item.m = key.owner.m();
        item.a = key.asset_id;
        item.d = key.signature;
        Ok(Some(item))
    }

    async fn store(&self, item: &ItemData, owner_key: u64, is_market: bool) -> Result<()> {
        let owner = if is_market {
            OwnerContext::from_tokens(0, owner_key)
        } else {
            OwnerContext::from_tokens(owner_key, 0)
        }
        .ok_or_else(|| Error::Cache(format!("item {} has no owner", item.a)))?;

        let key = InspectKey::new(owner, item.a, item.d);
        let identity = item.identity();

        self.by_identity.insert(identity.clone(), key);
        self.items.insert(
            key,
            CachedItem {
                item: item.clone(),
                identity,
                stored_at: Utc::now(),
            },
        );
        Ok(())
    }
}
