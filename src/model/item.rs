//! Item attributes as reported upstream and as returned to callers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{InspectKey, InspectRequest, OwnerContext};
use crate::identity::{self, ItemFields, Sticker};

/// Raw item attributes from a game-coordinator response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemInfo {
    /// Asset id the response is for. Matched against the pending request's `a`.
    pub item_id: u64,
    pub defindex: u32,
    pub paintindex: u32,
    pub rarity: u32,
    pub quality: u32,
    pub killeater_score_type: Option<u32>,
    pub killeater_value: Option<u32>,
    pub paintseed: u32,
    pub paintwear: f32,
    #[serde(default)]
    pub stickers: Vec<Sticker>,
}

/// A resolved item: upstream attributes merged with the originating request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemData {
    /// How long the caller should expect to have waited under the rate limit.
    #[serde(rename = "delay")]
    pub delay_ms: u64,
    pub item_id: u64,
    pub defindex: u32,
    pub paintindex: u32,
    pub rarity: u32,
    pub quality: u32,
    pub killeater_score_type: Option<u32>,
    pub killeater_value: Option<u32>,
    pub paintseed: u32,
    pub paintwear: f32,
    pub stickers: Vec<Sticker>,
    pub s: u64,
    pub a: u64,
    pub d: u64,
    pub m: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional: Option<ItemMetadata>,
}

/// Human-readable metadata attached by an enricher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wear_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ItemData {
    /// Merge an upstream response with the request that caused it.
    pub fn resolve(info: ItemInfo, request: &InspectRequest, delay: Duration) -> Self {
        Self::from_parts(info, &request.key(), delay.as_millis() as u64)
    }

    fn from_parts(info: ItemInfo, key: &InspectKey, delay_ms: u64) -> Self {
        Self {
            delay_ms,
            item_id: info.item_id,
            defindex: info.defindex,
            paintindex: info.paintindex,
            rarity: info.rarity,
            quality: info.quality,
            killeater_score_type: info.killeater_score_type,
            killeater_value: info.killeater_value,
            paintseed: info.paintseed,
            paintwear: info.paintwear,
            stickers: info.stickers,
            s: key.owner.s(),
            a: key.asset_id,
            d: key.signature,
            m: key.owner.m(),
            additional: None,
        }
    }

    /// The owner context this item was inspected under.
    pub fn owner(&self) -> Option<OwnerContext> {
        OwnerContext::from_tokens(self.s, self.m)
    }

    pub fn key(&self) -> Option<InspectKey> {
        self.owner().map(|owner| InspectKey::new(owner, self.a, self.d))
    }

    /// The identity-defining attributes.
    pub fn fields(&self) -> ItemFields {
        ItemFields {
            killeater_score_type: self.killeater_score_type,
            defindex: self.defindex,
            paintindex: self.paintindex,
            paintseed: self.paintseed,
            rarity: self.rarity,
            quality: self.quality,
            paintwear: self.paintwear,
        }
    }

    /// 32-digit item identity.
    pub fn identity(&self) -> String {
        identity::encode_item(&self.fields())
    }
}
