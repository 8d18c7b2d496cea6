//! Optional human-readable decoration of resolved items.

use crate::model::{ItemData, ItemMetadata};

/// Adds display metadata to a resolved item.
pub trait Enricher: Send + Sync {
    fn enrich(&self, item: ItemData) -> ItemData;
}

// Upper bounds are inclusive, lower bounds exclusive.
const WEAR_TIERS: [(f32, &str); 5] = [
    (0.07, "Factory New"),
    (0.15, "Minimal Wear"),
    (0.38, "Field-Tested"),
    (0.45, "Well-Worn"),
    (1.00, "Battle-Scarred"),
];

/// Names the exterior tier an item's paint wear falls in.
#[derive(Debug, Clone, Copy, Default)]
pub struct WearNames;

impl WearNames {
    /// `None` for wear outside `(0, 1]`, i.e. items without a paint wear.
    pub fn wear_name(wear: f32) -> Option<&'static str> {
        if wear.is_nan() || wear <= 0.0 {
            return None;
        }
        WEAR_TIERS
            .iter()
            .find(|(max, _)| wear <= *max)
            .map(|(_, name)| *name)
    }
}

impl Enricher for WearNames {
    fn enrich(&self, mut item: ItemData) -> ItemData {
        if let Some(name) = Self::wear_name(item.paintwear) {
            item.additional
                .get_or_insert_with(ItemMetadata::default)
                .wear_name = Some(name.to_string());
        }
        item
    }
}
