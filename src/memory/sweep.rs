//! Age-based expiry for the non-permanent tiers.

use chrono::{DateTime, Utc};
use tracing::info;

use super::types::{MemoryStore, Tier};

/// Remove items older than their tier's retention window.
///
/// An item expires when `now - touched_at` is strictly greater than the
/// retention, so an item exactly at the boundary survives. The permanent tier
/// is never inspected. Returns the number of items removed; running it again
/// with the same `now` removes nothing.
pub fn sweep(store: &mut MemoryStore, now: DateTime<Utc>) -> usize {
    let mut removed = 0;

    for tier in Tier::ALL {
        let Some(retention) = tier.retention() else {
            continue;
        };

        let items = store.tier_mut(tier);
        let before = items.len();
        items.retain(|item| now - item.touched_at() <= retention);

        let expired = before - items.len();
        if expired > 0 {
            info!(tier = %tier, count = expired, "Cleaned expired memories");
        }
        removed += expired;
    }

    removed
}
