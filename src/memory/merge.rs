//! Merge/eviction engine.
//!
//! Applies an [`ExtractionResult`] to a [`MemoryStore`] in two phases:
//! updates first (exact, trimmed text match; first match wins), then inserts
//! (global case-insensitive dedup, tier capacity policy). Every candidate is
//! passed through the [`JunkClassifier`] before it can touch the store.
//!
//! After `merge` returns, no tier exceeds its capacity and no two items share
//! the same case-insensitive text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::filter::JunkClassifier;

use super::types::{
    dedup_key, ExtractionResult, MemoryItem, MemoryStore, MemoryUpdate, NewMemory, Tier,
};

/// What a merge did to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Whether the store content changed
    pub has_changes: bool,
    /// Facts inserted
    pub added: usize,
    /// Facts rewritten in place
    pub updated: usize,
    /// Facts evicted to make room
    pub evicted: usize,
    /// Candidates dropped by the junk classifier
    pub rejected_junk: usize,
    /// Candidates dropped because the text already exists
    pub rejected_duplicate: usize,
    /// Inserts dropped because the permanent tier is full
    pub rejected_full: usize,
    /// Updates whose `old_fact` matched nothing
    pub unmatched_updates: usize,
}

/// Merges extractor output into a store.
#[derive(Debug, Clone, Default)]
pub struct MemoryMerger {
    junk: JunkClassifier,
}

impl MemoryMerger {
    pub fn new(junk: JunkClassifier) -> Self {
        Self { junk }
    }

    pub fn junk(&self) -> &JunkClassifier {
        &self.junk
    }

    /// Apply `result` to `store`, stamping new and rewritten items with `now`.
    pub fn merge(
        &self,
        store: &mut MemoryStore,
        result: ExtractionResult,
        now: DateTime<Utc>,
    ) -> MergeReport {
        let mut report = MergeReport::default();

        for update in result.updates {
            self.apply_update(store, update, now, &mut report);
        }
        for candidate in result.new_memories {
            self.apply_insert(store, candidate, now, &mut report);
        }

        report.has_changes = report.added > 0 || report.updated > 0;
        report
    }

    fn apply_update(
        &self,
        store: &mut MemoryStore,
        update: MemoryUpdate,
        now: DateTime<Utc>,
        report: &mut MergeReport,
    ) {
        let new_fact = update.new_fact.trim();
        if new_fact.is_empty() {
            return;
        }
        if let Some(category) = self.junk.classify(new_fact) {
            debug!(fact = new_fact, %category, "Dropped junk update");
            report.rejected_junk += 1;
            return;
        }

        let Some((tier, index)) = find_exact(store, update.old_fact.trim()) else {
            debug!(old_fact = %update.old_fact, "Update target not found");
            report.unmatched_updates += 1;
            return;
        };

        let key = dedup_key(new_fact);
        let collides = store
            .iter_indexed()
            .any(|(t, i, item)| (t, i) != (tier, index) && item.dedup_key() == key);
        if collides {
            debug!(fact = new_fact, "Update would duplicate another fact");
            report.rejected_duplicate += 1;
            return;
        }

        let item = &mut store.tier_mut(tier)[index];
        if item.fact == new_fact {
            return;
        }
        info!(tier = %tier, old_fact = %item.fact, new_fact, "Updated memory");
        item.rewrite(new_fact, now);
        report.updated += 1;
    }

    fn apply_insert(
        &self,
        store: &mut MemoryStore,
        candidate: NewMemory,
        now: DateTime<Utc>,
        report: &mut MergeReport,
    ) {
        let fact = candidate.fact.trim();
        let tier = candidate.tier;
        if fact.is_empty() {
            return;
        }
        if let Some(category) = self.junk.classify(fact) {
            debug!(fact, %category, "Dropped junk fact");
            report.rejected_junk += 1;
            return;
        }
        if store.contains_fact(fact) {
            debug!(fact, "Skipped duplicate fact");
            report.rejected_duplicate += 1;
            return;
        }

        let items = store.tier_mut(tier);
        if items.len() >= tier.capacity() {
            if !tier.evicts_on_overflow() {
                warn!(
                    tier = %tier,
                    capacity = tier.capacity(),
                    fact,
                    "Tier is full, rejected new fact"
                );
                report.rejected_full += 1;
                return;
            }
            while items.len() >= tier.capacity() {
                let Some(oldest) = oldest_index(items.as_slice()) else {
                    break;
                };
                let evicted = items.remove(oldest);
                info!(tier = %tier, fact = %evicted.fact, "Evicted oldest memory");
                report.evicted += 1;
            }
        }

        info!(tier = %tier, fact, "Added memory");
        items.push(MemoryItem::new(fact, now));
        report.added += 1;
    }
}

/// First item, in tier order then insertion order, whose trimmed text equals `fact`.
fn find_exact(store: &MemoryStore, fact: &str) -> Option<(Tier, usize)> {
    store
        .iter_indexed()
        .find(|(_, _, item)| item.fact.trim() == fact)
        .map(|(tier, index, _)| (tier, index))
}

/// Index of the least recently touched item; ties go to the earliest inserted.
fn oldest_index(items: &[MemoryItem]) -> Option<usize> {
    let mut oldest: Option<(usize, DateTime<Utc>)> = None;
    for (index, item) in items.iter().enumerate() {
        let touched = item.touched_at();
        match oldest {
            Some((_, best)) if touched >= best => {}
            _ => oldest = Some((index, touched)),
        }
    }
    oldest.map(|(index, _)| index)
}
