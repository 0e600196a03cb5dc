//! Property-based tests for the memory store invariants using proptest.
//!
//! After any sequence of merges:
//!
//! - no tier holds more items than its capacity
//! - no two items share the same case-insensitive text
//! - `updated_at` never precedes `created_at`
//! - a full permanent tier only changes through updates

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::{DateTime, Duration, Utc};
    use proptest::prelude::*;

    use crate::memory::merge::MemoryMerger;
    use crate::memory::sweep::sweep;
    use crate::memory::types::{
        ExtractionResult, MemoryItem, MemoryStore, MemoryUpdate, NewMemory, Tier,
    };

    fn base_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn tier() -> impl Strategy<Value = Tier> {
        prop_oneof![
            Just(Tier::Permanent),
            Just(Tier::LongTerm),
            Just(Tier::ShortTerm),
        ]
    }

    // Small vocabulary with case variants so collisions are common
    fn fact() -> impl Strategy<Value = String> {
        "(likes|Likes|LIKES|owns|Owns) (item|Item) [0-9]{1,2}"
    }

    fn new_memory() -> impl Strategy<Value = NewMemory> {
        (fact(), tier()).prop_map(|(fact, tier)| NewMemory::new(fact, tier))
    }

    fn update() -> impl Strategy<Value = MemoryUpdate> {
        (fact(), fact()).prop_map(|(old, new)| MemoryUpdate::new(old, new))
    }

    fn extraction() -> impl Strategy<Value = ExtractionResult> {
        (
            prop::collection::vec(new_memory(), 0..8),
            prop::collection::vec(update(), 0..3),
        )
            .prop_map(|(new_memories, updates)| ExtractionResult {
                new_memories,
                updates,
            })
    }

    /// Merges with non-decreasing timestamps; a zero step yields ties.
    fn merge_sequence() -> impl Strategy<Value = Vec<(i64, ExtractionResult)>> {
        prop::collection::vec((0i64..3, extraction()), 1..25)
    }

    fn run(sequence: Vec<(i64, ExtractionResult)>) -> MemoryStore {
        let merger = MemoryMerger::default();
        let mut store = MemoryStore::new();
        let mut now = base_time();
        for (step, result) in sequence {
            now += Duration::minutes(step);
            merger.merge(&mut store, result, now);
        }
        store
    }

    proptest! {
        #[test]
        fn capacity_is_never_exceeded(sequence in merge_sequence()) {
            let store = run(sequence);
            for tier in Tier::ALL {
                prop_assert!(
                    store.tier(tier).len() <= tier.capacity(),
                    "{} holds {} items",
                    tier,
                    store.tier(tier).len()
                );
            }
        }

        #[test]
        fn facts_are_globally_unique(sequence in merge_sequence()) {
            let store = run(sequence);
            let mut seen = HashSet::new();
            for (_, item) in store.iter() {
                prop_assert!(seen.insert(item.dedup_key()), "duplicate fact {:?}", item.fact);
            }
        }

        #[test]
        fn updated_never_precedes_created(sequence in merge_sequence()) {
            let store = run(sequence);
            for (_, item) in store.iter() {
                prop_assert!(item.touched_at() >= item.created_at);
            }
        }

        #[test]
        fn full_permanent_tier_rejects_inserts(
            inserts in prop::collection::vec(new_memory(), 1..10)
        ) {
            let mut store = MemoryStore::new();
            for i in 0..Tier::Permanent.capacity() {
                store
                    .permanent
                    .push(MemoryItem::new(format!("Core fact {}", i), base_time()));
            }
            let before = store.permanent.clone();

            let result = ExtractionResult { new_memories: inserts, updates: Vec::new() };
            MemoryMerger::default().merge(&mut store, result, base_time() + Duration::days(1));

            prop_assert_eq!(store.permanent, before);
        }

        #[test]
        fn sweep_is_idempotent(
            sequence in merge_sequence(),
            days_later in 0i64..120
        ) {
            let mut store = run(sequence);
            let now = base_time() + Duration::days(days_later);

            sweep(&mut store, now);
            let once = store.clone();
            prop_assert_eq!(sweep(&mut store, now), 0);
            prop_assert_eq!(store, once);
        }
    }
}
