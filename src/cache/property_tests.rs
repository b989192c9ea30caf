//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the eviction policy against arbitrary indexes.

use proptest::prelude::*;
use std::collections::HashSet;
use std::time::Duration;

use crate::cache::{compute_evictions, TimestampIndex};

// == Strategies ==
/// Generates URL-like keys drawn from a small pool so rewrites happen
fn url_strategy() -> impl Strategy<Value = String> {
    "[a-f]{1,3}".prop_map(|path| format!("https://example.com/{}", path))
}

/// Generates a sequence of (url, timestamp) writes
fn writes_strategy() -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::vec((url_strategy(), 0i64..200_000), 0..60)
}

fn build_index(writes: &[(String, i64)]) -> TimestampIndex {
    let mut index = TimestampIndex::new();
    for (url, ts) in writes {
        index.upsert(url, *ts);
    }
    index
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // **Property 1: Bounds Hold After Eviction**
    // *For any* index and limits, removing the computed victims leaves no
    // entry older than max_age and at most max_entries entries.
    #[test]
    fn prop_bounds_hold_after_eviction(
        writes in writes_strategy(),
        max_entries in prop::option::of(1usize..20),
        max_age_secs in prop::option::of(1u64..200),
        now in 0i64..400_000,
    ) {
        let mut index = build_index(&writes);
        let max_age = max_age_secs.map(Duration::from_secs);

        let victims = compute_evictions(&index, max_entries, max_age, now);
        index.remove_keys(&victims);

        if let Some(max) = max_entries {
            prop_assert!(index.len() <= max, "Index has {} entries, max {}", index.len(), max);
        }
        if let Some(age) = max_age {
            let cutoff = now - age.as_millis() as i64;
            for entry in index.oldest_first() {
                prop_assert!(entry.timestamp_ms >= cutoff, "Stale entry {} survived", entry.url);
            }
        }
    }

    // **Property 2: Idempotence**
    // *For any* index, a second policy run after applying the first is empty.
    #[test]
    fn prop_second_run_is_empty(
        writes in writes_strategy(),
        max_entries in prop::option::of(1usize..20),
        max_age_secs in prop::option::of(1u64..200),
        now in 0i64..400_000,
    ) {
        let mut index = build_index(&writes);
        let max_age = max_age_secs.map(Duration::from_secs);

        let first = compute_evictions(&index, max_entries, max_age, now);
        index.remove_keys(&first);
        let second = compute_evictions(&index, max_entries, max_age, now);

        prop_assert!(second.is_empty(), "Second run evicted {:?}", second);
    }

    // **Property 3: Victims Are Unique Existing Keys**
    // *For any* index, every victim is present in the index exactly once.
    #[test]
    fn prop_victims_unique_and_present(
        writes in writes_strategy(),
        max_entries in prop::option::of(1usize..20),
        now in 0i64..400_000,
    ) {
        let index = build_index(&writes);
        let victims = compute_evictions(&index, max_entries, Some(Duration::from_secs(60)), now);

        let unique: HashSet<&String> = victims.iter().collect();
        prop_assert_eq!(unique.len(), victims.len(), "Duplicate victims");
        for victim in &victims {
            prop_assert!(index.contains(victim));
        }
    }

    // **Property 4: Count Eviction Keeps The Newest**
    // *For any* index, count-only eviction never removes an entry that is
    // newer in write order than a surviving entry.
    #[test]
    fn prop_count_eviction_keeps_newest(
        writes in writes_strategy(),
        max_entries in 1usize..20,
    ) {
        let index = build_index(&writes);
        let victims: HashSet<String> =
            compute_evictions(&index, Some(max_entries), None, 0).into_iter().collect();

        let ordered = index.oldest_first();
        let first_survivor = ordered.iter().position(|e| !victims.contains(&e.url));
        if let Some(pos) = first_survivor {
            for entry in &ordered[pos..] {
                prop_assert!(!victims.contains(&entry.url), "{} evicted after a survivor", entry.url);
            }
        }
    }

    // **Property 5: Last Write Is Never Its Own Victim**
    // *For any* index, a key just stamped at `now` survives its pass.
    #[test]
    fn prop_fresh_write_survives(
        writes in writes_strategy(),
        fresh in url_strategy(),
        max_entries in prop::option::of(1usize..20),
        max_age_secs in prop::option::of(1u64..200),
    ) {
        let now = 200_000;
        let mut index = build_index(&writes);
        index.upsert(&fresh, now);

        let victims = compute_evictions(&index, max_entries, max_age_secs.map(Duration::from_secs), now);
        prop_assert!(!victims.contains(&fresh));
    }
}
