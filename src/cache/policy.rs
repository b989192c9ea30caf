//! Eviction Policy Module
//!
//! Decides which URLs to drop from a cache given its timestamp index.

use std::time::Duration;

use crate::cache::TimestampIndex;

// == Compute Evictions ==
/// Returns the URLs to evict, oldest first.
///
/// Entries written before `now_ms - max_age` are evicted first. If the
/// survivors still number more than `max_entries`, the oldest survivors are
/// evicted until they fit. Equal timestamps are broken by write order.
///
/// Applying the result to `index` and calling this again with the same
/// `now_ms` returns an empty list.
pub fn compute_evictions(
    index: &TimestampIndex,
    max_entries: Option<usize>,
    max_age: Option<Duration>,
    now_ms: i64,
) -> Vec<String> {
    let ordered = index.oldest_first();

    let cutoff_ms = max_age.map(|age| now_ms.saturating_sub(duration_ms(age)));
    let (expired, live): (Vec<_>, Vec<_>) = ordered
        .into_iter()
        .partition(|entry| cutoff_ms.is_some_and(|cutoff| entry.timestamp_ms < cutoff));

    let mut victims: Vec<String> = expired.into_iter().map(|e| e.url).collect();

    if let Some(max) = max_entries {
        let excess = live.len().saturating_sub(max);
        victims.extend(live.into_iter().take(excess).map(|e| e.url));
    }

    victims
}

fn duration_ms(age: Duration) -> i64 {
    i64::try_from(age.as_millis()).unwrap_or(i64::MAX)
}
