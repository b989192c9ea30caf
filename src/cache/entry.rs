//! Timestamp Index Module
//!
//! Defines the per-cache map from URL to last-write time that drives
//! expiration, and the clock used to stamp it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};

// == Index Stamp ==
/// When a URL was last written, plus its position in write order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStamp {
    /// Wall-clock write time (Unix milliseconds)
    pub timestamp_ms: i64,
    /// Monotonic per-index sequence, bumped on every upsert
    pub seq: u64,
}

/// A single index entry in eviction order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampEntry {
    pub url: String,
    pub timestamp_ms: i64,
    pub seq: u64,
}

// == Timestamp Index ==
/// Mapping from URL to last-write stamp for one named cache.
///
/// Entries with equal timestamps are ordered by `seq`, so the entry written
/// first is always evicted first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampIndex {
    next_seq: u64,
    entries: BTreeMap<String, IndexStamp>,
}

impl TimestampIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // == Upsert ==
    /// Records a write of `url` at `timestamp_ms`, overwriting any previous stamp.
    pub fn upsert(&mut self, url: &str, timestamp_ms: i64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries
            .insert(url.to_string(), IndexStamp { timestamp_ms, seq });
    }

    /// Removes the given keys. Keys that are not present are ignored.
    pub fn remove_keys(&mut self, urls: &[String]) {
        for url in urls {
            self.entries.remove(url);
        }
    }

    pub fn get(&self, url: &str) -> Option<IndexStamp> {
        self.entries.get(url).copied()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    // == Oldest First ==
    /// Returns every entry ordered by `(timestamp_ms, seq)`.
    pub fn oldest_first(&self) -> Vec<TimestampEntry> {
        let mut ordered: Vec<TimestampEntry> = self
            .entries
            .iter()
            .map(|(url, stamp)| TimestampEntry {
                url: url.clone(),
                timestamp_ms: stamp.timestamp_ms,
                seq: stamp.seq,
            })
            .collect();
        ordered.sort_by_key(|e| (e.timestamp_ms, e.seq));
        ordered
    }
}

// == Clock ==
/// Source of "now" for stamping and expiration.
pub trait Clock: Send + Sync {
    /// Current time in Unix milliseconds.
    fn now_ms(&self) -> i64;
}

/// Wall clock backed by chrono.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        current_timestamp_ms()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.now_ms.fetch_add(secs * 1000, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
