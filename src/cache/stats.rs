//! Cache Statistics Module
//!
//! Counts fetches, cache writes and eviction outcomes.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Fetch Stats ==
/// Live counters shared between the fetcher and its background tasks.
#[derive(Debug, Default)]
pub struct FetchStats {
    fetches: AtomicU64,
    network_errors: AtomicU64,
    cache_writes: AtomicU64,
    cache_write_failures: AtomicU64,
    eviction_passes: AtomicU64,
    failed_passes: AtomicU64,
    evicted_entries: AtomicU64,
}

impl FetchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_network_error(&self) {
        self.network_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_write(&self) {
        self.cache_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_write_failure(&self) {
        self.cache_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a finished eviction pass and how many entries it removed.
    pub fn record_pass(&self, evicted: usize) {
        self.eviction_passes.fetch_add(1, Ordering::Relaxed);
        self.evicted_entries
            .fetch_add(evicted as u64, Ordering::Relaxed);
    }

    pub fn record_failed_pass(&self) {
        self.failed_passes.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Returns a point-in-time copy of every counter.
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            fetches: self.fetches.load(Ordering::Relaxed),
            network_errors: self.network_errors.load(Ordering::Relaxed),
            cache_writes: self.cache_writes.load(Ordering::Relaxed),
            cache_write_failures: self.cache_write_failures.load(Ordering::Relaxed),
            eviction_passes: self.eviction_passes.load(Ordering::Relaxed),
            failed_passes: self.failed_passes.load(Ordering::Relaxed),
            evicted_entries: self.evicted_entries.load(Ordering::Relaxed),
        }
    }
}

// == Cache Stats ==
/// Serializable snapshot of `FetchStats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Responses obtained from the transport
    pub fetches: u64,
    /// Fetches that failed at the transport
    pub network_errors: u64,
    /// Responses written into a content cache
    pub cache_writes: u64,
    /// Content cache opens or writes that failed
    pub cache_write_failures: u64,
    /// Eviction passes that ran to completion
    pub eviction_passes: u64,
    /// Eviction passes aborted by a metadata error
    pub failed_passes: u64,
    /// Entries removed by eviction
    pub evicted_entries: u64,
}

impl CacheStats {
    // == Write Rate ==
    /// Share of fetches that ended up in a cache, or 0.0 before any fetch.
    pub fn write_rate(&self) -> f64 {
        if self.fetches == 0 {
            0.0
        } else {
            self.cache_writes as f64 / self.fetches as f64
        }
    }
}
