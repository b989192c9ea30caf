//! Cache Module
//!
//! Content caches, the durable timestamp indexes that track them, and the
//! LRU/TTL policy that decides what to evict.

mod content;
mod entry;
mod metadata;
mod policy;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use content::{ContentCache, ContentStore, MemoryCache, MemoryContentStore};
pub use entry::{
    current_timestamp_ms, Clock, IndexStamp, ManualClock, SystemClock, TimestampEntry,
    TimestampIndex,
};
pub use metadata::{
    FileIndex, FileMetadataStore, MemoryIndex, MemoryMetadataStore, MetadataIndex, MetadataStore,
};
pub use policy::compute_evictions;
pub use stats::{CacheStats, FetchStats};
