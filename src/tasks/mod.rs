//! Background Tasks Module
//!
//! Contains the work that runs off the request path.
//!
//! # Tasks
//! - Cleanup queue: runs eviction passes one at a time, in order
//! - Eviction pass: stamps a written URL and evicts per the cache's limits

mod cleanup;
mod eviction;

pub use cleanup::{spawn_cleanup_queue, CleanupQueue, CleanupTask};
pub use eviction::{EvictionPass, EvictionReport};
