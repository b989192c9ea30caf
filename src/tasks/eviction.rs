//! Eviction Pass
//!
//! One serialized run of: stamp the written URL, evaluate the policy, and
//! delete the victims from both the metadata index and the content cache.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::cache::{compute_evictions, Clock, ContentCache, FetchStats, MetadataStore};
use crate::config::ExpirationPolicy;
use crate::error::{FetchCacheError, Result};
use crate::fetcher::debug_log;

/// Outcome of a completed eviction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Keys removed from the content cache
    pub evicted: Vec<String>,
    /// Keys whose removal failed
    pub failed: Vec<String>,
}

// == Eviction Pass ==
/// Everything one pass needs, captured when the pass is scheduled.
pub struct EvictionPass {
    pub url: String,
    pub cache: Arc<dyn ContentCache>,
    pub policy: ExpirationPolicy,
    pub metadata: Arc<dyn MetadataStore>,
    pub clock: Arc<dyn Clock>,
    pub stats: Arc<FetchStats>,
    pub debug: bool,
}

impl EvictionPass {
    /// Runs the pass.
    ///
    /// Metadata open/read/write failures abort the pass and are returned.
    /// Per-key delete failures are logged and do not stop the other keys.
    pub async fn run(self) -> Result<EvictionReport> {
        match self.execute().await {
            Ok(report) => {
                self.stats.record_pass(report.evicted.len());
                Ok(report)
            }
            Err(e) => {
                self.stats.record_failed_pass();
                debug_log(self.debug, &format!("Cache cleanup for {} failed: {}", self.url, e));
                Err(e)
            }
        }
    }

    async fn execute(&self) -> Result<EvictionReport> {
        let now = self.clock.now_ms();
        debug_log(
            self.debug,
            &format!(
                "Updating LRU order for {}. Max entries is {:?}, max age is {:?}",
                self.url, self.policy.max_entries, self.policy.max_age
            ),
        );

        let index = self.metadata.open(&self.policy.cache_name).await?;
        index.set_timestamp(&self.url, now).await?;

        let snapshot = index.snapshot().await?;
        let victims = compute_evictions(&snapshot, self.policy.max_entries, self.policy.max_age, now);
        debug_log(self.debug, "Successfully updated metadata index.");

        if victims.is_empty() {
            debug_log(self.debug, "Done with cache cleanup.");
            return Ok(EvictionReport::default());
        }

        let mut report = EvictionReport::default();

        if let Err(e) = index.delete_keys(&victims).await {
            for key in &victims {
                let err = FetchCacheError::EvictionDelete {
                    key: key.clone(),
                    reason: e.to_string(),
                };
                warn!(cache = %self.policy.cache_name, error = %err, "Metadata delete failed");
            }
        }

        let deletions = victims.iter().map(|key| self.cache.delete(key));
        for (key, outcome) in victims.iter().zip(join_all(deletions).await) {
            match outcome {
                Ok(_) => report.evicted.push(key.clone()),
                Err(e) => {
                    let err = FetchCacheError::EvictionDelete {
                        key: key.clone(),
                        reason: e.to_string(),
                    };
                    warn!(cache = %self.policy.cache_name, error = %err, "Content delete failed");
                    report.failed.push(key.clone());
                }
            }
        }

        debug!(
            cache = %self.policy.cache_name,
            evicted = report.evicted.len(),
            failed = report.failed.len(),
            "Eviction pass complete"
        );
        debug_log(self.debug, "Done with cache cleanup.");
        Ok(report)
    }
}
