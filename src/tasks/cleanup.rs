//! Cleanup Queue
//!
//! FIFO queue that runs cleanup tasks one at a time on a single worker.
//!
//! Each task runs in its own spawned task and is awaited to completion
//! before the next one starts. A task that fails or panics is logged and the
//! queue carries on with the next one.

use std::future::Future;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{FetchCacheError, Result};

/// A deferred unit of cleanup work.
pub type CleanupTask = BoxFuture<'static, Result<()>>;

enum Job {
    Run { label: String, task: CleanupTask },
    Flush(oneshot::Sender<()>),
}

// == Cleanup Queue ==
/// Handle for submitting tasks to the cleanup worker.
///
/// Cloning the handle shares the same worker, so every clone observes the
/// same ordering.
#[derive(Debug, Clone)]
pub struct CleanupQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Job::Run { label, .. } => f.debug_struct("Run").field("label", label).finish(),
            Job::Flush(_) => f.write_str("Flush"),
        }
    }
}

/// Spawns the cleanup worker.
///
/// Returns the queue handle and the worker's JoinHandle, which can be used
/// to abort the worker during graceful shutdown.
///
/// # Example
/// ```ignore
/// let (queue, worker) = spawn_cleanup_queue();
/// queue.enqueue("expire c1", async { Ok(()) });
/// // Later, during shutdown:
/// worker.abort();
/// ```
pub fn spawn_cleanup_queue() -> (CleanupQueue, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

    let worker = tokio::spawn(async move {
        info!("Cleanup queue worker started");

        while let Some(job) = rx.recv().await {
            match job {
                Job::Run { label, task } => match tokio::spawn(task).await {
                    Ok(Ok(())) => debug!(task = %label, "Cleanup task finished"),
                    Ok(Err(e)) => warn!(task = %label, error = %e, "Cleanup task failed"),
                    Err(e) => error!(task = %label, error = %e, "Cleanup task panicked"),
                },
                Job::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }

        debug!("Cleanup queue closed");
    });

    (CleanupQueue { tx }, worker)
}

impl CleanupQueue {
    // == Enqueue ==
    /// Appends `task` to the queue without waiting for it.
    ///
    /// If the worker has stopped the task is dropped with a warning.
    pub fn enqueue<F>(&self, label: impl Into<String>, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let label = label.into();
        let job = Job::Run {
            label: label.clone(),
            task: Box::pin(task),
        };
        if self.tx.send(job).is_err() {
            warn!(task = %label, "Cleanup queue is closed, dropping task");
        }
    }

    // == Run ==
    /// Appends `task` to the queue and waits for its output.
    pub async fn run<F, T>(&self, label: impl Into<String>, task: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        self.enqueue(label, async move {
            let result = task.await;
            let outcome = match &result {
                Ok(_) => Ok(()),
                Err(e) => Err(FetchCacheError::Internal(e.to_string())),
            };
            let _ = result_tx.send(result);
            outcome
        });

        result_rx
            .await
            .map_err(|_| FetchCacheError::Internal("Cleanup task did not complete".to_string()))?
    }

    // == Flush ==
    /// Waits until every task enqueued before this call has settled.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Job::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Whether the worker is still accepting tasks.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}
