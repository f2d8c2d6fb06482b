//! Sync plan execution
//!
//! Uploads and deletes touch disjoint keys, so they run concurrently on a
//! pool of tokio tasks bounded by a semaphore. `execute_plan` only returns
//! once every task has resolved.

use super::plan::SyncPlan;
use crate::config::Config;
use crate::error::{Error, ItemFailure, Result};
use crate::fetch::Fetcher;
use crate::progress::ProgressTracker;
use crate::retry::{with_retry, RetryConfig};
use crate::storage::StorageBackend;
use crate::types::{SourceFile, SyncAction, SyncStats};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// What happened to one planned action
#[derive(Debug)]
enum Outcome {
    Uploaded { bytes: u64 },
    Deleted,
    Failed(Error),
    /// Never started, or interrupted, because the run was halted
    Skipped,
}

/// Result of executing a plan
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// Counts of operations that completed
    pub stats: SyncStats,
    /// Operations that failed after retries
    pub failures: Vec<ItemFailure>,
    /// Operations that never ran or were interrupted
    pub not_run: usize,
}

impl ExecutionReport {
    /// Whether every planned operation completed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.not_run == 0
    }
}

/// Everything a worker task needs, cheap to clone
#[derive(Clone)]
struct Worker {
    store: StorageBackend,
    fetcher: Fetcher,
    retry: RetryConfig,
    progress: ProgressTracker,
}

impl Worker {
    async fn run(&self, entry: &SourceFile, action: SyncAction, key: &str) -> Outcome {
        let result = match action {
            SyncAction::Upload => self
                .upload(entry, key)
                .await
                .map(|bytes| Outcome::Uploaded { bytes }),
            SyncAction::Delete => self.delete(key).await.map(|()| Outcome::Deleted),
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => Outcome::Failed(e),
        }
    }

    async fn upload(&self, entry: &SourceFile, key: &str) -> Result<u64> {
        self.progress.start_item(&entry.name);
        tracing::info!(name = %entry.name, key = %key, url = %entry.url, "Uploading");

        let fetched = with_retry(&self.retry, "fetch", || self.fetcher.fetch(&entry.url)).await?;
        let size = fetched.data.len() as u64;

        with_retry(&self.retry, "put", || {
            self.store.put(key, fetched.data.clone(), &fetched.content_type)
        })
        .await?;

        tracing::debug!(name = %entry.name, bytes = size, content_type = %fetched.content_type, "Uploaded");
        Ok(size)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.progress.start_item(key);
        tracing::info!(key = %key, "Deleting");
        with_retry(&self.retry, "delete", || self.store.delete(key)).await
    }
}

/// Execute a sync plan
///
/// Cancelling `cancel` stops new operations from starting and interrupts
/// in-flight ones; they are counted in `not_run`.
pub async fn execute_plan(
    plan: &SyncPlan,
    store: &StorageBackend,
    fetcher: &Fetcher,
    config: &Config,
    progress: &ProgressTracker,
    cancel: &CancellationToken,
) -> ExecutionReport {
    let mut report = ExecutionReport::default();
    let semaphore = Arc::new(Semaphore::new(config.effective_jobs().max(1)));
    // Halting on failure must not look like an external cancellation
    let halt = cancel.child_token();

    let worker = Worker {
        store: store.clone(),
        fetcher: fetcher.clone(),
        retry: RetryConfig::from(config),
        progress: progress.clone(),
    };

    let mut tasks = JoinSet::new();
    for planned in &plan.actions {
        let worker = worker.clone();
        let semaphore = semaphore.clone();
        let halt = halt.clone();
        let entry = planned.entry.clone();
        let action = planned.action;
        let key = config.object_key(&entry.name);

        tasks.spawn(async move {
            let _permit = tokio::select! {
                biased;
                _ = halt.cancelled() => return (entry.name, Outcome::Skipped),
                permit = semaphore.acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => return (entry.name, Outcome::Skipped),
                },
            };

            let outcome = tokio::select! {
                biased;
                _ = halt.cancelled() => Outcome::Skipped,
                outcome = worker.run(&entry, action, &key) => outcome,
            };
            (entry.name, outcome)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (name, outcome) = match joined {
            Ok(done) => done,
            Err(e) => {
                tracing::error!(error = %e, "Worker task did not complete");
                report.stats.errors += 1;
                report.failures.push(ItemFailure {
                    name: "<worker>".to_string(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match outcome {
            Outcome::Uploaded { bytes } => {
                report.stats.files_uploaded += 1;
                report.stats.bytes_transferred += bytes;
                progress.finish_item();
            }
            Outcome::Deleted => {
                report.stats.files_deleted += 1;
                progress.finish_item();
            }
            Outcome::Skipped => {
                report.not_run += 1;
            }
            Outcome::Failed(e) => {
                tracing::error!(name = %name, error = %e, "Operation failed");
                report.stats.errors += 1;
                report.failures.push(ItemFailure {
                    name,
                    reason: e.to_string(),
                });
                if config.fail_fast && !halt.is_cancelled() {
                    tracing::warn!("Stopping remaining operations after failure");
                    halt.cancel();
                }
            }
        }

        progress.update_stats(&report.stats);
    }

    report
}
