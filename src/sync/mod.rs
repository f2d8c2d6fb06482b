//! Sync engine and orchestration
//!
//! A run moves through `Loaded → Diffed → Applying → Committed`, or stops
//! at `Aborted`. The manifest is written only on the way into `Committed`,
//! so a run that fails or is cancelled leaves the previous manifest intact.
//! The engine does not lock: callers must ensure that only one run targets
//! a given manifest key at a time.

pub mod diff;
pub mod execute;
pub mod plan;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::manifest::{Manifest, ManifestStore};
use crate::progress::ProgressTracker;
use crate::retry::RetryConfig;
use crate::snapshot::mirror_snapshot;
use crate::storage::StorageBackend;
use crate::types::{RunResult, RunState, SourceFile, SyncStats};
use plan::{PlanCounts, SyncPlan};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// What a run did and where it stopped
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Final state; `Diffed` for dry runs
    pub state: RunState,
    /// What the diff scheduled
    pub planned: PlanCounts,
    /// What was executed
    pub stats: SyncStats,
}

impl RunReport {
    /// Counts of executed uploads and deletes
    pub fn result(&self) -> RunResult {
        self.stats.result()
    }
}

/// The main sync engine
pub struct SyncEngine {
    /// Configuration
    config: Config,
    /// Destination store
    store: StorageBackend,
    /// HTTP client for file fetches
    fetcher: Fetcher,
    /// Manifest blob
    manifests: ManifestStore,
    /// Progress tracker
    progress: ProgressTracker,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(config: Config, store: StorageBackend, fetcher: Fetcher) -> Self {
        let progress = ProgressTracker::new(config.progress);
        let manifests = ManifestStore::new(store.clone(), config.manifest_key.clone());
        Self {
            config,
            store,
            fetcher,
            manifests,
            progress,
        }
    }

    /// Load the manifest and compute what a run would do, without mutating
    pub async fn plan(&self, source: &[SourceFile]) -> Result<SyncPlan> {
        let manifest = self.manifests.load().await?;
        Ok(plan::generate_plan(diff::compute_diff(source, manifest.entries())))
    }

    /// Run one reconciliation against `source`
    ///
    /// Returns `Error::RunFailed` if any upload or delete failed and
    /// `Error::Cancelled` if `cancel` fired (or the run deadline passed)
    /// before the manifest was written. In both cases the stored manifest
    /// is unchanged.
    pub async fn run(&self, source: Vec<SourceFile>, cancel: &CancellationToken) -> Result<RunReport> {
        let start = Instant::now();

        // The deadline cancels a child token so the caller's token stays untouched
        let run_token = cancel.child_token();
        let deadline = self.config.run_timeout().map(|timeout| {
            let token = run_token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                tracing::warn!(timeout_secs = timeout.as_secs(), "Run deadline reached");
                token.cancel();
            })
        });

        let result = self.run_inner(source, &run_token, start).await;

        if let Some(handle) = deadline {
            handle.abort();
        }

        if let Err(e) = &result {
            tracing::error!(state = %RunState::Aborted, error = %e, "Run aborted");
        }
        result
    }

    async fn run_inner(
        &self,
        source: Vec<SourceFile>,
        cancel: &CancellationToken,
        start: Instant,
    ) -> Result<RunReport> {
        self.config.check_key_layout()?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let manifest = self.manifests.load().await?;
        log_state(RunState::Loaded);

        let source = diff::dedupe_by_name(&source);
        let diff = diff::compute_diff(&source, manifest.entries());
        let plan = plan::generate_plan(diff);
        let planned = plan.counts();
        log_state(RunState::Diffed);
        tracing::info!(
            uploads = planned.uploads,
            deletes = planned.deletes,
            skips = planned.skips,
            "Diff complete"
        );

        let mut stats = SyncStats {
            files_listed: source.len() as u64,
            files_skipped: planned.skips as u64,
            ..Default::default()
        };

        if self.config.dry_run {
            tracing::info!("Dry run mode - no changes will be made");
            stats.duration_secs = start.elapsed().as_secs_f64();
            return Ok(RunReport {
                state: RunState::Diffed,
                planned,
                stats,
            });
        }

        log_state(RunState::Applying);
        self.progress.set_total((planned.uploads + planned.deletes) as u64);
        let report = execute::execute_plan(
            &plan,
            &self.store,
            &self.fetcher,
            &self.config,
            &self.progress,
            cancel,
        )
        .await;
        self.progress.finish();

        stats.files_uploaded = report.stats.files_uploaded;
        stats.files_deleted = report.stats.files_deleted;
        stats.bytes_transferred = report.stats.bytes_transferred;
        stats.errors = report.stats.errors;

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if !report.is_complete() {
            return Err(Error::RunFailed {
                uploaded: stats.files_uploaded as usize,
                deleted: stats.files_deleted as usize,
                failures: report.failures,
            });
        }

        self.manifests.save(&Manifest::new(source)).await?;
        log_state(RunState::Committed);

        stats.duration_secs = start.elapsed().as_secs_f64();
        Ok(RunReport {
            state: RunState::Committed,
            planned,
            stats,
        })
    }

    /// Mirror every configured snapshot, returning total bytes written
    pub async fn run_snapshots(&self) -> Result<u64> {
        let retry = RetryConfig::from(&self.config);
        let mut total = 0;
        for snapshot in &self.config.snapshots {
            total += mirror_snapshot(snapshot, &self.fetcher, &self.store, &retry).await?;
        }
        Ok(total)
    }
}

fn log_state(state: RunState) {
    tracing::info!(state = %state, "Run state");
}
