//! Snapshot mirroring: single URLs copied verbatim to fixed keys
//!
//! Snapshots are not tracked by the manifest; each run overwrites them.

use crate::config::SnapshotConfig;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::retry::{with_retry, RetryConfig};
use crate::storage::StorageBackend;

/// Fetch one snapshot URL and write it to its key, returning the byte count
pub async fn mirror_snapshot(
    snapshot: &SnapshotConfig,
    fetcher: &Fetcher,
    store: &StorageBackend,
    retry: &RetryConfig,
) -> Result<u64> {
    tracing::info!(url = %snapshot.url, key = %snapshot.key, "Mirroring snapshot");

    let fetched = with_retry(retry, "snapshot fetch", || fetcher.fetch(&snapshot.url)).await?;
    let size = fetched.data.len() as u64;

    with_retry(retry, "snapshot put", || {
        store.put(&snapshot.key, fetched.data.clone(), &fetched.content_type)
    })
    .await?;

    Ok(size)
}
