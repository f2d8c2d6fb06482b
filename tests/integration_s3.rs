//! AWS S3 Integration Tests
//!
//! These tests are marked with #[ignore] and require real AWS credentials.
//! They will NOT run with normal `cargo test`.
//!
//! To run these tests manually:
//!   export AWS_ACCESS_KEY_ID="your_key"
//!   export AWS_SECRET_ACCESS_KEY="your_secret"
//!   export AWS_REGION="eu-central-1"
//!   export MIRRORSYNC_TEST_BUCKET="your-bucket"
//!   cargo test --test integration_s3 -- --ignored --nocapture

use bytes::Bytes;
use mirrorsync::config::Config;
use mirrorsync::fetch::Fetcher;
use mirrorsync::manifest::ManifestStore;
use mirrorsync::storage::StorageBackend;
use mirrorsync::sync::SyncEngine;
use mirrorsync::{Error, RunState, SourceFile};
use std::fs;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;

fn test_bucket() -> String {
    std::env::var("MIRRORSYNC_TEST_BUCKET").expect("MIRRORSYNC_TEST_BUCKET must be set")
}

/// Helper to create a unique test prefix for isolation
fn test_prefix() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let counter = COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("mirrorsync-test-{}-{}-{}", timestamp, std::process::id(), counter)
}

async fn create_s3_backend(prefix: String) -> StorageBackend {
    StorageBackend::s3(test_bucket(), prefix, None, None)
        .await
        .expect("Failed to create S3 backend")
}

#[tokio::test]
#[ignore]
async fn test_s3_put_get_delete() {
    let store = create_s3_backend(test_prefix()).await;

    assert!(!store.exists("sample.txt").await.unwrap());
    store
        .put("sample.txt", Bytes::from_static(b"hello"), "text/plain")
        .await
        .unwrap();
    assert!(store.exists("sample.txt").await.unwrap());
    assert_eq!(&store.get("sample.txt").await.unwrap()[..], b"hello");

    store.delete("sample.txt").await.unwrap();
    assert!(!store.exists("sample.txt").await.unwrap());
    // Deleting again is not an error
    store.delete("sample.txt").await.unwrap();

    assert!(matches!(
        store.get("sample.txt").await,
        Err(Error::NotFound { .. })
    ));
}

#[tokio::test]
#[ignore]
async fn test_s3_sync_commits_manifest() {
    let src = TempDir::new().unwrap();
    let path = src.path().join("a.csv");
    fs::write(&path, b"id,value\n1,2\n").unwrap();
    let listing = vec![SourceFile::new(
        "a.csv",
        "2024-01-01T00:00:00Z",
        Url::from_file_path(&path).unwrap().to_string(),
    )];

    let prefix = test_prefix();
    let store = create_s3_backend(prefix.clone()).await;
    let config = Config {
        store: format!("s3://{}/{}", test_bucket(), prefix),
        ..Default::default()
    };
    let engine = SyncEngine::new(
        config.clone(),
        store.clone(),
        Fetcher::from_config(&config).unwrap(),
    );

    let report = engine
        .run(listing.clone(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.state, RunState::Committed);
    assert_eq!(report.result().uploaded, 1);

    let manifest = ManifestStore::new(store.clone(), config.manifest_key.clone())
        .load()
        .await
        .unwrap();
    assert_eq!(manifest.entries(), &listing[..]);

    // Clean up
    engine.run(Vec::new(), &CancellationToken::new()).await.unwrap();
    store.delete(&config.manifest_key).await.unwrap();
}
