//! Integration tests for syncing file:// sources into a local store

use mirrorsync::config::{Config, DEFAULT_MANIFEST_KEY};
use mirrorsync::fetch::Fetcher;
use mirrorsync::manifest::Manifest;
use mirrorsync::storage::StorageBackend;
use mirrorsync::sync::SyncEngine;
use mirrorsync::{Error, RunState, SourceFile};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;

const MANIFEST_KEY: &str = "mirror_manifest.json";

/// Write a source file and return its listing entry
fn source_file(dir: &TempDir, name: &str, last_updated: &str, content: &[u8]) -> SourceFile {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    SourceFile::new(name, last_updated, file_url(&path))
}

fn file_url(path: &Path) -> String {
    Url::from_file_path(path).unwrap().to_string()
}

fn test_config(store: &TempDir) -> Config {
    Config {
        store: store.path().to_string_lossy().into_owned(),
        directory: "mirror".to_string(),
        manifest_key: MANIFEST_KEY.to_string(),
        jobs: 4,
        max_retries: 0,
        retry_delay_ms: 1,
        ..Default::default()
    }
}

fn engine(config: Config) -> SyncEngine {
    let store = StorageBackend::local(config.store.clone().into());
    let fetcher = Fetcher::from_config(&config).unwrap();
    SyncEngine::new(config, store, fetcher)
}

fn stored(store: &TempDir, name: &str) -> Option<Vec<u8>> {
    fs::read(store.path().join("mirror").join(name)).ok()
}

fn manifest_bytes(store: &TempDir) -> Option<Vec<u8>> {
    fs::read(store.path().join(MANIFEST_KEY)).ok()
}

fn manifest(store: &TempDir) -> Manifest {
    Manifest::from_json(MANIFEST_KEY, &manifest_bytes(store).unwrap()).unwrap()
}

#[tokio::test]
async fn test_first_run_uploads_everything() {
    let src = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    let listing = vec![
        source_file(&src, "a.txt", "2024-01-01T00:00:00Z", b"alpha"),
        source_file(&src, "b.txt", "2024-01-02T00:00:00Z", b"bravo"),
    ];

    let report = engine(test_config(&store))
        .run(listing.clone(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Committed);
    assert_eq!(report.result().uploaded, 2);
    assert_eq!(report.result().deleted, 0);
    assert_eq!(stored(&store, "a.txt").unwrap(), b"alpha");
    assert_eq!(stored(&store, "b.txt").unwrap(), b"bravo");
    assert_eq!(manifest(&store).entries(), &listing[..]);
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let src = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    let listing = vec![source_file(&src, "a.txt", "2024-01-01T00:00:00Z", b"alpha")];
    let engine = engine(test_config(&store));

    engine.run(listing.clone(), &CancellationToken::new()).await.unwrap();
    let before = manifest_bytes(&store).unwrap();

    let report = engine.run(listing, &CancellationToken::new()).await.unwrap();
    assert_eq!(report.state, RunState::Committed);
    assert_eq!(report.result().uploaded, 0);
    assert_eq!(report.result().deleted, 0);
    assert_eq!(report.stats.files_skipped, 1);
    assert_eq!(manifest_bytes(&store).unwrap(), before);
}

#[tokio::test]
async fn test_changed_added_and_removed_files() {
    let src = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    let engine = engine(test_config(&store));

    let first = vec![
        source_file(&src, "a.txt", "2024-01-01T00:00:00Z", b"a1"),
        source_file(&src, "b.txt", "2024-01-01T00:00:00Z", b"b1"),
    ];
    engine.run(first, &CancellationToken::new()).await.unwrap();

    let second = vec![
        source_file(&src, "a.txt", "2024-02-01T00:00:00Z", b"a2"),
        source_file(&src, "c.txt", "2024-01-01T00:00:00Z", b"c1"),
    ];
    let report = engine
        .run(second.clone(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.result().uploaded, 2);
    assert_eq!(report.result().deleted, 1);
    assert_eq!(stored(&store, "a.txt").unwrap(), b"a2");
    assert_eq!(stored(&store, "c.txt").unwrap(), b"c1");
    assert!(stored(&store, "b.txt").is_none());
    assert_eq!(manifest(&store).entries(), &second[..]);
}

#[tokio::test]
async fn test_older_timestamp_is_not_reuploaded() {
    let src = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    let engine = engine(test_config(&store));

    engine
        .run(
            vec![source_file(&src, "a.txt", "2024-02-01T00:00:00Z", b"new")],
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let rolled_back = vec![source_file(&src, "a.txt", "2024-01-01T00:00:00Z", b"old")];
    let report = engine
        .run(rolled_back.clone(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.result().uploaded, 0);
    assert_eq!(stored(&store, "a.txt").unwrap(), b"new");
    // The manifest still mirrors the listing it was committed with
    assert_eq!(manifest(&store).entries(), &rolled_back[..]);
}

#[tokio::test]
async fn test_empty_source_deletes_everything() {
    let src = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    let engine = engine(test_config(&store));

    engine
        .run(
            vec![
                source_file(&src, "a.txt", "2024-01-01T00:00:00Z", b"a"),
                source_file(&src, "b.txt", "2024-01-01T00:00:00Z", b"b"),
            ],
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let report = engine.run(Vec::new(), &CancellationToken::new()).await.unwrap();

    assert_eq!(report.result().deleted, 2);
    assert!(stored(&store, "a.txt").is_none());
    assert!(stored(&store, "b.txt").is_none());
    assert!(manifest(&store).is_empty());
    assert_eq!(manifest_bytes(&store).unwrap(), b"[]");
}

#[tokio::test]
async fn test_failed_fetch_leaves_manifest_untouched() {
    let src = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    let engine = engine(test_config(&store));

    engine
        .run(
            vec![source_file(&src, "a.txt", "2024-01-01T00:00:00Z", b"a")],
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    let before = manifest_bytes(&store).unwrap();

    let missing = SourceFile::new(
        "gone.txt",
        "2024-01-01T00:00:00Z",
        file_url(&src.path().join("does-not-exist")),
    );
    let listing = vec![
        source_file(&src, "a.txt", "2024-01-01T00:00:00Z", b"a"),
        source_file(&src, "b.txt", "2024-01-01T00:00:00Z", b"b"),
        missing,
    ];

    match engine.run(listing, &CancellationToken::new()).await {
        Err(Error::RunFailed {
            uploaded, failures, ..
        }) => {
            assert_eq!(uploaded, 1);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].name, "gone.txt");
        }
        other => panic!("expected RunFailed, got {:?}", other),
    }

    assert_eq!(manifest_bytes(&store).unwrap(), before);
}

#[tokio::test]
async fn test_failed_first_run_writes_no_manifest() {
    let src = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();

    let listing = vec![SourceFile::new(
        "gone.txt",
        "2024-01-01T00:00:00Z",
        file_url(&src.path().join("does-not-exist")),
    )];

    let result = engine(test_config(&store))
        .run(listing, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(Error::RunFailed { .. })));
    assert!(manifest_bytes(&store).is_none());
}

#[tokio::test]
async fn test_cancelled_run_writes_no_manifest() {
    let src = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    let listing = vec![source_file(&src, "a.txt", "2024-01-01T00:00:00Z", b"a")];

    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = engine(test_config(&store)).run(listing, &cancel).await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(manifest_bytes(&store).is_none());
    assert!(stored(&store, "a.txt").is_none());
}

#[tokio::test]
async fn test_dry_run_touches_nothing() {
    let src = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    let listing = vec![source_file(&src, "a.txt", "2024-01-01T00:00:00Z", b"a")];

    let mut config = test_config(&store);
    config.dry_run = true;

    let report = engine(config)
        .run(listing, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Diffed);
    assert_eq!(report.planned.uploads, 1);
    assert_eq!(report.result().uploaded, 0);
    assert!(manifest_bytes(&store).is_none());
    assert!(stored(&store, "a.txt").is_none());
}

#[tokio::test]
async fn test_duplicate_names_keep_last_entry() {
    let src = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();

    let first = source_file(&src, "a.txt", "2024-01-01T00:00:00Z", b"a");
    let other = source_file(&src, "b.txt", "2024-01-01T00:00:00Z", b"b");
    let last = SourceFile::new("a.txt", "2024-03-01T00:00:00Z", first.url.clone());

    let report = engine(test_config(&store))
        .run(vec![first, other.clone(), last.clone()], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.result().uploaded, 2);
    assert_eq!(manifest(&store).entries(), &[last, other][..]);
}

#[tokio::test]
async fn test_corrupt_manifest_aborts_before_any_operation() {
    let src = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    fs::write(store.path().join(MANIFEST_KEY), b"{not json").unwrap();

    let listing = vec![source_file(&src, "a.txt", "2024-01-01T00:00:00Z", b"a")];
    let result = engine(test_config(&store))
        .run(listing, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(Error::Manifest { .. })));
    assert!(stored(&store, "a.txt").is_none());
    assert_eq!(manifest_bytes(&store).unwrap(), b"{not json");
}

#[tokio::test]
async fn test_plan_reports_without_mutating() {
    let src = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    let engine = engine(test_config(&store));

    engine
        .run(
            vec![source_file(&src, "old.txt", "2024-01-01T00:00:00Z", b"o")],
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let plan = engine
        .plan(&[source_file(&src, "new.txt", "2024-01-01T00:00:00Z", b"n")])
        .await
        .unwrap();

    let counts = plan.counts();
    assert_eq!(counts.uploads, 1);
    assert_eq!(counts.deletes, 1);
    assert!(stored(&store, "old.txt").is_some());
    assert!(stored(&store, "new.txt").is_none());
}

#[tokio::test]
async fn test_file_named_manifest_survives_default_layout() {
    let src = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    let listing = vec![source_file(&src, "manifest.json", "2024-01-01T00:00:00Z", b"SOURCE PAYLOAD")];

    let config = Config {
        store: store.path().to_string_lossy().into_owned(),
        max_retries: 0,
        ..Default::default()
    };
    let engine = engine(config);

    let first = engine.run(listing.clone(), &CancellationToken::new()).await.unwrap();
    assert_eq!(first.result().uploaded, 1);
    let second = engine.run(listing.clone(), &CancellationToken::new()).await.unwrap();
    assert_eq!(second.result().uploaded, 0);

    assert_eq!(stored(&store, "manifest.json").unwrap(), b"SOURCE PAYLOAD");
    let recorded = fs::read(store.path().join(DEFAULT_MANIFEST_KEY)).unwrap();
    assert_eq!(
        Manifest::from_json(DEFAULT_MANIFEST_KEY, &recorded).unwrap().entries(),
        &listing[..]
    );
}

#[tokio::test]
async fn test_manifest_key_inside_directory_is_rejected() {
    let src = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    let listing = vec![source_file(&src, "a.txt", "2024-01-01T00:00:00Z", b"a")];

    let mut config = test_config(&store);
    config.manifest_key = "mirror/manifest.json".to_string();

    let result = engine(config).run(listing, &CancellationToken::new()).await;

    assert!(matches!(result, Err(Error::Config { .. })));
    assert!(stored(&store, "a.txt").is_none());
    assert!(!store.path().join("mirror/manifest.json").exists());
}
