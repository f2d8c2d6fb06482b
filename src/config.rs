//! Configuration management for mirrorsync

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default number of parallel jobs (0 = auto)
pub const DEFAULT_JOBS: usize = 0;

/// Default object-key prefix for mirrored files
pub const DEFAULT_DIRECTORY: &str = "mirror";

/// Default object key of the manifest blob, outside `DEFAULT_DIRECTORY`
pub const DEFAULT_MANIFEST_KEY: &str = "mirror_manifest.json";

/// Default per-request HTTP timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Remote directory listing to mirror
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Scheme and host, e.g. `https://download.example.gov`
    pub base_url: String,

    /// Path of the listed directory below `base_url`
    pub directory: String,

    /// Headers sent with the listing request and every file fetch
    pub headers: BTreeMap<String, String>,
}

impl SourceConfig {
    /// URL of the directory listing page
    pub fn listing_url(&self) -> String {
        join_url(&self.base_url, &self.directory)
    }

    /// URL a listed file is fetched from
    pub fn file_url(&self, name: &str) -> String {
        format!("{}/{}", self.listing_url(), name)
    }
}

/// A single URL copied verbatim to a fixed key on every run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Where to fetch the payload
    pub url: String,

    /// Object key to write it to
    pub key: String,
}

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // ==================== Source ====================

    /// Remote listing settings
    pub source: SourceConfig,

    /// Extra single-URL payloads mirrored alongside the listing
    pub snapshots: Vec<SnapshotConfig>,

    // ==================== Store ====================

    /// Store location: local path, `file://` or `s3://bucket/prefix`
    pub store: String,

    /// AWS region override
    pub region: Option<String>,

    /// Custom S3 endpoint for S3-compatible storage (MinIO, R2, etc.)
    pub s3_endpoint: Option<String>,

    /// Key prefix mirrored files are written under
    pub directory: String,

    /// Key of the manifest blob
    pub manifest_key: String,

    // ==================== Execution ====================

    /// Number of parallel transfer jobs (0 = auto-detect CPU count)
    pub jobs: usize,

    /// Compute and report the plan without touching the store
    pub dry_run: bool,

    /// Stop scheduling new operations after the first failure
    pub fail_fast: bool,

    /// Show progress bars
    pub progress: bool,

    /// Abort the run after this many seconds (0 = no deadline)
    pub run_timeout_secs: u64,

    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,

    // ==================== Retry ====================

    /// Maximum retries for failed operations
    pub max_retries: u32,

    /// Retry delay base in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            snapshots: Vec::new(),

            store: String::new(),
            region: None,
            s3_endpoint: None,
            directory: DEFAULT_DIRECTORY.to_string(),
            manifest_key: DEFAULT_MANIFEST_KEY.to_string(),

            jobs: DEFAULT_JOBS,
            dry_run: false,
            fail_fast: false,
            progress: false,
            run_timeout_secs: 0,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,

            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::io("reading config", e))?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io("creating config dir", e))?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("serializing config: {}", e)))?;
        std::fs::write(path, contents).map_err(|e| Error::io("writing config", e))?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("mirrorsync").join("config.toml"))
            .ok_or_else(|| Error::config("could not determine config directory"))
    }

    /// Check that everything a sync run needs is present
    pub fn validate(&self) -> Result<()> {
        if self.source.base_url.trim().is_empty() {
            return Err(Error::config("source.base_url is not set"));
        }
        if self.store.trim().is_empty() {
            return Err(Error::config("store is not set"));
        }
        self.check_key_layout()
    }

    /// Check that the manifest and snapshot keys cannot be overwritten by a mirrored file
    pub fn check_key_layout(&self) -> Result<()> {
        if self.manifest_key.trim().is_empty() {
            return Err(Error::config("manifest_key is empty"));
        }
        if self.in_mirror_namespace(&self.manifest_key) {
            return Err(Error::config(format!(
                "manifest_key {:?} lies inside the mirrored directory {:?}",
                self.manifest_key, self.directory
            )));
        }
        for snapshot in &self.snapshots {
            if snapshot.key == self.manifest_key {
                return Err(Error::config("a snapshot key collides with manifest_key"));
            }
            if self.in_mirror_namespace(&snapshot.key) {
                return Err(Error::config(format!(
                    "snapshot key {:?} lies inside the mirrored directory {:?}",
                    snapshot.key, self.directory
                )));
            }
        }
        Ok(())
    }

    /// Whether some listed file could be stored at `key`
    fn in_mirror_namespace(&self, key: &str) -> bool {
        let prefix = self.object_key("");
        if prefix.is_empty() {
            // Listed names are single path segments
            !key.contains('/')
        } else {
            key.starts_with(&prefix)
        }
    }

    /// Get the effective number of jobs (resolves 0 to CPU count)
    pub fn effective_jobs(&self) -> usize {
        if self.jobs == 0 {
            num_cpus::get()
        } else {
            self.jobs
        }
    }

    /// Object key a mirrored file is stored at
    pub fn object_key(&self, name: &str) -> String {
        let dir = self.directory.trim_matches('/');
        if dir.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", dir, name)
        }
    }

    /// Deadline for a whole run, if configured
    pub fn run_timeout(&self) -> Option<Duration> {
        (self.run_timeout_secs > 0).then(|| Duration::from_secs(self.run_timeout_secs))
    }

    /// Timeout applied to each HTTP request
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, path)
    }
}
