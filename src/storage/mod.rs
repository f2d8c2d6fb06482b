//! Object store backends for mirrorsync
//!
//! Every backend is bound to one bucket-like namespace and exposes the same
//! four primitives: `exists`, `get`, `put` and `delete`. A missing object is
//! always distinguishable from any other failure.

pub mod local;
pub mod s3;

use crate::config::Config;
use crate::error::Result;
use crate::uri::Location;
use bytes::Bytes;
use std::path::PathBuf;

pub use local::LocalBackend;
pub use s3::S3Backend;

/// Content type used when the source does not declare one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Storage backend enum for unified access to different storage systems
#[derive(Clone)]
pub enum StorageBackend {
    Local(LocalBackend),
    S3(S3Backend),
}

impl StorageBackend {
    /// Create a local backend
    pub fn local(path: PathBuf) -> Self {
        StorageBackend::Local(LocalBackend::new(path))
    }

    /// Create an S3 backend
    pub async fn s3(
        bucket: String,
        prefix: String,
        region: Option<String>,
        endpoint: Option<String>,
    ) -> Result<Self> {
        Ok(StorageBackend::S3(
            S3Backend::new(bucket, prefix, region, endpoint).await?,
        ))
    }

    /// Create the backend a parsed location points at
    pub async fn from_location(location: &Location, config: &Config) -> Result<Self> {
        match location {
            Location::Local(path) => Ok(StorageBackend::local(path.clone())),
            Location::S3 { bucket, prefix } => {
                StorageBackend::s3(
                    bucket.clone(),
                    prefix.clone(),
                    config.region.clone(),
                    config.s3_endpoint.clone(),
                )
                .await
            }
        }
    }

    /// Create the backend named by `config.store`
    pub async fn from_config(config: &Config) -> Result<Self> {
        let location = Location::parse(&config.store)?;
        Self::from_location(&location, config).await
    }

    /// Get the name of this backend (for logging)
    pub fn name(&self) -> &'static str {
        match self {
            StorageBackend::Local(_) => "local",
            StorageBackend::S3(_) => "s3",
        }
    }

    /// Check if an object exists
    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self {
            StorageBackend::Local(b) => b.exists(key).await,
            StorageBackend::S3(b) => b.exists(key).await,
        }
    }

    /// Read an object's contents
    ///
    /// Fails with `Error::NotFound` if the object does not exist.
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        match self {
            StorageBackend::Local(b) => b.get(key).await,
            StorageBackend::S3(b) => b.get(key).await,
        }
    }

    /// Write an object, replacing any previous contents
    pub async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<()> {
        match self {
            StorageBackend::Local(b) => b.put(key, data, content_type).await,
            StorageBackend::S3(b) => b.put(key, data, content_type).await,
        }
    }

    /// Delete an object; deleting a missing object succeeds
    pub async fn delete(&self, key: &str) -> Result<()> {
        match self {
            StorageBackend::Local(b) => b.delete(key).await,
            StorageBackend::S3(b) => b.delete(key).await,
        }
    }
}
