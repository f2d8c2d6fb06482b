//! Manifest store: the durable record of the last successful run
//!
//! The manifest is a JSON array of `{file_name, last_updated, full_url}`
//! objects kept in a single blob. It is read once when a run starts and
//! replaced wholesale when the run commits.

use crate::error::{Error, Result};
use crate::storage::StorageBackend;
use crate::types::SourceFile;
use bytes::Bytes;
use serde::Serialize;

/// Content type the manifest blob is written with
pub const MANIFEST_CONTENT_TYPE: &str = "application/json";

/// Ordered record of mirrored files, logically keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<SourceFile>,
}

impl Manifest {
    /// Build a manifest from entries, keeping their order
    pub fn new(entries: Vec<SourceFile>) -> Self {
        Self { entries }
    }

    /// An empty manifest (first run)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Entries in stored order
    pub fn entries(&self) -> &[SourceFile] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode as indented JSON
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.entries
            .serialize(&mut ser)
            .map_err(|e| Error::storage(format!("serializing manifest: {}", e)))?;
        Ok(buf)
    }

    /// Decode from JSON; `key` is only used for error context
    pub fn from_json(key: &str, data: &[u8]) -> Result<Self> {
        let entries: Vec<SourceFile> =
            serde_json::from_slice(data).map_err(|e| Error::Manifest {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { entries })
    }
}

impl From<Vec<SourceFile>> for Manifest {
    fn from(entries: Vec<SourceFile>) -> Self {
        Self::new(entries)
    }
}

/// Loads and saves the manifest blob at one key of a store
pub struct ManifestStore {
    backend: StorageBackend,
    key: String,
}

impl ManifestStore {
    /// Create a manifest store for `key`
    pub fn new(backend: StorageBackend, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Load the manifest
    ///
    /// Absence is decided by an existence check and yields the empty
    /// manifest. Any other failure, including an undecodable blob, is an
    /// error.
    pub async fn load(&self) -> Result<Manifest> {
        if !self.backend.exists(&self.key).await? {
            tracing::info!(key = %self.key, "No manifest found, starting from empty");
            return Ok(Manifest::empty());
        }

        let data = self.backend.get(&self.key).await?;
        let manifest = Manifest::from_json(&self.key, &data)?;
        tracing::info!(key = %self.key, entries = manifest.len(), "Loaded manifest");
        Ok(manifest)
    }

    /// Overwrite the manifest blob
    pub async fn save(&self, manifest: &Manifest) -> Result<()> {
        let data = manifest.to_json()?;
        self.backend
            .put(&self.key, Bytes::from(data), MANIFEST_CONTENT_TYPE)
            .await?;
        tracing::info!(key = %self.key, entries = manifest.len(), "Saved manifest");
        Ok(())
    }
}
