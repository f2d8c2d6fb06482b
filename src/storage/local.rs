//! Local filesystem storage backend

use crate::error::{Error, Result};
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Local filesystem storage backend
///
/// Keys map to paths below `root`; `/` in a key creates subdirectories.
/// Content types are not recorded.
#[derive(Clone)]
pub struct LocalBackend {
    /// Root path for this backend
    root: PathBuf,
}

impl LocalBackend {
    /// Create a new local backend with the given root path
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Resolve a key to a path under the root
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if key.is_empty() || escapes {
            return Err(Error::storage(format!("invalid object key: {:?}", key)));
        }
        Ok(self.root.join(relative))
    }

    /// Check if an object exists
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let full_path = self.resolve(key)?;

        match fs::metadata(&full_path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io("reading metadata", e)),
        }
    }

    /// Read an object's contents
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        let full_path = self.resolve(key)?;
        match fs::read(&full_path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(Error::io("reading file", e)),
        }
    }

    /// Write an object's contents
    ///
    /// Writes to a temporary sibling first and renames it into place, so a
    /// reader never observes a half-written object.
    pub async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> Result<()> {
        let full_path = self.resolve(key)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io("creating directories", e))?;
        }

        let tmp_path = temp_path(&full_path);
        fs::write(&tmp_path, &data)
            .await
            .map_err(|e| Error::io("writing file", e))?;
        if let Err(e) = fs::rename(&tmp_path, &full_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(Error::io("renaming file into place", e));
        }

        Ok(())
    }

    /// Delete an object
    pub async fn delete(&self, key: &str) -> Result<()> {
        let full_path = self.resolve(key)?;

        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(key = %key, "Delete of missing object");
                Ok(())
            }
            Err(e) => Err(Error::io("removing file", e)),
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}
