//! Diff computation between the source listing and the manifest
//!
//! Staleness is decided by name and timestamp alone:
//! - a name missing from the manifest is uploaded
//! - a name whose source timestamp is strictly newer is uploaded
//! - a manifest name missing from the source is deleted
//! - everything else is skipped

use crate::types::SourceFile;
use std::collections::{HashMap, HashSet};

/// Uploads and deletes needed to bring the store in line with the source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// Source entries to fetch and write, in source order
    pub to_upload: Vec<SourceFile>,
    /// Manifest entries whose objects must go, in manifest order
    pub to_delete: Vec<SourceFile>,
    /// Source entries already mirrored
    pub skipped: usize,
}

impl Diff {
    /// Whether the run has nothing to do
    pub fn is_empty(&self) -> bool {
        self.to_upload.is_empty() && self.to_delete.is_empty()
    }

    /// Names scheduled for deletion
    pub fn delete_names(&self) -> impl Iterator<Item = &str> {
        self.to_delete.iter().map(|e| e.name.as_str())
    }
}

/// Collapse duplicate names: the last entry wins, at the first one's position
pub fn dedupe_by_name(entries: &[SourceFile]) -> Vec<SourceFile> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(entries.len());
    let mut out: Vec<SourceFile> = Vec::with_capacity(entries.len());

    for entry in entries {
        match index.get(entry.name.as_str()) {
            Some(&i) => {
                tracing::warn!(
                    name = %entry.name,
                    previous = %out[i].last_updated,
                    replacement = %entry.last_updated,
                    "Duplicate name in listing, keeping the later entry"
                );
                out[i] = entry.clone();
            }
            None => {
                index.insert(entry.name.as_str(), out.len());
                out.push(entry.clone());
            }
        }
    }

    out
}

/// Compute the diff between the source listing and the manifest
pub fn compute_diff(source: &[SourceFile], manifest: &[SourceFile]) -> Diff {
    let source = dedupe_by_name(source);
    let manifest = dedupe_by_name(manifest);

    let manifest_map: HashMap<&str, &SourceFile> =
        manifest.iter().map(|e| (e.name.as_str(), e)).collect();

    let mut diff = Diff::default();

    for entry in &source {
        match manifest_map.get(entry.name.as_str()) {
            None => {
                tracing::debug!(name = %entry.name, "New file");
                diff.to_upload.push(entry.clone());
            }
            Some(recorded) if entry.is_newer_than(recorded) => {
                tracing::debug!(
                    name = %entry.name,
                    recorded = %recorded.last_updated,
                    current = %entry.last_updated,
                    "Updated file"
                );
                diff.to_upload.push(entry.clone());
            }
            Some(_) => diff.skipped += 1,
        }
    }

    let source_names: HashSet<&str> = source.iter().map(|e| e.name.as_str()).collect();
    diff.to_delete = manifest
        .iter()
        .filter(|e| !source_names.contains(e.name.as_str()))
        .cloned()
        .collect();

    diff
}
