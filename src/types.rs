//! Core domain types for mirrorsync

use serde::{Deserialize, Serialize};
use std::fmt;

/// One file in a source listing or in the persisted manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// File name, unique within a listing or manifest
    #[serde(rename = "file_name")]
    pub name: String,

    /// Last modification time as `YYYY-MM-DDTHH:MM:SSZ`
    ///
    /// Fixed width and zulu-suffixed, so string order is time order.
    pub last_updated: String,

    /// Where the file's bytes can be fetched from
    #[serde(rename = "full_url")]
    pub url: String,
}

impl SourceFile {
    /// Create a new source file entry
    pub fn new(
        name: impl Into<String>,
        last_updated: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            last_updated: last_updated.into(),
            url: url.into(),
        }
    }

    /// Whether this entry carries a strictly newer timestamp than `other`
    pub fn is_newer_than(&self, other: &SourceFile) -> bool {
        self.last_updated > other.last_updated
    }
}

/// Action to perform during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncAction {
    /// Fetch from the source and write to the store
    Upload,

    /// Remove from the store
    Delete,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncAction::Upload => write!(f, "upload"),
            SyncAction::Delete => write!(f, "delete"),
        }
    }
}

/// A planned action with the entry it applies to
///
/// For deletes the entry is the manifest's record of the file.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    /// The file entry being acted upon
    pub entry: SourceFile,

    /// The action to perform
    pub action: SyncAction,
}

impl PlannedAction {
    /// Create a new planned action
    pub fn new(entry: SourceFile, action: SyncAction) -> Self {
        Self { entry, action }
    }
}

/// Where a reconciliation run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Manifest read from the store
    Loaded,
    /// Uploads and deletes computed
    Diffed,
    /// Store mutations in flight
    Applying,
    /// New manifest persisted
    Committed,
    /// Run stopped before the manifest was written
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Loaded => "loaded",
            RunState::Diffed => "diffed",
            RunState::Applying => "applying",
            RunState::Committed => "committed",
            RunState::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Outcome of one run: the counts other tooling consumes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Uploads actually executed
    pub uploaded: usize,
    /// Deletes actually executed
    pub deleted: usize,
}

/// Statistics for a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    /// Entries in the source listing
    pub files_listed: u64,

    /// Files uploaded
    pub files_uploaded: u64,

    /// Files deleted from the store
    pub files_deleted: u64,

    /// Files skipped (already mirrored)
    pub files_skipped: u64,

    /// Total bytes written to the store
    pub bytes_transferred: u64,

    /// Operations that failed
    pub errors: u64,

    /// Duration in seconds
    pub duration_secs: f64,
}

impl SyncStats {
    /// Calculate transfer rate in bytes per second
    pub fn transfer_rate(&self) -> f64 {
        if self.duration_secs == 0.0 {
            0.0
        } else {
            self.bytes_transferred as f64 / self.duration_secs
        }
    }

    /// Counts in the shape of the run contract
    pub fn result(&self) -> RunResult {
        RunResult {
            uploaded: self.files_uploaded as usize,
            deleted: self.files_deleted as usize,
        }
    }
}
