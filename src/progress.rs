//! Progress tracking and display for mirrorsync

use crate::sync::plan::SyncPlan;
use crate::types::{RunState, SyncAction, SyncStats};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress tracker for a run
///
/// Cloning shares the underlying bars, so worker tasks can report into the
/// same display.
#[derive(Clone)]
pub struct ProgressTracker {
    /// Overall progress bar (operations)
    overall: ProgressBar,
    /// Stats line
    stats: ProgressBar,
}

impl ProgressTracker {
    /// Create a new progress tracker
    pub fn new(enabled: bool) -> Self {
        let multi = MultiProgress::new();

        let overall = if enabled {
            let pb = multi.add(ProgressBar::new(0));
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ops {msg:.dim}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };

        let stats = if enabled {
            let pb = multi.add(ProgressBar::new_spinner());
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("  {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        Self { overall, stats }
    }

    /// Set the total number of operations
    pub fn set_total(&self, count: u64) {
        self.overall.set_length(count);
    }

    /// An operation started on `name`
    pub fn start_item(&self, name: &str) {
        self.overall.set_message(truncate_filename(name, 30));
    }

    /// An operation finished
    pub fn finish_item(&self) {
        self.overall.inc(1);
    }

    /// Update stats display
    pub fn update_stats(&self, stats: &SyncStats) {
        let msg = format!(
            "Uploaded: {} | Deleted: {} | Transferred: {} | Errors: {}",
            stats.files_uploaded,
            stats.files_deleted,
            format_size(stats.bytes_transferred),
            stats.errors
        );
        self.stats.set_message(msg);
    }

    /// Finish all progress bars
    pub fn finish(&self) {
        self.overall.finish_and_clear();
        self.stats.finish_and_clear();
    }
}

/// Truncate a filename for display
fn truncate_filename(name: &str, max_len: usize) -> String {
    let count = name.chars().count();
    if count <= max_len {
        name.to_string()
    } else {
        let tail: String = name.chars().skip(count - (max_len - 3)).collect();
        format!("...{}", tail)
    }
}

/// Format a file size for display
pub fn format_size(bytes: u64) -> String {
    human_bytes::human_bytes(bytes as f64)
}

/// Format a duration for display
pub fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        let mins = secs / 60.0;
        format!("{:.1}m", mins)
    } else {
        let hours = secs / 3600.0;
        format!("{:.1}h", hours)
    }
}

/// Format transfer rate for display
pub fn format_rate(bytes_per_sec: f64) -> String {
    format!("{}/s", human_bytes::human_bytes(bytes_per_sec))
}

/// Print the actions a plan would take
pub fn print_plan(plan: &SyncPlan) {
    let counts = plan.counts();
    println!("\n=== Sync Plan ===");
    for action in &plan.actions {
        let marker = match action.action {
            SyncAction::Upload => '+',
            SyncAction::Delete => '-',
        };
        println!("{} {}  {}", marker, action.entry.last_updated, action.entry.name);
    }
    println!();
    println!("Files to upload:   {}", counts.uploads);
    println!("Files to delete:   {}", counts.deletes);
    println!("Files unchanged:   {}", counts.skips);
}

/// Print a final summary after a run
pub fn print_summary(stats: &SyncStats, state: RunState) {
    println!("\n=== Sync {} ===", state);
    println!("Duration:          {}", format_duration(stats.duration_secs));
    println!("Files listed:      {}", stats.files_listed);
    println!("Files uploaded:    {}", stats.files_uploaded);
    println!("Files deleted:     {}", stats.files_deleted);
    println!("Files unchanged:   {}", stats.files_skipped);
    println!("Errors:            {}", stats.errors);
    println!();
    println!("Bytes transferred: {}", format_size(stats.bytes_transferred));
    println!("Transfer rate:     {}", format_rate(stats.transfer_rate()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_filename() {
        assert_eq!(truncate_filename("short.txt", 30), "short.txt");
        let long = "pr.data.1.AllData.with.a.very.long.suffix";
        let truncated = truncate_filename(long, 20);
        assert_eq!(truncated.chars().count(), 20);
        assert!(truncated.starts_with("..."));
        assert!(long.ends_with(&truncated[3..]));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(5.0), "5.0s");
        assert_eq!(format_duration(90.0), "1.5m");
        assert_eq!(format_duration(5400.0), "1.5h");
    }

    #[test]
    fn test_hidden_tracker_accepts_updates() {
        let tracker = ProgressTracker::new(false);
        tracker.set_total(2);
        tracker.start_item("a");
        tracker.finish_item();
        tracker.update_stats(&SyncStats::default());
        tracker.finish();
    }
}
