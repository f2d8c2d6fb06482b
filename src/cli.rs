//! CLI argument parsing for mirrorsync

use crate::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// mirrorsync - mirror a remote directory listing into object storage
#[derive(Parser, Debug)]
#[command(name = "mirrorsync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file path
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the source, reconcile the store and commit the manifest
    Sync(SyncArgs),

    /// Print the parsed source listing as JSON
    List(StoreArgs),

    /// Show what a sync would upload and delete
    Plan(StoreArgs),

    /// Print the stored manifest
    Manifest(StoreArgs),

    /// Show configuration
    Config(ConfigArgs),
}

/// Store selection shared by every command that touches the store
#[derive(Parser, Debug, Default)]
pub struct StoreArgs {
    /// Store location: local path, file:// or s3://bucket/prefix
    #[arg(short = 's', long)]
    pub store: Option<String>,

    /// Key prefix mirrored files are written under
    #[arg(short = 'd', long)]
    pub directory: Option<String>,

    /// Key of the manifest blob
    #[arg(short = 'm', long)]
    pub manifest_key: Option<String>,
}

impl StoreArgs {
    /// Apply overrides onto a loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref store) = self.store {
            config.store = store.clone();
        }
        if let Some(ref directory) = self.directory {
            config.directory = directory.clone();
        }
        if let Some(ref key) = self.manifest_key {
            config.manifest_key = key.clone();
        }
    }
}

/// Arguments for the sync command
#[derive(Parser, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Perform a trial run with no changes made
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Show progress bars
    #[arg(short = 'P', long)]
    pub progress: bool,

    /// Number of parallel transfers [default: from config, 0 = auto]
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Stop scheduling operations after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Abort the run (before committing) after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Skip configured snapshot URLs
    #[arg(long)]
    pub no_snapshots: bool,
}

impl SyncArgs {
    /// Apply overrides onto a loaded configuration
    pub fn apply(&self, config: &mut Config) {
        self.store.apply(config);
        config.dry_run |= self.dry_run;
        config.progress |= self.progress;
        config.fail_fast |= self.fail_fast;
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if let Some(timeout) = self.timeout {
            config.run_timeout_secs = timeout;
        }
        if self.no_snapshots {
            config.snapshots.clear();
        }
    }
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Show the configuration file path
    #[arg(long)]
    pub path: bool,

    /// Create default configuration file
    #[arg(long)]
    pub init: bool,
}
