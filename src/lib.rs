//! mirrorsync - mirror a remote directory listing into object storage
//!
//! This library reconciles a source directory listing against a JSON
//! manifest kept in a blob store (local filesystem or S3), uploading new and
//! changed files, deleting removed ones and committing the new manifest only
//! after every operation succeeded.

pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod progress;
pub mod retry;
pub mod snapshot;
pub mod source;
pub mod storage;
pub mod sync;
pub mod types;
pub mod uri;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
