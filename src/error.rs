//! Error types for mirrorsync

use thiserror::Error;

/// Result type alias for mirrorsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// A single upload or delete that did not complete during a run
#[derive(Debug, Clone)]
pub struct ItemFailure {
    /// File name the operation was for
    pub name: String,
    /// Human-readable reason
    pub reason: String,
}

/// Main error type for mirrorsync
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors (file system operations)
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Network errors (HTTP, connection issues)
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Source listing could not be enumerated
    #[error("Listing error: {message}")]
    Listing { message: String },

    /// Retrieving the bytes of an upload candidate failed
    #[error("Fetch error for {url}: {message}")]
    Fetch {
        url: String,
        message: String,
        /// HTTP status, when the server answered
        status: Option<u16>,
    },

    /// Storage backend errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Object does not exist in the store
    #[error("Object not found: {key}")]
    NotFound { key: String },

    /// Stored manifest could not be decoded
    #[error("Manifest error at {key}: {message}")]
    Manifest { key: String, message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// One or more uploads/deletes failed; the manifest was left untouched
    #[error("Run failed: {} of {} operations failed", .failures.len(), .failures.len() + .uploaded + .deleted)]
    RunFailed {
        uploaded: usize,
        deleted: usize,
        failures: Vec<ItemFailure>,
    },

    /// Operation was cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid URI format
    #[error("Invalid URI: {uri} - {reason}")]
    InvalidUri { uri: String, reason: String },

    /// AWS SDK error
    #[error("AWS error: {message}")]
    Aws { message: String },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a listing error
    pub fn listing(message: impl Into<String>) -> Self {
        Self::Listing {
            message: message.into(),
        }
    }

    /// Create a fetch error without an HTTP status
    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        crate::retry::is_retryable(self)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config {
            message: format!("TOML parse error: {}", err),
        }
    }
}
