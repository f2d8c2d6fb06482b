//! Store location parsing

use crate::error::{Error, Result};
use std::path::PathBuf;
use url::Url;

/// Where mirrored objects live - a local directory or an S3 bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Local filesystem path
    Local(PathBuf),

    /// AWS S3 (or S3-compatible) bucket and key prefix
    S3 { bucket: String, prefix: String },
}

impl Location {
    /// Parse a location string into a Location enum
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidUri {
                uri: s.to_string(),
                reason: "empty location".to_string(),
            });
        }

        if let Some((scheme, _)) = s.split_once("://") {
            return match scheme.to_lowercase().as_str() {
                "s3" => Self::parse_s3(s),
                "file" => {
                    let path = s.strip_prefix("file://").unwrap_or(s);
                    Ok(Location::Local(PathBuf::from(path)))
                }
                other => Err(Error::InvalidUri {
                    uri: s.to_string(),
                    reason: format!("unsupported scheme '{}'", other),
                }),
            };
        }

        Ok(Location::Local(PathBuf::from(s)))
    }

    fn parse_s3(s: &str) -> Result<Self> {
        let url = Url::parse(s).map_err(|e| Error::InvalidUri {
            uri: s.to_string(),
            reason: e.to_string(),
        })?;

        let bucket = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::InvalidUri {
                uri: s.to_string(),
                reason: "missing bucket name".to_string(),
            })?
            .to_string();

        let prefix = url.path().trim_matches('/').to_string();

        Ok(Location::S3 { bucket, prefix })
    }

    /// Convert back to a URI string
    pub fn to_uri(&self) -> String {
        match self {
            Location::Local(path) => path.display().to_string(),
            Location::S3 { bucket, prefix } => {
                if prefix.is_empty() {
                    format!("s3://{}", bucket)
                } else {
                    format!("s3://{}/{}", bucket, prefix)
                }
            }
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_uri())
    }
}
