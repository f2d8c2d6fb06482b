//! Fetching file bytes from the source host

use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::DEFAULT_CONTENT_TYPE;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Bytes of one fetched file and the type the server declared for them
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub data: Bytes,
    pub content_type: String,
}

/// HTTP client shared by the listing request and every file fetch
///
/// `file://` URLs are read from the local filesystem.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// Create a fetcher that sends `headers` with every request
    pub fn new(headers: &BTreeMap<String, String>, timeout: Duration) -> Result<Self> {
        let client = client_builder(headers, timeout)?
            .build()
            .map_err(|e| Error::config(format!("building HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Create a fetcher from the source section of the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.source.headers, config.request_timeout())
    }

    /// Fetch a file's bytes
    pub async fn fetch(&self, url: &str) -> Result<FetchedFile> {
        if url.starts_with("file://") {
            return fetch_local(url).await;
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch {
                url: url.to_string(),
                message: format!("HTTP {}", status),
                status: Some(status.as_u16()),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let data = response.bytes().await.map_err(|e| network_error(url, e))?;

        tracing::debug!(url = %url, bytes = data.len(), content_type = %content_type, "Fetched");

        Ok(FetchedFile { data, content_type })
    }

    /// Fetch a page as text
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let fetched = self.fetch(url).await?;
        String::from_utf8(fetched.data.to_vec())
            .map_err(|e| Error::fetch(url, format!("response is not UTF-8: {}", e)))
    }
}

async fn fetch_local(url: &str) -> Result<FetchedFile> {
    let path = Url::parse(url)
        .ok()
        .and_then(|u| u.to_file_path().ok())
        .ok_or_else(|| Error::fetch(url, "not a valid file URL"))?;

    let data = tokio::fs::read(&path)
        .await
        .map_err(|e| Error::fetch(url, e.to_string()))?;

    Ok(FetchedFile {
        data: Bytes::from(data),
        content_type: DEFAULT_CONTENT_TYPE.to_string(),
    })
}

fn client_builder(
    headers: &BTreeMap<String, String>,
    timeout: Duration,
) -> Result<reqwest::ClientBuilder> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::config(format!("invalid header name {:?}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::config(format!("invalid value for header {}: {}", name, e)))?;
        map.insert(name, value);
    }

    Ok(reqwest::Client::builder().default_headers(map).timeout(timeout))
}

fn network_error(url: &str, err: reqwest::Error) -> Error {
    Error::Network {
        message: format!("GET {}: {}", url, err),
        source: Some(err),
    }
}
