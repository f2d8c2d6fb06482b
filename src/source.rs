//! Source listing: enumerate the files a remote directory page offers
//!
//! The remote host serves an IIS-style directory page. Every file row looks
//! like `1/30/2026  8:30 AM   19537 <A HREF="...">pr.class</A>` inside a
//! single `<pre>` block. Timestamps carry no zone and are taken as UTC.

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::retry::{with_retry, RetryConfig};
use crate::types::SourceFile;
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::OnceLock;

/// Timestamp format of a listing row (after whitespace is collapsed)
const LISTING_TIME_FORMAT: &str = "%m/%d/%Y %I:%M %p";

/// Format of `SourceFile::last_updated`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

fn pre_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<pre[^>]*>(.*?)</pre>").expect("valid regex"))
}

fn listing_row() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)(\d{1,2}/\d{1,2}/\d{4}\s+\d{1,2}:\d{2}\s+[AP]M)(.*?)<a\s+href="[^"]*"\s*>([^<]+)</a>"#,
        )
        .expect("valid regex")
    })
}

/// Produces the current source listing
pub struct SourceLister {
    fetcher: Fetcher,
    source: SourceConfig,
    retry: RetryConfig,
}

impl SourceLister {
    /// Create a lister for the configured directory page
    pub fn new(fetcher: Fetcher, source: SourceConfig, retry: RetryConfig) -> Self {
        Self {
            fetcher,
            source,
            retry,
        }
    }

    /// Fetch and parse the directory page
    ///
    /// A failed request, a page without a listing block and a row whose
    /// timestamp does not parse are all `Error::Listing`; a listing block
    /// without files is an empty listing.
    pub async fn list(&self) -> Result<Vec<SourceFile>> {
        let url = self.source.listing_url();
        tracing::info!(url = %url, "Fetching source listing");

        let page = with_retry(&self.retry, "listing", || self.fetcher.fetch_text(&url))
            .await
            .map_err(|e| Error::listing(format!("fetching {}: {}", url, e)))?;

        let files = parse_listing(&page, &self.source)?;
        tracing::info!(files = files.len(), "Source listing parsed");
        Ok(files)
    }
}

/// Parse an IIS directory page into source files, in page order
pub fn parse_listing(page: &str, source: &SourceConfig) -> Result<Vec<SourceFile>> {
    let block = pre_block()
        .captures(page)
        .and_then(|c| c.get(1))
        .ok_or_else(|| Error::listing("page has no <pre> listing block"))?
        .as_str();

    let mut files = Vec::new();
    for caps in listing_row().captures_iter(block) {
        let raw_time = &caps[1];
        let between = caps[2].to_ascii_lowercase();
        let name = caps[3].trim();

        // Parent links and directory rows
        if name.is_empty()
            || name.starts_with('[')
            || between.contains("&lt;dir&gt;")
            || between.contains("<dir>")
        {
            continue;
        }

        // Dropping the row would schedule the mirrored copy for deletion
        let last_updated = normalize_timestamp(raw_time).ok_or_else(|| {
            Error::listing(format!("unparseable timestamp {:?} for {}", raw_time, name))
        })?;

        files.push(SourceFile::new(name, last_updated, source.file_url(name)));
    }

    Ok(files)
}

/// Convert a listing timestamp like `1/30/2026  8:30 PM` to `2026-01-30T20:30:00Z`
pub fn normalize_timestamp(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&collapsed, LISTING_TIME_FORMAT)
        .ok()
        .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
}
