//! Retry with exponential backoff for fetches and store calls

use crate::config::Config;
use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::time::Duration;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound on any single delay, in milliseconds
    pub max_delay_ms: u64,
    /// Extra random delay as a fraction of the backoff (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            jitter: 0.25,
        }
    }
}

impl From<&Config> for RetryConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay_ms: config.retry_delay_ms,
            ..Default::default()
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `attempt + 1`: `base * 2^attempt`, capped, plus jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self
            .base_delay_ms
            .saturating_mul(1u64 << attempt.min(32))
            .min(self.max_delay_ms);

        let spread = (backoff as f64 * self.jitter) as u64;
        let jitter = if spread > 0 { clock_noise() % spread } else { 0 };

        Duration::from_millis(backoff.saturating_add(jitter))
    }
}

/// Run `operation` until it succeeds, fails permanently or runs out of retries
///
/// `what` names the operation in log output. The error of the last attempt
/// is returned.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, what: &str, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < config.max_retries && is_retryable(&e) => {
                let delay = config.delay_for(attempt);
                attempt += 1;
                tracing::warn!(
                    op = what,
                    attempt,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Whether an error is worth another attempt
pub fn is_retryable(error: &Error) -> bool {
    match error {
        Error::Network { .. } => true,
        Error::Fetch { status: Some(status), .. } => *status == 429 || *status >= 500,
        Error::Aws { message } => is_transient_aws(message),
        Error::Io { source, .. } => matches!(
            source.kind(),
            ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::TimedOut
                | ErrorKind::Interrupted
        ),
        _ => false,
    }
}

/// The SDK only surfaces these as text once converted
fn is_transient_aws(message: &str) -> bool {
    const MARKERS: [&str; 6] = ["throttl", "timeout", "connection", "500", "503", "429"];
    let message = message.to_lowercase();
    MARKERS.iter().any(|m| message.contains(m))
}

fn clock_noise() -> u64 {
    use std::time::SystemTime;
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0)
}
