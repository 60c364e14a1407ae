//! Retry configuration, delay calculation, and the shared retry loop.
//!
//! The manager drives every provider attempt through [`with_retry()`],
//! keeping retry logic in a single place for both modalities.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::ProviderResult;
use crate::telemetry;

/// Configuration for retry behaviour on retryable provider errors.
///
/// Uses exponential backoff seeded by `base_delay`:
///
/// ```rust
/// # use lectern::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_retries(5)
///     .base_delay(Duration::from_millis(200));
/// assert_eq!(config.delay_for_attempt(2), Duration::from_millis(800));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the initial attempt. 0 = single attempt. Default: 3.
    pub max_retries: u32,
    /// Delay before the first retry. Default: 500ms.
    pub base_delay: Duration,
    /// Cap on the computed exponential delay. Default: 30s.
    ///
    /// Backend `retry_after` hints are honoured as given, above the cap.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay before retry number `attempt + 1` (0-indexed).
    ///
    /// `base_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }

    /// Calculate the effective delay, respecting provider `retry_after` hints.
    ///
    /// A hint from a `RateLimit` error replaces the computed backoff for
    /// this one retry.
    pub fn effective_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or_else(|| self.delay_for_attempt(attempt))
    }
}

/// Execute one provider's attempts with retry logic.
///
/// Retryable errors (see
/// [`ProviderError::is_retryable()`](crate::ProviderError::is_retryable))
/// are retried up to `config.max_retries` times. Everything else, and the
/// error of the final attempt, is returned immediately. No sleep follows
/// the final attempt.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    provider_name: &str,
    operation: &'static str,
    f: F,
) -> ProviderResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = config.effective_delay(attempt, e.retry_after());
                metrics::counter!(telemetry::RETRIES_TOTAL,
                    "provider" => provider_name.to_owned(),
                    "operation" => operation,
                    "kind" => e.kind().as_str(),
                )
                .increment(1);
                warn!(
                    provider = provider_name,
                    operation,
                    attempt = attempt + 1,
                    max_retries = config.max_retries,
                    delay_ms = whole_millis(delay),
                    error = %e,
                    "retrying after retryable error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e), // non-retryable, or out of retries
        }
    }
}

/// Milliseconds in `d`, saturating at `u64::MAX`.
pub(crate) fn whole_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
