//! Exponential backoff for transient index and RPC failures.

use crate::{CcipError, IndexError};
use core::{fmt::Display, future::Future, time::Duration};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Backoff policy applied by [with_retry].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    #[serde(rename = "initialDelayMs", with = "crate::serde_utils::duration_ms")]
    pub initial_delay: Duration,
    /// Growth factor applied per retry.
    pub backoff_multiplier: f64,
    /// Upper bound of the computed delay.
    #[serde(rename = "maxDelayMs", with = "crate::serde_utils::duration_ms")]
    pub max_delay: Duration,
    /// Whether a server `Retry-After` hint longer than the computed delay is honored.
    #[serde(rename = "respectRetryAfterHint")]
    pub respect_retry_after: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1_000),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(30_000),
            respect_retry_after: true,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self { max_retries: 0, ..Default::default() }
    }

    /// Returns the delay before retry number `attempt` (0-indexed).
    pub fn delay_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped = scaled.min(self.max_delay.as_millis() as f64);
        let delay = Duration::from_millis(capped as u64);
        match hint {
            Some(hint) if self.respect_retry_after && hint > delay => hint,
            _ => delay,
        }
    }
}

/// An error that knows whether the failed operation is worth repeating.
pub trait Retryable {
    /// Returns true if the failure is transient.
    fn is_retryable(&self) -> bool;

    /// Returns the delay the remote side asked for, if any.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Retryable for CcipError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }

    fn retry_after(&self) -> Option<Duration> {
        CcipError::retry_after(self)
    }
}

impl Retryable for IndexError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }

    fn retry_after(&self) -> Option<Duration> {
        IndexError::retry_after(self)
    }
}

/// Runs `operation` until it succeeds, fails permanently, or the retry budget is spent.
///
/// The final error is returned unchanged.
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: Retryable + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < config.max_retries => {
                let delay = config.delay_for(attempt, err.retry_after());
                warn!(
                    target: "retry",
                    "{label} failed (attempt {}/{}): {err}; retrying in {delay:?}",
                    attempt + 1,
                    config.max_retries + 1
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                debug!(target: "retry", "{label} failed after {} attempts: {err}", attempt + 1);
                return Err(err);
            }
        }
    }
}
