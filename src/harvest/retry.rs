//! Bounded retry with exponential backoff
//!
//! Every remote call goes through [`RetryPolicy::execute`]. Failures are
//! values of [`Failure`]; nothing here panics or propagates past the unit of
//! work that the caller decides to skip.

use crate::config::RetryConfig;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single remote call
#[derive(Debug, Clone, Error)]
pub enum Failure {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("rate limited by remote service")]
    RateLimited,

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("giving up after {attempts} attempts, last error: {last}")]
    RetriesExhausted { attempts: u32, last: Box<Failure> },
}

impl Failure {
    /// Returns true if another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::RetriesExhausted { .. })
    }
}

impl From<reqwest::Error> for Failure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Failure::Parse(e.to_string())
        } else {
            Failure::Network(e.to_string())
        }
    }
}

/// Retry schedule: at most `max_attempts` calls, sleeping
/// `min(max_delay, base_delay * 2^attempt)` after failed attempt `attempt`
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Runs `operation` until it succeeds or the attempts are used up
    ///
    /// `label` names the unit of work in log messages. Attempts never overlap;
    /// the backoff is a real sleep between them.
    pub async fn execute<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, Failure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Failure>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let failure = match operation().await {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            if !failure.is_retryable() {
                return Err(failure);
            }

            if attempt >= self.max_attempts {
                tracing::error!(
                    "{}: failed after {} attempts: {}",
                    label,
                    attempt,
                    failure
                );
                return Err(Failure::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(failure),
                });
            }

            let delay = self.delay_for(attempt);
            tracing::warn!(
                "{}: attempt {}/{} failed ({}), retrying in {:?}",
                label,
                attempt,
                self.max_attempts,
                failure,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}
