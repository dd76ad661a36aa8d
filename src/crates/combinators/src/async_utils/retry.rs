//! Retry utilities for async operations
//!
//! The default policy waits a fixed interval between attempts. Exponential
//! backoff and jitter are opt-in.

use crate::config::CombinatorConfig;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Configuration for retrying failed operations
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first)
    pub max_attempts: usize,

    /// Wait before the first retry
    pub interval: Duration,

    /// Multiplier applied to the interval after each retry
    pub backoff_factor: f64,

    /// Upper bound for any single wait
    pub max_interval: Duration,

    /// Scale each wait by a random factor in `0.5..=1.5`
    pub jitter: bool,
}

impl RetryPolicy {
    /// Create a fixed-interval policy with the given max attempts
    ///
    /// ```rust
    /// use combinators::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::new(3);
    /// assert_eq!(policy.max_attempts, 3);
    /// assert_eq!(policy.interval, Duration::from_secs(1));
    /// ```
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            interval: Duration::from_secs(1),
            backoff_factor: 1.0,
            max_interval: Duration::from_secs(30),
            jitter: false,
        }
    }

    /// Policy built from the configured attempts and delay
    pub fn from_config(config: &CombinatorConfig) -> Self {
        Self::new(config.retry_attempts).with_interval(config.retry_delay)
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Number of attempts actually made; at least one
    pub fn attempts(&self) -> usize {
        self.max_attempts.max(1)
    }

    /// Wait before retry number `retry` (0-indexed)
    ///
    /// `interval * backoff_factor ^ retry`, capped at `max_interval`, then
    /// jittered if enabled.
    pub fn calculate_delay(&self, retry: usize) -> Duration {
        let base = self.interval.as_secs_f64() * self.backoff_factor.powi(retry as i32);
        let capped = base.min(self.max_interval.as_secs_f64());

        let delay = if self.jitter {
            capped * rand::thread_rng().gen_range(0.5..=1.5)
        } else {
            capped
        };

        Duration::try_from_secs_f64(delay).unwrap_or(self.max_interval)
    }

    /// Whether another attempt follows attempt number `attempt` (1-based)
    pub fn should_retry(&self, attempt: usize) -> bool {
        attempt < self.attempts()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Execute an async operation with retry logic
///
/// Returns the first success, or the error of the final attempt once all
/// attempts have failed.
///
/// ```rust,ignore
/// use combinators::{with_retry, RetryPolicy};
///
/// let body = with_retry(&RetryPolicy::new(3), || fetch("/api/data")).await?;
/// ```
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    with_retry_notify(policy, operation, |_, _| {}).await
}

/// Like [`with_retry`], calling `on_retry(&error, attempt)` after each failed
/// attempt that will be retried
///
/// `attempt` is the 1-based number of the attempt that failed. The final
/// failure is returned to the caller rather than reported here.
pub async fn with_retry_notify<F, Fut, T, E, N>(
    policy: &RetryPolicy,
    mut operation: F,
    mut on_retry: N,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    N: FnMut(&E, usize),
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        let error = match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => error,
        };

        if !policy.should_retry(attempt) {
            tracing::debug!("Attempt {} failed: {}. Giving up", attempt, error);
            return Err(error);
        }

        tracing::debug!("Attempt {} failed: {}. Retrying...", attempt, error);
        on_retry(&error, attempt);

        let delay = policy.calculate_delay(attempt - 1);
        tracing::debug!("Waiting {:?} before retry", delay);
        tokio::time::sleep(delay).await;
    }
}
