//! Timeout races for async operations
//!
//! [`with_timeout`] and [`timeout`] drop the wrapped future when the deadline
//! wins, which cancels it at its next await point. [`spawn_with_timeout`]
//! races a detached task instead, so the work keeps running after the
//! deadline and its eventual result is discarded.

use crate::{CombinatorError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout as tokio_timeout;

/// Race a fallible operation against a deadline
///
/// ```rust,ignore
/// use combinators::{with_timeout, TimeoutError};
/// use std::time::Duration;
///
/// match with_timeout(Duration::from_secs(5), fetch_data()).await {
///     Ok(data) => render(data),
///     Err(TimeoutError::Timeout(_)) => show_slow_network_banner(),
///     Err(TimeoutError::OperationFailed(e)) => show_error(e),
/// }
/// ```
pub async fn with_timeout<F, T, E>(
    duration: Duration,
    operation: F,
) -> std::result::Result<T, TimeoutError<E>>
where
    F: Future<Output = std::result::Result<T, E>>,
{
    match tokio_timeout(duration, operation).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(error)) => Err(TimeoutError::OperationFailed(error)),
        Err(_elapsed) => {
            tracing::debug!("Operation timed out after {:?}", duration);
            Err(TimeoutError::Timeout(duration))
        }
    }
}

/// Race any future against a deadline
pub async fn timeout<F: Future>(duration: Duration, future: F) -> Result<F::Output> {
    tokio_timeout(duration, future).await.map_err(|_elapsed| {
        tracing::debug!("Operation timed out after {:?}", duration);
        CombinatorError::Timeout(duration)
    })
}

/// Race a detached task against a deadline
///
/// The future is spawned on the current runtime and is not aborted when the
/// deadline passes. Fails with `Task` if the spawned work panics before the
/// deadline.
pub async fn spawn_with_timeout<F>(duration: Duration, future: F) -> Result<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let handle = tokio::spawn(future);
    match tokio_timeout(duration, handle).await {
        Ok(joined) => Ok(joined?),
        Err(_elapsed) => {
            tracing::debug!(
                "Detached operation still running after {:?}; result will be discarded",
                duration
            );
            Err(CombinatorError::Timeout(duration))
        }
    }
}

/// Error type for [`with_timeout`]
#[derive(Debug)]
pub enum TimeoutError<E> {
    /// Operation completed but failed
    OperationFailed(E),
    /// Operation timed out
    Timeout(Duration),
}

impl<E> TimeoutError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TimeoutError::Timeout(_))
    }
}

impl<E: std::fmt::Display> std::fmt::Display for TimeoutError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeoutError::OperationFailed(e) => write!(f, "Operation failed: {}", e),
            TimeoutError::Timeout(d) => write!(f, "Operation timed out after {:?}", d),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for TimeoutError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TimeoutError::OperationFailed(e) => Some(e),
            TimeoutError::Timeout(_) => None,
        }
    }
}
