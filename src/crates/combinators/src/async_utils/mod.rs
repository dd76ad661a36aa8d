//! Async utilities for common async patterns
//!
//! - Sleeping
//! - Retry with fixed or exponential delays
//! - Timeout races
//! - In-flight call deduplication
//! - Bounded-concurrency and serial task runners
//!
//! None of these can be cancelled once started other than by dropping the
//! returned future.
//!
//! # Example
//!
//! ```rust,ignore
//! use combinators::{run_bounded, with_retry, with_timeout, RetryPolicy};
//! use std::time::Duration;
//!
//! async fn fetch_all(urls: Vec<String>) -> Result<Vec<String>, String> {
//!     let policy = RetryPolicy::new(3);
//!
//!     let tasks = urls.into_iter().map(|url| {
//!         let policy = policy.clone();
//!         move || async move {
//!             with_retry(&policy, || async {
//!                 with_timeout(Duration::from_secs(10), fetch(&url))
//!                     .await
//!                     .map_err(|e| e.to_string())
//!             })
//!             .await
//!         }
//!     });
//!
//!     run_bounded(tasks, 5).await
//! }
//! ```

pub mod dedupe;
pub mod retry;
pub mod runner;
pub mod timeout;

use std::time::Duration;

/// Resolve after at least `duration`
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Resolve after at least `ms` milliseconds
pub async fn sleep_ms(ms: u64) {
    sleep(Duration::from_millis(ms)).await;
}
