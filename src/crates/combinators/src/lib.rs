//! Timing and concurrency combinators for async Rust
//!
//! Each combinator wraps a caller-supplied function with a policy and hands
//! back a value that behaves like the function plus that policy. Instances
//! are independent: there is no global registry, and every wrapper owns its
//! own timer, cache or queue.
//!
//! # Modules
//!
//! - `schedule` - Debounce, throttle, frame throttle and batching
//! - `async_utils` - Sleep, retry, timeout races, dedupe and task runners
//! - `memo` - Memoization and run-once wrappers
//! - `serialization` - Stable JSON serialization used for cache keys
//! - `config` - Default policies loaded from environment variables
//! - `logging` - Structured logging helpers and call timing

pub mod async_utils;
pub mod config;
pub mod logging;
pub mod memo;
pub mod schedule;
pub mod serialization;

pub use async_utils::dedupe::Dedupe;
pub use async_utils::retry::{with_retry, with_retry_notify, RetryPolicy};
pub use async_utils::runner::{
    run_bounded, run_bounded_from_config, run_bounded_ordered, run_serial,
};
pub use async_utils::timeout::{spawn_with_timeout, timeout, with_timeout, TimeoutError};
pub use async_utils::{sleep, sleep_ms};
pub use config::CombinatorConfig;
pub use memo::{CacheStats, MemoCache, MemoOptions, Memoize, Once};
pub use schedule::{
    Batch, Debounce, FixedRateClock, FrameClock, RafThrottle, Throttle, ThrottleOptions,
};

use std::time::Duration;
use thiserror::Error;

/// Errors produced by the combinators themselves
///
/// Failures of the wrapped functions are never converted into this type;
/// they travel back to the caller inside the wrapped function's own output.
#[derive(Debug, Error)]
pub enum CombinatorError {
    /// A policy or configuration value that cannot work
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A timer-backed combinator was created outside a Tokio runtime
    #[error("No Tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// Call arguments could not be turned into a cache key
    #[error("Failed to serialize call arguments: {0}")]
    Key(#[from] serde_json::Error),

    /// The deadline elapsed before the operation settled
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// A detached task panicked or was aborted
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A shared deduplicated execution ended without producing a value
    #[error("Deduplicated call failed: {0}")]
    Dedupe(String),

    /// Environment configuration could not be read
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for combinator operations
pub type Result<T> = std::result::Result<T, CombinatorError>;
