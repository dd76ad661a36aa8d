//! Result caching wrappers
//!
//! - [`Memoize`] caches results per argument key, in a bounded LRU by default.
//! - [`Once`] runs a function a single time and replays its result.

pub mod memoize;
pub mod once;

pub use memoize::{CacheStats, MemoCache, MemoOptions, Memoize};
pub use once::Once;
