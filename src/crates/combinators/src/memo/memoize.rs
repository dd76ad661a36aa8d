//! Memoization keyed by serialized arguments

use crate::config::CombinatorConfig;
use crate::serialization::{default_key, truncate_key, KeyFn};
use crate::Result;
use hashlink::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sizing for a memoization cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoOptions {
    /// Maximum number of cached results; `None` grows without bound
    pub capacity: Option<usize>,
}

impl Default for MemoOptions {
    fn default() -> Self {
        Self {
            capacity: Some(1000),
        }
    }
}

impl MemoOptions {
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
        }
    }

    pub fn unbounded() -> Self {
        Self { capacity: None }
    }
}

/// Hit and miss counters for a [`MemoCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Backing store of a [`Memoize`], evicting least recently used entries
pub struct MemoCache<T> {
    entries: Mutex<LruCache<String, T>>,
    capacity: Option<usize>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T> MemoCache<T> {
    fn new(options: MemoOptions) -> Self {
        // A zero capacity would cache nothing; treat it as unbounded.
        let capacity = options.capacity.filter(|&c| c > 0);
        let entries = match capacity {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::new_unbounded(),
        };

        Self {
            entries: Mutex::new(entries),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lookup(&self, key: &str) -> Option<T>
    where
        T: Clone,
    {
        let found = self.entries.lock().get(key).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    fn store(&self, key: String, value: T) {
        let mut entries = self.entries.lock();
        entries.insert(key, value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Option<T> {
        self.entries.lock().remove(key)
    }

    /// Drop every cached result
    pub fn clear(&self) {
        self.entries.lock().clear();
        tracing::debug!("Memo cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: self.len(),
        }
    }
}

/// Memoized wrapper around `Fn(A) -> T`
///
/// Repeat calls whose key matches a cached entry return a clone of the
/// cached result without running the function. The key comes from the
/// configured [`KeyFn`], by default the stable JSON of the arguments.
///
/// Two concurrent misses for the same key may both run the function; the
/// later result replaces the earlier one.
///
/// # Example
///
/// ```rust
/// use combinators::Memoize;
///
/// let square = Memoize::new(|n: u64| n * n);
/// assert_eq!(square.call(12).unwrap(), 144);
/// assert_eq!(square.call(12).unwrap(), 144); // served from cache
/// assert_eq!(square.cache().stats().hits, 1);
/// ```
pub struct Memoize<A, T> {
    func: Box<dyn Fn(A) -> T + Send + Sync>,
    key: KeyFn<A>,
    cache: MemoCache<T>,
}

impl<A, T> Memoize<A, T>
where
    A: Serialize + 'static,
    T: Clone,
{
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(A) -> T + Send + Sync + 'static,
    {
        Self::with_options(func, default_key(), MemoOptions::default())
    }

    /// Memoize with the configured cache capacity
    pub fn from_config<F>(config: &CombinatorConfig, func: F) -> Self
    where
        F: Fn(A) -> T + Send + Sync + 'static,
    {
        Self::with_options(func, default_key(), config.memo_options())
    }
}

impl<A, T: Clone> Memoize<A, T> {
    /// Memoize with a custom key function
    pub fn with_key<F>(func: F, key: KeyFn<A>) -> Self
    where
        F: Fn(A) -> T + Send + Sync + 'static,
    {
        Self::with_options(func, key, MemoOptions::default())
    }

    pub fn with_options<F>(func: F, key: KeyFn<A>, options: MemoOptions) -> Self
    where
        F: Fn(A) -> T + Send + Sync + 'static,
    {
        Self {
            func: Box::new(func),
            key,
            cache: MemoCache::new(options),
        }
    }

    /// Return the cached result for these arguments, computing it on a miss
    ///
    /// Fails only if the key cannot be computed.
    pub fn call(&self, args: A) -> Result<T> {
        let key = (self.key)(&args)?;

        if let Some(hit) = self.cache.lookup(&key) {
            tracing::trace!("Memo hit for {}", truncate_key(&key, 64));
            return Ok(hit);
        }

        let value = (self.func)(args);
        self.cache.store(key, value.clone());
        Ok(value)
    }

    pub fn cache(&self) -> &MemoCache<T> {
        &self.cache
    }
}
