//! Batching: collect pushed items and hand them over in one call

use super::timer::{current_runtime, TimerSlot};
use crate::config::CombinatorConfig;
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Buffers items and flushes them together once pushes go quiet
///
/// Like a trailing debounce that keeps every argument: each push restarts the
/// timer, and when `delay` passes without one the whole buffer is passed to
/// the function in push order.
///
/// # Example
///
/// ```rust,ignore
/// use combinators::Batch;
/// use std::time::Duration;
///
/// let save = Batch::new(
///     |rows: Vec<String>| println!("saving {} rows", rows.len()),
///     Duration::from_millis(100),
/// )?;
///
/// save.push("a".into());
/// save.push("b".into());
/// // 100ms later: saving 2 rows
/// ```
pub struct Batch<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    func: Box<dyn Fn(Vec<T>) + Send + Sync>,
    delay: Duration,
    runtime: Handle,
    state: Mutex<State<T>>,
}

struct State<T> {
    timer: TimerSlot,
    items: Vec<T>,
}

impl<T: Send + 'static> Batch<T> {
    pub fn new<F>(func: F, delay: Duration) -> Result<Self>
    where
        F: Fn(Vec<T>) + Send + Sync + 'static,
    {
        Ok(Self {
            inner: Arc::new(Inner {
                func: Box::new(func),
                delay,
                runtime: current_runtime()?,
                state: Mutex::new(State {
                    timer: TimerSlot::default(),
                    items: Vec::new(),
                }),
            }),
        })
    }

    pub fn from_config<F>(config: &CombinatorConfig, func: F) -> Result<Self>
    where
        F: Fn(Vec<T>) + Send + Sync + 'static,
    {
        Self::new(func, config.batch_delay)
    }

    /// Buffer an item and restart the flush timer
    pub fn push(&self, item: T) {
        let mut state = self.inner.state.lock();
        state.items.push(item);

        let inner = Arc::clone(&self.inner);
        let delay = self.inner.delay;
        state.timer.arm(&self.inner.runtime, move |generation| async move {
            tokio::time::sleep(delay).await;
            inner.flush_scheduled(generation);
        });
    }

    /// Flush the buffer now instead of waiting for the timer
    pub fn flush(&self) {
        let mut state = self.inner.state.lock();
        state.timer.cancel();
        let items = std::mem::take(&mut state.items);
        drop(state);
        self.inner.deliver(items);
    }

    /// Discard buffered items without calling the function
    ///
    /// Returns how many items were dropped.
    pub fn cancel(&self) -> usize {
        let mut state = self.inner.state.lock();
        state.timer.cancel();
        let dropped = state.items.len();
        state.items.clear();
        if dropped > 0 {
            tracing::debug!("Batch cancelled with {} buffered items", dropped);
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_pending(&self) -> bool {
        self.inner.state.lock().timer.is_armed()
    }
}

impl<T> Inner<T> {
    fn flush_scheduled(&self, generation: u64) {
        let mut state = self.state.lock();
        if !state.timer.claim(generation) {
            return;
        }
        let items = std::mem::take(&mut state.items);
        drop(state);
        self.deliver(items);
    }

    fn deliver(&self, items: Vec<T>) {
        if items.is_empty() {
            return;
        }
        tracing::trace!("Batch flushing {} items", items.len());
        (self.func)(items);
    }
}

impl<T> Clone for Batch<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
