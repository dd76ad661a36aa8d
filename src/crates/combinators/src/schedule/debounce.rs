//! Debounce: run a function once calls have stopped for a quiet period

use super::timer::{current_runtime, TimerSlot};
use crate::config::CombinatorConfig;
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Debounced wrapper around `Fn(A)`
///
/// In trailing mode every call replaces the pending arguments and restarts
/// the timer; the function runs once with the latest arguments after
/// `delay` passes without a new call.
///
/// In immediate mode the first call of an idle period runs the function
/// straight away. Calls that follow within `delay` are dropped and push the
/// end of the window out; once a full `delay` passes quietly, the next call
/// runs immediately again.
///
/// Clones share state, so a clone is the same debounced function.
///
/// # Example
///
/// ```rust,ignore
/// use combinators::Debounce;
/// use std::time::Duration;
///
/// let search = Debounce::new(
///     |query: String| println!("searching {query}"),
///     Duration::from_millis(300),
///     false,
/// )?;
///
/// search.call("r".into());
/// search.call("ru".into());
/// search.call("rust".into()); // only this one runs, 300ms from now
/// ```
pub struct Debounce<A> {
    inner: Arc<Inner<A>>,
}

struct Inner<A> {
    func: Box<dyn Fn(A) + Send + Sync>,
    delay: Duration,
    immediate: bool,
    runtime: Handle,
    state: Mutex<State<A>>,
}

struct State<A> {
    timer: TimerSlot,
    pending_args: Option<A>,
    // Immediate mode: the leading call of the current window already ran
    invoked: bool,
}

impl<A: Send + 'static> Debounce<A> {
    /// Create a debounced function
    ///
    /// Must be called from within a Tokio runtime; the timers run on it.
    pub fn new<F>(func: F, delay: Duration, immediate: bool) -> Result<Self>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Ok(Self {
            inner: Arc::new(Inner {
                func: Box::new(func),
                delay,
                immediate,
                runtime: current_runtime()?,
                state: Mutex::new(State {
                    timer: TimerSlot::default(),
                    pending_args: None,
                    invoked: false,
                }),
            }),
        })
    }

    /// Trailing-mode debounce using the configured default delay
    pub fn from_config<F>(config: &CombinatorConfig, func: F) -> Result<Self>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::new(func, config.debounce_delay, false)
    }

    pub fn call(&self, args: A) {
        let mut state = self.inner.state.lock();

        if self.inner.immediate {
            let run_now = !state.invoked;
            state.invoked = true;
            self.arm(&mut state);
            drop(state);

            if run_now {
                (self.inner.func)(args);
            } else {
                tracing::trace!("Debounce suppressed call inside immediate window");
            }
            return;
        }

        state.pending_args = Some(args);
        self.arm(&mut state);
    }

    /// Drop the pending call and reset the immediate window
    pub fn cancel(&self) {
        let mut state = self.inner.state.lock();
        if state.timer.cancel() {
            tracing::debug!("Debounce cancelled pending call");
        }
        state.pending_args = None;
        state.invoked = false;
    }

    /// Whether a timer is waiting to fire
    pub fn is_pending(&self) -> bool {
        self.inner.state.lock().timer.is_armed()
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    fn arm(&self, state: &mut State<A>) {
        let inner = Arc::clone(&self.inner);
        let delay = self.inner.delay;
        state.timer.arm(&self.inner.runtime, move |generation| async move {
            tokio::time::sleep(delay).await;
            inner.fire(generation);
        });
        tracing::trace!("Debounce timer armed for {:?}", delay);
    }
}

impl<A> Inner<A> {
    fn fire(&self, generation: u64) {
        let mut state = self.state.lock();
        if !state.timer.claim(generation) {
            return;
        }
        state.invoked = false;
        let args = state.pending_args.take();
        drop(state);

        if let Some(args) = args {
            (self.func)(args);
        }
    }
}

impl<A> Clone for Debounce<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
