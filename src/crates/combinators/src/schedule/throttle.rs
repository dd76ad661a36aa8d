//! Throttle: run a function at most once per window

use super::timer::{current_runtime, TimerSlot};
use crate::config::CombinatorConfig;
use crate::{CombinatorError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;

/// Which edges of a throttle window run the function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleOptions {
    /// Run the first call of a window immediately
    pub leading: bool,
    /// Run the last blocked call once the window closes
    pub trailing: bool,
}

impl Default for ThrottleOptions {
    fn default() -> Self {
        Self {
            leading: true,
            trailing: true,
        }
    }
}

impl ThrottleOptions {
    pub fn leading_only() -> Self {
        Self {
            leading: true,
            trailing: false,
        }
    }

    pub fn trailing_only() -> Self {
        Self {
            leading: false,
            trailing: true,
        }
    }
}

/// Throttled wrapper around `Fn(A)`
///
/// Guarantees the function runs at most once per `delay`. Calls that land in
/// a closed window are dropped, except that with `trailing` enabled the
/// latest of them runs when the window reopens.
///
/// A throttle with neither edge enabled would never run anything and is
/// rejected at construction.
///
/// # Example
///
/// ```rust,ignore
/// use combinators::{Throttle, ThrottleOptions};
/// use std::time::Duration;
///
/// let on_scroll = Throttle::new(
///     |offset: f64| println!("scrolled to {offset}"),
///     Duration::from_millis(100),
///     ThrottleOptions::default(),
/// )?;
/// ```
pub struct Throttle<A> {
    inner: Arc<Inner<A>>,
}

struct Inner<A> {
    func: Box<dyn Fn(A) + Send + Sync>,
    delay: Duration,
    options: ThrottleOptions,
    runtime: Handle,
    state: Mutex<State<A>>,
}

struct State<A> {
    timer: TimerSlot,
    /// Start of the current window; `None` means no window is open
    last_fire: Option<Instant>,
    pending_args: Option<A>,
}

impl<A: Send + 'static> Throttle<A> {
    pub fn new<F>(func: F, delay: Duration, options: ThrottleOptions) -> Result<Self>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        if !options.leading && !options.trailing {
            return Err(CombinatorError::InvalidConfig(
                "throttle needs a leading or a trailing edge".to_string(),
            ));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                func: Box::new(func),
                delay,
                options,
                runtime: current_runtime()?,
                state: Mutex::new(State {
                    timer: TimerSlot::default(),
                    last_fire: None,
                    pending_args: None,
                }),
            }),
        })
    }

    /// Throttle using the configured default delay and edges
    pub fn from_config<F>(config: &CombinatorConfig, func: F) -> Result<Self>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::new(func, config.throttle_delay, config.throttle_options())
    }

    pub fn call(&self, args: A) {
        let now = Instant::now();
        let delay = self.inner.delay;
        let options = self.inner.options;
        let mut state = self.inner.state.lock();

        // Without a leading edge the first call opens the window instead of
        // running.
        if state.last_fire.is_none() && !options.leading {
            state.last_fire = Some(now);
        }

        let remaining = match state.last_fire {
            Some(start) => delay.saturating_sub(now.saturating_duration_since(start)),
            None => Duration::ZERO,
        };

        if remaining.is_zero() {
            state.timer.cancel();
            state.last_fire = Some(now);
            state.pending_args = None;
            drop(state);
            (self.inner.func)(args);
            return;
        }

        if !options.trailing {
            return;
        }

        state.pending_args = Some(args);
        if !state.timer.is_armed() {
            let inner = Arc::clone(&self.inner);
            state.timer.arm(&self.inner.runtime, move |generation| async move {
                tokio::time::sleep(remaining).await;
                inner.fire_trailing(generation);
            });
            tracing::trace!("Throttle trailing call scheduled in {:?}", remaining);
        }
    }

    /// Drop any trailing call and close the current window
    pub fn cancel(&self) {
        let mut state = self.inner.state.lock();
        if state.timer.cancel() {
            tracing::debug!("Throttle cancelled trailing call");
        }
        state.last_fire = None;
        state.pending_args = None;
    }

    /// Whether a trailing call is scheduled
    pub fn is_pending(&self) -> bool {
        self.inner.state.lock().timer.is_armed()
    }

    pub fn options(&self) -> ThrottleOptions {
        self.inner.options
    }
}

impl<A> Inner<A> {
    fn fire_trailing(&self, generation: u64) {
        let mut state = self.state.lock();
        if !state.timer.claim(generation) {
            return;
        }
        state.last_fire = self.options.leading.then(Instant::now);
        let args = state.pending_args.take();
        drop(state);

        if let Some(args) = args {
            (self.func)(args);
        }
    }
}

impl<A> Clone for Throttle<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
