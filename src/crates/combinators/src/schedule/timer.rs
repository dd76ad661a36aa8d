//! Cancellable one-shot timers shared by the scheduling combinators

use crate::Result;
use std::future::Future;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Capture the runtime that will drive an instance's timers
pub(crate) fn current_runtime() -> Result<Handle> {
    Ok(Handle::try_current()?)
}

/// Slot holding at most one pending timer task
///
/// Every arm or cancel bumps the generation. A timer task must present its
/// generation to [`TimerSlot::claim`] before acting, so a task that wakes
/// after it was aborted or replaced does nothing even if the abort lost the
/// race with the wake-up.
#[derive(Debug, Default)]
pub(crate) struct TimerSlot {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl TimerSlot {
    /// Cancel any pending timer and spawn a new one
    ///
    /// `timer` receives the generation it has to claim with.
    pub(crate) fn arm<F, Fut>(&mut self, runtime: &Handle, timer: F)
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let generation = self.generation;
        self.handle = Some(runtime.spawn(timer(generation)));
    }

    /// Abort the pending timer, returning whether one was pending
    pub(crate) fn cancel(&mut self) -> bool {
        self.generation = self.generation.wrapping_add(1);
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Mark the timer of `generation` as fired
    ///
    /// Returns false when that timer is no longer the current one.
    pub(crate) fn claim(&mut self, generation: u64) -> bool {
        if self.handle.is_none() || self.generation != generation {
            return false;
        }
        self.handle = None;
        self.generation = self.generation.wrapping_add(1);
        true
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.handle.is_some()
    }
}
