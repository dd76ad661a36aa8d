//! Frame-aligned throttling
//!
//! Coalesces bursts of calls into at most one run per display frame. There
//! is no compositor to ask for a frame callback, so frame boundaries come
//! from a [`FrameClock`].

use super::timer::{current_runtime, TimerSlot};
use crate::config::CombinatorConfig;
use crate::{CombinatorError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;

/// Source of frame boundaries
pub trait FrameClock: Send + Sync {
    /// Time left until the next frame boundary, strictly after now
    fn until_next_frame(&self) -> Duration;
}

/// Frames at a fixed rate, aligned to the clock's creation instant
#[derive(Debug, Clone)]
pub struct FixedRateClock {
    origin: Instant,
    interval: Duration,
}

impl FixedRateClock {
    pub fn new(interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(CombinatorError::InvalidConfig(
                "frame interval must be non-zero".to_string(),
            ));
        }
        Ok(Self {
            origin: Instant::now(),
            interval,
        })
    }

    pub fn from_fps(fps: u32) -> Result<Self> {
        if fps == 0 {
            return Err(CombinatorError::InvalidConfig(
                "frame rate must be non-zero".to_string(),
            ));
        }
        Self::new(Duration::from_secs(1) / fps)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for FixedRateClock {
    /// 60 frames per second
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            interval: Duration::from_secs(1) / 60,
        }
    }
}

impl FrameClock for FixedRateClock {
    fn until_next_frame(&self) -> Duration {
        let interval = self.interval.as_nanos();
        let into_frame = self.origin.elapsed().as_nanos() % interval;
        Duration::from_nanos((interval - into_frame) as u64)
    }
}

/// Frame-throttled wrapper around `Fn(A)`
///
/// The first call schedules a run at the next frame boundary. Calls that
/// arrive before it fires only replace the arguments, so the run sees the
/// most recent ones.
pub struct RafThrottle<A> {
    inner: Arc<Inner<A>>,
}

struct Inner<A> {
    func: Box<dyn Fn(A) + Send + Sync>,
    clock: Arc<dyn FrameClock>,
    runtime: Handle,
    state: Mutex<State<A>>,
}

struct State<A> {
    timer: TimerSlot,
    pending_args: Option<A>,
}

impl<A: Send + 'static> RafThrottle<A> {
    /// Throttle to a 60 fps clock
    pub fn new<F>(func: F) -> Result<Self>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::with_clock(func, Arc::new(FixedRateClock::default()))
    }

    /// Throttle to the configured frame rate
    pub fn from_config<F>(config: &CombinatorConfig, func: F) -> Result<Self>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::with_clock(func, Arc::new(config.frame_clock()?))
    }

    pub fn with_clock<F>(func: F, clock: Arc<dyn FrameClock>) -> Result<Self>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Ok(Self {
            inner: Arc::new(Inner {
                func: Box::new(func),
                clock,
                runtime: current_runtime()?,
                state: Mutex::new(State {
                    timer: TimerSlot::default(),
                    pending_args: None,
                }),
            }),
        })
    }

    pub fn call(&self, args: A) {
        let mut state = self.inner.state.lock();
        state.pending_args = Some(args);
        if state.timer.is_armed() {
            return;
        }

        let wait = self.inner.clock.until_next_frame();
        let inner = Arc::clone(&self.inner);
        state.timer.arm(&self.inner.runtime, move |generation| async move {
            tokio::time::sleep(wait).await;
            inner.fire(generation);
        });
    }

    /// Abort a scheduled frame callback
    pub fn cancel(&self) {
        let mut state = self.inner.state.lock();
        state.timer.cancel();
        state.pending_args = None;
    }

    pub fn is_pending(&self) -> bool {
        self.inner.state.lock().timer.is_armed()
    }
}

impl<A> Inner<A> {
    fn fire(&self, generation: u64) {
        let mut state = self.state.lock();
        if !state.timer.claim(generation) {
            return;
        }
        let args = state.pending_args.take();
        drop(state);

        if let Some(args) = args {
            (self.func)(args);
        }
    }
}

impl<A> Clone for RafThrottle<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_fixed_rate_clock_alignment() {
        let clock = FixedRateClock::new(Duration::from_millis(16)).unwrap();
        assert_eq!(clock.until_next_frame(), Duration::from_millis(16));

        sleep(Duration::from_millis(20)).await;
        assert_eq!(clock.until_next_frame(), Duration::from_millis(12));

        sleep(Duration::from_millis(12)).await;
        // Exactly on a boundary: wait for the following frame
        assert_eq!(clock.until_next_frame(), Duration::from_millis(16));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_rate_clock_rejects_zero() {
        assert!(FixedRateClock::new(Duration::ZERO).is_err());
        assert!(FixedRateClock::from_fps(0).is_err());
        assert_eq!(
            FixedRateClock::from_fps(50).unwrap().interval(),
            Duration::from_millis(20)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_coalesces_to_one_run_per_frame() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let clock = Arc::new(FixedRateClock::new(Duration::from_millis(16)).unwrap());
        let throttled = RafThrottle::with_clock(move |v: u32| sink.lock().push(v), clock).unwrap();

        throttled.call(1);
        throttled.call(2);
        throttled.call(3);
        assert!(throttled.is_pending());
        assert!(calls.lock().is_empty());

        sleep(Duration::from_millis(17)).await;
        assert_eq!(*calls.lock(), vec![3]);

        throttled.call(4);
        sleep(Duration::from_millis(16)).await;
        assert_eq!(*calls.lock(), vec![3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_frame() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let throttled = RafThrottle::new(move |v: u32| sink.lock().push(v)).unwrap();

        throttled.call(1);
        throttled.cancel();
        assert!(!throttled.is_pending());

        sleep(Duration::from_millis(50)).await;
        assert!(calls.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_from_config_rejects_zero_frame_rate() {
        let config = CombinatorConfig {
            frame_rate: 0,
            ..CombinatorConfig::default()
        };
        assert!(matches!(
            RafThrottle::from_config(&config, |_: u32| {}),
            Err(CombinatorError::InvalidConfig(_))
        ));
        assert!(RafThrottle::from_config(&CombinatorConfig::default(), |_: u32| {}).is_ok());
    }
}
