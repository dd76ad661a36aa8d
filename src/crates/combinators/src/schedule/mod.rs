//! Timer-driven combinators
//!
//! Synchronous, fire-and-forget wrappers: callers hand over arguments and
//! get nothing back, and the wrapped function runs later on the Tokio
//! runtime that was current when the wrapper was built.
//!
//! Every wrapper here moves through the same states for each scheduled run:
//!
//! ```text
//! idle -> scheduled -> fired    -> idle
//!                   \-> canceled -> idle
//! ```
//!
//! `is_pending()` reports whether a wrapper is in `scheduled`. Runs already
//! scheduled still happen if the wrapper is dropped.

mod batch;
mod debounce;
mod frame;
mod throttle;
mod timer;

pub use batch::Batch;
pub use debounce::Debounce;
pub use frame::{FixedRateClock, FrameClock, RafThrottle};
pub use throttle::{Throttle, ThrottleOptions};
