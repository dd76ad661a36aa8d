//! Logging utilities
//!
//! Helpers for timing calls with tracing. The crate never installs a
//! subscriber; hosts decide where these events go.

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Log execution time of a future
///
/// ```rust,ignore
/// use combinators::logging::timed;
///
/// let rows = timed("load_rows", db.load_rows()).await;
/// ```
pub async fn timed<F, T>(name: &str, future: F) -> T
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    debug!("Starting: {}", name);

    let result = future.await;

    debug!("Completed: {} in {}", name, format_duration(start.elapsed()));
    result
}

/// Wrap a function so that every call logs how long it took
///
/// ```rust
/// use combinators::logging::measured;
///
/// let word_count = measured("word_count", |text: String| text.split_whitespace().count());
/// assert_eq!(word_count("three small words".to_string()), 3);
/// ```
pub fn measured<A, T, F>(label: impl Into<String>, func: F) -> impl Fn(A) -> T
where
    F: Fn(A) -> T,
{
    let label = label.into();
    move |args: A| {
        let start = Instant::now();
        let result = func(args);
        debug!("{}: {}", label, format_duration(start.elapsed()));
        result
    }
}

/// Async counterpart of [`measured`]; the duration covers the whole future
pub fn measured_async<A, T, F, Fut>(
    label: impl Into<String>,
    func: F,
) -> impl Fn(A) -> BoxFuture<'static, T>
where
    F: Fn(A) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: 'static,
{
    let label: Arc<str> = Arc::from(label.into());
    move |args: A| {
        let label = Arc::clone(&label);
        let start = Instant::now();
        let future = func(args);
        async move {
            let result = future.await;
            debug!("{}: {}", label, format_duration(start.elapsed()));
            result
        }
        .boxed()
    }
}

/// RAII guard for logging scope entry and exit
///
/// ```rust
/// use combinators::logging::LogGuard;
///
/// fn flush_queue() {
///     let _guard = LogGuard::new("flush_queue");
///     // exit is logged when the guard drops
/// }
/// ```
pub struct LogGuard {
    name: String,
    start: Instant,
}

impl LogGuard {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        debug!("Entering: {}", name);

        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Get elapsed time since guard creation
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        debug!(
            "Exiting: {} (elapsed: {})",
            self.name,
            format_duration(self.start.elapsed())
        );
    }
}

/// Format duration in human-readable form
///
/// ```rust
/// use combinators::logging::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
/// assert_eq!(format_duration(Duration::from_micros(500)), "500μs");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let micros = duration.as_micros();

    if micros < 1000 {
        format!("{}μs", micros)
    } else if micros < 1_000_000 {
        format!("{}ms", micros / 1000)
    } else if micros < 60_000_000 {
        format!("{:.2}s", micros as f64 / 1_000_000.0)
    } else {
        let seconds = micros / 1_000_000;
        format!("{}m{}s", seconds / 60, seconds % 60)
    }
}
