//! Run-once wrapper

use std::sync::OnceLock;

/// Wrapper that runs its function at most once
///
/// The first call runs the function and stores the result; every later
/// call returns a clone of that result and ignores its arguments. Calls
/// racing the first one block until it finishes.
///
/// ```rust
/// use combinators::Once;
///
/// let init = Once::new(|port: u16| format!("listening on {port}"));
/// assert_eq!(init.call(8080), "listening on 8080");
/// assert_eq!(init.call(9090), "listening on 8080");
/// ```
pub struct Once<A, T> {
    func: Box<dyn Fn(A) -> T + Send + Sync>,
    value: OnceLock<T>,
}

impl<A, T: Clone> Once<A, T> {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(A) -> T + Send + Sync + 'static,
    {
        Self {
            func: Box::new(func),
            value: OnceLock::new(),
        }
    }

    pub fn call(&self, args: A) -> T {
        self.value
            .get_or_init(|| {
                tracing::trace!("Running once-guarded function");
                (self.func)(args)
            })
            .clone()
    }

    pub fn is_called(&self) -> bool {
        self.value.get().is_some()
    }

    /// The stored result, if the function has run
    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_runs_once_and_ignores_later_arguments() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let once = Once::new(move |n: u32| {
            counter.fetch_add(1, Ordering::SeqCst);
            n * 2
        });

        assert!(!once.is_called());
        assert_eq!(once.get(), None);

        assert_eq!(once.call(5), 10);
        assert_eq!(once.call(100), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(once.is_called());
        assert_eq!(once.get(), Some(&10));
    }

    #[test]
    fn test_concurrent_first_calls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let once = Arc::new(Once::new(move |n: usize| {
            counter.fetch_add(1, Ordering::SeqCst);
            n
        }));

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let once = Arc::clone(&once);
                std::thread::spawn(move || once.call(n))
            })
            .collect();

        let results: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|&r| r == results[0]));
    }
}
