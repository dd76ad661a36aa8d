//! Collapse concurrent identical calls into one execution

use crate::serialization::{default_key, truncate_key, KeyFn};
use crate::{CombinatorError, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;

type SharedCall<T> = Shared<BoxFuture<'static, Option<T>>>;

struct InFlight<T> {
    id: u64,
    call: SharedCall<T>,
}

type PendingMap<T> = Arc<Mutex<HashMap<String, InFlight<T>>>>;

/// Deduplicating wrapper around an async function
///
/// While a call for some key is in flight, further calls with the same key
/// await that call instead of starting another one, and all of them receive
/// a clone of its output. The key is released as soon as the call settles,
/// so the next call runs the function again.
///
/// Failures are part of `T` (typically `Result<V, E>` with a cloneable `E`)
/// and reach every waiting caller unchanged. Callers that give up early
/// (a timeout, a dropped task) do not cancel the execution; the key is
/// released when it finishes.
///
/// # Example
///
/// ```rust,ignore
/// use combinators::Dedupe;
///
/// let fetch_user = Dedupe::new(|id: u64| async move { api::user(id).await });
///
/// // One request goes out; both callers get its result
/// let (a, b) = tokio::join!(fetch_user.call(1), fetch_user.call(1));
/// ```
pub struct Dedupe<A, T> {
    func: Arc<dyn Fn(A) -> BoxFuture<'static, T> + Send + Sync>,
    key: KeyFn<A>,
    pending: PendingMap<T>,
    next_id: AtomicU64,
}

impl<A, T> Dedupe<A, T>
where
    A: Serialize + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Dedupe on the stable JSON serialization of the arguments
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self::with_key(func, default_key())
    }
}

impl<A, T> Dedupe<A, T>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn with_key<F, Fut>(func: F, key: KeyFn<A>) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self {
            func: Arc::new(move |args| func(args).boxed()),
            key,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Run the function, or join the in-flight call with the same key
    ///
    /// The execution is spawned on the current runtime and runs to the end
    /// even if every caller stops waiting. Fails if the key cannot be
    /// computed, outside a Tokio runtime, or if the function panicked.
    pub async fn call(&self, args: A) -> Result<T> {
        let key = (self.key)(&args)?;
        let runtime = Handle::try_current()?;

        let call = {
            let mut pending = self.pending.lock();
            match pending.get(&key).map(|in_flight| in_flight.call.clone()) {
                Some(call) => {
                    tracing::trace!("Joining in-flight call for {}", truncate_key(&key, 64));
                    call
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let call = self.start(&runtime, key.clone(), id, args);
                    pending.insert(
                        key,
                        InFlight {
                            id,
                            call: call.clone(),
                        },
                    );
                    call
                }
            }
        };

        call.await.ok_or_else(|| {
            CombinatorError::Dedupe("the shared execution panicked or was aborted".to_string())
        })
    }

    /// Number of distinct keys currently in flight
    pub fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }

    // The execution runs as its own task so it settles and releases the key
    // even when every caller stops waiting. The function is invoked inside
    // that task, outside the pending-map lock.
    fn start(&self, runtime: &Handle, key: String, id: u64, args: A) -> SharedCall<T> {
        let release = Release {
            pending: Arc::clone(&self.pending),
            key,
            id,
        };
        let func = Arc::clone(&self.func);

        let handle = runtime.spawn(async move {
            let _release = release;
            func(args).await
        });

        async move {
            match handle.await {
                Ok(output) => Some(output),
                Err(error) => {
                    tracing::warn!("Deduplicated call did not complete: {}", error);
                    None
                }
            }
        }
        .boxed()
        .shared()
    }
}

/// Removes an in-flight entry once its execution ends, including by panic
struct Release<T> {
    pending: PendingMap<T>,
    key: String,
    id: u64,
}

impl<T> Drop for Release<T> {
    fn drop(&mut self) {
        let mut pending = self.pending.lock();
        // A newer call may already own the key if this entry was replaced.
        if pending.get(&self.key).is_some_and(|entry| entry.id == self.id) {
            pending.remove(&self.key);
        }
    }
}
