//! Task runners: bounded concurrency and strict sequencing
//!
//! Tasks are zero-argument thunks returning a future, so nothing starts
//! until the runner decides to invoke it. All futures are polled inside the
//! caller's task; nothing is spawned.

use crate::config::CombinatorConfig;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;

fn effective_limit(limit: usize) -> usize {
    if limit == 0 {
        tracing::warn!("Concurrency limit of 0 requested; running one task at a time");
        1
    } else {
        limit
    }
}

/// Run tasks with at most `limit` in flight, collecting results in
/// completion order
///
/// The first error aborts the run: it is returned immediately and the
/// futures still in flight are dropped. A `limit` of 0 is treated as 1.
///
/// ```rust,ignore
/// use combinators::run_bounded;
///
/// let tasks = urls.into_iter().map(|url| move || fetch(url));
/// let pages = run_bounded(tasks, 5).await?;
/// ```
pub async fn run_bounded<I, F, Fut, T, E>(tasks: I, limit: usize) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let limit = effective_limit(limit);
    tracing::debug!("Running tasks with concurrency limit {}", limit);

    stream::iter(tasks)
        .map(|task| task())
        .buffer_unordered(limit)
        .try_collect()
        .await
}

/// [`run_bounded`] with the configured `concurrency_limit`
pub async fn run_bounded_from_config<I, F, Fut, T, E>(
    config: &CombinatorConfig,
    tasks: I,
) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    run_bounded(tasks, config.concurrency_limit).await
}

/// Like [`run_bounded`], but results follow submission order
pub async fn run_bounded_ordered<I, F, Fut, T, E>(tasks: I, limit: usize) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let limit = effective_limit(limit);

    stream::iter(tasks)
        .map(|task| task())
        .buffered(limit)
        .try_collect()
        .await
}

/// Run tasks one after another
///
/// Each task is invoked only after the previous one succeeded; the first
/// error stops the run and the remaining tasks are never invoked.
pub async fn run_serial<I, F, Fut, T, E>(tasks: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let tasks = tasks.into_iter();
    let mut results = Vec::with_capacity(tasks.size_hint().0);

    for (index, task) in tasks.enumerate() {
        match task().await {
            Ok(result) => results.push(result),
            Err(error) => {
                tracing::debug!("Serial run stopped at task {}", index);
                return Err(error);
            }
        }
    }

    Ok(results)
}
