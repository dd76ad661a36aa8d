//! Behavioural properties of the combinators, driven on paused virtual time

use combinators::{
    run_bounded, run_serial, with_retry_notify, Batch, Debounce, Dedupe, Memoize, RetryPolicy,
    Throttle, ThrottleOptions,
};
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test(start_paused = true)]
async fn debounce_rapid_calls_run_once_with_last_arguments() {
    for n in [1u32, 2, 7, 25] {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let debounced = Debounce::new(move |v: u32| sink.lock().push(v), ms(100), false).unwrap();

        for i in 0..n {
            debounced.call(i);
            sleep(ms(60)).await;
        }
        sleep(ms(200)).await;

        assert_eq!(*calls.lock(), vec![n - 1], "n = {n}");
    }
}

#[tokio::test(start_paused = true)]
async fn throttle_fires_once_per_window_during_burst() {
    let fires: Arc<Mutex<Vec<(Instant, u32)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&fires);
    let throttled = Throttle::new(
        move |v: u32| sink.lock().push((Instant::now(), v)),
        ms(100),
        ThrottleOptions::default(),
    )
    .unwrap();

    let start = Instant::now();
    for i in 0..50 {
        throttled.call(i);
        sleep(ms(10)).await;
    }
    sleep(ms(300)).await;

    let fires = fires.lock();
    assert!(
        (5..=7).contains(&fires.len()),
        "unexpected fire count {}",
        fires.len()
    );

    // Leading edge runs immediately with the first arguments
    assert_eq!(fires[0], (start, 0));
    // Trailing edge delivers the last call of the burst
    assert_eq!(fires[fires.len() - 1].1, 49);

    for pair in fires.windows(2) {
        let gap = pair[1].0 - pair[0].0;
        assert!(gap >= ms(95) && gap <= ms(130), "gap {gap:?} outside window");
    }
}

#[tokio::test(start_paused = true)]
async fn memoize_runs_once_per_serialized_key() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let memo = Memoize::new(move |query: serde_json::Value| {
        counter.fetch_add(1, Ordering::SeqCst);
        query["term"].as_str().map(str::len)
    });

    let first = memo.call(json!({"term": "rust", "page": 1})).unwrap();
    let second = memo.call(json!({"page": 1, "term": "rust"})).unwrap();
    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    memo.call(json!({"term": "rust", "page": 2})).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn dedupe_concurrent_callers_share_one_invocation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let fetch = Dedupe::new(move |id: u64| {
        let counter = Arc::clone(&counter);
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            sleep(ms(50)).await;
            format!("user-{id}-{n}")
        }
    });

    let (a, b, c) = tokio::join!(fetch.call(9), fetch.call(9), fetch.call(9));
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(a, "user-9-0");
    assert_eq!(a, b);
    assert_eq!(b, c);
}

#[tokio::test(start_paused = true)]
async fn retry_recovers_after_two_failures() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let mut retries = Vec::new();

    let policy = RetryPolicy::new(3).with_interval(ms(100));
    let result = with_retry_notify(
        &policy,
        move || {
            let counter = Arc::clone(&counter);
            async move {
                match counter.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err("unavailable".to_string()),
                    _ => Ok("payload"),
                }
            }
        },
        |_: &String, attempt| retries.push(attempt),
    )
    .await;

    assert_eq!(result.unwrap(), "payload");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(retries, vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn serial_preserves_order_and_waits_for_each_task() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let task = |name: &'static str, delay: u64| {
        let log = Arc::clone(&log);
        move || async move {
            log.lock().push(format!("{name} start"));
            sleep(ms(delay)).await;
            log.lock().push(format!("{name} end"));
            Ok::<_, String>(format!("{name}-result"))
        }
    };

    let results = run_serial(vec![task("a", 30), task("b", 20), task("c", 10)])
        .await
        .unwrap();

    assert_eq!(results, vec!["a-result", "b-result", "c-result"]);
    assert_eq!(
        *log.lock(),
        vec!["a start", "a end", "b start", "b end", "c start", "c end"]
    );
}

#[tokio::test(start_paused = true)]
async fn bounded_runner_never_exceeds_limit() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<Box<dyn FnOnce() -> BoxFuture<'static, Result<usize, String>>>> = (0..5usize)
        .map(|i| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            Box::new(move || {
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    sleep(ms(10 * (5 - i as u64))).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, String>(i)
                }
                .boxed()
            }) as Box<dyn FnOnce() -> BoxFuture<'static, Result<usize, String>>>
        })
        .collect();

    let mut results = run_bounded(tasks, 2).await.unwrap();
    results.sort();

    assert_eq!(results, vec![0, 1, 2, 3, 4]);
    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(peak.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn batch_collects_burst_into_one_call() {
    let flushes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&flushes);
    let batch = Batch::new(move |items: Vec<&'static str>| sink.lock().push(items), ms(50)).unwrap();

    batch.push("a");
    sleep(ms(5)).await;
    batch.push("b");
    sleep(ms(5)).await;
    batch.push("c");
    sleep(ms(60)).await;

    assert_eq!(*flushes.lock(), vec![vec!["a", "b", "c"]]);
    assert!(!batch.is_pending());
}
