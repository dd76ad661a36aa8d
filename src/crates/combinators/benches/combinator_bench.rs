use combinators::serialization::to_stable_json;
use combinators::{Dedupe, Memoize};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

fn stable_key_benchmark(c: &mut Criterion) {
    let args = json!({
        "query": "tokio timers",
        "filters": {"lang": "rust", "year": 2024, "tags": ["async", "time"]},
        "page": 3,
    });

    c.bench_function("stable json key", |b| {
        b.iter(|| to_stable_json(black_box(&args)).unwrap());
    });
}

fn memoize_hit_benchmark(c: &mut Criterion) {
    let memo = Memoize::new(|(a, b): (u64, u64)| a.pow(2) + b);
    memo.call((12, 7)).unwrap();

    c.bench_function("memoize hit", |b| {
        b.iter(|| memo.call(black_box((12, 7))).unwrap());
    });
}

fn dedupe_call_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let fetch = Dedupe::new(|id: u64| async move { id * 2 });

    c.bench_function("dedupe call", |b| {
        b.iter(|| runtime.block_on(fetch.call(black_box(21))).unwrap());
    });
}

criterion_group!(
    benches,
    stable_key_benchmark,
    memoize_hit_benchmark,
    dedupe_call_benchmark
);
criterion_main!(benches);
