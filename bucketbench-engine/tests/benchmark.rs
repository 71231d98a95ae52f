//! Behavior tests for the benchmark engine, driven through the
//! in-memory store.

use std::sync::Arc;
use std::time::Duration;

use bucketbench_engine::{Benchmark, EngineError};
use bucketbench_storage::InMemoryStore;

/// The canonical scenario: keys `[a, b, c]` with two workers. Slots
/// alternate `[a -> 0, b -> 1, c -> 0, a -> 1, ...]`, and the consumer
/// draining in slot order sees the keys in listing order.
#[tokio::test]
async fn delivers_keys_in_listing_order() {
    let store = Arc::new(InMemoryStore::new("scenario"));
    store.insert("a", &[1; 10]);
    store.insert("b", &[2; 20]);
    store.insert("c", &[3; 30]);

    let mut bench = Benchmark::start(store, 2).await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..7 {
        seen.push(bench.next_object().await.name);
    }
    assert_eq!(seen, ["a", "b", "c", "a", "b", "c", "a"]);

    bench.stop();
    let report = bench.collect_report().await;

    // Collection was never enabled.
    assert_eq!(report.files_downloaded, 0);
    assert_eq!(report.bytes_downloaded, 0);
    assert_eq!(report.files_consumed, 0);
    assert!(report.first_byte_latencies.is_empty());
}

/// A slow object ahead of a fast one: the fast download completes
/// first, but delivery still follows assignment order.
#[tokio::test(start_paused = true)]
async fn in_order_delivery_with_out_of_order_completion() {
    let store = Arc::new(InMemoryStore::new("ordering"));
    store.insert_with_delay("slow", &[0; 64], Duration::from_millis(250));
    store.insert("fast", &[0; 64]);

    let mut bench = Benchmark::start(store, 2).await.unwrap();

    assert_eq!(bench.next_object().await.name, "slow");
    assert_eq!(bench.next_object().await.name, "fast");
    assert_eq!(bench.next_object().await.name, "slow");

    bench.stop();
    bench.collect_report().await;
}

/// With a population of size K, a run longer than one full cycle
/// observes every key at least twice, restarting from the first key.
#[tokio::test]
async fn replays_population_cyclically() {
    let keys = ["k0", "k1", "k2", "k3", "k4"];
    let store = Arc::new(InMemoryStore::new("replay"));
    for key in keys {
        store.insert(key, &[0; 8]);
    }

    let mut bench = Benchmark::start(store, 3).await.unwrap();

    for cycle in 0..2 {
        for key in keys {
            assert_eq!(bench.next_object().await.name, key, "cycle {cycle}");
        }
    }

    bench.stop();
    bench.collect_report().await;
}

#[tokio::test]
async fn zero_size_objects_have_no_latency_sample() {
    let store = Arc::new(InMemoryStore::new("zeros"));
    store.insert("empty", &[]);

    let mut bench = Benchmark::start(store, 1).await.unwrap();
    bench.set_metrics_enabled(true);

    for _ in 0..4 {
        assert_eq!(bench.next_object().await.size, 0);
    }

    bench.stop();
    let report = bench.collect_report().await;

    assert!(report.first_byte_latencies.is_empty());
    assert!(report.files_downloaded >= 1);
    assert_eq!(report.bytes_downloaded, 0);
    assert_eq!(report.files_consumed, 4);
    assert_eq!(report.bytes_consumed, 0);
}

#[tokio::test]
async fn collects_latency_samples_for_non_empty_objects() {
    let store = Arc::new(InMemoryStore::new("sampling"));
    store.insert("payload", &[5; 1000]);

    let mut bench = Benchmark::start(store, 1).await.unwrap();
    bench.set_metrics_enabled(true);

    for _ in 0..5 {
        assert_eq!(bench.next_object().await.size, 1000);
    }

    bench.stop();
    let report = bench.collect_report().await;

    assert!(!report.first_byte_latencies.is_empty());
    assert!(report.files_downloaded >= 1);
    assert!(report.bytes_downloaded >= 1000);
    assert_eq!(report.files_consumed, 5);
    assert_eq!(report.bytes_consumed, 5000);
}

/// Disabling collection mid-run freezes all counters while downloads
/// and handoffs continue.
#[tokio::test]
async fn disabling_collection_freezes_counters() {
    let store = Arc::new(InMemoryStore::new("toggle"));
    store.insert("x", &[9; 100]);

    let mut bench = Benchmark::start(store, 1).await.unwrap();
    assert!(!bench.metrics_enabled());

    bench.set_metrics_enabled(true);
    for _ in 0..3 {
        bench.next_object().await;
    }
    bench.set_metrics_enabled(false);

    // Data transfer continues regardless of the toggle.
    for _ in 0..5 {
        assert_eq!(bench.next_object().await.size, 100);
    }

    bench.stop();
    let report = bench.collect_report().await;

    assert_eq!(report.files_consumed, 3);
    assert_eq!(report.bytes_consumed, 300);
    assert!(report.files_downloaded <= 5);
}

/// The aggregation barrier only resolves once shutdown has been
/// requested; collecting a running benchmark blocks.
#[tokio::test(start_paused = true)]
async fn collect_report_blocks_until_stopped() {
    let store = Arc::new(InMemoryStore::new("barrier"));
    store.insert("a", &[1; 10]);

    let bench = Benchmark::start(store, 2).await.unwrap();

    let collect = tokio::time::timeout(Duration::from_secs(5), bench.collect_report());
    assert!(collect.await.is_err(), "report must not resolve before stop");
}

/// A worker that dies on its fatal path still reports its tallies, so
/// the aggregation barrier completes with one report per worker.
#[tokio::test(start_paused = true)]
async fn dead_worker_still_reports_tallies() {
    let store = Arc::new(InMemoryStore::new("degraded"));
    store.insert("good", &[7; 16]);
    store.insert("bad", &[0; 16]);
    store.poison("bad");

    let mut bench = Benchmark::start(store, 2).await.unwrap();
    bench.set_metrics_enabled(true);

    assert_eq!(bench.next_object().await.name, "good");

    bench.stop();
    let report = tokio::time::timeout(Duration::from_secs(5), bench.collect_report())
        .await
        .expect("report must complete despite the dead worker");
    assert_eq!(report.files_consumed, 1);
}

/// Shutdown terminates the feeder and all workers; collecting the
/// report joins every task within the timeout.
#[tokio::test(start_paused = true)]
async fn stop_terminates_feeder_and_workers() {
    let store = Arc::new(InMemoryStore::new("shutdown"));
    store.insert("a", &[1; 32]);
    store.insert("b", &[2; 32]);

    let mut bench = Benchmark::start(store, 3).await.unwrap();
    for _ in 0..4 {
        bench.next_object().await;
    }

    bench.stop();
    bench.stop(); // idempotent
    assert!(bench.is_stopped());

    tokio::time::timeout(Duration::from_secs(5), bench.collect_report())
        .await
        .expect("all tasks must exit after stop");
}

#[tokio::test]
async fn rejects_zero_concurrency() {
    let store = Arc::new(InMemoryStore::new("invalid"));
    store.insert("a", &[1]);

    let result = Benchmark::start(store, 0).await;
    assert!(matches!(result, Err(EngineError::InvalidConcurrency)));
}

#[tokio::test]
async fn rejects_empty_bucket() {
    let store = Arc::new(InMemoryStore::new("empty"));

    let result = Benchmark::start(store, 1).await;
    assert!(matches!(result, Err(EngineError::EmptyBucket { .. })));
}

#[tokio::test]
async fn listing_failure_is_fatal() {
    let store = Arc::new(InMemoryStore::new("unlistable"));
    store.insert("a", &[1]);
    store.break_listing();

    let result = Benchmark::start(store, 1).await;
    assert!(matches!(result, Err(EngineError::List { .. })));
}
