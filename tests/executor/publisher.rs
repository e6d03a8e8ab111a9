//! Health snapshots of commands driven through the executor.

use super::{executor, fail, fallback, succeed};
use command_resilience_circuitbreaker::CircuitState;
use command_resilience_core::Outcome;
use command_resilience_executor::CommandConfig;
use command_resilience_metrics::{BroadcastSink, LatestSnapshots, MetricsPublisher, NdjsonSink};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A writer that blocks its thread for 300 ms on every write.
struct SlowWriter;

impl Write for SlowWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        std::thread::sleep(Duration::from_millis(300));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn snapshots_follow_the_circuit() {
    let executor = executor(CommandConfig::builder().request_volume_threshold(2));
    let latest = LatestSnapshots::new();
    let publisher = MetricsPublisher::new(Arc::clone(executor.registry()), Duration::from_secs(1))
        .with_sink(latest.clone());

    executor.execute("orders", succeed, fallback).await.unwrap();
    publisher.publish_now();
    let healthy = latest.get("orders").unwrap();
    assert_eq!(healthy.state, CircuitState::Closed);
    assert_eq!(healthy.total_requests, 1);
    assert!(!healthy.volume_threshold_met);

    // 1 of 2 failed trips the circuit; the next two calls are short-circuited.
    let _ = executor.execute("orders", fail, fallback).await;
    for _ in 0..2 {
        let _ = executor.execute("orders", succeed, fallback).await;
    }
    publisher.publish_now();

    let open = latest.get("orders").unwrap();
    assert_eq!(open.state, CircuitState::Open);
    assert_eq!(open.count(Outcome::ShortCircuited), 2);
    assert_eq!(open.count(Outcome::FallbackSuccess), 3);
    assert_eq!(open.total_requests, 2);
    assert_eq!(open.error_count, 1);
    assert!(open.volume_threshold_met);
}

#[tokio::test(start_paused = true)]
async fn publisher_streams_every_interval() {
    let executor = executor(CommandConfig::builder());
    executor.execute("a", succeed, fallback).await.unwrap();
    executor.execute("b", succeed, fallback).await.unwrap();

    let stream = BroadcastSink::new(64);
    let mut rx = stream.subscribe();
    let running = MetricsPublisher::new(Arc::clone(executor.registry()), Duration::from_millis(500))
        .with_sink(stream)
        .start();

    let mut keys = Vec::new();
    for _ in 0..6 {
        keys.push(rx.recv().await.unwrap().command_key.to_string());
    }
    running.stop();

    assert_eq!(keys, vec!["a", "b", "a", "b", "a", "b"]);
}

#[tokio::test]
async fn ndjson_lines_parse_back() {
    let executor = executor(CommandConfig::builder());
    let _ = executor.execute("search", fail, fallback).await;

    let sink = Arc::new(NdjsonSink::new(Vec::new()));
    MetricsPublisher::new(Arc::clone(executor.registry()), Duration::from_secs(1))
        .with_sink(Arc::clone(&sink))
        .publish_now();

    let sink = Arc::into_inner(sink).unwrap();
    let output = String::from_utf8(sink.into_inner()).unwrap();
    let record: serde_json::Value = serde_json::from_str(output.trim_end()).unwrap();

    assert_eq!(record["command_key"], "search");
    assert_eq!(record["state"], "CLOSED");
    assert_eq!(record["counts"]["failure"], 1);
    assert_eq!(record["counts"]["fallback_success"], 1);
    assert_eq!(record["error_percentage"], 100.0);
    assert!(record["window_end_ms"].as_u64().unwrap() >= record["window_start_ms"].as_u64().unwrap());
}

#[tokio::test]
async fn registered_commands_appear_before_their_first_call() {
    let executor = executor(CommandConfig::builder());
    executor.register(
        "orders",
        CommandConfig::builder().bulkhead_capacity(4).build().unwrap(),
    );
    executor.execute("search", succeed, fallback).await.unwrap();

    let snapshots = MetricsPublisher::new(Arc::clone(executor.registry()), Duration::from_secs(1))
        .publish_now();

    let keys: Vec<_> = snapshots.iter().map(|s| s.command_key.to_string()).collect();
    assert_eq!(keys, vec!["orders", "search"]);

    let orders = &snapshots[0];
    assert_eq!(orders.state, CircuitState::Closed);
    assert_eq!(orders.total_requests, 0);
    assert_eq!(orders.bulkhead_capacity, 4);
    assert_eq!(executor.bulkhead("orders").max_concurrent_calls(), 4);
}

// Current-thread runtime: a sink writing on the runtime thread would stall
// every call on it.
#[tokio::test]
async fn slow_sink_does_not_delay_live_calls() {
    let executor = executor(CommandConfig::builder());
    executor.execute("warm", succeed, fallback).await.unwrap();

    let running = MetricsPublisher::new(Arc::clone(executor.registry()), Duration::from_millis(50))
        .with_sink(NdjsonSink::new(SlowWriter))
        .start();
    tokio::time::sleep(Duration::from_millis(120)).await;

    let started = Instant::now();
    let value = executor
        .execute(
            "k",
            || async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok::<_, String>(1)
            },
            || async { Ok(0) },
        )
        .await;
    let elapsed = started.elapsed();
    running.stop();

    assert_eq!(value, Ok(1));
    assert!(elapsed < Duration::from_millis(250), "call took {:?}", elapsed);
}
