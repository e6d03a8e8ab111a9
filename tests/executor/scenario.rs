//! The full breaker cycle as seen by a caller.

use super::{executor, fail, fallback, succeed};
use command_resilience_circuitbreaker::CircuitState;
use command_resilience_executor::{CommandConfig, Outcome};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn opens_short_circuits_probes_and_closes() {
    let executor = executor(
        CommandConfig::builder()
            .request_volume_threshold(5)
            .error_threshold_percentage(50.0)
            .rolling_window(Duration::from_secs(10))
            .num_buckets(10)
            .sleep_window(Duration::from_secs(5)),
    );
    let breaker = executor.circuit_breaker("catalog");

    for _ in 0..3 {
        let value = executor.execute("catalog", succeed, fallback).await.unwrap();
        assert_eq!(value, "primary");
    }
    for _ in 0..2 {
        let value = executor.execute("catalog", fail, fallback).await.unwrap();
        assert_eq!(value, "fallback");
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    // 3 of 6 failed: 50% at a volume of 6.
    let value = executor.execute("catalog", fail, fallback).await.unwrap();
    assert_eq!(value, "fallback");
    assert_eq!(breaker.state(), CircuitState::Open);

    let primary_runs = Arc::new(AtomicUsize::new(0));
    let counted = {
        let runs = Arc::clone(&primary_runs);
        move || {
            runs.fetch_add(1, Ordering::SeqCst);
            succeed()
        }
    };

    let value = executor
        .execute("catalog", counted.clone(), fallback)
        .await
        .unwrap();
    assert_eq!(value, "fallback");
    assert_eq!(primary_runs.load(Ordering::SeqCst), 0);

    let snapshot = executor
        .registry()
        .get("catalog")
        .unwrap()
        .window()
        .snapshot(Instant::now());
    assert_eq!(snapshot.count(Outcome::ShortCircuited), 1);
    assert_eq!(snapshot.count(Outcome::FallbackSuccess), 4);

    tokio::time::advance(Duration::from_secs(5)).await;

    let value = executor.execute("catalog", counted, fallback).await.unwrap();
    assert_eq!(value, "primary");
    assert_eq!(primary_runs.load(Ordering::SeqCst), 1);
    assert_eq!(breaker.state(), CircuitState::Closed);

    // Closing discards the pre-recovery errors.
    let metrics = breaker.metrics(Instant::now());
    assert_eq!(metrics.error_count, 0);
}
