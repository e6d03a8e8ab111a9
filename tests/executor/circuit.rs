//! Circuit breaker behaviour through the executor.

use super::{executor, fail, fallback, succeed};
use command_resilience_circuitbreaker::CircuitState;
use command_resilience_core::PrimaryFailure;
use command_resilience_executor::CommandConfig;
use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn tripping_config() -> command_resilience_executor::CommandConfigBuilder {
    CommandConfig::builder()
        .request_volume_threshold(4)
        .error_threshold_percentage(50.0)
        .sleep_window(Duration::from_secs(5))
}

#[tokio::test]
async fn stays_closed_below_volume_threshold() {
    let executor = executor(tripping_config());
    for _ in 0..3 {
        let _ = executor.execute("k", fail, fallback).await;
    }
    assert_eq!(executor.circuit_breaker("k").state(), CircuitState::Closed);

    let _ = executor.execute("k", fail, fallback).await;
    assert_eq!(executor.circuit_breaker("k").state(), CircuitState::Open);
}

#[tokio::test]
async fn stays_closed_below_error_threshold() {
    let executor = executor(tripping_config());
    for _ in 0..3 {
        executor.execute("k", succeed, fallback).await.unwrap();
    }
    for _ in 0..2 {
        let _ = executor.execute("k", fail, fallback).await;
    }
    // 2 of 5 failed.
    assert_eq!(executor.circuit_breaker("k").state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn no_primary_runs_while_open_under_burst() {
    let executor = executor(tripping_config());
    for _ in 0..4 {
        let _ = executor.execute("k", fail, fallback).await;
    }
    assert_eq!(executor.circuit_breaker("k").state(), CircuitState::Open);

    let runs = Arc::new(AtomicUsize::new(0));
    let burst = (0..50).map(|_| {
        let executor = executor.clone();
        let runs = Arc::clone(&runs);
        tokio::spawn(async move {
            executor
                .execute(
                    "k",
                    move || {
                        runs.fetch_add(1, Ordering::SeqCst);
                        succeed()
                    },
                    fallback,
                )
                .await
        })
    });

    for result in join_all(burst).await {
        assert_eq!(result.unwrap().unwrap(), "fallback");
    }
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn exactly_one_probe_per_half_open_episode() {
    let executor = executor(tripping_config());
    for _ in 0..4 {
        let _ = executor.execute("k", fail, fallback).await;
    }
    tokio::time::advance(Duration::from_secs(5)).await;

    let runs = Arc::new(AtomicUsize::new(0));
    let burst = (0..20).map(|_| {
        let executor = executor.clone();
        let runs = Arc::clone(&runs);
        async move {
            executor
                .execute(
                    "k",
                    move || async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok::<_, String>("primary")
                    },
                    fallback,
                )
                .await
                .unwrap()
        }
    });

    let results = join_all(burst).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(results.iter().filter(|r| *r == &"primary").count(), 1);
    assert_eq!(results.iter().filter(|r| *r == &"fallback").count(), 19);
    assert_eq!(executor.circuit_breaker("k").state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn failed_probe_reopens_and_restarts_sleep_window() {
    let executor = executor(tripping_config());
    for _ in 0..4 {
        let _ = executor.execute("k", fail, fallback).await;
    }
    let breaker = executor.circuit_breaker("k");

    tokio::time::advance(Duration::from_secs(5)).await;
    let _ = executor.execute("k", fail, fallback).await;
    assert_eq!(breaker.state(), CircuitState::Open);

    // The new sleep window counts from the failed probe.
    tokio::time::advance(Duration::from_millis(4900)).await;
    let err = executor
        .execute("k", succeed, || async { Err::<&str, _>("no fallback".to_string()) })
        .await
        .unwrap_err();
    assert!(err.primary().is_short_circuited());

    tokio::time::advance(Duration::from_millis(100)).await;
    assert_eq!(executor.execute("k", succeed, fallback).await.unwrap(), "primary");
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn timed_out_probe_reopens() {
    let executor = executor(tripping_config().execution_timeout(Duration::from_millis(200)));
    for _ in 0..4 {
        let _ = executor.execute("k", fail, fallback).await;
    }
    tokio::time::advance(Duration::from_secs(5)).await;

    let value = executor
        .execute(
            "k",
            || async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, String>("late")
            },
            fallback,
        )
        .await
        .unwrap();

    assert_eq!(value, "fallback");
    assert_eq!(executor.circuit_breaker("k").state(), CircuitState::Open);
}

#[tokio::test]
async fn disabled_breaker_never_short_circuits() {
    let executor = executor(tripping_config().circuit_breaker_enabled(false));
    for _ in 0..20 {
        let _ = executor.execute("k", fail, fallback).await;
    }
    let breaker = executor.circuit_breaker("k");
    assert_eq!(breaker.state(), CircuitState::Closed);

    breaker.force_open();
    assert_eq!(executor.execute("k", succeed, fallback).await.unwrap(), "primary");
}

#[tokio::test]
async fn forced_open_circuit_is_seen_by_fallback() {
    let executor = executor(tripping_config());
    executor.circuit_breaker("k").force_open();

    let value = executor
        .execute_with("k", succeed, |failure: &PrimaryFailure<String>| {
            let short_circuited = failure.is_short_circuited();
            async move {
                Ok(if short_circuited {
                    "short-circuited"
                } else {
                    "other"
                })
            }
        })
        .await
        .unwrap();
    assert_eq!(value, "short-circuited");

    executor.circuit_breaker("k").force_closed();
    assert_eq!(executor.execute("k", succeed, fallback).await.unwrap(), "primary");
}

#[tokio::test]
async fn keys_have_independent_circuits() {
    let executor = executor(tripping_config());
    for _ in 0..4 {
        let _ = executor.execute("flaky", fail, fallback).await;
    }
    assert!(executor.circuit_breaker("flaky").is_open());
    assert_eq!(executor.execute("healthy", succeed, fallback).await.unwrap(), "primary");
    assert_eq!(
        executor.circuit_breaker("healthy").state(),
        CircuitState::Closed
    );
}
