//! Which primary outcomes route to the fallback.

use super::{FailEvery, executor, fail, succeed};
use command_resilience_core::{Outcome, PrimaryFailure};
use command_resilience_executor::{CommandConfig, CommandError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Runs one call and returns the outcome the fallback saw, if it ran.
async fn fallback_trigger(
    executor: &command_resilience_executor::CommandExecutor,
    key: &str,
    primary: impl FnOnce() -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<&'static str, String>> + Send>>,
) -> Option<Outcome> {
    let seen = Arc::new(Mutex::new(None));
    let s = Arc::clone(&seen);
    let _ = executor
        .execute_with(key.to_string(), primary, move |failure: &PrimaryFailure<String>| {
            *s.lock().unwrap() = Some(failure.outcome());
            async { Ok("fallback") }
        })
        .await;
    let outcome = *seen.lock().unwrap();
    outcome
}

#[tokio::test(start_paused = true)]
async fn runs_exactly_for_failing_outcomes() {
    let executor = executor(
        CommandConfig::builder()
            .execution_timeout(Duration::from_millis(100))
            .bulkhead_capacity(1),
    );

    assert_eq!(
        fallback_trigger(&executor, "success", || Box::pin(succeed())).await,
        None
    );
    assert_eq!(
        fallback_trigger(&executor, "failure", || Box::pin(fail())).await,
        Some(Outcome::Failure)
    );
    assert_eq!(
        fallback_trigger(&executor, "timeout", || {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok("late")
            })
        })
        .await,
        Some(Outcome::Timeout)
    );

    executor.circuit_breaker("open").force_open();
    assert_eq!(
        fallback_trigger(&executor, "open", || Box::pin(succeed())).await,
        Some(Outcome::ShortCircuited)
    );

    let bulkhead = executor.bulkhead("full");
    let _held = bulkhead.try_acquire().unwrap();
    assert_eq!(
        fallback_trigger(&executor, "full", || Box::pin(succeed())).await,
        Some(Outcome::RejectedByBulkhead)
    );
}

#[tokio::test]
async fn fail_every_fifth_call() {
    let executor = executor(CommandConfig::builder());
    let injector = FailEvery::new(5);
    let mut fallbacks = 0;

    for _ in 0..20 {
        let value = executor
            .execute("injected", || injector.call(), || async { Ok("fallback") })
            .await
            .unwrap();
        if value == "fallback" {
            fallbacks += 1;
        }
    }

    assert_eq!(injector.calls(), 20);
    assert_eq!(fallbacks, 4);

    // 20% errors at the volume threshold keeps the circuit closed.
    let metrics = executor.circuit_breaker("injected").metrics(Instant::now());
    assert_eq!(metrics.total_requests, 20);
    assert_eq!(metrics.error_count, 4);
    assert!(metrics.volume_threshold_met);
    assert!(!executor.circuit_breaker("injected").is_open());
}

#[tokio::test]
async fn fallback_failure_keeps_both_errors() {
    let executor = executor(CommandConfig::builder());
    let err = executor
        .execute("k", fail, || async { Err::<&str, _>("stale cache empty".to_string()) })
        .await
        .unwrap_err();

    assert!(err.is_fallback_failed());
    assert_eq!(err.outcome(), Outcome::FallbackFailure);
    let message = err.to_string();
    assert!(message.contains("dependency down"), "{}", message);
    assert!(message.contains("stale cache empty"), "{}", message);

    let (primary, fallback) = err.into_parts();
    assert_eq!(primary.into_inner(), Some("dependency down".to_string()));
    assert_eq!(fallback, Some("stale cache empty".to_string()));
}

#[tokio::test]
async fn disabled_fallback_returns_primary_failure() {
    let executor = executor(CommandConfig::builder().fallback_enabled(false));
    let err = executor
        .execute("k", fail, || async { Ok("never") })
        .await
        .unwrap_err();

    match err {
        CommandError::FallbackDisabled { primary } => assert!(primary.is_failure()),
        other => panic!("unexpected error: {:?}", other),
    }

    let snapshot = executor
        .registry()
        .get("k")
        .unwrap()
        .window()
        .snapshot(Instant::now());
    assert_eq!(snapshot.count(Outcome::FallbackSuccess), 0);
    assert_eq!(snapshot.count(Outcome::FallbackFailure), 0);
}
