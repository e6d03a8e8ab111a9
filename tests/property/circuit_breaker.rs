//! Property tests for the circuit breaker.
//!
//! Invariants tested:
//! - Opens at the first call where volume and error rate both reach threshold
//! - Never opens before that point
//! - Short-circuits every call once open

use command_resilience_circuitbreaker::{
    CallPermission, CircuitBreaker, CircuitBreakerConfig, CircuitState,
};
use command_resilience_core::Outcome;
use command_resilience_window::RollingWindow;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: the breaker trips exactly where the model says it should
    #[test]
    fn trips_at_first_qualifying_call(
        volume in 1u64..=20,
        threshold in 1.0f64..=100.0,
        calls in prop::collection::vec(any::<bool>(), 1..80),
    ) {
        let now = Instant::now();
        let window = Arc::new(RollingWindow::starting_at(Duration::from_secs(10), 10, now));
        let breaker = CircuitBreaker::new(
            CircuitBreakerConfig::builder()
                .request_volume_threshold(volume)
                .error_threshold_percentage(threshold)
                .sleep_window(Duration::from_secs(60))
                .build(),
            Arc::clone(&window),
        );

        let (mut total, mut errors) = (0u64, 0u64);
        let mut open = false;

        for failed in calls {
            let permission = breaker.allow(now);
            if open {
                prop_assert_eq!(permission, CallPermission::ShortCircuit);
                window.record(Outcome::ShortCircuited, now);
                continue;
            }
            prop_assert_eq!(permission, CallPermission::Pass);

            let outcome = if failed { Outcome::Failure } else { Outcome::Success };
            window.record(outcome, now);
            breaker.on_outcome(outcome, permission, now);

            total += 1;
            errors += u64::from(failed);
            let pct = errors as f64 / total as f64 * 100.0;
            open = total >= volume && pct >= threshold;

            let expected = if open { CircuitState::Open } else { CircuitState::Closed };
            prop_assert_eq!(breaker.state(), expected);
        }
    }

    /// Property: a probe decides the next state on its own
    #[test]
    fn probe_outcome_decides_state(probe_succeeds in any::<bool>(), extra in 0u64..5_000) {
        let start = Instant::now();
        let window = Arc::new(RollingWindow::starting_at(Duration::from_secs(10), 10, start));
        let breaker = CircuitBreaker::new(
            CircuitBreakerConfig::builder()
                .sleep_window(Duration::from_secs(5))
                .build(),
            window,
        );
        breaker.force_open();

        let later = Instant::now() + Duration::from_secs(5) + Duration::from_millis(extra);
        let permission = breaker.allow(later);
        prop_assert_eq!(permission, CallPermission::Probe);
        prop_assert_eq!(breaker.state(), CircuitState::HalfOpen);
        prop_assert_eq!(breaker.allow(later), CallPermission::ShortCircuit);

        let outcome = if probe_succeeds { Outcome::Success } else { Outcome::Failure };
        breaker.window().record(outcome, later);
        breaker.on_outcome(outcome, permission, later);

        let expected = if probe_succeeds { CircuitState::Closed } else { CircuitState::Open };
        prop_assert_eq!(breaker.state(), expected);
    }
}
