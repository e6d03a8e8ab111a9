use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
use command_resilience_window::WindowSnapshot;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[repr(u8)]
pub enum CircuitState {
    /// Calls reach the dependency; outcomes are evaluated against the thresholds.
    Closed = 0,
    /// Calls are short-circuited until the sleep window elapses.
    Open = 1,
    /// A single probe is in flight; every other call is short-circuited.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    /// Stable label used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a circuit breaker and its rolling window.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitMetrics {
    /// Current state of the circuit breaker.
    pub state: CircuitState,
    /// Requests in the rolling window that reached the dependency or its bulkhead.
    pub total_requests: u64,
    /// Failures, timeouts and bulkhead rejections in the rolling window.
    pub error_count: u64,
    /// Error percentage (0 to 100).
    pub error_percentage: f64,
    /// Whether `total_requests` has reached the request volume threshold.
    pub volume_threshold_met: bool,
    /// Time since the last state transition.
    pub time_since_state_change: Duration,
}

/// State machine guarded by the breaker mutex.
#[derive(Debug)]
pub(crate) struct Circuit {
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    last_state_change: Instant,
    opened_at: Option<Instant>,
}

impl Circuit {
    pub(crate) fn new(state_atomic: Arc<AtomicU8>, now: Instant) -> Self {
        state_atomic.store(CircuitState::Closed as u8, Ordering::Release);
        Self {
            state: CircuitState::Closed,
            state_atomic,
            last_state_change: now,
            opened_at: None,
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    /// Returns true once the open circuit has slept long enough to probe.
    pub(crate) fn sleep_window_elapsed(&self, config: &CircuitBreakerConfig, now: Instant) -> bool {
        match self.opened_at {
            Some(opened_at) => now.saturating_duration_since(opened_at) >= config.sleep_window,
            None => true,
        }
    }

    pub(crate) fn metrics(
        &self,
        config: &CircuitBreakerConfig,
        snapshot: &WindowSnapshot,
        now: Instant,
    ) -> CircuitMetrics {
        let total_requests = snapshot.total_requests();
        CircuitMetrics {
            state: self.state,
            total_requests,
            error_count: snapshot.error_count(),
            error_percentage: snapshot.error_percentage(),
            volume_threshold_met: total_requests >= config.request_volume_threshold,
            time_since_state_change: now.saturating_duration_since(self.last_state_change),
        }
    }

    /// Returns true if the window should trip a closed circuit.
    pub(crate) fn should_trip(config: &CircuitBreakerConfig, snapshot: &WindowSnapshot) -> bool {
        let total = snapshot.total_requests();
        total > 0
            && total >= config.request_volume_threshold
            && snapshot.error_percentage() >= config.error_threshold_percentage
    }

    pub(crate) fn transition_to(
        &mut self,
        state: CircuitState,
        config: &CircuitBreakerConfig,
        now: Instant,
    ) {
        if state == CircuitState::Open {
            // Re-opening restarts the sleep window even when already open.
            self.opened_at = Some(now);
        }

        if self.state == state {
            return;
        }

        let from_state = self.state;

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                command_key: config.name.clone(),
                timestamp: now,
                from_state,
                to_state: state,
            });

        #[cfg(feature = "tracing")]
        tracing::info!(
            command = %config.name,
            from = ?from_state,
            to = ?state,
            "Circuit state transition"
        );

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "command" => config.name.to_string(),
                "from" => from_state.as_str(),
                "to" => state.as_str()
            )
            .increment(1);

            gauge!("circuitbreaker_state", "command" => config.name.to_string())
                .set(state as u8 as f64);
        }

        self.state = state;
        self.state_atomic.store(state as u8, Ordering::Release);
        self.last_state_change = now;
        if state == CircuitState::Closed {
            self.opened_at = None;
        }
    }
}
