//! Error-percentage circuit breaker for commands.
//!
//! The breaker reads its decisions from a shared [`RollingWindow`]: the
//! executor records every primary outcome into the window, then reports it
//! to the breaker, which trips when both the request volume and the error
//! percentage within the window reach their thresholds.
//!
//! ## States
//! - **Closed**: calls pass; each reported outcome re-evaluates the window
//! - **Open**: calls are short-circuited until the sleep window elapses
//! - **Half-Open**: exactly one probe call is in flight; all others are
//!   short-circuited. A successful probe closes the circuit and clears the
//!   window, any other error reopens it and restarts the sleep window.
//!
//! There is no terminal state; the probe cycle lets the breaker heal itself.
//!
//! ## Usage
//!
//! ```rust
//! use command_resilience_circuitbreaker::{CallPermission, CircuitBreaker, CircuitBreakerConfig, CircuitState};
//! use command_resilience_core::Outcome;
//! use command_resilience_window::RollingWindow;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio::time::Instant;
//!
//! let start = Instant::now();
//! let window = Arc::new(RollingWindow::starting_at(Duration::from_secs(10), 10, start));
//! let breaker = CircuitBreaker::new(
//!     CircuitBreakerConfig::builder()
//!         .name("payments")
//!         .request_volume_threshold(2)
//!         .error_threshold_percentage(50.0)
//!         .build(),
//!     Arc::clone(&window),
//! );
//!
//! for _ in 0..2 {
//!     let permission = breaker.allow(start);
//!     window.record(Outcome::Failure, start);
//!     breaker.on_outcome(Outcome::Failure, permission, start);
//! }
//!
//! assert_eq!(breaker.state_sync(), CircuitState::Open);
//! assert_eq!(breaker.allow(start), CallPermission::ShortCircuit);
//!
//! // After the sleep window one probe is admitted.
//! let later = start + Duration::from_secs(5);
//! assert_eq!(breaker.allow(later), CallPermission::Probe);
//! assert_eq!(breaker.allow(later), CallPermission::ShortCircuit);
//! ```
//!
//! ## Event Listeners
//!
//! ```rust
//! use command_resilience_circuitbreaker::CircuitBreakerConfig;
//!
//! let config = CircuitBreakerConfig::builder()
//!     .name("payments")
//!     .on_state_transition(|from, to| println!("{} -> {}", from, to))
//!     .on_call_rejected(|state| println!("short-circuited while {}", state))
//!     .build();
//! # let _ = config;
//! ```
//!
//! Listeners run while the breaker lock is held. They may read
//! [`CircuitBreaker::state_sync`] but must not call the locking accessors.
//!
//! ## Feature Flags
//! - `tracing`: state transitions at `info`, rejections at `debug`, permits at `trace`
//! - `metrics`: `circuitbreaker_transitions_total` and `circuitbreaker_state`
//! - `serde`: `Serialize` for [`CircuitState`]

use command_resilience_core::{CommandKey, Outcome};
use command_resilience_window::RollingWindow;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

pub use circuit::{CircuitMetrics, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use events::CircuitBreakerEvent;

mod circuit;
mod config;
mod events;

use circuit::Circuit;

/// Verdict returned by [`CircuitBreaker::allow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPermission {
    /// The circuit is closed; run the primary action.
    Pass,
    /// The circuit is open or a probe is already in flight; skip the primary.
    ShortCircuit,
    /// This call is the single half-open probe. Its outcome decides the circuit.
    Probe,
}

impl CallPermission {
    /// Returns true if the primary action may run.
    pub fn is_permitted(self) -> bool {
        !matches!(self, CallPermission::ShortCircuit)
    }
}

/// Per-command circuit breaker.
///
/// All state changes happen under one short, non-async lock, so concurrent
/// callers can never both take the half-open probe.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: Arc<CircuitBreakerConfig>,
    window: Arc<RollingWindow>,
    circuit: Mutex<Circuit>,
    state_atomic: Arc<AtomicU8>,
}

impl CircuitBreaker {
    /// Creates a closed breaker evaluating `window`.
    pub fn new(config: CircuitBreakerConfig, window: Arc<RollingWindow>) -> Self {
        let state_atomic = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        let circuit = Circuit::new(Arc::clone(&state_atomic), Instant::now());
        Self {
            config: Arc::new(config),
            window,
            circuit: Mutex::new(circuit),
            state_atomic,
        }
    }

    /// The command this breaker guards.
    pub fn command_key(&self) -> &CommandKey {
        &self.config.name
    }

    /// The breaker's configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// The rolling window the breaker evaluates.
    pub fn window(&self) -> &Arc<RollingWindow> {
        &self.window
    }

    /// Decides whether a call may run at `now`.
    ///
    /// An open circuit whose sleep window has elapsed moves to half-open here
    /// and hands out the single probe slot.
    pub fn allow(&self, now: Instant) -> CallPermission {
        if !self.config.enabled {
            return CallPermission::Pass;
        }

        let config = &*self.config;
        let mut circuit = self.circuit.lock();

        match circuit.state() {
            CircuitState::Closed => {
                config.event_listeners.emit(&CircuitBreakerEvent::CallPermitted {
                    command_key: config.name.clone(),
                    timestamp: now,
                    state: CircuitState::Closed,
                });

                #[cfg(feature = "tracing")]
                tracing::trace!(command = %config.name, "Call permitted");

                CallPermission::Pass
            }
            CircuitState::Open if circuit.sleep_window_elapsed(config, now) => {
                circuit.transition_to(CircuitState::HalfOpen, config, now);
                config.event_listeners.emit(&CircuitBreakerEvent::ProbePermitted {
                    command_key: config.name.clone(),
                    timestamp: now,
                });

                #[cfg(feature = "tracing")]
                tracing::debug!(command = %config.name, "Half-open probe permitted");

                CallPermission::Probe
            }
            state => {
                config.event_listeners.emit(&CircuitBreakerEvent::CallRejected {
                    command_key: config.name.clone(),
                    timestamp: now,
                    state,
                });

                #[cfg(feature = "tracing")]
                tracing::debug!(command = %config.name, state = ?state, "Call short-circuited");

                CallPermission::ShortCircuit
            }
        }
    }

    /// Reports the primary outcome of a call admitted with `permission`.
    ///
    /// The outcome must already be recorded in the window.
    pub fn on_outcome(&self, outcome: Outcome, permission: CallPermission, now: Instant) {
        if !self.config.enabled {
            return;
        }

        let config = &*self.config;
        let mut circuit = self.circuit.lock();

        config.event_listeners.emit(&CircuitBreakerEvent::OutcomeRecorded {
            command_key: config.name.clone(),
            timestamp: now,
            outcome,
            state: circuit.state(),
        });

        match permission {
            CallPermission::ShortCircuit => {}
            CallPermission::Probe if circuit.state() == CircuitState::HalfOpen => {
                if outcome == Outcome::Success {
                    circuit.transition_to(CircuitState::Closed, config, now);
                    self.window.reset(now);
                } else if outcome.is_error() {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(command = %config.name, outcome = %outcome, "Probe failed, reopening circuit");

                    circuit.transition_to(CircuitState::Open, config, now);
                }
            }
            // A probe whose circuit was overridden in the meantime is
            // treated like a normal closed-state call.
            CallPermission::Pass | CallPermission::Probe => {
                if circuit.state() == CircuitState::Closed
                    && Circuit::should_trip(config, &self.window.snapshot(now))
                {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(command = %config.name, "Error threshold reached, opening circuit");

                    circuit.transition_to(CircuitState::Open, config, now);
                }
            }
        }
    }

    /// Releases a probe whose caller went away before an outcome was known.
    ///
    /// The circuit reopens so it cannot stay half-open forever.
    pub fn abandon_probe(&self, now: Instant) {
        let mut circuit = self.circuit.lock();
        if circuit.state() == CircuitState::HalfOpen {
            #[cfg(feature = "tracing")]
            tracing::debug!(command = %self.config.name, "Probe abandoned, reopening circuit");

            circuit.transition_to(CircuitState::Open, &self.config, now);
        }
    }

    /// Returns the current state, taking the breaker lock.
    pub fn state(&self) -> CircuitState {
        self.circuit.lock().state()
    }

    /// Returns the current state without taking the breaker lock.
    ///
    /// May briefly lag a transition that is in progress on another thread.
    pub fn state_sync(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(Ordering::Acquire))
    }

    /// Returns true if the circuit is currently open.
    pub fn is_open(&self) -> bool {
        self.state_sync() == CircuitState::Open
    }

    /// Returns a consistent view of the state and the window at `now`.
    pub fn metrics(&self, now: Instant) -> CircuitMetrics {
        let circuit = self.circuit.lock();
        let snapshot = self.window.snapshot(now);
        circuit.metrics(&self.config, &snapshot, now)
    }

    /// Forces the circuit open, starting a fresh sleep window.
    ///
    /// Ignored when the breaker is disabled.
    pub fn force_open(&self) {
        if !self.config.enabled {
            return;
        }
        self.circuit
            .lock()
            .transition_to(CircuitState::Open, &self.config, Instant::now());
    }

    /// Forces the circuit closed, keeping the rolling window as is.
    pub fn force_closed(&self) {
        self.circuit
            .lock()
            .transition_to(CircuitState::Closed, &self.config, Instant::now());
    }

    /// Closes the circuit and discards the rolling window.
    pub fn reset(&self) {
        let now = Instant::now();
        let mut circuit = self.circuit.lock();
        circuit.transition_to(CircuitState::Closed, &self.config, now);
        self.window.reset(now);
    }
}
