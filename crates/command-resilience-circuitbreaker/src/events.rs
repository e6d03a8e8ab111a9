use crate::CircuitState;
use command_resilience_core::{CommandKey, Outcome, ResilienceEvent};
use tokio::time::Instant;

/// Events emitted by the circuit breaker.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// A call was let through while the circuit was closed.
    CallPermitted {
        command_key: CommandKey,
        timestamp: Instant,
        state: CircuitState,
    },
    /// The sleep window elapsed and this call became the half-open probe.
    ProbePermitted {
        command_key: CommandKey,
        timestamp: Instant,
    },
    /// A call was short-circuited.
    CallRejected {
        command_key: CommandKey,
        timestamp: Instant,
        state: CircuitState,
    },
    /// The circuit changed state.
    StateTransition {
        command_key: CommandKey,
        timestamp: Instant,
        from_state: CircuitState,
        to_state: CircuitState,
    },
    /// An outcome was reported to the breaker.
    OutcomeRecorded {
        command_key: CommandKey,
        timestamp: Instant,
        outcome: Outcome,
        state: CircuitState,
    },
}

impl ResilienceEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::CallPermitted { .. } => "call_permitted",
            CircuitBreakerEvent::ProbePermitted { .. } => "probe_permitted",
            CircuitBreakerEvent::CallRejected { .. } => "call_rejected",
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
            CircuitBreakerEvent::OutcomeRecorded { .. } => "outcome_recorded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::CallPermitted { timestamp, .. }
            | CircuitBreakerEvent::ProbePermitted { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. }
            | CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::OutcomeRecorded { timestamp, .. } => *timestamp,
        }
    }

    fn command_key(&self) -> &CommandKey {
        match self {
            CircuitBreakerEvent::CallPermitted { command_key, .. }
            | CircuitBreakerEvent::ProbePermitted { command_key, .. }
            | CircuitBreakerEvent::CallRejected { command_key, .. }
            | CircuitBreakerEvent::StateTransition { command_key, .. }
            | CircuitBreakerEvent::OutcomeRecorded { command_key, .. } => command_key,
        }
    }
}
