//! Events emitted by the command executor.

use command_resilience_core::{CommandKey, Outcome, ResilienceEvent};
use std::time::Duration;
use tokio::time::Instant;

/// Events emitted while executing a command.
#[derive(Debug, Clone)]
pub enum CommandEvent {
    /// An outcome was recorded in the command's rolling window.
    ///
    /// Every execution emits one primary-path outcome and, when the fallback
    /// ran, one fallback-path outcome.
    OutcomeRecorded {
        command_key: CommandKey,
        timestamp: Instant,
        outcome: Outcome,
        /// Time since the execution started.
        elapsed: Duration,
    },
}

impl ResilienceEvent for CommandEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CommandEvent::OutcomeRecorded { .. } => "outcome_recorded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CommandEvent::OutcomeRecorded { timestamp, .. } => *timestamp,
        }
    }

    fn command_key(&self) -> &CommandKey {
        match self {
            CommandEvent::OutcomeRecorded { command_key, .. } => command_key,
        }
    }
}
