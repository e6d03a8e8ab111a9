//! Events emitted by the bulkhead.

use command_resilience_core::{CommandKey, ResilienceEvent};
use std::time::Duration;
use tokio::time::Instant;

/// Events emitted by the bulkhead.
#[derive(Debug, Clone)]
pub enum BulkheadEvent {
    /// A call acquired a slot.
    CallPermitted {
        command_key: CommandKey,
        timestamp: Instant,
        /// Slots in use, this call included.
        concurrent_calls: usize,
    },
    /// A call joined the wait queue.
    CallQueued {
        command_key: CommandKey,
        timestamp: Instant,
        /// Queue length, this call included.
        queued: usize,
    },
    /// A call was rejected because slots and queue were full.
    CallRejected {
        command_key: CommandKey,
        timestamp: Instant,
        max_concurrent_calls: usize,
        max_queued_calls: usize,
    },
    /// A queued call gave up after its wait bound.
    WaitTimedOut {
        command_key: CommandKey,
        timestamp: Instant,
        waited: Duration,
    },
}

impl ResilienceEvent for BulkheadEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BulkheadEvent::CallPermitted { .. } => "call_permitted",
            BulkheadEvent::CallQueued { .. } => "call_queued",
            BulkheadEvent::CallRejected { .. } => "call_rejected",
            BulkheadEvent::WaitTimedOut { .. } => "wait_timed_out",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            BulkheadEvent::CallPermitted { timestamp, .. }
            | BulkheadEvent::CallQueued { timestamp, .. }
            | BulkheadEvent::CallRejected { timestamp, .. }
            | BulkheadEvent::WaitTimedOut { timestamp, .. } => *timestamp,
        }
    }

    fn command_key(&self) -> &CommandKey {
        match self {
            BulkheadEvent::CallPermitted { command_key, .. }
            | BulkheadEvent::CallQueued { command_key, .. }
            | BulkheadEvent::CallRejected { command_key, .. }
            | BulkheadEvent::WaitTimedOut { command_key, .. } => command_key,
        }
    }
}
