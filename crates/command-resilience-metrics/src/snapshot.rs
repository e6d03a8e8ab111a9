use command_resilience_circuitbreaker::CircuitState;
use command_resilience_core::{CommandKey, Outcome};
use command_resilience_executor::CommandHandle;
use command_resilience_window::OutcomeCounts;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

/// Health of one command at one publication tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// The command the snapshot describes.
    pub command_key: CommandKey,
    /// Circuit state at capture time.
    pub state: CircuitState,
    /// Start of the rolling window, in Unix epoch milliseconds.
    pub window_start_ms: u64,
    /// End of the rolling window (the capture time), in Unix epoch milliseconds.
    pub window_end_ms: u64,
    /// Per-outcome counts inside the window.
    pub counts: OutcomeCounts,
    /// Requests that reached the dependency or its bulkhead.
    pub total_requests: u64,
    /// Failures, timeouts and bulkhead rejections.
    pub error_count: u64,
    /// `error_count / total_requests` as a percentage, 0 when idle.
    pub error_percentage: f64,
    /// Whether `total_requests` has reached the request volume threshold.
    pub volume_threshold_met: bool,
    /// Calls holding a bulkhead permit.
    pub bulkhead_active: usize,
    /// Calls waiting in the bulkhead queue.
    pub bulkhead_queued: usize,
    /// Bulkhead capacity.
    pub bulkhead_capacity: usize,
    /// Bulkhead queue capacity.
    pub bulkhead_queue_capacity: usize,
}

impl MetricsSnapshot {
    /// Reads the command's window, breaker and bulkhead as of `now`.
    ///
    /// Capturing never writes to any of them, so it cannot change the
    /// command's behaviour. The circuit state comes from the lock-free
    /// mirror, so capture never waits on the breaker lock.
    pub fn capture(handle: &CommandHandle, now: Instant) -> Self {
        let window = handle.window().snapshot(now);
        let breaker = handle.circuit_breaker();
        let bulkhead = handle.bulkhead();
        let total_requests = window.total_requests();

        let wall_now = unix_millis(SystemTime::now());
        let to_wall = |at: Instant| wall_now.saturating_sub(millis(now.saturating_duration_since(at)));

        Self {
            command_key: handle.key().clone(),
            state: breaker.state_sync(),
            window_start_ms: to_wall(window.window_start),
            window_end_ms: to_wall(window.window_end),
            counts: window.counts,
            total_requests,
            error_count: window.error_count(),
            error_percentage: window.error_percentage(),
            volume_threshold_met: total_requests
                >= breaker.config().request_volume_threshold(),
            bulkhead_active: bulkhead.active_calls(),
            bulkhead_queued: bulkhead.queued_calls(),
            bulkhead_capacity: bulkhead.max_concurrent_calls(),
            bulkhead_queue_capacity: bulkhead.max_queued_calls(),
        }
    }

    /// Count of one outcome inside the window.
    pub fn count(&self, outcome: Outcome) -> u64 {
        self.counts.get(outcome)
    }

    /// The snapshot as one line of newline-delimited JSON, newline included.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

fn unix_millis(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH).map(millis).unwrap_or(0)
}

fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
