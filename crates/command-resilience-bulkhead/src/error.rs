//! Error types for the bulkhead.

use std::time::Duration;

/// Errors that can occur when acquiring a bulkhead permit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BulkheadError {
    /// Every slot is busy and the wait queue is full.
    #[error(
        "bulkhead is full: {max_concurrent_calls} concurrent calls and {max_queued_calls} queued"
    )]
    BulkheadFull {
        /// Maximum concurrent calls allowed.
        max_concurrent_calls: usize,
        /// Maximum queued calls allowed.
        max_queued_calls: usize,
    },
    /// The call waited in the queue longer than the configured bound.
    #[error("timed out after {waited:?} waiting for bulkhead permit")]
    Timeout {
        /// How long the call waited.
        waited: Duration,
    },
}

impl BulkheadError {
    /// Returns true if the call was rejected without waiting.
    pub fn is_full(&self) -> bool {
        matches!(self, BulkheadError::BulkheadFull { .. })
    }

    /// Returns true if the call gave up waiting in the queue.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BulkheadError::Timeout { .. })
    }
}

/// Result type for bulkhead operations.
pub type Result<T> = std::result::Result<T, BulkheadError>;
