//! Error taxonomy for command execution.
//!
//! Four primary-path failures are recoverable by design: the action failed,
//! it timed out, the circuit was open, or the bulkhead was full. Each one
//! routes the call to its fallback and is described by [`PrimaryFailure`].
//!
//! The caller only sees an error when the fallback cannot rescue the call.
//! [`CommandError`] then carries both the triggering primary cause and the
//! fallback's own cause, so operators can tell which layer broke.
//!
//! ```
//! use command_resilience_core::{CommandError, Outcome, PrimaryFailure};
//! use std::time::Duration;
//!
//! let err: CommandError<String> = CommandError::FallbackFailed {
//!     primary: PrimaryFailure::Timeout { timeout: Duration::from_millis(250) },
//!     fallback: "cache miss".to_string(),
//! };
//!
//! assert!(err.primary().is_timeout());
//! assert_eq!(err.fallback_error(), Some(&"cache miss".to_string()));
//! assert_eq!(err.outcome(), Outcome::FallbackFailure);
//! ```

use crate::{CommandKey, Outcome};
use std::fmt;
use std::time::Duration;

/// Why the primary path did not produce a value.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryFailure<E> {
    /// The primary action returned an error.
    Failure(E),

    /// The primary action panicked while running on its own task.
    Panicked {
        /// Panic payload, when it was a string.
        message: String,
    },

    /// The primary action exceeded its execution timeout.
    Timeout {
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// The circuit breaker was open and the action was never attempted.
    ShortCircuited {
        /// Command whose circuit is open.
        key: CommandKey,
    },

    /// The bulkhead had neither a free slot nor queue room.
    BulkheadRejected {
        /// Command whose bulkhead is saturated.
        key: CommandKey,
        /// Configured concurrent capacity.
        max_concurrent_calls: usize,
        /// Configured queue capacity.
        max_queued_calls: usize,
    },
}

impl<E> PrimaryFailure<E> {
    /// The outcome recorded for this failure.
    pub fn outcome(&self) -> Outcome {
        match self {
            PrimaryFailure::Failure(_) | PrimaryFailure::Panicked { .. } => Outcome::Failure,
            PrimaryFailure::Timeout { .. } => Outcome::Timeout,
            PrimaryFailure::ShortCircuited { .. } => Outcome::ShortCircuited,
            PrimaryFailure::BulkheadRejected { .. } => Outcome::RejectedByBulkhead,
        }
    }

    /// Returns `true` if the primary action itself failed (error or panic).
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PrimaryFailure::Failure(_) | PrimaryFailure::Panicked { .. }
        )
    }

    /// Returns `true` if the primary action timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PrimaryFailure::Timeout { .. })
    }

    /// Returns `true` if the call was short-circuited by an open circuit.
    pub fn is_short_circuited(&self) -> bool {
        matches!(self, PrimaryFailure::ShortCircuited { .. })
    }

    /// Returns `true` if the bulkhead rejected the call.
    pub fn is_bulkhead_rejected(&self) -> bool {
        matches!(self, PrimaryFailure::BulkheadRejected { .. })
    }

    /// Returns the error produced by the primary action, if any.
    pub fn inner(&self) -> Option<&E> {
        match self {
            PrimaryFailure::Failure(e) => Some(e),
            _ => None,
        }
    }

    /// Consumes the failure, returning the primary action's error if any.
    pub fn into_inner(self) -> Option<E> {
        match self {
            PrimaryFailure::Failure(e) => Some(e),
            _ => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for PrimaryFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryFailure::Failure(e) => write!(f, "primary action failed: {}", e),
            PrimaryFailure::Panicked { message } => {
                write!(f, "primary action panicked: {}", message)
            }
            PrimaryFailure::Timeout { timeout } => {
                write!(f, "primary action timed out after {:?}", timeout)
            }
            PrimaryFailure::ShortCircuited { key } => {
                write!(f, "circuit for '{}' is open; call short-circuited", key)
            }
            PrimaryFailure::BulkheadRejected {
                key,
                max_concurrent_calls,
                max_queued_calls,
            } => write!(
                f,
                "bulkhead for '{}' is full ({} running, {} queued)",
                key, max_concurrent_calls, max_queued_calls
            ),
        }
    }
}

impl<E> std::error::Error for PrimaryFailure<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PrimaryFailure::Failure(e) => Some(e),
            _ => None,
        }
    }
}

/// Caller-visible error: the primary path failed and no fallback rescued it.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandError<E> {
    /// The fallback ran and failed too.
    FallbackFailed {
        /// What sent the call to the fallback.
        primary: PrimaryFailure<E>,
        /// The fallback's own error.
        fallback: E,
    },

    /// Fallback is disabled for this command, so the primary failure surfaces.
    FallbackDisabled {
        /// What went wrong on the primary path.
        primary: PrimaryFailure<E>,
    },
}

impl<E> CommandError<E> {
    /// The primary-path failure that triggered the fallback.
    pub fn primary(&self) -> &PrimaryFailure<E> {
        match self {
            CommandError::FallbackFailed { primary, .. }
            | CommandError::FallbackDisabled { primary } => primary,
        }
    }

    /// The fallback's error, if the fallback ran.
    pub fn fallback_error(&self) -> Option<&E> {
        match self {
            CommandError::FallbackFailed { fallback, .. } => Some(fallback),
            CommandError::FallbackDisabled { .. } => None,
        }
    }

    /// Returns `true` if the fallback ran and failed.
    pub fn is_fallback_failed(&self) -> bool {
        matches!(self, CommandError::FallbackFailed { .. })
    }

    /// The last outcome recorded for the call.
    pub fn outcome(&self) -> Outcome {
        match self {
            CommandError::FallbackFailed { .. } => Outcome::FallbackFailure,
            CommandError::FallbackDisabled { primary } => primary.outcome(),
        }
    }

    /// Splits the error into its primary cause and optional fallback cause.
    pub fn into_parts(self) -> (PrimaryFailure<E>, Option<E>) {
        match self {
            CommandError::FallbackFailed { primary, fallback } => (primary, Some(fallback)),
            CommandError::FallbackDisabled { primary } => (primary, None),
        }
    }
}

impl<E: fmt::Display> fmt::Display for CommandError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::FallbackFailed { primary, fallback } => {
                write!(f, "fallback failed: {} (after {})", fallback, primary)
            }
            CommandError::FallbackDisabled { primary } => {
                write!(f, "{} (fallback disabled)", primary)
            }
        }
    }
}

impl<E> std::error::Error for CommandError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::FallbackFailed { fallback, .. } => Some(fallback),
            CommandError::FallbackDisabled { primary } => Some(primary),
        }
    }
}
