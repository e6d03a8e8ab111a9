use std::fmt;

/// Tagged result of one invocation attempt.
///
/// Every execution records exactly one primary-path outcome
/// (`Success`, `Failure`, `Timeout`, `ShortCircuited`, `RejectedByBulkhead`)
/// and, when the fallback runs, exactly one fallback-path outcome
/// (`FallbackSuccess`, `FallbackFailure`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum Outcome {
    /// The primary action completed with a value.
    Success = 0,
    /// The primary action returned an error.
    Failure = 1,
    /// The primary action did not complete before its deadline.
    Timeout = 2,
    /// The circuit was open; the primary action was never attempted.
    ShortCircuited = 3,
    /// The bulkhead had no capacity; the primary action was never attempted.
    RejectedByBulkhead = 4,
    /// The fallback completed with a value.
    FallbackSuccess = 5,
    /// The fallback itself failed.
    FallbackFailure = 6,
}

impl Outcome {
    /// Number of distinct outcomes.
    pub const COUNT: usize = 7;

    /// All outcomes in index order.
    pub const ALL: [Outcome; Outcome::COUNT] = [
        Outcome::Success,
        Outcome::Failure,
        Outcome::Timeout,
        Outcome::ShortCircuited,
        Outcome::RejectedByBulkhead,
        Outcome::FallbackSuccess,
        Outcome::FallbackFailure,
    ];

    /// Dense index, usable as an array offset.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns `true` for outcomes produced by the primary path.
    pub fn is_primary(self) -> bool {
        !self.is_fallback()
    }

    /// Returns `true` for outcomes produced by the fallback path.
    pub fn is_fallback(self) -> bool {
        matches!(self, Outcome::FallbackSuccess | Outcome::FallbackFailure)
    }

    /// Returns `true` for outcomes counted as errors by the circuit breaker.
    pub fn is_error(self) -> bool {
        matches!(
            self,
            Outcome::Failure | Outcome::Timeout | Outcome::RejectedByBulkhead
        )
    }

    /// Returns `true` for outcomes that route the call to its fallback.
    pub fn triggers_fallback(self) -> bool {
        matches!(
            self,
            Outcome::Failure
                | Outcome::Timeout
                | Outcome::ShortCircuited
                | Outcome::RejectedByBulkhead
        )
    }

    /// Stable snake_case label, used for metric labels and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Timeout => "timeout",
            Outcome::ShortCircuited => "short_circuited",
            Outcome::RejectedByBulkhead => "rejected_by_bulkhead",
            Outcome::FallbackSuccess => "fallback_success",
            Outcome::FallbackFailure => "fallback_failure",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
