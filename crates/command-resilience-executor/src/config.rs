//! Per-command configuration.

use crate::events::CommandEvent;
use command_resilience_bulkhead::BulkheadEvent;
use command_resilience_circuitbreaker::{CircuitBreakerEvent, CircuitState};
use command_resilience_core::{EventListeners, FnListener, Outcome};
use std::time::Duration;
use thiserror::Error;

/// Where the primary action runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Isolation {
    /// Spawn the primary on its own tokio task. A timeout aborts the task and
    /// a panic is reported as a failure instead of unwinding into the caller.
    #[default]
    Task,
    /// Poll the primary on the caller's task. A timeout drops the future.
    Inline,
}

/// Invalid command configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The rolling window has zero length.
    #[error("rolling window duration must be non-zero")]
    ZeroRollingWindow,

    /// The bucket count is zero or too large.
    #[error("number of buckets must be between 1 and {max}, got {0}", max = u32::MAX)]
    InvalidBucketCount(usize),

    /// The window cannot be split into equal buckets.
    #[error("rolling window {window:?} is not evenly divisible into {num_buckets} buckets")]
    UnevenBuckets {
        /// Configured window.
        window: Duration,
        /// Configured bucket count.
        num_buckets: usize,
    },

    /// The error threshold is not a percentage.
    #[error("error threshold percentage must be within 0..=100, got {0}")]
    ThresholdOutOfRange(f64),

    /// The execution timeout has zero length.
    #[error("execution timeout must be non-zero")]
    ZeroExecutionTimeout,

    /// The bulkhead admits no calls.
    #[error("bulkhead capacity must be at least 1")]
    ZeroBulkheadCapacity,
}

/// Immutable configuration for one command key.
///
/// Built through [`CommandConfig::builder`], which validates every option.
#[derive(Debug, Clone)]
pub struct CommandConfig {
    pub(crate) rolling_window: Duration,
    pub(crate) num_buckets: usize,
    pub(crate) error_threshold_percentage: f64,
    pub(crate) request_volume_threshold: u64,
    pub(crate) sleep_window: Duration,
    pub(crate) execution_timeout: Duration,
    pub(crate) bulkhead_capacity: usize,
    pub(crate) bulkhead_queue_size: usize,
    pub(crate) bulkhead_max_wait: Option<Duration>,
    pub(crate) isolation: Isolation,
    pub(crate) circuit_breaker_enabled: bool,
    pub(crate) fallback_enabled: bool,
    pub(crate) event_listeners: EventListeners<CommandEvent>,
    pub(crate) breaker_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) bulkhead_listeners: EventListeners<BulkheadEvent>,
}

impl CommandConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CommandConfigBuilder {
        CommandConfigBuilder::new()
    }

    /// Length of the rolling statistics window.
    pub fn rolling_window(&self) -> Duration {
        self.rolling_window
    }

    /// Number of buckets the window is split into.
    pub fn num_buckets(&self) -> usize {
        self.num_buckets
    }

    /// Error percentage at which the circuit opens.
    pub fn error_threshold_percentage(&self) -> f64 {
        self.error_threshold_percentage
    }

    /// Requests needed in the window before the circuit may open.
    pub fn request_volume_threshold(&self) -> u64 {
        self.request_volume_threshold
    }

    /// How long an open circuit waits before probing.
    pub fn sleep_window(&self) -> Duration {
        self.sleep_window
    }

    /// Deadline for the primary action.
    pub fn execution_timeout(&self) -> Duration {
        self.execution_timeout
    }

    /// Maximum concurrent primary actions.
    pub fn bulkhead_capacity(&self) -> usize {
        self.bulkhead_capacity
    }

    /// Maximum callers waiting for a bulkhead slot.
    pub fn bulkhead_queue_size(&self) -> usize {
        self.bulkhead_queue_size
    }

    /// Bound on the bulkhead queue wait. Falls back to the execution timeout
    /// when not set explicitly.
    pub fn bulkhead_max_wait(&self) -> Duration {
        self.bulkhead_max_wait.unwrap_or(self.execution_timeout)
    }

    /// Where the primary action runs.
    pub fn isolation(&self) -> Isolation {
        self.isolation
    }

    /// Whether the circuit breaker is active.
    pub fn circuit_breaker_enabled(&self) -> bool {
        self.circuit_breaker_enabled
    }

    /// Whether the fallback runs on primary failure.
    pub fn fallback_enabled(&self) -> bool {
        self.fallback_enabled
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        let b = CommandConfigBuilder::new();
        CommandConfig {
            rolling_window: b.rolling_window,
            num_buckets: b.num_buckets,
            error_threshold_percentage: b.error_threshold_percentage,
            request_volume_threshold: b.request_volume_threshold,
            sleep_window: b.sleep_window,
            execution_timeout: b.execution_timeout,
            bulkhead_capacity: b.bulkhead_capacity,
            bulkhead_queue_size: b.bulkhead_queue_size,
            bulkhead_max_wait: b.bulkhead_max_wait,
            isolation: b.isolation,
            circuit_breaker_enabled: b.circuit_breaker_enabled,
            fallback_enabled: b.fallback_enabled,
            event_listeners: b.event_listeners,
            breaker_listeners: b.breaker_listeners,
            bulkhead_listeners: b.bulkhead_listeners,
        }
    }
}

/// Builder for [`CommandConfig`].
pub struct CommandConfigBuilder {
    rolling_window: Duration,
    num_buckets: usize,
    error_threshold_percentage: f64,
    request_volume_threshold: u64,
    sleep_window: Duration,
    execution_timeout: Duration,
    bulkhead_capacity: usize,
    bulkhead_queue_size: usize,
    bulkhead_max_wait: Option<Duration>,
    isolation: Isolation,
    circuit_breaker_enabled: bool,
    fallback_enabled: bool,
    event_listeners: EventListeners<CommandEvent>,
    breaker_listeners: EventListeners<CircuitBreakerEvent>,
    bulkhead_listeners: EventListeners<BulkheadEvent>,
}

impl CommandConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            rolling_window: Duration::from_secs(10),
            num_buckets: 10,
            error_threshold_percentage: 50.0,
            request_volume_threshold: 20,
            sleep_window: Duration::from_secs(5),
            execution_timeout: Duration::from_secs(1),
            bulkhead_capacity: 10,
            bulkhead_queue_size: 0,
            bulkhead_max_wait: None,
            isolation: Isolation::Task,
            circuit_breaker_enabled: true,
            fallback_enabled: true,
            event_listeners: EventListeners::new(),
            breaker_listeners: EventListeners::new(),
            bulkhead_listeners: EventListeners::new(),
        }
    }

    /// Sets the length of the rolling statistics window.
    ///
    /// Default: 10 seconds
    pub fn rolling_window(mut self, duration: Duration) -> Self {
        self.rolling_window = duration;
        self
    }

    /// Sets the number of buckets. Must divide the window evenly.
    ///
    /// Default: 10
    pub fn num_buckets(mut self, n: usize) -> Self {
        self.num_buckets = n;
        self
    }

    /// Sets the error percentage (0 to 100) at which the circuit opens.
    ///
    /// Default: 50
    pub fn error_threshold_percentage(mut self, percentage: f64) -> Self {
        self.error_threshold_percentage = percentage;
        self
    }

    /// Sets the minimum number of requests in the window before the circuit
    /// may open.
    ///
    /// Default: 20
    pub fn request_volume_threshold(mut self, volume: u64) -> Self {
        self.request_volume_threshold = volume;
        self
    }

    /// Sets how long the circuit stays open before a probe is admitted.
    ///
    /// Default: 5 seconds
    pub fn sleep_window(mut self, duration: Duration) -> Self {
        self.sleep_window = duration;
        self
    }

    /// Sets the deadline for the primary action.
    ///
    /// Default: 1 second
    pub fn execution_timeout(mut self, duration: Duration) -> Self {
        self.execution_timeout = duration;
        self
    }

    /// Sets the maximum number of concurrent primary actions.
    ///
    /// Default: 10
    pub fn bulkhead_capacity(mut self, capacity: usize) -> Self {
        self.bulkhead_capacity = capacity;
        self
    }

    /// Sets how many callers may wait for a bulkhead slot.
    ///
    /// Default: 0
    pub fn bulkhead_queue_size(mut self, size: usize) -> Self {
        self.bulkhead_queue_size = size;
        self
    }

    /// Bounds how long a queued caller waits for a bulkhead slot.
    ///
    /// Default: the execution timeout
    pub fn bulkhead_max_wait(mut self, duration: Duration) -> Self {
        self.bulkhead_max_wait = Some(duration);
        self
    }

    /// Sets where the primary action runs.
    ///
    /// Default: [`Isolation::Task`]
    pub fn isolation(mut self, isolation: Isolation) -> Self {
        self.isolation = isolation;
        self
    }

    /// Enables or disables the circuit breaker.
    ///
    /// Default: true
    pub fn circuit_breaker_enabled(mut self, enabled: bool) -> Self {
        self.circuit_breaker_enabled = enabled;
        self
    }

    /// Enables or disables the fallback. With the fallback disabled, primary
    /// failures surface as [`CommandError::FallbackDisabled`].
    ///
    /// Default: true
    ///
    /// [`CommandError::FallbackDisabled`]: command_resilience_core::CommandError::FallbackDisabled
    pub fn fallback_enabled(mut self, enabled: bool) -> Self {
        self.fallback_enabled = enabled;
        self
    }

    /// Registers a callback for every outcome recorded for the command.
    ///
    /// # Example
    /// ```rust
    /// use command_resilience_executor::CommandConfig;
    /// use command_resilience_core::Outcome;
    ///
    /// let config = CommandConfig::builder()
    ///     .on_outcome(|outcome| {
    ///         if outcome == Outcome::FallbackFailure {
    ///             eprintln!("fallback failed");
    ///         }
    ///     })
    ///     .build()
    ///     .unwrap();
    /// # let _ = config;
    /// ```
    pub fn on_outcome<F>(mut self, f: F) -> Self
    where
        F: Fn(Outcome) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CommandEvent| {
                let CommandEvent::OutcomeRecorded { outcome, .. } = event;
                f(*outcome);
            }));
        self
    }

    /// Registers a callback for circuit state transitions.
    ///
    /// # Callback Signature
    /// `Fn(CircuitState, CircuitState)` - called with `(from, to)`.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.breaker_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(*from_state, *to_state);
                }
            }));
        self
    }

    /// Registers a callback for calls rejected by a full bulkhead.
    pub fn on_bulkhead_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.bulkhead_listeners
            .add(FnListener::new(move |event: &BulkheadEvent| {
                if matches!(
                    event,
                    BulkheadEvent::CallRejected { .. } | BulkheadEvent::WaitTimedOut { .. }
                ) {
                    f();
                }
            }));
        self
    }

    /// Validates the options and builds the configuration.
    pub fn build(self) -> Result<CommandConfig, ConfigError> {
        if self.rolling_window.is_zero() {
            return Err(ConfigError::ZeroRollingWindow);
        }
        if self.num_buckets == 0 || u32::try_from(self.num_buckets).is_err() {
            return Err(ConfigError::InvalidBucketCount(self.num_buckets));
        }
        if self.rolling_window.as_nanos() % self.num_buckets as u128 != 0 {
            return Err(ConfigError::UnevenBuckets {
                window: self.rolling_window,
                num_buckets: self.num_buckets,
            });
        }
        if !(0.0..=100.0).contains(&self.error_threshold_percentage) {
            return Err(ConfigError::ThresholdOutOfRange(
                self.error_threshold_percentage,
            ));
        }
        if self.execution_timeout.is_zero() {
            return Err(ConfigError::ZeroExecutionTimeout);
        }
        if self.bulkhead_capacity == 0 {
            return Err(ConfigError::ZeroBulkheadCapacity);
        }

        Ok(CommandConfig {
            rolling_window: self.rolling_window,
            num_buckets: self.num_buckets,
            error_threshold_percentage: self.error_threshold_percentage,
            request_volume_threshold: self.request_volume_threshold,
            sleep_window: self.sleep_window,
            execution_timeout: self.execution_timeout,
            bulkhead_capacity: self.bulkhead_capacity,
            bulkhead_queue_size: self.bulkhead_queue_size,
            bulkhead_max_wait: self.bulkhead_max_wait,
            isolation: self.isolation,
            circuit_breaker_enabled: self.circuit_breaker_enabled,
            fallback_enabled: self.fallback_enabled,
            event_listeners: self.event_listeners,
            breaker_listeners: self.breaker_listeners,
            bulkhead_listeners: self.bulkhead_listeners,
        })
    }
}

impl Default for CommandConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain-data command settings, as read from a configuration file.
///
/// Durations are in milliseconds. Missing fields take the builder defaults.
///
/// ```rust
/// # #[cfg(feature = "serde")]
/// # {
/// use command_resilience_executor::{CommandConfig, CommandSettings};
///
/// let settings: CommandSettings = serde_json::from_str(
///     r#"{ "requestVolumeThreshold": 5, "executionTimeoutMs": 250 }"#,
/// ).unwrap();
/// let config = CommandConfig::try_from(settings).unwrap();
/// assert_eq!(config.request_volume_threshold(), 5);
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct CommandSettings {
    /// Rolling window length.
    pub rolling_window_ms: u64,
    /// Number of window buckets.
    pub num_buckets: usize,
    /// Error percentage that opens the circuit.
    pub error_threshold_percentage: f64,
    /// Minimum window volume before the circuit may open.
    pub request_volume_threshold: u64,
    /// Open-circuit sleep window.
    pub sleep_window_ms: u64,
    /// Primary action deadline.
    pub execution_timeout_ms: u64,
    /// Maximum concurrent primary actions.
    pub bulkhead_capacity: usize,
    /// Maximum queued callers.
    pub bulkhead_queue_size: usize,
    /// Queue wait bound; the execution timeout when absent.
    pub bulkhead_max_wait_ms: Option<u64>,
    /// Where the primary action runs.
    pub isolation: Isolation,
    /// Whether the circuit breaker is active.
    pub circuit_breaker_enabled: bool,
    /// Whether the fallback runs.
    pub fallback_enabled: bool,
}

impl Default for CommandSettings {
    fn default() -> Self {
        let config = CommandConfig::default();
        Self {
            rolling_window_ms: config.rolling_window.as_millis() as u64,
            num_buckets: config.num_buckets,
            error_threshold_percentage: config.error_threshold_percentage,
            request_volume_threshold: config.request_volume_threshold,
            sleep_window_ms: config.sleep_window.as_millis() as u64,
            execution_timeout_ms: config.execution_timeout.as_millis() as u64,
            bulkhead_capacity: config.bulkhead_capacity,
            bulkhead_queue_size: config.bulkhead_queue_size,
            bulkhead_max_wait_ms: None,
            isolation: config.isolation,
            circuit_breaker_enabled: config.circuit_breaker_enabled,
            fallback_enabled: config.fallback_enabled,
        }
    }
}

impl TryFrom<CommandSettings> for CommandConfig {
    type Error = ConfigError;

    fn try_from(settings: CommandSettings) -> Result<Self, Self::Error> {
        let mut builder = CommandConfig::builder()
            .rolling_window(Duration::from_millis(settings.rolling_window_ms))
            .num_buckets(settings.num_buckets)
            .error_threshold_percentage(settings.error_threshold_percentage)
            .request_volume_threshold(settings.request_volume_threshold)
            .sleep_window(Duration::from_millis(settings.sleep_window_ms))
            .execution_timeout(Duration::from_millis(settings.execution_timeout_ms))
            .bulkhead_capacity(settings.bulkhead_capacity)
            .bulkhead_queue_size(settings.bulkhead_queue_size)
            .isolation(settings.isolation)
            .circuit_breaker_enabled(settings.circuit_breaker_enabled)
            .fallback_enabled(settings.fallback_enabled);
        if let Some(ms) = settings.bulkhead_max_wait_ms {
            builder = builder.bulkhead_max_wait(Duration::from_millis(ms));
        }
        builder.build()
    }
}
