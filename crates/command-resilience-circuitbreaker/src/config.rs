use crate::events::CircuitBreakerEvent;
use crate::CircuitState;
use command_resilience_core::{CommandKey, EventListeners, FnListener, Outcome};
use std::time::Duration;

/// Configuration for one command's circuit breaker.
#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    pub(crate) error_threshold_percentage: f64,
    pub(crate) request_volume_threshold: u64,
    pub(crate) sleep_window: Duration,
    pub(crate) enabled: bool,
    pub(crate) name: CommandKey,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Error percentage (0..=100) at or above which the circuit opens.
    pub fn error_threshold_percentage(&self) -> f64 {
        self.error_threshold_percentage
    }

    /// Minimum requests in the window before the error rate is considered.
    pub fn request_volume_threshold(&self) -> u64 {
        self.request_volume_threshold
    }

    /// How long the circuit stays open before admitting a probe.
    pub fn sleep_window(&self) -> Duration {
        self.sleep_window
    }

    /// Whether the breaker is active at all.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// The command this breaker guards.
    pub fn name(&self) -> &CommandKey {
        &self.name
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        CircuitBreakerConfigBuilder::new().build()
    }
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder {
    error_threshold_percentage: f64,
    request_volume_threshold: u64,
    sleep_window: Duration,
    enabled: bool,
    name: CommandKey,
    event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            error_threshold_percentage: 50.0,
            request_volume_threshold: 20,
            sleep_window: Duration::from_secs(5),
            enabled: true,
            name: CommandKey::from("<unnamed>"),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the error percentage at which the circuit opens.
    ///
    /// Values outside `0..=100` are clamped.
    ///
    /// Default: 50
    pub fn error_threshold_percentage(mut self, percentage: f64) -> Self {
        self.error_threshold_percentage = percentage;
        self
    }

    /// Sets the minimum number of requests in the rolling window before the
    /// circuit may trip.
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

    /// Enables or disables the breaker. A disabled breaker lets every call
    /// through and never leaves the closed state.
    ///
    /// Default: true
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the command key used in events, logs and metric labels.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<CommandKey>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds every listener in `listeners` to this breaker.
    pub fn event_listeners(mut self, listeners: &EventListeners<CircuitBreakerEvent>) -> Self {
        self.event_listeners.extend(listeners);
        self
    }

    /// Registers a callback for state transitions.
    ///
    /// # Callback Signature
    /// `Fn(CircuitState, CircuitState)` - called with `(from, to)`.
    ///
    /// # Example
    /// ```rust
    /// use command_resilience_circuitbreaker::{CircuitBreakerConfig, CircuitState};
    ///
    /// let config = CircuitBreakerConfig::builder()
    ///     .name("inventory")
    ///     .on_state_transition(|from, to| {
    ///         if to == CircuitState::Open {
    ///             eprintln!("inventory circuit opened (was {:?})", from);
    ///         }
    ///     })
    ///     .build();
    /// # let _ = config;
    /// ```
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
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

    /// Registers a callback for short-circuited calls.
    ///
    /// The callback receives the circuit state at rejection time
    /// (`Open`, or `HalfOpen` while a probe is in flight).
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::CallRejected { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback invoked when a half-open probe is admitted.
    pub fn on_probe<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if matches!(event, CircuitBreakerEvent::ProbePermitted { .. }) {
                    f();
                }
            }));
        self
    }

    /// Registers a callback invoked for every outcome reported to the breaker.
    pub fn on_outcome<F>(mut self, f: F) -> Self
    where
        F: Fn(Outcome) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::OutcomeRecorded { outcome, .. } = event {
                    f(*outcome);
                }
            }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            error_threshold_percentage: self.error_threshold_percentage.clamp(0.0, 100.0),
            request_volume_threshold: self.request_volume_threshold,
            sleep_window: self.sleep_window,
            enabled: self.enabled,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
