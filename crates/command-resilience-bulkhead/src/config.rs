//! Configuration for the bulkhead.

use crate::events::BulkheadEvent;
use command_resilience_core::events::{EventListeners, FnListener};
use command_resilience_core::CommandKey;
use std::time::Duration;

/// Configuration for one command's bulkhead.
#[derive(Clone, Debug)]
pub struct BulkheadConfig {
    /// Slots available to primaries at once.
    pub(crate) max_concurrent_calls: usize,
    /// Maximum number of calls waiting for a slot.
    pub(crate) max_queued_calls: usize,
    /// Maximum time a queued call waits for a slot.
    pub(crate) max_wait_duration: Option<Duration>,
    /// Command this bulkhead isolates.
    pub(crate) name: CommandKey,
    /// Event listeners.
    pub(crate) event_listeners: EventListeners<BulkheadEvent>,
}

impl BulkheadConfig {
    /// Starts a builder with the defaults.
    pub fn builder() -> BulkheadConfigBuilder {
        BulkheadConfigBuilder::new()
    }

    /// Maximum number of concurrent calls.
    pub fn max_concurrent_calls(&self) -> usize {
        self.max_concurrent_calls
    }

    /// Maximum number of queued calls.
    pub fn max_queued_calls(&self) -> usize {
        self.max_queued_calls
    }

    /// Bound on the queue wait, if any.
    pub fn max_wait_duration(&self) -> Option<Duration> {
        self.max_wait_duration
    }

    /// The command this bulkhead isolates.
    pub fn name(&self) -> &CommandKey {
        &self.name
    }
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        BulkheadConfigBuilder::new().build()
    }
}

/// Builder for [`BulkheadConfig`].
pub struct BulkheadConfigBuilder {
    max_concurrent_calls: usize,
    max_queued_calls: usize,
    max_wait_duration: Option<Duration>,
    name: CommandKey,
    event_listeners: EventListeners<BulkheadEvent>,
}

impl BulkheadConfigBuilder {
    /// Starts from ten slots, no queue and no wait bound.
    pub fn new() -> Self {
        Self {
            max_concurrent_calls: 10,
            max_queued_calls: 0,
            max_wait_duration: None,
            name: CommandKey::from("bulkhead"),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets how many primaries may hold a slot at once.
    ///
    /// Default: 10
    pub fn max_concurrent_calls(mut self, max: usize) -> Self {
        self.max_concurrent_calls = max;
        self
    }

    /// Sets how many calls may wait for a slot once all slots are busy.
    ///
    /// With 0, calls are rejected as soon as the bulkhead is at capacity.
    ///
    /// Default: 0
    pub fn max_queued_calls(mut self, max: usize) -> Self {
        self.max_queued_calls = max;
        self
    }

    /// Sets the maximum time a queued call waits for a slot.
    ///
    /// If `None`, queued calls wait indefinitely.
    /// Default: None
    pub fn max_wait_duration(mut self, duration: Option<Duration>) -> Self {
        self.max_wait_duration = duration;
        self
    }

    /// Sets the command key used in events, logs and metric labels.
    ///
    /// Default: "bulkhead"
    pub fn name(mut self, name: impl Into<CommandKey>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds every listener in `listeners` to this bulkhead.
    pub fn event_listeners(mut self, listeners: &EventListeners<BulkheadEvent>) -> Self {
        self.event_listeners.extend(listeners);
        self
    }

    /// Registers a callback when a call acquires a slot.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - called with the number of slots in use after this call was permitted.
    ///
    /// # Example
    /// ```rust
    /// use command_resilience_bulkhead::BulkheadConfig;
    ///
    /// let config = BulkheadConfig::builder()
    ///     .max_concurrent_calls(10)
    ///     .on_call_permitted(|concurrent| {
    ///         if concurrent >= 8 {
    ///             println!("approaching capacity: {}", concurrent);
    ///         }
    ///     })
    ///     .build();
    /// # let _ = config;
    /// ```
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::CallPermitted {
                concurrent_calls, ..
            } = event
            {
                f(*concurrent_calls);
            }
        }));
        self
    }

    /// Registers a callback when a call joins the wait queue.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - called with the queue length including this call.
    pub fn on_call_queued<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::CallQueued { queued, .. } = event {
                f(*queued);
            }
        }));
        self
    }

    /// Registers a callback when a call is rejected because the bulkhead and
    /// its queue are full.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, BulkheadEvent::CallRejected { .. }) {
                f();
            }
        }));
        self
    }

    /// Registers a callback when a queued call gives up waiting.
    ///
    /// # Callback Signature
    /// `Fn(Duration)` - called with how long the call waited.
    pub fn on_wait_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::WaitTimedOut { waited, .. } = event {
                f(*waited);
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> BulkheadConfig {
        BulkheadConfig {
            max_concurrent_calls: self.max_concurrent_calls,
            max_queued_calls: self.max_queued_calls,
            max_wait_duration: self.max_wait_duration,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for BulkheadConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
