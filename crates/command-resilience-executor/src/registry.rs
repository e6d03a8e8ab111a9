//! Per-key state registry.

use crate::config::CommandConfig;
use command_resilience_bulkhead::{Bulkhead, BulkheadConfig};
use command_resilience_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig};
use command_resilience_core::CommandKey;
use command_resilience_window::RollingWindow;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Live state shared by every invocation of one command.
#[derive(Debug)]
pub struct CommandHandle {
    key: CommandKey,
    config: CommandConfig,
    window: Arc<RollingWindow>,
    breaker: Arc<CircuitBreaker>,
    bulkhead: Arc<Bulkhead>,
}

impl CommandHandle {
    /// Builds the window, breaker and bulkhead described by `config`.
    pub fn new(key: CommandKey, config: CommandConfig) -> Self {
        let window = Arc::new(RollingWindow::new(config.rolling_window, config.num_buckets));

        let breaker = CircuitBreaker::new(
            CircuitBreakerConfig::builder()
                .name(key.clone())
                .error_threshold_percentage(config.error_threshold_percentage)
                .request_volume_threshold(config.request_volume_threshold)
                .sleep_window(config.sleep_window)
                .enabled(config.circuit_breaker_enabled)
                .event_listeners(&config.breaker_listeners)
                .build(),
            Arc::clone(&window),
        );

        let bulkhead = Bulkhead::new(
            BulkheadConfig::builder()
                .name(key.clone())
                .max_concurrent_calls(config.bulkhead_capacity)
                .max_queued_calls(config.bulkhead_queue_size)
                .max_wait_duration(Some(config.bulkhead_max_wait()))
                .event_listeners(&config.bulkhead_listeners)
                .build(),
        );

        Self {
            key,
            config,
            window,
            breaker: Arc::new(breaker),
            bulkhead: Arc::new(bulkhead),
        }
    }

    /// The command key.
    pub fn key(&self) -> &CommandKey {
        &self.key
    }

    /// The configuration the state was built from.
    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    /// The command's rolling window.
    pub fn window(&self) -> &Arc<RollingWindow> {
        &self.window
    }

    /// The command's circuit breaker.
    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// The command's bulkhead.
    pub fn bulkhead(&self) -> &Arc<Bulkhead> {
        &self.bulkhead
    }
}

/// Maps command keys to their configuration and live state.
///
/// A registered config is held until the key's first invocation, which
/// builds the [`CommandHandle`]. Unregistered keys use the registry's
/// default config. The registry lock only guards lookup and insertion;
/// all per-call work happens under the handle's own locks.
#[derive(Debug)]
pub struct CommandRegistry {
    defaults: CommandConfig,
    handles: RwLock<HashMap<CommandKey, Arc<CommandHandle>>>,
    pending: Mutex<HashMap<CommandKey, CommandConfig>>,
}

impl CommandRegistry {
    /// Creates an empty registry whose unregistered keys use `defaults`.
    pub fn new(defaults: CommandConfig) -> Self {
        Self {
            defaults,
            handles: RwLock::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Config used for keys that were never registered.
    pub fn defaults(&self) -> &CommandConfig {
        &self.defaults
    }

    /// Stores `config` for `key`.
    ///
    /// The first registration wins: registering a key again, or registering
    /// one that has already executed, keeps the existing config and returns
    /// `false`.
    pub fn register(&self, key: impl Into<CommandKey>, config: CommandConfig) -> bool {
        let key = key.into();
        // Same lock order as `get_or_create`: handles, then pending.
        let handles = self.handles.write();
        let mut pending = self.pending.lock();

        if handles.contains_key(&key) || pending.contains_key(&key) {
            #[cfg(feature = "tracing")]
            tracing::warn!(command = %key, "Command already registered; keeping first config");
            return false;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(command = %key, "Command registered");

        pending.insert(key, config);
        true
    }

    /// Returns the live state for `key`, if it has executed at least once.
    pub fn get(&self, key: &str) -> Option<Arc<CommandHandle>> {
        self.handles.read().get(key).cloned()
    }

    /// Returns the live state for `key`, creating it on first use.
    pub fn get_or_create(&self, key: &CommandKey) -> Arc<CommandHandle> {
        if let Some(handle) = self.handles.read().get(key) {
            return Arc::clone(handle);
        }

        let mut handles = self.handles.write();
        if let Some(handle) = handles.get(key) {
            return Arc::clone(handle);
        }

        let config = self
            .pending
            .lock()
            .remove(key)
            .unwrap_or_else(|| self.defaults.clone());

        #[cfg(feature = "tracing")]
        tracing::debug!(command = %key, "Creating command state");

        let handle = Arc::new(CommandHandle::new(key.clone(), config));
        handles.insert(key.clone(), Arc::clone(&handle));
        handle
    }

    /// Every live handle, ordered by key.
    pub fn handles(&self) -> Vec<Arc<CommandHandle>> {
        let mut handles: Vec<_> = self.handles.read().values().cloned().collect();
        handles.sort_by(|a, b| a.key.cmp(&b.key));
        handles
    }

    /// Keys that are registered or live, ordered.
    pub fn keys(&self) -> Vec<CommandKey> {
        let mut keys: Vec<_> = self.handles.read().keys().cloned().collect();
        keys.extend(self.pending.lock().keys().cloned());
        keys.sort();
        keys.dedup();
        keys
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    /// Returns true if no command has executed yet.
    pub fn is_empty(&self) -> bool {
        self.handles.read().is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new(CommandConfig::default())
    }
}
