//! Bulkhead implementation.

use crate::config::BulkheadConfig;
use crate::error::BulkheadError;
use crate::events::BulkheadEvent;
use command_resilience_core::CommandKey;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::time::Instant;

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Bounded-concurrency gate for one command.
///
/// At most `max_concurrent_calls` permits are outstanding at once. When all
/// are taken, up to `max_queued_calls` callers wait in FIFO order; anyone
/// beyond that is rejected immediately.
#[derive(Debug)]
pub struct Bulkhead {
    config: Arc<BulkheadConfig>,
    semaphore: Arc<Semaphore>,
    queued: Arc<AtomicUsize>,
}

impl Bulkhead {
    /// Creates a bulkhead with every slot free.
    pub fn new(config: BulkheadConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_calls));
        Self {
            config: Arc::new(config),
            semaphore,
            queued: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Acquires a slot, waiting in the queue if there is room.
    ///
    /// Returns [`BulkheadError::BulkheadFull`] when every slot and queue
    /// position is taken, and [`BulkheadError::Timeout`] when a queued call
    /// outlives `max_wait_duration`. Dropping the returned permit frees the
    /// slot for the oldest waiter.
    pub async fn acquire(&self) -> Result<BulkheadPermit, BulkheadError> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => return Ok(self.permitted(permit)),
            Err(TryAcquireError::Closed) => return Err(self.reject()),
            Err(TryAcquireError::NoPermits) => {}
        }

        let Some(slot) = self.join_queue() else {
            return Err(self.reject());
        };

        let started = Instant::now();
        let acquired = match self.config.max_wait_duration {
            Some(max_wait) => {
                match tokio::time::timeout(max_wait, Arc::clone(&self.semaphore).acquire_owned())
                    .await
                {
                    Ok(result) => result,
                    Err(_) => {
                        drop(slot);
                        return Err(self.wait_timed_out(started.elapsed()));
                    }
                }
            }
            None => Arc::clone(&self.semaphore).acquire_owned().await,
        };
        drop(slot);

        match acquired {
            Ok(permit) => Ok(self.permitted(permit)),
            Err(_) => Err(self.reject()),
        }
    }

    /// Takes a slot only if one is free right now.
    pub fn try_acquire(&self) -> Result<BulkheadPermit, BulkheadError> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => Ok(self.permitted(permit)),
            Err(_) => Err(self.reject()),
        }
    }

    /// Slots currently in use.
    pub fn active_calls(&self) -> usize {
        self.config
            .max_concurrent_calls
            .saturating_sub(self.semaphore.available_permits())
    }

    /// Callers currently waiting for a slot.
    pub fn queued_calls(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }

    /// Configured concurrent capacity.
    pub fn max_concurrent_calls(&self) -> usize {
        self.config.max_concurrent_calls
    }

    /// Configured queue capacity.
    pub fn max_queued_calls(&self) -> usize {
        self.config.max_queued_calls
    }

    /// The command this bulkhead isolates.
    pub fn command_key(&self) -> &CommandKey {
        &self.config.name
    }

    /// The bulkhead's configuration.
    pub fn config(&self) -> &BulkheadConfig {
        &self.config
    }

    fn join_queue(&self) -> Option<QueueSlot> {
        let max = self.config.max_queued_calls;
        let mut current = self.queued.load(Ordering::Acquire);
        loop {
            if current >= max {
                return None;
            }
            match self.queued.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        let queued = current + 1;
        self.config.event_listeners.emit(&BulkheadEvent::CallQueued {
            command_key: self.config.name.clone(),
            timestamp: Instant::now(),
            queued,
        });

        #[cfg(feature = "tracing")]
        tracing::debug!(command = %self.config.name, queued, "Call queued for bulkhead slot");

        Some(QueueSlot {
            queued: Arc::clone(&self.queued),
        })
    }

    fn permitted(&self, permit: OwnedSemaphorePermit) -> BulkheadPermit {
        let concurrent_calls = self.active_calls();
        self.config.event_listeners.emit(&BulkheadEvent::CallPermitted {
            command_key: self.config.name.clone(),
            timestamp: Instant::now(),
            concurrent_calls,
        });

        #[cfg(feature = "tracing")]
        tracing::trace!(command = %self.config.name, concurrent_calls, "Bulkhead permit acquired");

        #[cfg(feature = "metrics")]
        gauge!("bulkhead_concurrent_calls", "command" => self.config.name.to_string())
            .set(concurrent_calls as f64);

        BulkheadPermit {
            permit: Some(permit),
            #[cfg(feature = "metrics")]
            semaphore: Arc::clone(&self.semaphore),
            config: Arc::clone(&self.config),
        }
    }

    fn reject(&self) -> BulkheadError {
        self.config.event_listeners.emit(&BulkheadEvent::CallRejected {
            command_key: self.config.name.clone(),
            timestamp: Instant::now(),
            max_concurrent_calls: self.config.max_concurrent_calls,
            max_queued_calls: self.config.max_queued_calls,
        });

        #[cfg(feature = "tracing")]
        tracing::warn!(
            command = %self.config.name,
            max_concurrent_calls = self.config.max_concurrent_calls,
            max_queued_calls = self.config.max_queued_calls,
            "Bulkhead full, call rejected"
        );

        #[cfg(feature = "metrics")]
        counter!("bulkhead_calls_rejected_total", "command" => self.config.name.to_string())
            .increment(1);

        BulkheadError::BulkheadFull {
            max_concurrent_calls: self.config.max_concurrent_calls,
            max_queued_calls: self.config.max_queued_calls,
        }
    }

    fn wait_timed_out(&self, waited: std::time::Duration) -> BulkheadError {
        self.config.event_listeners.emit(&BulkheadEvent::WaitTimedOut {
            command_key: self.config.name.clone(),
            timestamp: Instant::now(),
            waited,
        });

        #[cfg(feature = "tracing")]
        tracing::warn!(command = %self.config.name, ?waited, "Timed out waiting for bulkhead slot");

        #[cfg(feature = "metrics")]
        counter!("bulkhead_calls_rejected_total", "command" => self.config.name.to_string())
            .increment(1);

        BulkheadError::Timeout { waited }
    }
}

/// Queue position held while waiting; releases itself on drop, including
/// when the waiting future is cancelled.
struct QueueSlot {
    queued: Arc<AtomicUsize>,
}

impl Drop for QueueSlot {
    fn drop(&mut self) {
        self.queued.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A held bulkhead slot. Dropping it releases the slot.
#[derive(Debug)]
pub struct BulkheadPermit {
    permit: Option<OwnedSemaphorePermit>,
    #[cfg(feature = "metrics")]
    semaphore: Arc<Semaphore>,
    config: Arc<BulkheadConfig>,
}

impl BulkheadPermit {
    /// The command whose slot this is.
    pub fn command_key(&self) -> &CommandKey {
        &self.config.name
    }
}

impl Drop for BulkheadPermit {
    fn drop(&mut self) {
        drop(self.permit.take());

        #[cfg(feature = "metrics")]
        {
            let active = self
                .config
                .max_concurrent_calls
                .saturating_sub(self.semaphore.available_permits());
            gauge!("bulkhead_concurrent_calls", "command" => self.config.name.to_string())
                .set(active as f64);
        }
    }
}
