//! The command executor.

use crate::config::{CommandConfig, Isolation};
use crate::events::CommandEvent;
use crate::registry::{CommandHandle, CommandRegistry};
use command_resilience_bulkhead::Bulkhead;
use command_resilience_circuitbreaker::{CallPermission, CircuitBreaker};
use command_resilience_core::{CommandError, CommandKey, Outcome, PrimaryFailure};
use futures::FutureExt;
#[cfg(feature = "metrics")]
use metrics::counter;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Runs commands behind a circuit breaker, a bulkhead, a timeout and a fallback.
///
/// Cloning is cheap; clones share one [`CommandRegistry`].
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    registry: Arc<CommandRegistry>,
}

impl CommandExecutor {
    /// Creates an executor whose unregistered commands use the default config.
    pub fn new() -> Self {
        Self::with_defaults(CommandConfig::default())
    }

    /// Creates an executor whose unregistered commands use `defaults`.
    pub fn with_defaults(defaults: CommandConfig) -> Self {
        Self {
            registry: Arc::new(CommandRegistry::new(defaults)),
        }
    }

    /// Registers the config for a command.
    ///
    /// Only the first registration of a key takes effect. Later ones, and
    /// registrations after the key has executed, are ignored with a warning
    /// and return `false`.
    pub fn register(&self, key: impl Into<CommandKey>, config: CommandConfig) -> bool {
        self.registry.register(key, config)
    }

    /// The shared registry, for metrics publication and inspection.
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// The circuit breaker for `key`, created on first use.
    pub fn circuit_breaker(&self, key: impl Into<CommandKey>) -> Arc<CircuitBreaker> {
        Arc::clone(self.registry.get_or_create(&key.into()).circuit_breaker())
    }

    /// The bulkhead for `key`, created on first use.
    pub fn bulkhead(&self, key: impl Into<CommandKey>) -> Arc<Bulkhead> {
        Arc::clone(self.registry.get_or_create(&key.into()).bulkhead())
    }

    /// Executes `primary` under the command's protections, substituting
    /// `fallback` when the primary fails, times out, is short-circuited or
    /// is rejected by the bulkhead.
    ///
    /// ```rust
    /// use command_resilience_executor::CommandExecutor;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let executor = CommandExecutor::new();
    ///
    /// let value = executor
    ///     .execute(
    ///         "greeting",
    ///         || async { Err::<String, String>("upstream down".into()) },
    ///         || async { Ok("hello from cache".to_string()) },
    ///     )
    ///     .await;
    ///
    /// assert_eq!(value.unwrap(), "hello from cache");
    /// # }
    /// ```
    pub async fn execute<T, E, P, Fut, F, FutB>(
        &self,
        key: impl Into<CommandKey>,
        primary: P,
        fallback: F,
    ) -> Result<T, CommandError<E>>
    where
        P: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
        F: FnOnce() -> FutB,
        FutB: Future<Output = Result<T, E>>,
    {
        self.execute_with(key, primary, move |_: &PrimaryFailure<E>| fallback())
            .await
    }

    /// Like [`execute`](Self::execute), but the fallback receives the reason
    /// the primary path failed.
    pub async fn execute_with<T, E, P, Fut, F, FutB>(
        &self,
        key: impl Into<CommandKey>,
        primary: P,
        fallback: F,
    ) -> Result<T, CommandError<E>>
    where
        P: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
        F: FnOnce(&PrimaryFailure<E>) -> FutB,
        FutB: Future<Output = Result<T, E>>,
    {
        let key = key.into();
        let handle = self.registry.get_or_create(&key);
        let started = Instant::now();

        let failure = match run_primary(&handle, primary, started).await {
            Ok(value) => return Ok(value),
            Err(failure) => failure,
        };

        if !handle.config().fallback_enabled() {
            #[cfg(feature = "tracing")]
            tracing::debug!(command = %key, outcome = %failure.outcome(), "Fallback disabled");

            return Err(CommandError::FallbackDisabled { primary: failure });
        }

        let fallback_future = fallback(&failure);
        match fallback_future.await {
            Ok(value) => {
                record(&handle, Outcome::FallbackSuccess, started);
                Ok(value)
            }
            Err(error) => {
                record(&handle, Outcome::FallbackFailure, started);

                #[cfg(feature = "tracing")]
                tracing::warn!(command = %key, primary = %failure.outcome(), "Fallback failed");

                Err(CommandError::FallbackFailed {
                    primary: failure,
                    fallback: error,
                })
            }
        }
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Breaker check, bulkhead, timed primary. Records exactly one primary outcome.
async fn run_primary<T, E, P, Fut>(
    handle: &CommandHandle,
    primary: P,
    started: Instant,
) -> Result<T, PrimaryFailure<E>>
where
    P: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let breaker = handle.circuit_breaker();
    let permission = breaker.allow(started);

    if permission == CallPermission::ShortCircuit {
        record(handle, Outcome::ShortCircuited, started);
        return Err(PrimaryFailure::ShortCircuited {
            key: handle.key().clone(),
        });
    }

    let mut probe = ProbeGuard::new(breaker, permission);

    let permit = match handle.bulkhead().acquire().await {
        Ok(permit) => permit,
        Err(_) => {
            probe.disarm();
            complete(handle, Outcome::RejectedByBulkhead, permission, started);
            return Err(PrimaryFailure::BulkheadRejected {
                key: handle.key().clone(),
                max_concurrent_calls: handle.bulkhead().max_concurrent_calls(),
                max_queued_calls: handle.bulkhead().max_queued_calls(),
            });
        }
    };

    let timeout = handle.config().execution_timeout();
    let result = match handle.config().isolation() {
        Isolation::Task => run_on_task(primary(), timeout).await,
        Isolation::Inline => run_inline(primary(), timeout).await,
    };
    drop(permit);
    probe.disarm();

    let outcome = match &result {
        Ok(_) => Outcome::Success,
        Err(failure) => failure.outcome(),
    };

    #[cfg(feature = "tracing")]
    {
        if outcome == Outcome::Timeout {
            tracing::warn!(command = %handle.key(), ?timeout, "Command timed out");
        }
    }

    complete(handle, outcome, permission, started);
    result
}

async fn run_on_task<T, E, Fut>(future: Fut, timeout: Duration) -> Result<T, PrimaryFailure<E>>
where
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let mut task = AbortOnDrop(tokio::spawn(future));
    match tokio::time::timeout(timeout, &mut task.0).await {
        Ok(Ok(result)) => result.map_err(PrimaryFailure::Failure),
        Ok(Err(join_error)) => Err(PrimaryFailure::Panicked {
            message: if join_error.is_panic() {
                panic_message(join_error.into_panic())
            } else {
                "primary task was cancelled".to_string()
            },
        }),
        // The guard aborts the task when it goes out of scope.
        Err(_) => Err(PrimaryFailure::Timeout { timeout }),
    }
}

async fn run_inline<T, E, Fut>(future: Fut, timeout: Duration) -> Result<T, PrimaryFailure<E>>
where
    Fut: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(timeout, AssertUnwindSafe(future).catch_unwind()).await {
        Ok(Ok(result)) => result.map_err(PrimaryFailure::Failure),
        Ok(Err(payload)) => Err(PrimaryFailure::Panicked {
            message: panic_message(payload),
        }),
        Err(_) => Err(PrimaryFailure::Timeout { timeout }),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "primary action panicked".to_string()
    }
}

/// Records a primary outcome and reports it to the breaker.
fn complete(handle: &CommandHandle, outcome: Outcome, permission: CallPermission, started: Instant) {
    let now = record(handle, outcome, started);
    handle.circuit_breaker().on_outcome(outcome, permission, now);
}

/// Records one outcome in the window, notifying listeners and metrics.
fn record(handle: &CommandHandle, outcome: Outcome, started: Instant) -> Instant {
    let now = Instant::now();
    handle.window().record(outcome, now);

    let elapsed = now.saturating_duration_since(started);
    handle
        .config()
        .event_listeners
        .emit(&CommandEvent::OutcomeRecorded {
            command_key: handle.key().clone(),
            timestamp: now,
            outcome,
            elapsed,
        });

    #[cfg(feature = "tracing")]
    tracing::debug!(command = %handle.key(), outcome = %outcome, ?elapsed, "Outcome recorded");

    #[cfg(feature = "metrics")]
    counter!(
        "command_executions_total",
        "command" => handle.key().to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    now
}

/// Aborts the spawned primary when the caller stops waiting for it.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Holds the half-open probe slot until the probe's outcome is reported.
///
/// If the executing future is dropped first, the probe is abandoned and the
/// circuit reopens instead of staying half-open.
struct ProbeGuard<'a> {
    breaker: Option<&'a CircuitBreaker>,
}

impl<'a> ProbeGuard<'a> {
    fn new(breaker: &'a CircuitBreaker, permission: CallPermission) -> Self {
        Self {
            breaker: (permission == CallPermission::Probe).then_some(breaker),
        }
    }

    fn disarm(&mut self) {
        self.breaker = None;
    }
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if let Some(breaker) = self.breaker.take() {
            breaker.abandon_probe(Instant::now());
        }
    }
}
