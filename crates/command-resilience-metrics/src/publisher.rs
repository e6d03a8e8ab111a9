use crate::{MetricsSink, MetricsSnapshot};
use command_resilience_executor::CommandRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Periodically snapshots every registered command and hands the snapshots
/// to its sinks.
///
/// The publisher only reads command state; nothing it does feeds back into
/// execution. The running task delivers each tick on tokio's blocking pool
/// and waits for it before the next tick, so a slow or disconnected sink
/// only delays publication and never holds up a runtime worker.
///
/// # Example
///
/// ```rust
/// use command_resilience_executor::CommandExecutor;
/// use command_resilience_metrics::{LatestSnapshots, MetricsPublisher};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let executor = CommandExecutor::new();
/// let latest = LatestSnapshots::new();
///
/// let handle = MetricsPublisher::new(Arc::clone(executor.registry()), Duration::from_secs(1))
///     .with_sink(latest.clone())
///     .start();
///
/// let _ = executor
///     .execute("users", || async { Ok::<_, String>(1) }, || async { Ok(0) })
///     .await;
///
/// handle.stop();
/// # }
/// ```
#[derive(Clone)]
pub struct MetricsPublisher {
    registry: Arc<CommandRegistry>,
    interval: Duration,
    sinks: Vec<Arc<dyn MetricsSink>>,
}

impl MetricsPublisher {
    /// Creates a publisher ticking every `interval`.
    ///
    /// # Panics
    ///
    /// [`start`](Self::start) panics if `interval` is zero.
    pub fn new(registry: Arc<CommandRegistry>, interval: Duration) -> Self {
        Self {
            registry,
            interval,
            sinks: Vec::new(),
        }
    }

    /// Adds a sink. Sinks receive each tick in the order they were added.
    pub fn with_sink<S>(mut self, sink: S) -> Self
    where
        S: MetricsSink + 'static,
    {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// The publication interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Captures every registered command now and publishes to all sinks.
    ///
    /// Sinks run on the calling thread. A key that was registered but has
    /// not executed yet gets its state built here and reports an idle,
    /// closed circuit.
    pub fn publish_now(&self) -> Vec<MetricsSnapshot> {
        let snapshots = self.capture();
        for sink in &self.sinks {
            sink.publish(&snapshots);
        }
        snapshots
    }

    fn capture(&self) -> Vec<MetricsSnapshot> {
        let now = Instant::now();
        let snapshots: Vec<_> = self
            .registry
            .keys()
            .iter()
            .map(|key| MetricsSnapshot::capture(&self.registry.get_or_create(key), now))
            .collect();

        #[cfg(feature = "tracing")]
        tracing::trace!(commands = snapshots.len(), "Publishing metrics snapshots");

        snapshots
    }

    /// One tick of the running task: capture on the runtime, deliver off it.
    async fn tick(&self) {
        let snapshots = self.capture();
        if self.sinks.is_empty() {
            return;
        }

        let sinks = self.sinks.clone();
        let delivery = tokio::task::spawn_blocking(move || {
            for sink in &sinks {
                sink.publish(&snapshots);
            }
        });

        if let Err(_error) = delivery.await {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_error, "Metrics sink panicked; tick dropped");
        }
    }

    /// Spawns the periodic publication task.
    ///
    /// The first tick fires immediately. Ticks missed because the runtime
    /// was busy, or because a sink was still writing, are skipped rather
    /// than replayed.
    pub fn start(&self) -> PublisherHandle {
        let publisher = self.clone();

        #[cfg(feature = "tracing")]
        tracing::debug!(interval = ?publisher.interval, sinks = publisher.sinks.len(), "Starting metrics publisher");

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(publisher.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                publisher.tick().await;
            }
        });

        PublisherHandle { task: Some(task) }
    }
}

impl std::fmt::Debug for MetricsPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsPublisher")
            .field("interval", &self.interval)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

/// Owns a running publication task.
///
/// Dropping the handle stops publication.
#[derive(Debug)]
pub struct PublisherHandle {
    task: Option<JoinHandle<()>>,
}

impl PublisherHandle {
    /// Stops publication.
    pub fn stop(mut self) {
        self.abort();
    }

    /// Returns true while the task is running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PublisherHandle {
    fn drop(&mut self) {
        self.abort();
    }
}
