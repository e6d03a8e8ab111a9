//! Destinations for published snapshots.

use crate::MetricsSnapshot;
use command_resilience_core::CommandKey;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Receives the snapshots of every publication tick.
///
/// A running publisher calls sinks on tokio's blocking pool, one tick at a
/// time, so a sink may perform blocking I/O. A sink that is still busy when
/// the next tick is due makes the publisher skip that tick.
pub trait MetricsSink: Send + Sync {
    /// Handles one tick's snapshots, ordered by command key.
    fn publish(&self, snapshots: &[MetricsSnapshot]);
}

impl<S: MetricsSink + ?Sized> MetricsSink for Arc<S> {
    fn publish(&self, snapshots: &[MetricsSnapshot]) {
        (**self).publish(snapshots)
    }
}

/// Push stream of snapshots over a tokio broadcast channel.
///
/// A subscriber that falls behind loses the oldest ticks and sees
/// `RecvError::Lagged`; it never slows the publisher down.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<MetricsSnapshot>,
}

impl BroadcastSink {
    /// Creates a sink buffering up to `capacity` snapshots per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Opens a new subscription starting at the next tick.
    pub fn subscribe(&self) -> broadcast::Receiver<MetricsSnapshot> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl MetricsSink for BroadcastSink {
    fn publish(&self, snapshots: &[MetricsSnapshot]) {
        for snapshot in snapshots {
            // No subscribers is not an error.
            let _ = self.sender.send(snapshot.clone());
        }
    }
}

/// Keeps the most recent snapshot of every command for request/response access.
#[derive(Debug, Clone, Default)]
pub struct LatestSnapshots {
    latest: Arc<RwLock<HashMap<CommandKey, MetricsSnapshot>>>,
}

impl LatestSnapshots {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last published snapshot for `key`.
    pub fn get(&self, key: &str) -> Option<MetricsSnapshot> {
        self.latest.read().get(key).cloned()
    }

    /// Every command's last snapshot, ordered by key.
    pub fn all(&self) -> Vec<MetricsSnapshot> {
        let mut all: Vec<_> = self.latest.read().values().cloned().collect();
        all.sort_by(|a, b| a.command_key.cmp(&b.command_key));
        all
    }
}

impl MetricsSink for LatestSnapshots {
    fn publish(&self, snapshots: &[MetricsSnapshot]) {
        let mut latest = self.latest.write();
        for snapshot in snapshots {
            latest.insert(snapshot.command_key.clone(), snapshot.clone());
        }
    }
}

/// Writes each snapshot as one line of JSON.
///
/// Write errors are dropped (and logged with the `tracing` feature) so a
/// broken pipe cannot stop publication to other sinks.
#[derive(Debug)]
pub struct NdjsonSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> NdjsonSink<W> {
    /// Wraps `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_all(&self, snapshots: &[MetricsSnapshot]) -> std::io::Result<()> {
        // One buffered write per tick.
        let mut batch = Vec::with_capacity(snapshots.len() * 384);
        for snapshot in snapshots {
            serde_json::to_writer(&mut batch, snapshot)?;
            batch.push(b'\n');
        }

        let mut writer = self.writer.lock();
        writer.write_all(&batch)?;
        writer.flush()
    }
}

impl<W: Write + Send> MetricsSink for NdjsonSink<W> {
    fn publish(&self, snapshots: &[MetricsSnapshot]) {
        if let Err(_error) = self.write_all(snapshots) {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_error, "Failed to write metrics snapshots");
        }
    }
}

/// Mirrors snapshots into `metrics` gauges labelled by command.
///
/// Gauges: `command_window_requests`, `command_window_errors`,
/// `command_error_percentage`, `command_bulkhead_queued`.
#[cfg(feature = "metrics")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsFacadeSink;

#[cfg(feature = "metrics")]
impl MetricsSink for MetricsFacadeSink {
    fn publish(&self, snapshots: &[MetricsSnapshot]) {
        use metrics::gauge;

        for snapshot in snapshots {
            let command = snapshot.command_key.to_string();
            gauge!("command_window_requests", "command" => command.clone())
                .set(snapshot.total_requests as f64);
            gauge!("command_window_errors", "command" => command.clone())
                .set(snapshot.error_count as f64);
            gauge!("command_error_percentage", "command" => command.clone())
                .set(snapshot.error_percentage);
            gauge!("command_bulkhead_queued", "command" => command)
                .set(snapshot.bulkhead_queued as f64);
        }
    }
}
