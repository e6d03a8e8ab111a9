//! Periodic health snapshots for commands.
//!
//! A [`MetricsPublisher`] walks a [`CommandRegistry`] on a fixed interval,
//! captures one [`MetricsSnapshot`] per command and hands the batch to its
//! [`MetricsSink`]s. Snapshots carry the rolling-window counts, the circuit
//! state and the bulkhead occupancy of a command.
//!
//! Provided sinks:
//! - [`BroadcastSink`]: push stream over a tokio broadcast channel
//! - [`LatestSnapshots`]: last snapshot per command, for polling
//! - [`NdjsonSink`]: newline-delimited JSON to any writer
//! - `MetricsFacadeSink` (feature `metrics`): gauges in the `metrics` crate
//!
//! ```rust
//! use command_resilience_executor::CommandExecutor;
//! use command_resilience_metrics::{MetricsPublisher, NdjsonSink};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let executor = CommandExecutor::new();
//! let _ = executor
//!     .execute("search", || async { Err::<u32, _>("down") }, || async { Ok(0) })
//!     .await;
//!
//! let publisher = MetricsPublisher::new(Arc::clone(executor.registry()), Duration::from_secs(1))
//!     .with_sink(NdjsonSink::new(std::io::sink()));
//!
//! let snapshots = publisher.publish_now();
//! assert_eq!(snapshots[0].error_count, 1);
//! # }
//! ```
//!
//! [`CommandRegistry`]: command_resilience_executor::CommandRegistry

mod publisher;
mod sink;
mod snapshot;

pub use publisher::{MetricsPublisher, PublisherHandle};
#[cfg(feature = "metrics")]
pub use sink::MetricsFacadeSink;
pub use sink::{BroadcastSink, LatestSnapshots, MetricsSink, NdjsonSink};
pub use snapshot::MetricsSnapshot;
