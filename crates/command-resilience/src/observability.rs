//! Observability guide: logs, metrics, events and health snapshots.

/// Structured logging
pub mod tracing {
    //! # Tracing
    //!
    //! Enable the `tracing` feature and install any subscriber:
    //!
    //! ```rust,ignore
    //! tracing_subscriber::fmt()
    //!     .with_env_filter("command_resilience=debug")
    //!     .init();
    //! ```
    //!
    //! Every record carries a `command` field with the command key.
    //!
    //! | Level | Event |
    //! |-------|-------|
    //! | `info` | circuit state transitions (`from`, `to`) |
    //! | `warn` | timeouts, failed fallbacks, duplicate registrations |
    //! | `debug` | outcomes, short circuits, probes, queued calls |
    //! | `trace` | permits, publisher ticks |
}

/// Metrics facade
pub mod metrics {
    //! # Metrics
    //!
    //! With the `metrics` feature the components report through the
    //! [`metrics`](https://docs.rs/metrics) facade. Install any recorder,
    //! for example `metrics-exporter-prometheus`.
    //!
    //! | Metric | Type | Labels |
    //! |--------|------|--------|
    //! | `command_executions_total` | counter | `command`, `outcome` |
    //! | `circuitbreaker_transitions_total` | counter | `command`, `from`, `to` |
    //! | `circuitbreaker_state` | gauge | `command` (0 closed, 1 open, 2 half-open) |
    //! | `bulkhead_concurrent_calls` | gauge | `command` |
    //! | `bulkhead_calls_rejected_total` | counter | `command` |
    //!
    //! `MetricsFacadeSink` adds the rolling-window gauges
    //! `command_window_requests`, `command_window_errors`,
    //! `command_error_percentage` and `command_bulkhead_queued` on each
    //! publisher tick.
}

/// Event listeners
pub mod events {
    //! # Event Listeners
    //!
    //! Listeners are plain closures registered on the config builder. They
    //! run synchronously on the calling task, so keep them short.
    //!
    //! ```rust
    //! use command_resilience::CommandConfig;
    //!
    //! let config = CommandConfig::builder()
    //!     .on_outcome(|outcome| println!("outcome: {}", outcome))
    //!     .on_state_transition(|from, to| println!("circuit {} -> {}", from, to))
    //!     .on_bulkhead_rejected(|| println!("bulkhead full"))
    //!     .build()
    //!     .unwrap();
    //! # let _ = config;
    //! ```
    //!
    //! A panicking listener is caught and does not affect the command or
    //! the other listeners.
}

/// Health snapshots
pub mod snapshots {
    //! # Health Snapshots
    //!
    //! The publisher (feature `publisher`, on by default) captures one
    //! snapshot per command every interval:
    //!
    //! ```rust,ignore
    //! use command_resilience::publisher::{BroadcastSink, MetricsPublisher};
    //!
    //! let stream = BroadcastSink::new(64);
    //! let mut rx = stream.subscribe();
    //! let _running = MetricsPublisher::new(Arc::clone(executor.registry()), Duration::from_secs(1))
    //!     .with_sink(stream)
    //!     .start();
    //!
    //! while let Ok(snapshot) = rx.recv().await {
    //!     println!("{}", snapshot.to_json_line()?);
    //! }
    //! ```
    //!
    //! Publication only reads command state, so a slow or absent consumer
    //! never affects execution.
}
