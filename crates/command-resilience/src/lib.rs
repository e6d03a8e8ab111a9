//! Fault- and latency-tolerant command execution.
//!
//! `command-resilience` protects calls to external dependencies. Each call is
//! a *command* identified by a key, and every key gets its own:
//!
//! - **Circuit breaker**: stops calling a dependency whose error rate over a
//!   rolling window crosses a threshold, then probes it after a sleep window
//! - **Bulkhead**: bounds how many calls to the dependency run at once
//! - **Timeout**: abandons calls that outlive the execution timeout
//! - **Fallback**: substitutes a value whenever the primary path fails
//!
//! A separate publisher periodically snapshots every command's health.
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! command-resilience = { version = "0.1", features = ["tracing"] }
//! ```
//!
//! Enable `full` to re-export every building block as a module.
//!
//! # Example
//!
//! ```rust
//! use command_resilience::{CommandConfig, CommandExecutor};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let executor = CommandExecutor::new();
//! executor.register(
//!     "pricing",
//!     CommandConfig::builder()
//!         .execution_timeout(Duration::from_millis(250))
//!         .error_threshold_percentage(25.0)
//!         .build()
//!         .unwrap(),
//! );
//!
//! let price = executor
//!     .execute(
//!         "pricing",
//!         || async { Err::<u64, String>("pricing service unavailable".into()) },
//!         || async { Ok(999) },
//!     )
//!     .await
//!     .unwrap();
//!
//! assert_eq!(price, 999);
//! # }
//! ```
//!
//! # Individual Crates
//!
//! - `command-resilience-core` (keys, outcomes, errors, events)
//! - `command-resilience-window`
//! - `command-resilience-circuitbreaker`
//! - `command-resilience-bulkhead`
//! - `command-resilience-executor`
//! - `command-resilience-metrics`

pub mod observability;

pub use command_resilience_core as core;

pub use command_resilience_executor::{
    CommandConfig, CommandConfigBuilder, CommandError, CommandEvent, CommandExecutor,
    CommandHandle, CommandKey, CommandLayer, CommandRegistry, CommandService, CommandSettings,
    ConfigError, Isolation, Outcome, PrimaryFailure,
};

#[cfg(feature = "bulkhead")]
pub use command_resilience_bulkhead as bulkhead;

#[cfg(feature = "circuitbreaker")]
pub use command_resilience_circuitbreaker as circuitbreaker;

#[cfg(feature = "publisher")]
pub use command_resilience_metrics as publisher;

#[cfg(feature = "window")]
pub use command_resilience_window as window;
