//! Fault- and latency-tolerant command execution.
//!
//! A command is an external call identified by a [`CommandKey`]. Every
//! invocation of a key goes through the same protections:
//!
//! 1. the key's circuit breaker decides whether the call may run at all
//! 2. the key's bulkhead bounds how many calls run at once
//! 3. the primary action runs under the execution timeout
//! 4. the outcome is recorded in the key's rolling window
//! 5. on failure, timeout, short-circuit or rejection the fallback runs
//!
//! ## Basic Example
//!
//! ```rust
//! use command_resilience_executor::{CommandConfig, CommandExecutor};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let executor = CommandExecutor::new();
//! executor.register(
//!     "recommendations",
//!     CommandConfig::builder()
//!         .execution_timeout(Duration::from_millis(200))
//!         .bulkhead_capacity(20)
//!         .request_volume_threshold(10)
//!         .build()
//!         .unwrap(),
//! );
//!
//! let items = executor
//!     .execute(
//!         "recommendations",
//!         || async { Ok::<_, std::io::Error>(vec!["personalised"]) },
//!         || async { Ok(vec!["bestsellers"]) },
//!     )
//!     .await
//!     .unwrap();
//! assert_eq!(items, vec!["personalised"]);
//! # }
//! ```
//!
//! ## Inspecting the Failure
//!
//! [`CommandExecutor::execute_with`] hands the fallback the
//! [`PrimaryFailure`] that triggered it:
//!
//! ```rust
//! use command_resilience_executor::CommandExecutor;
//! use command_resilience_core::PrimaryFailure;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let executor = CommandExecutor::new();
//! let answer = executor
//!     .execute_with(
//!         "lookup",
//!         || async { Err::<u32, String>("connection refused".into()) },
//!         |failure: &PrimaryFailure<String>| {
//!             let stale_ok = failure.is_failure();
//!             async move { if stale_ok { Ok(0) } else { Err("no fallback".into()) } }
//!         },
//!     )
//!     .await;
//! assert_eq!(answer.unwrap(), 0);
//! # }
//! ```
//!
//! ## Feature Flags
//! - `tracing`: structured logs for outcomes, timeouts and registration
//! - `metrics`: `command_executions_total{command, outcome}` plus the breaker
//!   and bulkhead gauges
//! - `serde`: deserialize [`CommandSettings`]
//!
//! [`CommandKey`]: command_resilience_core::CommandKey
//! [`PrimaryFailure`]: command_resilience_core::PrimaryFailure

mod config;
mod events;
mod executor;
mod layer;
mod registry;

pub use config::{CommandConfig, CommandConfigBuilder, CommandSettings, ConfigError, Isolation};
pub use events::CommandEvent;
pub use executor::CommandExecutor;
pub use layer::{CommandLayer, CommandService};
pub use registry::{CommandHandle, CommandRegistry};

pub use command_resilience_core::{CommandError, CommandKey, Outcome, PrimaryFailure};
