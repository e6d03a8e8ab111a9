//! Bulkhead isolation for commands.
//!
//! Each command key owns its own [`Bulkhead`], so a saturated dependency can
//! only exhaust its own slots and never starves callers of another command.
//!
//! ## Basic Example
//!
//! ```rust
//! use command_resilience_bulkhead::{Bulkhead, BulkheadConfig};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let bulkhead = Bulkhead::new(
//!     BulkheadConfig::builder()
//!         .name("inventory")
//!         .max_concurrent_calls(10)
//!         .max_queued_calls(5)
//!         .max_wait_duration(Some(Duration::from_millis(250)))
//!         .build(),
//! );
//!
//! match bulkhead.acquire().await {
//!     Ok(_permit) => {
//!         // Call the dependency while holding the permit.
//!     }
//!     Err(e) => eprintln!("rejected: {}", e),
//! }
//! # }
//! ```
//!
//! ## Behavior
//!
//! - A free slot is taken immediately.
//! - With every slot taken, the caller queues if fewer than
//!   `max_queued_calls` callers are already waiting. Waiters are served in
//!   FIFO order as permits are dropped.
//! - Otherwise the call is rejected with [`BulkheadError::BulkheadFull`].
//!   A queued call that outlives `max_wait_duration` fails with
//!   [`BulkheadError::Timeout`].

pub mod bulkhead;
pub mod config;
pub mod error;
pub mod events;

pub use bulkhead::{Bulkhead, BulkheadPermit};
pub use config::{BulkheadConfig, BulkheadConfigBuilder};
pub use error::BulkheadError;
pub use events::BulkheadEvent;
