//! Rolling window of command outcomes.
//!
//! Time is partitioned into `num_buckets` slices of equal width covering the
//! configured window. Each bucket counts outcomes per [`Outcome`]; buckets
//! whose end time falls at or before `now - window` are evicted, so a
//! snapshot only reflects recent traffic and memory stays bounded.
//!
//! ```
//! use command_resilience_core::Outcome;
//! use command_resilience_window::RollingWindow;
//! use std::time::Duration;
//! use tokio::time::Instant;
//!
//! let start = Instant::now();
//! let window = RollingWindow::starting_at(Duration::from_secs(10), 10, start);
//!
//! window.record(Outcome::Success, start);
//! window.record(Outcome::Failure, start + Duration::from_secs(3));
//!
//! let snapshot = window.snapshot(start + Duration::from_secs(5));
//! assert_eq!(snapshot.total_requests(), 2);
//! assert_eq!(snapshot.error_percentage(), 50.0);
//!
//! // Twenty seconds later both buckets have aged out.
//! let later = window.snapshot(start + Duration::from_secs(25));
//! assert_eq!(later.total_requests(), 0);
//! ```
//!
//! [`Outcome`]: command_resilience_core::Outcome

mod counts;
mod window;

pub use counts::OutcomeCounts;
pub use window::{RollingWindow, WindowSnapshot};
