//! Core types shared by every command-resilience crate.
//!
//! - [`CommandKey`]: the identity grouping a circuit, a bulkhead and a metric stream
//! - [`Outcome`]: the tagged result of one invocation attempt
//! - [`events`]: listener infrastructure used by the breaker, bulkhead and executor
//! - [`error`]: the primary-path failure taxonomy and the caller-visible [`CommandError`]

pub mod error;
pub mod events;
mod key;
mod outcome;

pub use error::{CommandError, PrimaryFailure};
pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
pub use key::CommandKey;
pub use outcome::Outcome;
