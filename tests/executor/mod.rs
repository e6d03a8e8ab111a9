//! End-to-end tests for the command executor.
//!
//! Test organization:
//! - scenario.rs: Open, short-circuit, probe, close walkthrough
//! - circuit.rs: Threshold, sleep window and probe behaviour
//! - bulkhead.rs: Capacity, queueing and key isolation
//! - fallback.rs: Which outcomes route to the fallback
//! - window.rs: Rolling window expiry seen through the executor
//! - layer.rs: Tower integration
//! - publisher.rs: Health snapshots of live commands
//! - settings.rs: Configuration from serialized settings

mod circuit;
mod fallback;
mod publisher;
mod scenario;
mod settings;

use command_resilience_executor::{CommandConfigBuilder, CommandExecutor};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Executor whose commands all use `builder`'s config.
pub fn executor(builder: CommandConfigBuilder) -> CommandExecutor {
    CommandExecutor::with_defaults(builder.build().unwrap())
}

pub async fn succeed() -> Result<&'static str, String> {
    Ok("primary")
}

pub async fn fail() -> Result<&'static str, String> {
    Err("dependency down".to_string())
}

pub async fn fallback() -> Result<&'static str, String> {
    Ok("fallback")
}

/// Fault injection: every `n`th call fails.
#[derive(Clone)]
pub struct FailEvery {
    n: usize,
    calls: Arc<AtomicUsize>,
}

impl FailEvery {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call(&self) -> impl std::future::Future<Output = Result<&'static str, String>> + Send + 'static {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let n = self.n;
        async move {
            if call % n == 0 {
                Err(format!("injected failure on call {}", call))
            } else {
                Ok("primary")
            }
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Tracks peak concurrent primaries.
#[derive(Default)]
pub struct ConcurrencyTracker {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn enter(&self) {
        let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}
