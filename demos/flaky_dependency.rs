//! A dependency that fails every fifth call, then goes down entirely.
//! Run with: cargo run --example flaky_dependency
//! With logs: RUST_LOG=debug cargo run --example flaky_dependency

use command_resilience::publisher::{LatestSnapshots, MetricsPublisher};
use command_resilience::{CommandConfig, CommandExecutor};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let executor = CommandExecutor::new();
    executor.register(
        "inventory",
        CommandConfig::builder()
            .request_volume_threshold(10)
            .error_threshold_percentage(50.0)
            .sleep_window(Duration::from_secs(1))
            .execution_timeout(Duration::from_millis(100))
            .on_state_transition(|from, to| println!("circuit {} -> {}", from, to))
            .build()
            .unwrap(),
    );

    let latest = LatestSnapshots::new();
    let _publisher = MetricsPublisher::new(Arc::clone(executor.registry()), Duration::from_millis(250))
        .with_sink(latest.clone())
        .start();

    let calls = Arc::new(AtomicUsize::new(0));
    let down = Arc::new(AtomicBool::new(false));

    for round in 1..=60 {
        if round == 20 {
            println!("-- dependency goes down --");
            down.store(true, Ordering::SeqCst);
        }
        if round == 45 {
            println!("-- dependency recovers --");
            down.store(false, Ordering::SeqCst);
        }

        let calls = Arc::clone(&calls);
        let down = Arc::clone(&down);
        let stock = executor
            .execute(
                "inventory",
                move || async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if down.load(Ordering::SeqCst) || n % 5 == 0 {
                        Err(format!("call {} failed", n))
                    } else {
                        Ok(n as u64)
                    }
                },
                || async { Ok(0) },
            )
            .await;
        println!("round {:>2}: {:?}", round, stock);

        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    if let Some(snapshot) = latest.get("inventory") {
        println!("{}", snapshot.to_json_line().unwrap_or_default().trim_end());
    }
}
