//! Rolling window stress tests

use command_resilience_core::Outcome;
use command_resilience_window::RollingWindow;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Test: Millions of writes spread over many window lengths
#[test]
#[ignore]
fn stress_window_long_run() {
    let epoch = Instant::now();
    let window = RollingWindow::starting_at(Duration::from_secs(10), 10, epoch);

    // One write per millisecond of simulated time over 1000 seconds.
    for ms in 0..1_000_000u64 {
        let outcome = if ms % 10 == 0 {
            Outcome::Failure
        } else {
            Outcome::Success
        };
        window.record(outcome, epoch + Duration::from_millis(ms));
    }

    let snapshot = window.snapshot(epoch + Duration::from_millis(999_999));
    // 10 live buckets plus the partially expired one.
    assert!(snapshot.total_requests() <= 11_000);
    assert!(snapshot.total_requests() >= 10_000);
    assert_eq!(snapshot.error_percentage(), 10.0);
}

/// Test: Concurrent writers and readers on one window
#[test]
#[ignore]
fn stress_window_concurrent_threads() {
    let epoch = Instant::now();
    let window = Arc::new(RollingWindow::starting_at(Duration::from_secs(60), 60, epoch));

    let writers: Vec<_> = (0..8)
        .map(|_| {
            let window = Arc::clone(&window);
            std::thread::spawn(move || {
                for i in 0..100_000u64 {
                    window.record(Outcome::Success, epoch + Duration::from_micros(i));
                }
            })
        })
        .collect();

    let reader = {
        let window = Arc::clone(&window);
        std::thread::spawn(move || {
            for _ in 0..10_000 {
                let total = window
                    .snapshot(epoch + Duration::from_secs(1))
                    .total_requests();
                assert!(total <= 800_000);
            }
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    reader.join().unwrap();

    assert_eq!(
        window.snapshot(epoch + Duration::from_secs(1)).total_requests(),
        800_000
    );
}
