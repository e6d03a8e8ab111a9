//! Property tests for the bulkhead.
//!
//! Invariants tested:
//! - Concurrent permits never exceed max_concurrent_calls
//! - A burst admits exactly capacity plus queue and rejects the rest
//! - All permits are released afterwards

use command_resilience_bulkhead::{Bulkhead, BulkheadConfig};
use futures::future::join_all;
use proptest::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: a simultaneous burst is split into admitted and rejected calls
    #[test]
    fn burst_respects_capacity_and_queue(
        capacity in 1usize..=8,
        queue in 0usize..=8,
        burst in 1usize..=40,
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        rt.block_on(async {
            let bulkhead = Bulkhead::new(
                BulkheadConfig::builder()
                    .max_concurrent_calls(capacity)
                    .max_queued_calls(queue)
                    .max_wait_duration(Some(Duration::from_secs(10)))
                    .build(),
            );
            let current = Arc::new(AtomicUsize::new(0));
            let peak = Arc::new(AtomicUsize::new(0));

            let calls = (0..burst).map(|_| {
                let bulkhead = &bulkhead;
                let current = Arc::clone(&current);
                let peak = Arc::clone(&peak);
                async move {
                    let permit = bulkhead.acquire().await?;
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    drop(permit);
                    Ok::<_, command_resilience_bulkhead::BulkheadError>(())
                }
            });
            let results = join_all(calls).await;

            let admitted = results.iter().filter(|r| r.is_ok()).count();
            prop_assert_eq!(admitted, burst.min(capacity + queue));
            prop_assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|e| e.is_full()));
            prop_assert!(peak.load(Ordering::SeqCst) <= capacity);
            prop_assert_eq!(bulkhead.active_calls(), 0);
            prop_assert_eq!(bulkhead.queued_calls(), 0);
            Ok(())
        })?;
    }
}
