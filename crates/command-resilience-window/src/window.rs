use crate::counts::OutcomeCounts;
use command_resilience_core::Outcome;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// One time slice of the window.
#[derive(Debug, Clone)]
struct Bucket {
    /// Slice number since the window epoch.
    ordinal: u64,
    counts: OutcomeCounts,
}

#[derive(Debug, Default)]
struct Buckets {
    /// Live buckets in ascending ordinal order.
    live: VecDeque<Bucket>,
    /// Lowest ordinal that may still be written. Everything below was evicted.
    floor: u64,
}

/// Aggregated outcome counts over the live part of a [`RollingWindow`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSnapshot {
    /// Start of the covered horizon (`now - window`, clamped to the epoch).
    pub window_start: Instant,
    /// End of the covered horizon (`now`).
    pub window_end: Instant,
    /// Counts per outcome across live buckets.
    pub counts: OutcomeCounts,
}

impl WindowSnapshot {
    /// Count for one outcome.
    pub fn count(&self, outcome: Outcome) -> u64 {
        self.counts.get(outcome)
    }

    /// See [`OutcomeCounts::total_requests`].
    pub fn total_requests(&self) -> u64 {
        self.counts.total_requests()
    }

    /// See [`OutcomeCounts::error_count`].
    pub fn error_count(&self) -> u64 {
        self.counts.error_count()
    }

    /// See [`OutcomeCounts::error_percentage`].
    pub fn error_percentage(&self) -> f64 {
        self.counts.error_percentage()
    }
}

/// Fixed-duration, fixed-bucket-count sliding counter store.
///
/// Writers from many concurrent invocations share one window per command.
/// All mutation happens under a short, non-async lock, so no update is lost.
/// Timestamps are monotonic; a write aimed at an already-evicted bucket is
/// dropped rather than resurrecting stale data.
#[derive(Debug)]
pub struct RollingWindow {
    epoch: Instant,
    window: Duration,
    bucket_width: Duration,
    num_buckets: usize,
    buckets: Mutex<Buckets>,
}

impl RollingWindow {
    /// Creates a window whose bucket grid starts now.
    ///
    /// # Panics
    ///
    /// Panics if `window` is zero or `num_buckets` is zero. Callers going
    /// through the executor configuration get these checks as a `Result`.
    pub fn new(window: Duration, num_buckets: usize) -> Self {
        Self::starting_at(window, num_buckets, Instant::now())
    }

    /// Creates a window whose bucket grid starts at `epoch`.
    pub fn starting_at(window: Duration, num_buckets: usize, epoch: Instant) -> Self {
        assert!(!window.is_zero(), "rolling window duration must be non-zero");
        assert!(num_buckets > 0, "rolling window needs at least one bucket");

        let bucket_width = window / num_buckets as u32;
        assert!(
            !bucket_width.is_zero(),
            "rolling window is too short for {} buckets",
            num_buckets
        );

        Self {
            epoch,
            window,
            bucket_width,
            num_buckets,
            buckets: Mutex::new(Buckets::default()),
        }
    }

    /// Configured window duration.
    pub fn duration(&self) -> Duration {
        self.window
    }

    /// Configured number of buckets.
    pub fn num_buckets(&self) -> usize {
        self.num_buckets
    }

    /// Width of one bucket.
    pub fn bucket_width(&self) -> Duration {
        self.bucket_width
    }

    /// Records one outcome in the bucket covering `at`.
    ///
    /// Rotates buckets as needed and evicts those that have aged out
    /// relative to `at`. Never fails.
    pub fn record(&self, outcome: Outcome, at: Instant) {
        let ordinal = self.ordinal(at);
        let mut buckets = self.buckets.lock();
        self.evict(&mut buckets, at);

        if ordinal < buckets.floor {
            #[cfg(feature = "tracing")]
            tracing::trace!(
                outcome = %outcome,
                ordinal,
                floor = buckets.floor,
                "dropping write for evicted bucket"
            );
            return;
        }

        match buckets.live.back_mut() {
            Some(last) if last.ordinal == ordinal => last.counts.increment(outcome),
            Some(last) if last.ordinal < ordinal => {
                buckets.live.push_back(Bucket::with(ordinal, outcome));
            }
            None => buckets.live.push_back(Bucket::with(ordinal, outcome)),
            Some(_) => {
                // Late writer: the slice is older than the newest bucket.
                match buckets.live.binary_search_by_key(&ordinal, |b| b.ordinal) {
                    Ok(pos) => buckets.live[pos].counts.increment(outcome),
                    Err(pos) => buckets.live.insert(pos, Bucket::with(ordinal, outcome)),
                }
            }
        }
    }

    /// Aggregates every bucket that overlaps `[now - window, now]`.
    ///
    /// Read-only: buckets are not rotated or evicted by a snapshot.
    pub fn snapshot(&self, now: Instant) -> WindowSnapshot {
        let buckets = self.buckets.lock();
        let mut counts = OutcomeCounts::new();
        for bucket in buckets.live.iter().filter(|b| self.is_live(b.ordinal, now)) {
            counts += bucket.counts;
        }
        drop(buckets);

        WindowSnapshot {
            window_start: now.checked_sub(self.window).unwrap_or(self.epoch).max(self.epoch),
            window_end: now,
            counts,
        }
    }

    /// Discards every recorded outcome up to and including `now`'s bucket.
    ///
    /// Used when a circuit closes again so pre-recovery errors cannot trip it.
    pub fn reset(&self, now: Instant) {
        let mut buckets = self.buckets.lock();
        buckets.live.clear();
        buckets.floor = buckets.floor.max(self.ordinal(now));
    }

    fn ordinal(&self, at: Instant) -> u64 {
        let elapsed = at.saturating_duration_since(self.epoch).as_nanos();
        (elapsed / self.bucket_width.as_nanos()) as u64
    }

    /// A bucket is live at `now` if it has started and its end lies after `now - window`.
    fn is_live(&self, ordinal: u64, now: Instant) -> bool {
        let width = self.bucket_width.as_nanos();
        let now_ns = now.saturating_duration_since(self.epoch).as_nanos();
        let start = ordinal as u128 * width;
        let end = start + width;
        start <= now_ns && end + self.window.as_nanos() > now_ns
    }

    /// Lowest ordinal whose bucket still overlaps the horizon ending at `now`.
    fn oldest_live_ordinal(&self, now: Instant) -> u64 {
        let now_ns = now.saturating_duration_since(self.epoch).as_nanos();
        let horizon = now_ns.saturating_sub(self.window.as_nanos());
        (horizon / self.bucket_width.as_nanos()) as u64
    }

    fn evict(&self, buckets: &mut Buckets, now: Instant) {
        let oldest = self.oldest_live_ordinal(now);
        while buckets.live.front().is_some_and(|b| b.ordinal < oldest) {
            buckets.live.pop_front();
        }
        buckets.floor = buckets.floor.max(oldest);
    }

    #[cfg(test)]
    fn live_buckets(&self) -> usize {
        self.buckets.lock().live.len()
    }
}

impl Bucket {
    fn with(ordinal: u64, outcome: Outcome) -> Self {
        let mut counts = OutcomeCounts::new();
        counts.increment(outcome);
        Self { ordinal, counts }
    }
}
