use command_resilience_core::Outcome;
use std::ops::{Add, AddAssign};

/// One counter per [`Outcome`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    counts: [u64; Outcome::COUNT],
}

impl OutcomeCounts {
    /// All counters at zero.
    pub const fn new() -> Self {
        Self {
            counts: [0; Outcome::COUNT],
        }
    }

    /// Count for a single outcome.
    pub fn get(&self, outcome: Outcome) -> u64 {
        self.counts[outcome.index()]
    }

    /// Adds one to the counter for `outcome`.
    pub fn increment(&mut self, outcome: Outcome) {
        self.add_count(outcome, 1);
    }

    /// Adds `n` to the counter for `outcome`.
    pub fn add_count(&mut self, outcome: Outcome, n: u64) {
        let slot = &mut self.counts[outcome.index()];
        *slot = slot.saturating_add(n);
    }

    /// Requests that reached the dependency or its bulkhead:
    /// Success + Failure + Timeout + RejectedByBulkhead.
    ///
    /// Short-circuited calls and fallback outcomes are excluded.
    pub fn total_requests(&self) -> u64 {
        self.get(Outcome::Success) + self.error_count()
    }

    /// Failure + Timeout + RejectedByBulkhead.
    pub fn error_count(&self) -> u64 {
        Outcome::ALL
            .iter()
            .filter(|o| o.is_error())
            .map(|o| self.get(*o))
            .sum()
    }

    /// Errors as a percentage of [`total_requests`](Self::total_requests), 0 when idle.
    pub fn error_percentage(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.error_count() as f64 / total as f64 * 100.0
        }
    }

    /// Sum of every counter, fallback outcomes included.
    pub fn sum(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Returns true if every counter is zero.
    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|c| *c == 0)
    }

    /// Iterates `(outcome, count)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Outcome, u64)> + '_ {
        Outcome::ALL.iter().map(move |o| (*o, self.get(*o)))
    }
}

impl AddAssign for OutcomeCounts {
    fn add_assign(&mut self, rhs: Self) {
        for outcome in Outcome::ALL {
            self.add_count(outcome, rhs.get(outcome));
        }
    }
}

impl Add for OutcomeCounts {
    type Output = OutcomeCounts;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for OutcomeCounts {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(Outcome::COUNT))?;
        for (outcome, count) in self.iter() {
            map.serialize_entry(outcome.as_str(), &count)?;
        }
        map.end()
    }
}
