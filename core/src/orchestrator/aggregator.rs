//! Result aggregation from multiple workers

use std::ops::{Add, AddAssign};
use std::time::Duration;

use crate::worker::WorkerStats;

/// Running total of all merged workers
///
/// Merging is associative and commutative, so workers can be folded in
/// whenever they finish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregatedStats {
    /// Total request attempts
    pub total_requests: u64,

    /// Total not-OK outcomes
    pub not_ok: u64,

    /// Total not-successful outcomes
    pub not_successful: u64,

    /// Wall time covered; merging keeps the longest
    pub elapsed: Duration,
}

impl AggregatedStats {
    /// Fold one finished worker into the total
    pub fn merge(&mut self, stats: &WorkerStats) {
        self.total_requests += stats.total_requests;
        self.not_ok += stats.not_ok;
        self.not_successful += stats.not_successful;
    }

    /// Set the wall time covered by the run
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// Requests per second over the elapsed time (0 if no time elapsed)
    pub fn average_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_requests as f64 / secs
        } else {
            0.0
        }
    }

    /// Share of not-OK outcomes, 0-100
    pub fn not_ok_percentage(&self) -> f64 {
        percentage(self.not_ok, self.total_requests)
    }

    /// Share of not-successful outcomes, 0-100
    pub fn not_successful_percentage(&self) -> f64 {
        percentage(self.not_successful, self.total_requests)
    }
}

fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        100.0 * part as f64 / total as f64
    } else {
        0.0
    }
}

impl From<WorkerStats> for AggregatedStats {
    fn from(stats: WorkerStats) -> Self {
        let mut aggregated = Self::default();
        aggregated.merge(&stats);
        aggregated
    }
}

impl AddAssign<&WorkerStats> for AggregatedStats {
    fn add_assign(&mut self, stats: &WorkerStats) {
        self.merge(stats);
    }
}

impl AddAssign for AggregatedStats {
    fn add_assign(&mut self, other: Self) {
        self.total_requests += other.total_requests;
        self.not_ok += other.not_ok;
        self.not_successful += other.not_successful;
        self.elapsed = self.elapsed.max(other.elapsed);
    }
}

impl Add for AggregatedStats {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

/// Aggregate statistics from multiple workers
pub fn aggregate_worker_stats<'a>(
    stats: impl IntoIterator<Item = &'a WorkerStats>,
) -> AggregatedStats {
    stats
        .into_iter()
        .fold(AggregatedStats::default(), |mut total, s| {
            total.merge(s);
            total
        })
}
