//! Worker statistics tracking

use crate::response::Outcome;

/// Outcome counters kept by one worker
///
/// Elapsed time is tracked by the orchestrator, not per worker.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    /// Every attempt, whatever its outcome
    pub total_requests: u64,

    /// Attempts answered with a non-success HTTP status or lost in transport
    pub not_ok: u64,

    /// Attempts answered with success status but an unsuccessful payload
    pub not_successful: u64,
}

impl WorkerStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one attempt
    pub fn record(&mut self, outcome: Outcome) {
        self.total_requests += 1;
        match outcome {
            Outcome::Ok => {}
            Outcome::NotOk => self.not_ok += 1,
            Outcome::NotSuccessful => self.not_successful += 1,
        }
    }

    /// Attempts that succeeded in both respects
    pub fn ok(&self) -> u64 {
        self.total_requests
            .saturating_sub(self.not_ok)
            .saturating_sub(self.not_successful)
    }
}
