//! Orchestrator execution logic

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;

use crate::error::Result;
use crate::request::PayloadFactory;
use crate::shutdown::ShutdownSignal;
use crate::traits::{ApiClient, TicketSource};
use crate::worker::{TicketRateLimiter, WorkerBuilder, WorkerStats};

use super::aggregator::AggregatedStats;
use super::scaling::{needs_more_workers, workers_to_spawn};

/// Orchestrator manages the run lifecycle
///
/// Running: start one worker, then after each rate sample collect the
/// workers that finished and launch more if the achieved rate lags the
/// target. Draining: once shutdown is requested the limiter is stopped and
/// every in-flight worker is awaited. Reporting: the merged totals are
/// returned as a [`RunReport`].
pub struct Orchestrator {
    /// Shared admission control
    pub(crate) limiter: Arc<TicketRateLimiter>,

    /// Transport (shared across workers)
    pub(crate) client: Arc<dyn ApiClient>,

    /// Payload source (shared across workers)
    pub(crate) payloads: Arc<PayloadFactory>,

    /// External cancellation
    pub(crate) shutdown: ShutdownSignal,
}

impl Orchestrator {
    /// Create a new orchestrator
    ///
    /// Use `OrchestratorBuilder` for a more ergonomic construction.
    pub fn new(
        limiter: Arc<TicketRateLimiter>,
        client: Arc<dyn ApiClient>,
        payloads: Arc<PayloadFactory>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            limiter,
            client,
            payloads,
            shutdown,
        }
    }

    /// The shared rate limiter
    pub fn limiter(&self) -> &Arc<TicketRateLimiter> {
        &self.limiter
    }

    /// Run until shutdown, then drain and report
    pub async fn run(mut self) -> Result<RunReport> {
        let target_rate = self.limiter.target_rate();
        let start = Instant::now();
        let mut pool = WorkerPool::default();
        let mut aggregated = AggregatedStats::default();

        tracing::info!(
            target_rate,
            tickets_per_interval = self.limiter.budget().tickets_per_interval,
            interval_ms = self.limiter.budget().interval.as_millis() as u64,
            "Sending requests... (Ctrl+C to stop)"
        );

        // Subscribe before the first worker so no window is missed
        let mut rates = self.limiter.subscribe_rates();
        self.spawn_workers(&mut pool, 1)?;

        loop {
            let sample = tokio::select! {
                biased;

                _ = self.shutdown.wait() => None,
                sample = rates.next() => sample,
            };

            let Some(achieved_rate) = sample else {
                break;
            };

            let workers_at_sample = pool.workers.len();
            pool.collect_finished(&mut aggregated);
            let running = pool.workers.len();

            if needs_more_workers(target_rate, achieved_rate, running) {
                let count = workers_to_spawn(target_rate, achieved_rate, workers_at_sample, running);
                tracing::debug!(
                    achieved_rate,
                    running,
                    spawning = count,
                    "Achieved rate below target, adding workers"
                );
                self.spawn_workers(&mut pool, count)?;
            }

            if !self.shutdown.is_triggered() {
                tracing::info!(
                    "Running {} request loops - Target rate = {:.3} rps / Current rate = {:.3} rps",
                    workers_at_sample,
                    target_rate,
                    achieved_rate
                );
            }
        }

        self.limiter.stop();
        tracing::info!(in_flight = pool.workers.len(), "Stopping: draining workers");

        while let Some(result) = pool.workers.join_next().await {
            absorb(&mut aggregated, result);
        }

        let report = RunReport {
            stats: aggregated.with_elapsed(start.elapsed()),
            target_rate,
            workers_spawned: pool.spawned,
        };

        tracing::info!(
            elapsed_secs = report.stats.elapsed.as_secs_f64(),
            total_requests = report.stats.total_requests,
            not_ok = report.stats.not_ok,
            not_successful = report.stats.not_successful,
            workers = report.workers_spawned,
            "Run completed"
        );

        Ok(report)
    }

    fn spawn_workers(&self, pool: &mut WorkerPool, count: usize) -> Result<()> {
        for _ in 0..count {
            let tickets: Arc<dyn TicketSource> = self.limiter.clone();
            let worker = WorkerBuilder::new(pool.spawned)
                .client(Arc::clone(&self.client))
                .tickets(tickets)
                .payloads(Arc::clone(&self.payloads))
                .build()?;

            pool.workers.spawn(worker.run());
            pool.spawned += 1;
        }
        Ok(())
    }
}

/// Handles of every worker not yet merged
#[derive(Default)]
struct WorkerPool {
    workers: JoinSet<WorkerStats>,
    spawned: usize,
}

impl WorkerPool {
    /// Merge every worker that already finished, without waiting
    fn collect_finished(&mut self, aggregated: &mut AggregatedStats) {
        while let Some(result) = self.workers.try_join_next() {
            absorb(aggregated, result);
        }
    }
}

fn absorb(aggregated: &mut AggregatedStats, result: std::result::Result<WorkerStats, JoinError>) {
    match result {
        Ok(stats) => aggregated.merge(&stats),
        Err(e) => tracing::error!(error = %e, "Worker task panicked"),
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("limiter", &self.limiter)
            .field("shutdown_requested", &self.shutdown.is_triggered())
            .finish()
    }
}

/// Final outcome of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    /// Merged counters of every worker, with the run's wall time
    pub stats: AggregatedStats,

    /// Requested rate
    pub target_rate: f64,

    /// Workers launched over the whole run
    pub workers_spawned: usize,
}

impl RunReport {
    /// Wall time of the run
    pub fn elapsed(&self) -> Duration {
        self.stats.elapsed
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.stats;
        writeln!(f)?;
        writeln!(f, "API test ran for {:.3?}", stats.elapsed)?;
        writeln!(
            f,
            "Average rate = {:.3} rps (target {:.3} rps)",
            stats.average_rate(),
            self.target_rate
        )?;
        writeln!(
            f,
            "A total of {} requests have been sent by {} request loops:",
            stats.total_requests, self.workers_spawned
        )?;
        writeln!(f, "% of HTTP status not OK = {:.1}", stats.not_ok_percentage())?;
        writeln!(
            f,
            "% of Unsuccessful responses = {:.1}",
            stats.not_successful_percentage()
        )
    }
}
