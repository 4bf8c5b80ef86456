//! Worker pool growth policy
//!
//! The pool only grows. After every rate sample the orchestrator asks
//! whether more workers are needed and, if so, how many.

/// Achieved rate below this share of the target triggers growth
pub const SCALE_UP_THRESHOLD: f64 = 0.95;

/// Damping applied to the proportional worker estimate
pub const ESTIMATE_DAMPING: f64 = 0.8;

/// Whether to launch workers after a sample
///
/// `running` counts workers still in flight after finished ones were
/// collected.
pub fn needs_more_workers(target_rate: f64, achieved_rate: f64, running: usize) -> bool {
    achieved_rate < SCALE_UP_THRESHOLD * target_rate || running == 0
}

/// How many workers to launch when [`needs_more_workers`] says so
///
/// Scales the pool size seen at the sample by `target / achieved`, damped,
/// minus the workers still running; always at least one. With nothing
/// achieved the ratio is undefined and a single worker is launched.
pub fn workers_to_spawn(
    target_rate: f64,
    achieved_rate: f64,
    workers_at_sample: usize,
    running: usize,
) -> usize {
    if achieved_rate <= 0.0 {
        return 1;
    }
    let estimate =
        (ESTIMATE_DAMPING * workers_at_sample as f64 * target_rate / achieved_rate).floor();
    (estimate as usize).saturating_sub(running).max(1)
}
