//! Ticket-based rate limiting for request execution
//!
//! Every request needs a ticket. The limiter grants a fixed number of
//! tickets per renewal interval; a background task resets the budget at the
//! end of each interval and publishes the rate that was actually achieved
//! in the window it just closed.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::LimiterConfig;
use crate::error::{Error, Result};
use crate::traits::TicketSource;

/// Largest multiple of the time quantum considered as a renewal interval
pub const MAX_QUANTUM_MULTIPLE: u32 = 7;

/// Tickets granted per renewal interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketBudget {
    /// Tickets available in each window
    pub tickets_per_interval: u32,

    /// Window length
    pub interval: Duration,
}

impl TicketBudget {
    /// Pick the interval among `1..=7` multiples of `quantum` whose rounded
    /// ticket count best approximates `target_rate`
    ///
    /// Ties go to the smallest multiple. Candidates that round to zero
    /// tickets are skipped; if every candidate does, the result grants no
    /// tickets.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use http_loadgen_core::worker::TicketBudget;
    ///
    /// let budget = TicketBudget::for_rate(5.0, Duration::from_millis(1200));
    /// assert_eq!(budget.tickets_per_interval, 6);
    /// assert_eq!(budget.interval, Duration::from_millis(1200));
    /// ```
    pub fn for_rate(target_rate: f64, quantum: Duration) -> Self {
        let mut best: Option<(Self, f64)> = None;

        for multiple in 1..=MAX_QUANTUM_MULTIPLE {
            let candidate = Self::candidate(target_rate, quantum, multiple);
            if candidate.tickets_per_interval == 0 {
                continue;
            }
            let deviation = candidate.deviation(target_rate);
            if best.map_or(true, |(_, best_deviation)| deviation < best_deviation) {
                best = Some((candidate, deviation));
            }
        }

        best.map_or_else(|| Self::candidate(target_rate, quantum, 1), |(budget, _)| budget)
    }

    fn candidate(target_rate: f64, quantum: Duration, multiple: u32) -> Self {
        let interval = quantum * multiple;
        let tickets = (target_rate * interval.as_secs_f64()).round();
        Self {
            tickets_per_interval: tickets as u32,
            interval,
        }
    }

    /// Rate granted by this budget, in tickets per second
    pub fn rate(&self) -> f64 {
        self.tickets_per_interval as f64 / self.interval.as_secs_f64()
    }

    /// Absolute distance between `target_rate` and the granted rate
    pub fn deviation(&self, target_rate: f64) -> f64 {
        (target_rate - self.rate()).abs()
    }
}

/// Last value published by the renewal task
#[derive(Debug, Clone, Copy, PartialEq)]
enum RateSample {
    /// No window has closed yet
    Pending,
    /// Requests per second admitted in the last closed window
    Achieved(f64),
    /// Limiter stopped; no more windows
    Stopped,
}

struct Shared {
    budget: TicketBudget,

    /// Goes negative under contention; only the grant/deny result leaves
    /// this module.
    remaining: AtomicI64,

    /// Publishing through the watch lock makes reset, rate update and the
    /// broadcast wake-up one step, serialized with `stop`.
    samples: watch::Sender<RateSample>,
}

impl Shared {
    /// Close the current window. Returns `false` once the limiter is stopped.
    fn renew(&self) -> bool {
        let budget = i64::from(self.budget.tickets_per_interval);
        let secs = self.budget.interval.as_secs_f64();

        self.samples.send_if_modified(|sample| {
            if *sample == RateSample::Stopped {
                return false;
            }
            let left = self.remaining.swap(budget, Ordering::AcqRel).max(0);
            *sample = RateSample::Achieved((budget - left) as f64 / secs);
            true
        })
    }
}

/// Rate limiter granting a fixed ticket budget per renewal window
///
/// Share one instance across all workers via `Arc`. Construction spawns the
/// renewal task on the current tokio runtime; dropping the limiter or
/// calling [`stop`](Self::stop) ends it.
pub struct TicketRateLimiter {
    shared: Arc<Shared>,
    target_rate: f64,
    renewal: Mutex<Option<JoinHandle<()>>>,
}

impl TicketRateLimiter {
    /// Create a limiter for `target_rate` requests per second with the
    /// default time quantum
    pub fn new(target_rate: f64) -> Result<Self> {
        Self::with_config(LimiterConfig::new(target_rate))
    }

    /// Create a limiter from a full configuration
    ///
    /// # Errors
    /// Fails if the rate is not positive and finite, if it is too low to
    /// grant one ticket in any candidate interval, or if called outside a
    /// tokio runtime.
    pub fn with_config(config: LimiterConfig) -> Result<Self> {
        config.validate()?;

        let budget = TicketBudget::for_rate(config.target_rate, config.time_quantum);
        if budget.tickets_per_interval == 0 {
            return Err(Error::TargetRateTooLow(config.target_rate));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::config(format!("rate limiter needs a tokio runtime: {e}")))?;

        let (samples, _) = watch::channel(RateSample::Pending);
        let shared = Arc::new(Shared {
            budget,
            remaining: AtomicI64::new(i64::from(budget.tickets_per_interval)),
            samples,
        });

        let renewal = runtime.spawn({
            let shared = Arc::clone(&shared);
            async move {
                let period = shared.budget.interval;
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if !shared.renew() {
                        break;
                    }
                }
            }
        });

        tracing::debug!(
            target_rate = config.target_rate,
            tickets_per_interval = budget.tickets_per_interval,
            interval_ms = budget.interval.as_millis() as u64,
            "Ticket rate limiter started"
        );

        Ok(Self {
            shared,
            target_rate: config.target_rate,
            renewal: Mutex::new(Some(renewal)),
        })
    }

    /// Take one ticket without blocking
    ///
    /// At most `tickets_per_interval` calls succeed per window no matter how
    /// many threads race.
    pub fn take_ticket(&self) -> bool {
        self.shared.remaining.fetch_sub(1, Ordering::AcqRel) > 0
    }

    /// Wait for the next window to close and return the rate achieved in it
    ///
    /// Returns `None` once the limiter is stopped, immediately if it already
    /// was. Only windows closing after this call are observed; callers that
    /// sample in a loop should hold a [`RateSamples`] instead.
    pub async fn wait_for_next_rate_sample(&self) -> Option<f64> {
        self.subscribe_rates().next().await
    }

    /// Subscribe to rate samples, starting from the next window to close
    ///
    /// A window that closes while the subscriber is busy stays pending until
    /// its next call to [`RateSamples::next`].
    pub fn subscribe_rates(&self) -> RateSamples {
        RateSamples {
            rx: self.shared.samples.subscribe(),
        }
    }

    /// Stop granting tickets and release every rate-sample waiter
    ///
    /// Idempotent.
    pub fn stop(&self) {
        let first = self.shared.samples.send_if_modified(|sample| {
            if *sample == RateSample::Stopped {
                return false;
            }
            self.shared.remaining.store(0, Ordering::Release);
            *sample = RateSample::Stopped;
            true
        });

        if let Some(handle) = self.take_renewal() {
            handle.abort();
        }

        if first {
            tracing::debug!("Ticket rate limiter stopped");
        }
    }

    fn take_renewal(&self) -> Option<JoinHandle<()>> {
        self.renewal
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    /// Whether [`stop`](Self::stop) has been called
    pub fn is_stopped(&self) -> bool {
        *self.shared.samples.borrow() == RateSample::Stopped
    }

    /// Rate achieved in the most recently closed window (0 before the first)
    pub fn last_rate(&self) -> f64 {
        match *self.shared.samples.borrow() {
            RateSample::Achieved(rate) => rate,
            RateSample::Pending | RateSample::Stopped => 0.0,
        }
    }

    /// Tickets still available in the current window
    pub fn remaining_tickets(&self) -> u32 {
        self.shared.remaining.load(Ordering::Acquire).max(0) as u32
    }

    /// Budget chosen at construction
    pub fn budget(&self) -> TicketBudget {
        self.shared.budget
    }

    /// Requested rate in requests per second
    pub fn target_rate(&self) -> f64 {
        self.target_rate
    }
}

/// Stream of achieved-rate samples from one [`TicketRateLimiter`]
///
/// Only the latest unseen sample is kept: if several windows close between
/// two calls, the earlier ones are superseded.
#[derive(Debug)]
pub struct RateSamples {
    rx: watch::Receiver<RateSample>,
}

impl RateSamples {
    /// Rate of the next unseen window, or `None` once the limiter is stopped
    pub async fn next(&mut self) -> Option<f64> {
        if *self.rx.borrow() == RateSample::Stopped {
            return None;
        }
        self.rx.changed().await.ok()?;
        match *self.rx.borrow_and_update() {
            RateSample::Achieved(rate) => Some(rate),
            RateSample::Pending => Some(0.0),
            RateSample::Stopped => None,
        }
    }
}

impl TicketSource for TicketRateLimiter {
    fn take_ticket(&self) -> bool {
        TicketRateLimiter::take_ticket(self)
    }
}

impl Drop for TicketRateLimiter {
    fn drop(&mut self) {
        if let Some(handle) = self.take_renewal() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for TicketRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketRateLimiter")
            .field("target_rate", &self.target_rate)
            .field("budget", &self.shared.budget)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUANTUM: Duration = Duration::from_millis(1200);

    const INTEGER_RATES: [f64; 9] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
    const FRACTIONAL_RATES: [f64; 9] = [2.1, 2.2, 2.3, 2.4, 2.5, 2.6, 2.7, 2.8, 2.9];

    fn all_rates() -> impl Iterator<Item = f64> {
        INTEGER_RATES.into_iter().chain(FRACTIONAL_RATES)
    }

    #[test]
    fn test_budget_is_best_candidate() {
        for rate in all_rates().chain([0.5, 0.25, 13.7, 33.3, 250.0, 1000.0]) {
            let budget = TicketBudget::for_rate(rate, QUANTUM);
            let best = (1..=MAX_QUANTUM_MULTIPLE)
                .map(|m| TicketBudget::candidate(rate, QUANTUM, m).deviation(rate))
                .fold(f64::INFINITY, f64::min);

            assert_eq!(budget.deviation(rate), best, "rate {rate}");
            assert!(budget.tickets_per_interval > 0, "rate {rate}");
        }
    }

    #[test]
    fn test_budget_known_values() {
        let budget = TicketBudget::for_rate(5.0, QUANTUM);
        assert_eq!(budget.tickets_per_interval, 6);
        assert_eq!(budget.interval, QUANTUM);

        // 1 rps is exact only at 5 quanta: 6 tickets per 6 s
        let budget = TicketBudget::for_rate(1.0, QUANTUM);
        assert_eq!(budget.tickets_per_interval, 6);
        assert_eq!(budget.interval, Duration::from_secs(6));

        let budget = TicketBudget::for_rate(2.1, QUANTUM);
        assert_eq!(budget.tickets_per_interval, 5);
        assert_eq!(budget.interval, Duration::from_millis(2400));
    }

    #[test]
    fn test_budget_ties_pick_smallest_multiple() {
        // Every multiple of 1.2 s grants exactly 2.5 rps
        let budget = TicketBudget::for_rate(2.5, QUANTUM);
        assert_eq!(budget.interval, QUANTUM);
        assert_eq!(budget.tickets_per_interval, 3);
    }

    #[test]
    fn test_budget_rate() {
        let budget = TicketBudget {
            tickets_per_interval: 12,
            interval: Duration::from_millis(2400),
        };
        assert!((budget.rate() - 5.0).abs() < 1e-9);
        assert!((budget.deviation(4.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_budget_skips_zero_ticket_candidates() {
        // One ticket per 7 quanta deviates exactly as much as zero per quantum
        let rate = 0.5 / 8.4;
        let budget = TicketBudget::for_rate(rate, QUANTUM);
        assert_eq!(budget.tickets_per_interval, 1);
        assert_eq!(budget.interval, QUANTUM * MAX_QUANTUM_MULTIPLE);

        let budget = TicketBudget::for_rate(0.01, QUANTUM);
        assert_eq!(budget.tickets_per_interval, 0);
    }

    #[tokio::test]
    async fn test_accepts_lowest_grantable_rate() {
        let limiter = TicketRateLimiter::new(0.5 / 8.4).unwrap();
        assert_eq!(limiter.budget().tickets_per_interval, 1);
        assert_eq!(limiter.budget().interval, Duration::from_millis(8400));
    }

    #[tokio::test]
    async fn test_rejects_invalid_rates() {
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                TicketRateLimiter::new(rate),
                Err(Error::InvalidTargetRate(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_rejects_rate_below_one_ticket() {
        assert!(matches!(
            TicketRateLimiter::new(0.01),
            Err(Error::TargetRateTooLow(_))
        ));
    }

    #[test]
    fn test_requires_runtime() {
        assert!(matches!(TicketRateLimiter::new(5.0), Err(Error::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticket_exhaustion_and_renewal() {
        let limiter = TicketRateLimiter::new(5.0).unwrap();
        assert_eq!(limiter.remaining_tickets(), 6);
        assert_eq!(limiter.last_rate(), 0.0);

        for _ in 0..6 {
            assert!(limiter.take_ticket());
        }
        for _ in 0..10 {
            assert!(!limiter.take_ticket());
        }
        assert_eq!(limiter.remaining_tickets(), 0);

        let rate = limiter.wait_for_next_rate_sample().await.unwrap();
        assert!((rate - 5.0).abs() < 1e-9);
        assert!((limiter.last_rate() - 5.0).abs() < 1e-9);

        let granted = (0..20).filter(|_| limiter.take_ticket()).count();
        assert_eq!(granted, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_window_rate() {
        let limiter = TicketRateLimiter::new(5.0).unwrap();
        for _ in 0..3 {
            assert!(limiter.take_ticket());
        }

        let rate = limiter.wait_for_next_rate_sample().await.unwrap();
        assert!((rate - 2.5).abs() < 1e-9);

        // Nothing taken in the second window
        let rate = limiter.wait_for_next_rate_sample().await.unwrap();
        assert_eq!(rate, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_renewal_wakes_every_waiter() {
        let limiter = Arc::new(TicketRateLimiter::new(5.0).unwrap());

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.wait_for_next_rate_sample().await })
            })
            .collect();

        // Let every waiter subscribe before the window fills
        tokio::time::sleep(Duration::from_millis(10)).await;
        for _ in 0..3 {
            assert!(limiter.take_ticket());
        }

        for waiter in waiters {
            let sample = waiter.await.unwrap();
            assert_eq!(sample, Some(2.5));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscription_keeps_sample_closed_while_busy() {
        let limiter = TicketRateLimiter::new(5.0).unwrap();
        let mut rates = limiter.subscribe_rates();
        let start = Instant::now();

        for _ in 0..3 {
            assert!(limiter.take_ticket());
        }
        // Window closes at 1.2 s while nobody is waiting
        tokio::time::sleep(Duration::from_millis(1300)).await;

        assert_eq!(rates.next().await, Some(2.5));
        assert!(start.elapsed() < Duration::from_millis(1400));

        assert_eq!(rates.next().await, Some(0.0));
        assert!(start.elapsed() >= Duration::from_millis(2400));
    }

    #[tokio::test]
    async fn test_subscription_ends_on_stop() {
        let limiter = TicketRateLimiter::new(5.0).unwrap();
        let mut rates = limiter.subscribe_rates();

        limiter.stop();
        assert_eq!(rates.next().await, None);
        assert_eq!(rates.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drained_limiter_tracks_target_rate() {
        const WINDOWS: usize = 10;

        for target in all_rates() {
            let limiter = TicketRateLimiter::new(target).unwrap();
            let start = Instant::now();
            let mut taken = 0usize;
            let mut samples = Vec::with_capacity(WINDOWS);

            for _ in 0..WINDOWS {
                while limiter.take_ticket() {
                    taken += 1;
                }
                samples.push(limiter.wait_for_next_rate_sample().await.unwrap());
            }

            let observed = taken as f64 / start.elapsed().as_secs_f64();
            let sampled = samples.iter().sum::<f64>() / samples.len() as f64;

            let ratio = observed / target;
            assert!((0.95..=1.05).contains(&ratio), "target {target}: {observed}");
            let ratio = sampled / observed;
            assert!((0.95..=1.05).contains(&ratio), "target {target}: {sampled}");
        }
    }

    #[tokio::test]
    async fn test_concurrent_takers_never_exceed_budget() {
        let limiter = Arc::new(
            TicketRateLimiter::with_config(
                LimiterConfig::new(50.0).with_time_quantum(Duration::from_secs(60)),
            )
            .unwrap(),
        );
        let budget = limiter.budget().tickets_per_interval as usize;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || (0..1000).filter(|_| limiter.take_ticket()).count())
            })
            .collect();

        let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(granted, budget);
        assert_eq!(limiter.remaining_tickets(), 0);
    }

    #[tokio::test]
    async fn test_stop_wakes_waiter_promptly() {
        let limiter = Arc::new(
            TicketRateLimiter::with_config(
                LimiterConfig::new(5.0).with_time_quantum(Duration::from_secs(60)),
            )
            .unwrap(),
        );

        let waiter = tokio::spawn({
            let limiter = Arc::clone(&limiter);
            async move { limiter.wait_for_next_rate_sample().await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        limiter.stop();

        let sample = tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .expect("waiter still blocked after stop")
            .unwrap();
        assert_eq!(sample, None);
    }

    #[tokio::test]
    async fn test_stop_wakes_every_waiter() {
        let limiter = Arc::new(
            TicketRateLimiter::with_config(
                LimiterConfig::new(5.0).with_time_quantum(Duration::from_secs(60)),
            )
            .unwrap(),
        );

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.wait_for_next_rate_sample().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        limiter.stop();

        for waiter in waiters {
            let sample = tokio::time::timeout(Duration::from_millis(200), waiter)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(sample, None);
        }
    }

    #[tokio::test]
    async fn test_stopped_limiter_denies_and_returns_immediately() {
        let limiter = TicketRateLimiter::new(100.0).unwrap();
        assert!(limiter.take_ticket());

        limiter.stop();
        limiter.stop();

        assert!(limiter.is_stopped());
        assert!(!limiter.take_ticket());
        assert_eq!(limiter.remaining_tickets(), 0);
        assert_eq!(limiter.wait_for_next_rate_sample().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_renewal() {
        let limiter = TicketRateLimiter::new(5.0).unwrap();
        limiter.stop();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!limiter.take_ticket());
        assert_eq!(limiter.remaining_tickets(), 0);
    }

    #[tokio::test]
    async fn test_debug_output() {
        let limiter = TicketRateLimiter::new(5.0).unwrap();
        let debug = format!("{:?}", limiter);
        assert!(debug.contains("TicketRateLimiter"));
        assert!(debug.contains("tickets_per_interval: 6"));
        assert!(debug.contains("stopped: false"));
    }
}
