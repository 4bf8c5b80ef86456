//! Worker module for sending requests under admission control
//!
//! A Worker is deliberately small. Each one is a tokio task that:
//!
//! 1. Takes a ticket from the shared limiter
//! 2. Sends one payload through the ApiClient
//! 3. Classifies the response as OK, not-OK or not-successful
//! 4. Repeats until a ticket is denied, then returns its counters
//!
//! Workers never outlive a window's budget by more than the request in
//! flight: once tickets run out they finish, and the orchestrator decides
//! whether to start fresh ones after the next renewal.
//!
//! # Example
//!
//! ```ignore
//! use http_loadgen_core::worker::{TicketRateLimiter, WorkerBuilder};
//!
//! let limiter = Arc::new(TicketRateLimiter::new(5.0)?);
//! let worker = WorkerBuilder::new(0)
//!     .client(client)
//!     .tickets(limiter)
//!     .payloads(payloads)
//!     .build()?;
//!
//! let stats = worker.run().await;
//! println!("Sent: {}", stats.total_requests);
//! ```

mod builder;
mod executor;
mod rate_limiter;
mod stats;

pub use builder::WorkerBuilder;
pub use executor::Worker;
pub use rate_limiter::{RateSamples, TicketBudget, TicketRateLimiter, MAX_QUANTUM_MULTIPLE};
pub use stats::WorkerStats;
