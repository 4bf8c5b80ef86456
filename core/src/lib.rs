//! http-loadgen-core: rate-limited load generation against an HTTP API
//!
//! This crate holds everything except the HTTP transport itself:
//!
//! - Ticket rate limiter granting a fixed budget per renewal window
//! - Workers that spend tickets on requests and classify the outcomes
//! - The orchestrator growing the worker pool until the target rate is met
//! - Stats aggregation, configuration, shutdown signalling and errors

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod request;
pub mod response;
pub mod shutdown;
pub mod traits;
pub mod worker;

pub use config::{ApiClientConfig, ConfigError, LimiterConfig};
pub use error::*;
pub use orchestrator::{AggregatedStats, Orchestrator, OrchestratorBuilder, RunReport};
pub use request::*;
pub use response::*;
pub use shutdown::{Shutdown, ShutdownSignal, ShutdownTrigger};
pub use traits::*;
pub use worker::{
    RateSamples, TicketBudget, TicketRateLimiter, Worker, WorkerBuilder, WorkerStats,
};
