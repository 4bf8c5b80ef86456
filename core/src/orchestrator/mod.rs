//! Orchestrator for run lifecycle management
//!
//! The Orchestrator coordinates a complete load run:
//! - Growing the worker pool until the achieved rate meets the target
//! - Merging finished workers' counters as rate samples arrive
//! - Draining in-flight workers on shutdown
//! - Producing the final report
//!
//! # Example
//!
//! ```ignore
//! use http_loadgen_core::{OrchestratorBuilder, Shutdown};
//!
//! let (trigger, signal) = Shutdown::new();
//! let orchestrator = OrchestratorBuilder::new()
//!     .target_rate(25.0)
//!     .client(client)
//!     .shutdown(signal)
//!     .build()?;
//!
//! let report = orchestrator.run().await?;
//! println!("{report}");
//! ```

mod aggregator;
mod builder;
mod executor;
mod scaling;

pub use aggregator::{aggregate_worker_stats, AggregatedStats};
pub use builder::OrchestratorBuilder;
pub use executor::{Orchestrator, RunReport};
pub use scaling::{needs_more_workers, workers_to_spawn, ESTIMATE_DAMPING, SCALE_UP_THRESHOLD};
