//! Builder pattern for Orchestrator construction

use std::sync::Arc;
use std::time::Duration;

use crate::config::{LimiterConfig, DEFAULT_REQUEST_NAME};
use crate::error::{Error, Result};
use crate::request::PayloadFactory;
use crate::shutdown::ShutdownSignal;
use crate::traits::ApiClient;
use crate::worker::TicketRateLimiter;

use super::executor::Orchestrator;

/// Builder for creating an Orchestrator with proper configuration
///
/// # Example
///
/// ```ignore
/// let (trigger, signal) = Shutdown::new();
/// let orchestrator = OrchestratorBuilder::new()
///     .target_rate(25.0)
///     .client(client)
///     .shutdown(signal)
///     .build()?;
///
/// let report = orchestrator.run().await?;
/// ```
pub struct OrchestratorBuilder {
    target_rate: Option<f64>,
    time_quantum: Option<Duration>,
    limiter: Option<Arc<TicketRateLimiter>>,
    client: Option<Arc<dyn ApiClient>>,
    payloads: Option<Arc<PayloadFactory>>,
    shutdown: Option<ShutdownSignal>,
}

impl OrchestratorBuilder {
    /// Create a new orchestrator builder
    pub fn new() -> Self {
        Self {
            target_rate: None,
            time_quantum: None,
            limiter: None,
            client: None,
            payloads: None,
            shutdown: None,
        }
    }

    /// Set the target rate (requests per second)
    pub fn target_rate(mut self, rps: f64) -> Self {
        self.target_rate = Some(rps);
        self
    }

    /// Override the limiter's time quantum
    pub fn time_quantum(mut self, quantum: Duration) -> Self {
        self.time_quantum = Some(quantum);
        self
    }

    /// Use an existing limiter instead of building one from the target rate
    pub fn limiter(mut self, limiter: Arc<TicketRateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Set the transport
    pub fn client(mut self, client: Arc<dyn ApiClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the payload factory
    pub fn payloads(mut self, payloads: Arc<PayloadFactory>) -> Self {
        self.payloads = Some(payloads);
        self
    }

    /// Set the shutdown signal
    pub fn shutdown(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown = Some(signal);
        self
    }

    /// Build the orchestrator
    ///
    /// Starts the limiter's renewal clock, so call this right before
    /// [`Orchestrator::run`].
    ///
    /// # Errors
    ///
    /// Returns an error if the client, shutdown signal, or both the target
    /// rate and limiter are missing, or if the limiter cannot be built.
    pub fn build(self) -> Result<Orchestrator> {
        let client = self.client.ok_or_else(|| Error::missing_config("client"))?;
        let shutdown = self
            .shutdown
            .ok_or_else(|| Error::missing_config("shutdown"))?;

        let limiter = match self.limiter {
            Some(limiter) => limiter,
            None => {
                let rate = self
                    .target_rate
                    .ok_or_else(|| Error::missing_config("target_rate"))?;
                let mut config = LimiterConfig::new(rate);
                if let Some(quantum) = self.time_quantum {
                    config = config.with_time_quantum(quantum);
                }
                Arc::new(TicketRateLimiter::with_config(config)?)
            }
        };

        let payloads = self
            .payloads
            .unwrap_or_else(|| Arc::new(PayloadFactory::new(DEFAULT_REQUEST_NAME)));

        Ok(Orchestrator::new(limiter, client, payloads, shutdown))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
