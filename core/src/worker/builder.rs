//! Builder pattern for Worker construction

use crate::error::{Error, Result};
use crate::request::PayloadFactory;
use crate::traits::{ApiClient, TicketSource};

use super::executor::Worker;

use std::sync::Arc;

/// Builder for creating Worker instances
///
/// # Example
/// ```ignore
/// let worker = WorkerBuilder::new(0)
///     .client(client)
///     .tickets(limiter)
///     .payloads(payloads)
///     .build()?;
/// ```
pub struct WorkerBuilder {
    id: usize,
    client: Option<Arc<dyn ApiClient>>,
    tickets: Option<Arc<dyn TicketSource>>,
    payloads: Option<Arc<PayloadFactory>>,
}

impl WorkerBuilder {
    /// Create a new builder with the given worker ID
    pub fn new(id: usize) -> Self {
        Self {
            id,
            client: None,
            tickets: None,
            payloads: None,
        }
    }

    /// Set the transport
    pub fn client(mut self, client: Arc<dyn ApiClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the ticket source
    pub fn tickets(mut self, tickets: Arc<dyn TicketSource>) -> Self {
        self.tickets = Some(tickets);
        self
    }

    /// Set the payload factory
    pub fn payloads(mut self, payloads: Arc<PayloadFactory>) -> Self {
        self.payloads = Some(payloads);
        self
    }

    /// Build the Worker
    ///
    /// # Errors
    /// Returns an error if any required field is missing.
    pub fn build(self) -> Result<Worker> {
        let client = self.client.ok_or(Error::missing_config("client"))?;
        let tickets = self.tickets.ok_or(Error::missing_config("tickets"))?;
        let payloads = self.payloads.ok_or(Error::missing_config("payloads"))?;

        Ok(Worker::new(self.id, client, tickets, payloads))
    }
}
