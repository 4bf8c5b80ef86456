//! Worker execution loop

use crate::request::PayloadFactory;
use crate::response::Outcome;
use crate::traits::{ApiClient, TicketSource};

use super::stats::WorkerStats;

use std::sync::Arc;

/// Worker sends requests in a loop: take ticket -> send -> classify -> repeat
///
/// Runs until the ticket source denies a ticket, then hands back its stats.
/// Workers share the client, ticket source and payload factory via Arc.
pub struct Worker {
    /// Unique worker identifier
    id: usize,

    /// Transport (shared across workers)
    client: Arc<dyn ApiClient>,

    /// Admission control (shared across workers)
    tickets: Arc<dyn TicketSource>,

    /// Payload source (shared across workers)
    payloads: Arc<PayloadFactory>,
}

impl Worker {
    /// Create a new worker
    pub fn new(
        id: usize,
        client: Arc<dyn ApiClient>,
        tickets: Arc<dyn TicketSource>,
        payloads: Arc<PayloadFactory>,
    ) -> Self {
        Self {
            id,
            client,
            tickets,
            payloads,
        }
    }

    /// Run the worker loop
    ///
    /// Consumes the worker, so its stats are handed over exactly once.
    pub async fn run(self) -> WorkerStats {
        let mut stats = WorkerStats::new();

        tracing::debug!(worker_id = self.id, "Worker started");

        while self.tickets.take_ticket() {
            let outcome = self.execute_one().await;
            stats.record(outcome);
        }

        tracing::debug!(
            worker_id = self.id,
            total = stats.total_requests,
            not_ok = stats.not_ok,
            not_successful = stats.not_successful,
            "Worker finished"
        );

        stats
    }

    /// Send one request and classify the result
    ///
    /// A transport failure counts as not-OK; the worker keeps going.
    async fn execute_one(&self) -> Outcome {
        let payload = self.payloads.next_payload();
        match self.client.post(&payload).await {
            Ok(response) => response.classify(),
            Err(e) => {
                tracing::warn!(
                    worker_id = self.id,
                    request = payload.requests_sent,
                    error = %e,
                    "Request failed"
                );
                Outcome::NotOk
            }
        }
    }

    /// Get the worker ID
    pub fn id(&self) -> usize {
        self.id
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("payloads", &self.payloads)
            .finish()
    }
}
