//! Transport trait implemented outside core
//!
//! The HTTP implementation lives in the `http-loadgen-client` crate; tests
//! plug in stubs.

use crate::request::RequestPayload;
use crate::response::ApiResponse;
use async_trait::async_trait;

// ============================================================================
// Transport Trait
// ============================================================================

/// Sends one request payload to the API under test
///
/// Implementations return `Ok` for every response that arrived, whatever its
/// status; `Err` is reserved for requests that never produced a usable
/// response.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// POST one payload and return the status plus parsed body
    async fn post(&self, payload: &RequestPayload) -> Result<ApiResponse, TransportError>;
}

// ============================================================================
// Ticket Source Trait
// ============================================================================

/// Admission control consulted by workers before every request
///
/// Implemented by [`crate::TicketRateLimiter`]; tests substitute scripted
/// sources.
pub trait TicketSource: Send + Sync {
    /// Take one ticket without blocking
    ///
    /// Returns `false` when the current window's budget is exhausted or the
    /// source has been stopped.
    fn take_ticket(&self) -> bool;
}

/// Transport-level failures
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// HTTP/network error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Success status but the body is not a valid response payload
    #[error("could not deserialize JSON response: {0}")]
    MalformedResponse(String),

    /// Client could not be built from its configuration
    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Outcome;

    struct FixedClient(ApiResponse);

    #[async_trait]
    impl ApiClient for FixedClient {
        async fn post(&self, _payload: &RequestPayload) -> Result<ApiResponse, TransportError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let client: std::sync::Arc<dyn ApiClient> =
            std::sync::Arc::new(FixedClient(ApiResponse::ok(false)));
        let payload = RequestPayload::new("test", chrono::Utc::now(), 1);

        let response = client.post(&payload).await.unwrap();
        assert_eq!(response.classify(), Outcome::NotSuccessful);
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::MalformedResponse("<html>".into());
        assert_eq!(err.to_string(), "could not deserialize JSON response: <html>");
    }
}
