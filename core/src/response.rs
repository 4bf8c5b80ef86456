//! Responses from the API under test and their classification

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// JSON body of a successful response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePayload {
    /// Whether the operation itself succeeded
    pub successful: bool,
}

/// What the transport hands back for one POST
///
/// `payload` is only present for success statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status of the response
    pub status: StatusCode,

    /// Parsed body, if the status was a success
    pub payload: Option<ResponsePayload>,
}

impl ApiResponse {
    /// A success response carrying a business-outcome flag
    pub fn ok(successful: bool) -> Self {
        Self {
            status: StatusCode::OK,
            payload: Some(ResponsePayload { successful }),
        }
    }

    /// A response with a non-success status and no body
    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            payload: None,
        }
    }

    /// Classify into exactly one [`Outcome`]
    pub fn classify(&self) -> Outcome {
        if !self.status.is_success() {
            Outcome::NotOk
        } else {
            match self.payload {
                Some(ResponsePayload { successful: false }) => Outcome::NotSuccessful,
                _ => Outcome::Ok,
            }
        }
    }
}

/// Result of one request attempt as counted by a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Success status and a successful payload
    Ok,
    /// Non-success HTTP status, or the request never got a response
    NotOk,
    /// Success status but the payload reports failure
    NotSuccessful,
}
