//! reqwest-backed API client

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::Url;

use http_loadgen_core::{
    ApiClient, ApiClientConfig, ApiResponse, RequestPayload, ResponsePayload, TransportError,
};

/// POSTs JSON payloads to the configured endpoint
///
/// Cheap to share: wrap in `Arc` and hand to every worker. The underlying
/// connection pool is reused across requests.
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpApiClient {
    /// Build a client from validated settings
    ///
    /// Every request carries `Accept: application/json` and the configured
    /// auth header.
    pub fn new(config: &ApiClientConfig) -> Result<Self, TransportError> {
        config
            .validate()
            .map_err(|e| TransportError::Config(e.to_string()))?;

        let endpoint = config
            .endpoint_url()
            .map_err(|e| TransportError::Config(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        // validate() guarantees both are present
        let key_name = config.auth_key_name.as_deref().unwrap_or_default();
        let key_value = config.auth_key_value.as_deref().unwrap_or_default();
        let name = HeaderName::from_bytes(key_name.trim().as_bytes())
            .map_err(|e| TransportError::Config(format!("auth key name: {e}")))?;
        let mut value = HeaderValue::from_str(key_value.trim())
            .map_err(|e| TransportError::Config(format!("auth key value: {e}")))?;
        value.set_sensitive(true);
        headers.insert(name, value);

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            endpoint,
        })
    }

    /// URL every request is sent to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn post(&self, payload: &RequestPayload) -> Result<ApiResponse, TransportError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::trace!(%status, request = payload.requests_sent, "Non-success status");
            return Ok(ApiResponse::status(status));
        }

        let body = response.text().await?;
        let parsed: ResponsePayload =
            serde_json::from_str(&body).map_err(|_| TransportError::MalformedResponse(body))?;

        Ok(ApiResponse {
            status,
            payload: Some(parsed),
        })
    }
}
