//! HTTP client for signed webhook delivery.
//!
//! Handles request construction and error categorization. The client is
//! shared across all delivery sequences for connection pooling; per-attempt
//! state travels in [`SignedDelivery`].

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use bridge_core::models::EventId;

use crate::{
    error::DeliveryError,
    signature::{ATTEMPT_HEADER, EVENT_ID_HEADER, EVENT_TYPE_HEADER, SIGNATURE_HEADER},
};

/// Configuration for the delivery client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Timeout for each HTTP request.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECONDS),
            user_agent: "Bridge-Delivery/1.0".to_string(),
        }
    }
}

/// A signed delivery ready to POST.
///
/// The body and its signature are computed once per delivery sequence and
/// shared by every attempt, so the signature always covers the transmitted
/// bytes.
#[derive(Debug, Clone)]
pub struct SignedDelivery {
    /// Destination URL.
    pub url: String,
    /// Event being delivered.
    pub event_id: EventId,
    /// Event type string.
    pub event_type: String,
    /// Signature header value for the body.
    pub signature: String,
    /// Canonical JSON body bytes.
    pub body: Arc<Vec<u8>>,
}

/// Response from a delivery attempt that reached the endpoint.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryResponse {
    /// HTTP status code.
    pub status: u16,
    /// Whether the status is 2xx.
    pub is_success: bool,
}

/// HTTP client shared by all delivery sequences.
#[derive(Debug, Clone)]
pub struct DeliveryClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl DeliveryClient {
    /// Creates a new delivery client.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Configuration`] if the underlying HTTP
    /// client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| DeliveryError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Creates a client with default configuration.
    pub fn with_defaults() -> Result<Self, DeliveryError> {
        Self::new(ClientConfig::default())
    }

    /// POSTs one attempt of a signed delivery.
    ///
    /// Returns `Ok` for any HTTP response (the caller decides what a
    /// non-2xx status means) and `Err` for transport failures.
    pub async fn deliver(
        &self,
        delivery: &SignedDelivery,
        attempt: u32,
    ) -> Result<DeliveryResponse, DeliveryError> {
        let response = self
            .client
            .post(&delivery.url)
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, &delivery.signature)
            .header(EVENT_ID_HEADER, delivery.event_id.to_string())
            .header(EVENT_TYPE_HEADER, &delivery.event_type)
            .header(ATTEMPT_HEADER, attempt.to_string())
            .body(delivery.body.as_ref().clone())
            .send()
            .await;

        match response {
            Ok(response) => {
                let status = response.status();
                Ok(DeliveryResponse { status: status.as_u16(), is_success: status.is_success() })
            },
            Err(e) if e.is_timeout() => Err(DeliveryError::timeout(self.config.timeout.as_secs())),
            Err(e) if e.is_connect() => {
                Err(DeliveryError::network(format!("connection failed: {e}")))
            },
            Err(e) => Err(DeliveryError::network(e.to_string())),
        }
    }
}
