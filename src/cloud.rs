//! HTTP transport to the cloud backend.
//!
//! The core only ever sees status codes and body text; connection-level
//! details stay inside reqwest. A timed-out poll is indistinguishable from
//! any other transport failure by design.

use std::time::Duration;

use log::{debug, info, warn};
use reqwest::{Client, StatusCode};

use crate::error::LinkError;
use crate::payload::CloudEnvelope;
use crate::poller::FetchOutcome;
use crate::CLOUD_POLL_TIMEOUT_MS;

pub struct CloudClient {
    client: Client,
    url: String,
}

impl CloudClient {
    pub fn new(url: &str) -> Result<Self, LinkError> {
        let client = Client::builder()
            .build()
            .map_err(|e| LinkError::Transport(format!("HTTP client: {}", e)))?;
        Ok(CloudClient { client, url: url.to_string() })
    }

    /// Fetch the desired-state document. Anything other than a readable
    /// HTTP 200 body collapses into `Unreachable` for the fail-safe machine.
    pub async fn fetch_desired_state(&self) -> FetchOutcome {
        debug!("[CLOUD] GET {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .timeout(Duration::from_millis(CLOUD_POLL_TIMEOUT_MS))
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => return FetchOutcome::Unreachable(format!("GET {}: {}", self.url, e)),
        };

        let status = response.status();
        info!("[CLOUD] HTTP status: {}", status.as_u16());
        if status != StatusCode::OK {
            return FetchOutcome::Unreachable(format!("GET {} returned {}", self.url, status));
        }

        match response.text().await {
            Ok(body) => {
                debug!("[CLOUD] body: {}", body);
                FetchOutcome::Body(body)
            }
            Err(e) => FetchOutcome::Unreachable(format!("GET {} body: {}", self.url, e)),
        }
    }

    /// POST an envelope to the ingest agent as `application/json`. Returns the
    /// status code so the relay loop can log it; there is nothing to retry.
    pub async fn post_envelope(&self, envelope: &CloudEnvelope) -> Result<u16, LinkError> {
        let response = self
            .client
            .post(&self.url)
            .json(envelope)
            .send()
            .await
            .map_err(|e| LinkError::Transport(format!("POST {}: {}", self.url, e)))?;

        let status = response.status().as_u16();
        info!("[CLOUD] POST {} -> {}", self.url, status);
        match response.text().await {
            Ok(body) if !body.is_empty() => debug!("[CLOUD] response: {}", body),
            Ok(_) => {}
            Err(e) => warn!("[CLOUD] response body unreadable: {}", e),
        }
        Ok(status)
    }
}
