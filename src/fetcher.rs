//! HTTP client for the occupancy endpoint.

use crate::config::FetchConfig;
use crate::error::{CollectorError, Result};
use crate::occupancy::OccupancyReading;
use reqwest::StatusCode;
use tracing::debug;

/// Fetches a single [`OccupancyReading`] per call. No retries: a failed
/// cycle is simply skipped until the next tick.
#[derive(Debug, Clone)]
pub struct OccupancyClient {
    url: String,
    user_agent: String,
    client: reqwest::Client,
}

impl OccupancyClient {
    /// Build a client from fetch settings.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::Network`] if the TLS backend cannot be initialised.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CollectorError::Network(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            url: config.url.clone(),
            user_agent: config.user_agent.clone(),
            client,
        })
    }

    /// Endpoint this client polls.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// GET the endpoint, check for `200 OK`, and decode the body.
    ///
    /// # Errors
    ///
    /// - [`CollectorError::Network`] if the request cannot be sent or the body cannot be read.
    /// - [`CollectorError::BadStatus`] for any status other than 200.
    /// - [`CollectorError::Decode`] if the body is not occupancy JSON.
    pub async fn fetch(&self) -> Result<OccupancyReading> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| CollectorError::Network(format!("failed to send request: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(CollectorError::BadStatus(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CollectorError::Network(format!("failed to read body: {e}")))?;
        debug!(bytes = body.len(), "occupancy response received");

        serde_json::from_slice(&body)
            .map_err(|e| CollectorError::Decode(format!("failed to decode response: {e}")))
    }
}
