/*!
Thin client for the inference and actuation backend.

The trait seam keeps transport out of the session logic so tests can
substitute a mock; the reqwest implementation talks to the real
`/predict` and `/spray` endpoints.
*/

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use leafguard_store::DetectionResult;

use crate::core::config::BackendConfig;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure: connection refused, timeout, bad body.
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned {status} for {endpoint}")]
    Backend {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },
}

/// Acknowledgement of a dispatched spray.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SprayAck {
    pub amount_ml: f64,
}

/// Operations the dashboard needs from the backend.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Submit a leaf image for classification.
    async fn classify(
        &self,
        image: Vec<u8>,
        filename: &str,
    ) -> Result<DetectionResult, ClientError>;

    /// Request a pesticide spray of the given amount.
    async fn spray(&self, amount_ml: f64) -> Result<SprayAck, ClientError>;
}

/// HTTP implementation against the external backend.
pub struct HttpBackendClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn classify(
        &self,
        image: Vec<u8>,
        filename: &str,
    ) -> Result<DetectionResult, ClientError> {
        let part = reqwest::multipart::Part::bytes(image)
            .file_name(filename.to_string())
            .mime_str("image/jpeg")?;
        let form = reqwest::multipart::Form::new().part("image", part);

        debug!(filename, "Submitting image for classification");
        let response = self
            .client
            .post(format!("{}/predict", self.base_url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Backend {
                endpoint: "/predict",
                status: response.status(),
            });
        }

        let result: DetectionResult = response.json().await?;
        info!(disease = ?result.disease, "Classification response received");
        Ok(result)
    }

    async fn spray(&self, amount_ml: f64) -> Result<SprayAck, ClientError> {
        let response = self
            .client
            .post(format!("{}/spray", self.base_url))
            .json(&serde_json::json!({ "amount": amount_ml }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Backend {
                endpoint: "/spray",
                status: response.status(),
            });
        }

        info!(amount_ml, "Spray dispatched");
        Ok(SprayAck { amount_ml })
    }
}
