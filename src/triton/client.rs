use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    config::AppConfig,
    error::InferenceError,
    triton::{
        InferenceBackend,
        protocol::{ErrorBody, InferRequest, InferResponse},
    },
};

const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for a Triton server. Cloning shares the connection pool.
#[derive(Debug, Clone)]
pub struct TritonClient {
    http: reqwest::Client,
    base_url: String,
    health_timeout: Duration,
}

impl TritonClient {
    pub fn new(config: &AppConfig) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self::with_client(http, config.triton_url.clone())
            .with_health_timeout(config.health_timeout))
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
        }
    }

    /// Overrides the client-wide timeout for liveness probes only.
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }
}

#[async_trait]
impl InferenceBackend for TritonClient {
    async fn infer(
        &self,
        model_name: &str,
        request: &InferRequest,
    ) -> Result<InferResponse, InferenceError> {
        let url = format!("{}/v2/models/{}/infer", self.base_url, model_name);
        debug!(%url, inputs = request.inputs.len(), "posting inference request");

        let response = self.http.post(&url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("unknown error");
            let message = match response.text().await {
                Ok(body) if !body.trim().is_empty() => serde_json::from_str::<ErrorBody>(&body)
                    .map(|parsed| parsed.error)
                    .unwrap_or(body),
                _ => reason.to_string(),
            };
            return Err(InferenceError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| InferenceError::Protocol(e.to_string()))
    }

    async fn is_live(&self) -> Result<bool, InferenceError> {
        let response = self
            .http
            .get(format!("{}/v2/health/live", self.base_url))
            .timeout(self.health_timeout)
            .send()
            .await?;
        Ok(response.status().is_success())
    }
}
