//! Data provider backed by a metrics HTTP service.

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::models::{DataProviderConfig, ToolParams};
use crate::domain::ports::{DataProvider, ProviderError};
use crate::infrastructure::logging::scrub_secrets;

/// Calls `POST {base_url}/tools/{operation}` with the parameters as the JSON
/// body and returns the response body as the payload.
pub struct HttpDataProvider {
    http_client: ReqwestClient,
    base_url: String,
}

impl HttpDataProvider {
    pub fn new(config: &DataProviderConfig) -> Result<Self, ProviderError> {
        let http_client = ReqwestClient::builder()
            .pool_max_idle_per_host(10)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Failed(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl DataProvider for HttpDataProvider {
    async fn invoke(&self, operation: &str, params: &ToolParams) -> Result<Value, ProviderError> {
        let url = format!("{}/tools/{operation}", self.base_url);
        debug!(%url, "POST");

        let response = self
            .http_client
            .post(&url)
            .json(params)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| ProviderError::Failed(format!("invalid payload: {e}")));
        }

        let body = scrub_secrets(&response.text().await.unwrap_or_default());
        warn!(operation, %status, %body, "Data provider error");
        Err(match status {
            StatusCode::NOT_FOUND => ProviderError::NotFound,
            s if s.is_server_error() => ProviderError::Unavailable(format!("{s}: {body}")),
            s => ProviderError::Failed(format!("{s}: {body}")),
        })
    }
}
