//! Structured completion over the Anthropic Messages API.

use async_trait::async_trait;
use reqwest::{header, Client as ReqwestClient, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::errors::AnthropicError;
use super::rate_limiter::TokenBucketRateLimiter;
use super::retry::RetryPolicy;
use crate::domain::models::{CompletionConfig, RateLimitConfig, RetryConfig};
use crate::domain::ports::{
    ChatMessage, CompletionClient, CompletionError, CompletionRequest, CompletionResponse, RequestKind,
};
use crate::infrastructure::logging::scrub_secrets;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

/// HTTP client for the Messages API, with rate limiting and retry.
pub struct AnthropicCompletionClient {
    http_client: ReqwestClient,
    base_url: String,
    config: CompletionConfig,
    rate_limiter: TokenBucketRateLimiter,
    retry_policy: RetryPolicy,
}

impl AnthropicCompletionClient {
    pub fn new(
        config: &CompletionConfig,
        rate_limit: &RateLimitConfig,
        retry: &RetryConfig,
    ) -> Result<Self, AnthropicError> {
        let api_key = config.resolve_api_key().ok_or(AnthropicError::InvalidApiKey)?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            "x-api-key",
            header::HeaderValue::from_str(&api_key)
                .map_err(|e| AnthropicError::InvalidRequest(format!("Invalid API key: {e}")))?,
        );
        headers.insert("anthropic-version", header::HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));

        let http_client = ReqwestClient::builder()
            .pool_max_idle_per_host(10)
            .timeout(Duration::from_secs(config.timeout_secs))
            .tcp_nodelay(true)
            .default_headers(headers)
            .build()?;

        info!(
            base_url = %config.base_url,
            model = %config.model,
            rate_limit_rps = rate_limit.requests_per_second,
            "Initialized Anthropic completion client"
        );

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
            rate_limiter: TokenBucketRateLimiter::new(rate_limit.requests_per_second),
            retry_policy: RetryPolicy::from(retry),
        })
    }

    /// Model used for a request kind.
    pub fn model_for(&self, kind: RequestKind) -> &str {
        match kind {
            RequestKind::Planning => &self.config.planner_model,
            RequestKind::Report => &self.config.report_model,
            RequestKind::DateResolution | RequestKind::ToolSelection | RequestKind::Analysis => {
                &self.config.model
            }
        }
    }

    async fn send(&self, body: &MessagesRequest<'_>) -> Result<MessagesResponse, AnthropicError> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!(%url, "POST");
        let response = self.http_client.post(&url).json(body).send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response(response: Response) -> Result<MessagesResponse, AnthropicError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error body".to_string());
        let body = scrub_secrets(&body);
        warn!(%status, %body, "Completion API error");
        Err(AnthropicError::from_status(status, body))
    }
}

#[async_trait]
impl CompletionClient for AnthropicCompletionClient {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    #[instrument(skip(self, request), fields(kind = request.kind.as_str()))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, CompletionError> {
        let body = MessagesRequest {
            model: self.model_for(request.kind),
            max_tokens: self.config.max_tokens,
            system: &request.system,
            messages: &request.messages,
            temperature: self.config.temperature,
        };

        self.rate_limiter.acquire().await;
        let response = self.retry_policy.execute(|| self.send(&body)).await?;

        if let Some(usage) = &response.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Completion succeeded"
            );
        }

        let content = response
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        if content.trim().is_empty() {
            return Err(AnthropicError::EmptyResponse.into());
        }

        Ok(CompletionResponse { content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client(base_url: &str) -> AnthropicCompletionClient {
        let config = CompletionConfig {
            base_url: base_url.to_string(),
            api_key: Some("sk-ant-test-key".to_string()),
            planner_model: "planner".to_string(),
            ..CompletionConfig::default()
        };
        let retry = RetryConfig {
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        };
        AnthropicCompletionClient::new(&config, &RateLimitConfig::default(), &retry).unwrap()
    }

    #[tokio::test]
    async fn test_complete_joins_text_blocks() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "sk-ant-test-key")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .match_body(Matcher::PartialJson(json!({"model": "planner", "system": "sys"})))
            .with_status(200)
            .with_body(
                json!({
                    "content": [{"type": "text", "text": "{\"a\":"}, {"type": "text", "text": " 1}"}],
                    "usage": {"input_tokens": 10, "output_tokens": 4}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let response = client(&server.url())
            .complete(CompletionRequest::json(RequestKind::Planning, "sys").with_user_message("hi"))
            .await
            .unwrap();

        assert_eq!(response.content, "{\"a\": 1}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_errors_retried_then_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .with_status(529)
            .with_body("overloaded")
            .expect(3)
            .create_async()
            .await;

        let err = client(&server.url())
            .complete(CompletionRequest::text(RequestKind::Report, "sys"))
            .await
            .unwrap_err();

        assert!(err.is_unavailable());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_auth_failure_is_rejected_without_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let err = client(&server.url())
            .complete(CompletionRequest::text(RequestKind::Report, "sys"))
            .await
            .unwrap_err();

        assert!(matches!(err, CompletionError::Rejected(_)));
        mock.assert_async().await;
    }

    #[test]
    fn test_missing_api_key() {
        temp_env::with_var_unset("ANTHROPIC_API_KEY", || {
            let result = AnthropicCompletionClient::new(
                &CompletionConfig::default(),
                &RateLimitConfig::default(),
                &RetryConfig::default(),
            );
            assert!(matches!(result, Err(AnthropicError::InvalidApiKey)));
        });
    }
}
