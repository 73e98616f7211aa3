//! Structured Completion port.
//!
//! Every reasoning step (date resolution, planning, tool selection, analysis,
//! report) talks to the external model through this one trait. Steps build a
//! [`CompletionRequest`] and read back either a typed value via
//! [`complete_json`] or raw text via [`complete_text`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which step is asking. Adapters may route steps to different models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    DateResolution,
    Planning,
    ToolSelection,
    Analysis,
    Report,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DateResolution => "date_resolution",
            Self::Planning => "planning",
            Self::ToolSelection => "tool_selection",
            Self::Analysis => "analysis",
            Self::Report => "report",
        }
    }
}

/// Expected shape of the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// A single JSON object.
    Json,
    /// Free text (Markdown).
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One request to the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub kind: RequestKind,
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub format: ResponseFormat,
}

impl CompletionRequest {
    pub fn json(kind: RequestKind, system: impl Into<String>) -> Self {
        Self {
            kind,
            system: system.into(),
            messages: Vec::new(),
            format: ResponseFormat::Json,
        }
    }

    pub fn text(kind: RequestKind, system: impl Into<String>) -> Self {
        Self {
            kind,
            system: system.into(),
            messages: Vec::new(),
            format: ResponseFormat::Text,
        }
    }

    #[must_use]
    pub fn with_user_message(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::user(content));
        self
    }

    /// All message contents joined, handy for assertions and logging.
    pub fn transcript(&self) -> String {
        std::iter::once(self.system.as_str())
            .chain(self.messages.iter().map(|m| m.content.as_str()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub content: String,
}

/// Error types for completion calls
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompletionError {
    /// Service unreachable, overloaded, or still failing after retries.
    #[error("Completion service unavailable: {0}")]
    Unavailable(String),

    #[error("Completion call timed out after {0}s")]
    Timeout(u64),

    /// The service refused the request (bad key, invalid request, ...).
    #[error("Completion request rejected: {0}")]
    Rejected(String),

    /// The response did not have the requested shape.
    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),
}

impl CompletionError {
    /// Whether the failure is the service being down rather than a bad answer.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

/// Client for an external reasoning service
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Adapter name, for logs.
    fn name(&self) -> &'static str;

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError>;
}

/// Run `request` under `timeout` and return the raw text.
pub async fn complete_text(
    client: &dyn CompletionClient,
    request: CompletionRequest,
    timeout: Duration,
) -> Result<String, CompletionError> {
    match tokio::time::timeout(timeout, client.complete(request)).await {
        Ok(result) => result.map(|response| response.content),
        Err(_) => Err(CompletionError::Timeout(timeout.as_secs())),
    }
}

/// Run `request` under `timeout` and decode the first JSON object in the
/// response into `T`.
pub async fn complete_json<T: DeserializeOwned>(
    client: &dyn CompletionClient,
    request: CompletionRequest,
    timeout: Duration,
) -> Result<T, CompletionError> {
    let content = complete_text(client, request, timeout).await?;
    parse_json_response(&content)
}

/// Decode a model response, tolerating prose or code fences around the
/// object.
pub fn parse_json_response<T: DeserializeOwned>(content: &str) -> Result<T, CompletionError> {
    let body = extract_json_object(content).unwrap_or(content);
    serde_json::from_str(body).map_err(|e| CompletionError::MalformedResponse(e.to_string()))
}

/// Locate the first balanced `{...}` in `text`, skipping braces inside
/// string literals.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (offset, ch) in text[start..].char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
