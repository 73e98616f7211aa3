//! Data Provider port: the only way the orchestrator reaches metric data.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::models::ToolParams;

/// Label prefix of [`ProviderError::Unavailable`] records.
pub const UNAVAILABLE_LABEL: &str = "unavailable";

/// Error types for data provider calls
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// No data exists for the requested operation and parameters.
    #[error("No data found")]
    NotFound,

    #[error("Data provider unavailable: {0}")]
    Unavailable(String),

    #[error("Data provider call failed: {0}")]
    Failed(String),
}

impl ProviderError {
    /// Short label stored on the invocation record.
    pub fn label(&self) -> String {
        match self {
            Self::NotFound => "not_found".to_string(),
            Self::Unavailable(msg) => format!("{UNAVAILABLE_LABEL}: {msg}"),
            Self::Failed(msg) => format!("failed: {msg}"),
        }
    }
}

/// Executes one catalog operation with concrete parameters.
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn invoke(&self, operation: &str, params: &ToolParams) -> Result<Value, ProviderError>;
}
