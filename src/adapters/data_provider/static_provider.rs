//! In-memory data provider keyed by operation name.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::domain::models::{ToolCall, ToolParams};
use crate::domain::ports::{DataProvider, ProviderError};

#[derive(Debug, Clone)]
struct Canned {
    outcome: Result<Value, ProviderError>,
    delay: Option<Duration>,
}

/// Answers every call to an operation with the same outcome, optionally
/// after a delay, and remembers the calls it served. Operations without a
/// canned outcome are `NotFound`.
#[derive(Debug, Default)]
pub struct StaticDataProvider {
    canned: HashMap<String, Canned>,
    calls: Mutex<Vec<ToolCall>>,
}

impl StaticDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_payload(mut self, operation: &str, payload: Value) -> Self {
        self.set(operation, Ok(payload));
        self
    }

    #[must_use]
    pub fn with_error(mut self, operation: &str, error: ProviderError) -> Self {
        self.set(operation, Err(error));
        self
    }

    /// Delay every answer for `operation`; set its outcome first.
    #[must_use]
    pub fn with_delay(mut self, operation: &str, delay: Duration) -> Self {
        if let Some(canned) = self.canned.get_mut(operation) {
            canned.delay = Some(delay);
        }
        self
    }

    fn set(&mut self, operation: &str, outcome: Result<Value, ProviderError>) {
        self.canned
            .insert(operation.to_string(), Canned { outcome, delay: None });
    }

    /// Calls served so far, in arrival order.
    pub fn calls(&self) -> Vec<ToolCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DataProvider for StaticDataProvider {
    async fn invoke(&self, operation: &str, params: &ToolParams) -> Result<Value, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(ToolCall::new(operation, params.clone()));
        }

        let Some(canned) = self.canned.get(operation) else {
            return Err(ProviderError::NotFound);
        };
        if let Some(delay) = canned.delay {
            tokio::time::sleep(delay).await;
        }
        canned.outcome.clone()
    }
}
