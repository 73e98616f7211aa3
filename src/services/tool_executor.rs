//! Concurrent execution of one dispatched batch.

use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::domain::models::{ExecutionState, OutcomeStatus, ToolCall, ToolInvocationRecord, ToolPayload};
use crate::domain::ports::DataProvider;

/// Error detail recorded when a call exceeds its timeout.
pub const TIMEOUT_LABEL: &str = "timeout";

pub struct ToolExecutor {
    provider: Arc<dyn DataProvider>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(provider: Arc<dyn DataProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Run every call concurrently and wait for all of them.
    ///
    /// Records are appended to the state's tool history after the batch
    /// settles, in dispatch order. Only successful payloads are returned.
    pub async fn execute(&self, state: &mut ExecutionState, calls: Vec<ToolCall>) -> Vec<ToolPayload> {
        let iteration = state.current_iteration();
        let started = Instant::now();

        let outcomes = join_all(calls.into_iter().map(|call| self.invoke(call))).await;

        let mut payloads = Vec::new();
        for (call, outcome) in outcomes {
            let record = match &outcome {
                Ok(_) => ToolInvocationRecord {
                    operation_name: call.name.clone(),
                    parameters: call.params.clone(),
                    outcome_status: OutcomeStatus::Success,
                    error: None,
                    iteration,
                },
                Err(label) => ToolInvocationRecord {
                    operation_name: call.name.clone(),
                    parameters: call.params.clone(),
                    outcome_status: OutcomeStatus::Error,
                    error: Some(label.clone()),
                    iteration,
                },
            };
            if !state.record_invocation(record) {
                warn!(%call, "Call already recorded for this run, discarding its outcome");
                continue;
            }
            if let Ok(data) = outcome {
                payloads.push(ToolPayload { call, data });
            }
        }

        info!(
            iteration,
            succeeded = payloads.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Tool batch settled"
        );
        payloads
    }

    async fn invoke(&self, call: ToolCall) -> (ToolCall, Result<Value, String>) {
        let outcome = match tokio::time::timeout(self.timeout, self.provider.invoke(&call.name, &call.params)).await {
            Ok(Ok(data)) => {
                debug!(%call, "Tool call succeeded");
                Ok(data)
            }
            Ok(Err(e)) => {
                warn!(%call, error = %e, "Tool call failed");
                Err(e.label())
            }
            Err(_) => {
                warn!(%call, timeout_secs = self.timeout.as_secs(), "Tool call timed out");
                Err(TIMEOUT_LABEL.to_string())
            }
        };
        (call, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::data_provider::StaticDataProvider;
    use crate::domain::models::ToolParams;
    use crate::domain::ports::ProviderError;
    use chrono::NaiveDate;
    use chrono_tz::Tz;
    use serde_json::json;

    fn state() -> ExecutionState {
        ExecutionState::new("q", 1, Tz::UTC, NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(), None)
    }

    fn call(name: &str) -> ToolCall {
        ToolCall::new(name, ToolParams::new()).with_param("subject_id", 1)
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_order_and_payloads() {
        let provider = StaticDataProvider::new()
            .with_payload("steps_summary", json!({"steps": 4200}))
            .with_error("sleep_summary", ProviderError::NotFound);
        let executor = ToolExecutor::new(Arc::new(provider), Duration::from_secs(1));
        let mut state = state();

        let payloads = executor
            .execute(&mut state, vec![call("sleep_summary"), call("steps_summary")])
            .await;

        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].data, json!({"steps": 4200}));
        let history = state.tool_history();
        assert_eq!(history[0].operation_name, "sleep_summary");
        assert_eq!(history[0].error.as_deref(), Some("not_found"));
        assert_eq!(history[1].outcome_status, OutcomeStatus::Success);
        assert_eq!(state.payloads_received(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_does_not_cancel_siblings() {
        let provider = StaticDataProvider::new()
            .with_payload("steps_summary", json!({"steps": 1}))
            .with_payload("stress_summary", json!({"stress": 30}))
            .with_delay("stress_summary", Duration::from_secs(60));
        let executor = ToolExecutor::new(Arc::new(provider), Duration::from_secs(5));
        let mut state = state();

        let payloads = executor
            .execute(&mut state, vec![call("stress_summary"), call("steps_summary")])
            .await;

        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].call.name, "steps_summary");
        assert_eq!(state.tool_history()[0].error.as_deref(), Some(TIMEOUT_LABEL));
        assert_eq!(state.tool_history()[0].iteration, 1);
    }
}
