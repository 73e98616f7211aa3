//! Tool selection for one iteration.
//!
//! The model chooses; the dispatcher validates. Every returned call is pinned
//! to the run's subject, checked against the catalog, and dropped when it is
//! a structural duplicate of an earlier attempt or of a call earlier in the
//! same batch.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::errors::{RunError, RunResult};
use crate::domain::models::{
    parse_date, AnalysisDigest, ExecutionState, ParamType, RunPhase, ToolCall, ToolParams,
};
use crate::domain::ports::{complete_json, CompletionClient};
use crate::services::prompts::{self, ToolSelectionContext};
use crate::services::tool_catalog::{ToolCatalog, SUBJECT_PARAM};

#[derive(Debug, Deserialize)]
struct ToolSelection {
    #[serde(default)]
    tools_to_execute: Vec<SelectedCall>,
}

#[derive(Debug, Deserialize)]
struct SelectedCall {
    name: String,
    #[serde(default, alias = "arguments")]
    params: ToolParams,
}

/// Why a selected call was not dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    Invalid(String),
    FutureDate,
    AlreadyAttempted,
    DuplicateInBatch,
    OverBatchLimit,
}

pub struct ToolDispatcher {
    client: Arc<dyn CompletionClient>,
    timeout: Duration,
    max_calls: usize,
    comment_limit: usize,
}

impl ToolDispatcher {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        timeout: Duration,
        max_calls: usize,
        comment_limit: usize,
    ) -> Self {
        Self {
            client,
            timeout,
            max_calls,
            comment_limit,
        }
    }

    /// Select this iteration's calls. Returns at least one call, none of
    /// which has been attempted before in this run.
    pub async fn dispatch(&self, state: &ExecutionState, catalog: &ToolCatalog) -> RunResult<Vec<ToolCall>> {
        let digests = AnalysisDigest::from_history(state.analysis_history(), self.comment_limit);
        let targets = state
            .latest_analysis()
            .map(|latest| latest.targets().to_vec())
            .unwrap_or_default();

        let request = prompts::tool_selection(&ToolSelectionContext {
            query: &state.query,
            subject_id: state.subject_id,
            date_range: &state.date_range,
            plan: &state.plan,
            tools: catalog.descriptors(),
            history: state.tool_history(),
            digests: &digests,
            targets: &targets,
        });

        let selection: ToolSelection = complete_json(self.client.as_ref(), request, self.timeout)
            .await
            .map_err(|e| RunError::from_completion(RunPhase::Dispatching, e, RunError::Dispatch))?;

        let selected = selection
            .tools_to_execute
            .into_iter()
            .map(|call| ToolCall::new(call.name, call.params))
            .collect::<Vec<_>>();
        let requested = selected.len();

        let calls = self.validate(state, catalog, selected);
        if calls.is_empty() {
            return Err(RunError::Dispatch(format!(
                "no valid, unattempted calls among {requested} selected"
            )));
        }

        info!(
            iteration = state.current_iteration(),
            requested,
            dispatched = calls.len(),
            "Tools selected"
        );
        Ok(calls)
    }

    /// Filter a raw selection down to the calls that may run, keeping order.
    pub fn validate(&self, state: &ExecutionState, catalog: &ToolCatalog, selected: Vec<ToolCall>) -> Vec<ToolCall> {
        let mut calls: Vec<ToolCall> = Vec::new();

        for raw in selected {
            let pinned = raw.with_param(SUBJECT_PARAM, state.subject_id);
            let reason = match catalog.normalize(&pinned) {
                Err(e) => Some((pinned, DropReason::Invalid(e.to_string()))),
                Ok(call) if has_future_date(&call, catalog, state) => Some((call, DropReason::FutureDate)),
                Ok(call) if state.has_attempted(&call) => Some((call, DropReason::AlreadyAttempted)),
                Ok(call) if calls.contains(&call) => Some((call, DropReason::DuplicateInBatch)),
                Ok(call) if calls.len() >= self.max_calls => Some((call, DropReason::OverBatchLimit)),
                Ok(call) => {
                    calls.push(call);
                    None
                }
            };

            if let Some((call, reason)) = reason {
                match reason {
                    DropReason::Invalid(detail) => warn!(%call, %detail, "Dropping invalid tool call"),
                    other => debug!(%call, reason = ?other, "Dropping tool call"),
                }
            }
        }

        calls
    }
}

fn has_future_date(call: &ToolCall, catalog: &ToolCatalog, state: &ExecutionState) -> bool {
    let Some(descriptor) = catalog.get(&call.name) else {
        return false;
    };
    descriptor
        .parameters
        .iter()
        .filter(|spec| spec.param_type == ParamType::Date)
        .filter_map(|spec| call.params.get(&spec.name).and_then(Value::as_str).and_then(parse_date))
        .any(|date| date > state.today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::completion::ScriptedCompletionClient;
    use crate::domain::models::{OutcomeStatus, ToolInvocationRecord};
    use crate::domain::ports::RequestKind;
    use chrono::NaiveDate;
    use chrono_tz::Tz;
    use serde_json::json;

    fn state() -> ExecutionState {
        ExecutionState::new(
            "how did I sleep?",
            42,
            Tz::UTC,
            NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
            None,
        )
    }

    fn dispatcher(client: ScriptedCompletionClient) -> ToolDispatcher {
        ToolDispatcher::new(Arc::new(client), Duration::from_secs(5), 9, 1000)
    }

    fn sleep_call(date: &str) -> ToolCall {
        ToolCall::new("sleep_timeseries", ToolParams::new()).with_param("target_date", date)
    }

    #[test]
    fn test_validate_pins_subject_and_keeps_order() {
        let d = dispatcher(ScriptedCompletionClient::new());
        let selected = vec![
            sleep_call("2025-04-09").with_param(SUBJECT_PARAM, 7),
            ToolCall::new("weather", ToolParams::new()),
            sleep_call("2025-04-08"),
            sleep_call("2025-04-09"),
            sleep_call("2025-04-11"),
        ];
        let calls = d.validate(&state(), &ToolCatalog::wearable(), selected);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].params["target_date"], json!("2025-04-09"));
        assert_eq!(calls[1].params["target_date"], json!("2025-04-08"));
        assert!(calls.iter().all(|c| c.params[SUBJECT_PARAM] == json!(42)));
    }

    #[test]
    fn test_validate_skips_attempted_calls() {
        let d = dispatcher(ScriptedCompletionClient::new());
        let mut state = state();
        let attempted = sleep_call("2025-04-09").with_param(SUBJECT_PARAM, 42);
        state.record_invocation(ToolInvocationRecord {
            operation_name: attempted.name.clone(),
            parameters: attempted.params.clone(),
            outcome_status: OutcomeStatus::Error,
            error: Some("not_found".to_string()),
            iteration: 1,
        });

        let calls = d.validate(&state, &ToolCatalog::wearable(), vec![sleep_call("2025-04-09")]);
        assert!(calls.is_empty());
    }

    #[test]
    fn test_validate_caps_batch() {
        let d = ToolDispatcher::new(Arc::new(ScriptedCompletionClient::new()), Duration::from_secs(5), 1, 1000);
        let calls = d.validate(
            &state(),
            &ToolCatalog::wearable(),
            vec![sleep_call("2025-04-09"), sleep_call("2025-04-08")],
        );
        assert_eq!(calls.len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_with_nothing_valid_is_dispatch_error() {
        let client = ScriptedCompletionClient::new().with_response(
            RequestKind::ToolSelection,
            r#"{"tools_to_execute": [{"name": "weather", "params": {}}]}"#,
        );
        let err = dispatcher(client)
            .dispatch(&state(), &ToolCatalog::wearable())
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Dispatch(_)));
    }

    #[tokio::test]
    async fn test_dispatch_accepts_arguments_alias() {
        let client = ScriptedCompletionClient::new().with_response(
            RequestKind::ToolSelection,
            r#"```json
{"tools_to_execute": [{"name": "steps_summary", "arguments": {"start_date": "2025-04-01", "end_date": "2025-04-07"}}]}
```"#,
        );
        let calls = dispatcher(client)
            .dispatch(&state(), &ToolCatalog::wearable())
            .await
            .unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "steps_summary");
    }
}
