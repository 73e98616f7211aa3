#![allow(dead_code)]

//! Common test utilities for integration tests
//!
//! Scripted collaborators and run fixtures shared by the agent tests.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde_json::json;
use std::sync::Arc;

use health_analyst::adapters::completion::ScriptedCompletionClient;
use health_analyst::adapters::data_provider::StaticDataProvider;
use health_analyst::domain::models::{AgentConfig, ExecutionState};
use health_analyst::domain::ports::{CompletionClient, DataProvider, RequestKind};
use health_analyst::{HealthAnalysisAgent, ToolCatalog};

pub const SUBJECT: i64 = 42;

/// Fixed "today" for every scenario.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 10).expect("valid date")
}

/// Setup test logging
///
/// Call this at the beginning of tests that need logging output.
#[allow(dead_code)]
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Response selecting one call per `(operation, params)` pair.
pub fn selection(calls: &[(&str, serde_json::Value)]) -> String {
    let tools: Vec<_> = calls
        .iter()
        .map(|(name, params)| json!({ "name": name, "params": params }))
        .collect();
    json!({ "tools_to_execute": tools }).to_string()
}

/// Selection of a single sleep time series for `date`.
pub fn sleep_night(date: &str) -> String {
    selection(&[("sleep_timeseries", json!({ "target_date": date }))])
}

pub fn analysis(summary: &str, continuation_needed: bool) -> String {
    json!({
        "summary": summary,
        "insights": [{ "comment": format!("{summary} - detail") }],
        "additional_analysis_needed": continuation_needed,
        "additional_analysis_targets": if continuation_needed { json!(["previous night"]) } else { json!(null) },
    })
    .to_string()
}

/// Script date resolution, planning and report responses onto `client`.
pub fn push_base(client: &ScriptedCompletionClient, start: &str, end: &str) {
    client.push(
        RequestKind::DateResolution,
        Ok(json!({ "start_date": start, "end_date": end }).to_string()),
    );
    client.push(
        RequestKind::Planning,
        Ok(json!({
            "analysis_plan": ["Check sleep duration", "Compare with previous nights"],
            "focus_areas": ["sleep"],
            "user_intent": "Understand recent sleep quality",
        })
        .to_string()),
    );
    client.push(
        RequestKind::Report,
        Ok(format!("# Sleep report\n\nCovers {start} to {end}.")),
    );
}

/// Client with date resolution, planning and report already scripted.
pub fn scripted_client(start: &str, end: &str) -> ScriptedCompletionClient {
    let client = ScriptedCompletionClient::new();
    push_base(&client, start, end);
    client
}

pub fn sleep_provider() -> StaticDataProvider {
    StaticDataProvider::new().with_payload(
        "sleep_timeseries",
        json!({ "deep_minutes": 84, "light_minutes": 212, "rem_minutes": 95 }),
    )
}

pub fn agent(
    client: Arc<dyn CompletionClient>,
    provider: Arc<dyn DataProvider>,
    config: AgentConfig,
) -> HealthAnalysisAgent {
    HealthAnalysisAgent::new(client, provider, ToolCatalog::wearable(), config)
}

pub fn config_with_cap(max_iterations: u32) -> AgentConfig {
    AgentConfig {
        max_iterations,
        ..AgentConfig::default()
    }
}

pub fn state(query: &str) -> ExecutionState {
    ExecutionState::new(query, SUBJECT, Tz::UTC, today(), None)
}
