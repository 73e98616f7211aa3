//! Mutable record threaded through one analysis run.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::analysis::{AnalysisPlan, AnalysisResult};
use super::date_range::{DateHint, DateRange, DateResolution};
use super::report::Termination;
use super::tool::{ToolCall, ToolInvocationRecord};

/// Phase of the run's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Planning,
    Dispatching,
    Executing,
    Analyzing,
    Reporting,
    Done,
    Failed,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Dispatching => "dispatching",
            Self::Executing => "executing",
            Self::Analyzing => "analyzing",
            Self::Reporting => "reporting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution state for one run. Owned exclusively by the orchestrator and
/// discarded once the final report is returned.
#[derive(Debug, Clone)]
pub struct ExecutionState {
    pub run_id: Uuid,
    pub query: String,
    pub subject_id: i64,
    pub timezone: Tz,
    pub today: NaiveDate,
    pub date_hint: Option<DateHint>,

    pub date_range: DateRange,
    pub date_resolution: DateResolution,

    pub plan: Vec<String>,
    pub focus_areas: Vec<String>,
    pub user_intent: String,

    tool_history: Vec<ToolInvocationRecord>,
    analysis_history: Vec<AnalysisResult>,
    loop_count: u32,
    payloads_received: usize,

    pub phase: RunPhase,
    pub termination: Option<Termination>,
    pub final_report: Option<String>,
}

impl ExecutionState {
    pub fn new(
        query: impl Into<String>,
        subject_id: i64,
        timezone: Tz,
        today: NaiveDate,
        date_hint: Option<DateHint>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            query: query.into(),
            subject_id,
            timezone,
            today,
            date_hint,
            date_range: DateRange::single(today),
            date_resolution: DateResolution::Resolved,
            plan: Vec::new(),
            focus_areas: Vec::new(),
            user_intent: String::new(),
            tool_history: Vec::new(),
            analysis_history: Vec::new(),
            loop_count: 0,
            payloads_received: 0,
            phase: RunPhase::Planning,
            termination: None,
            final_report: None,
        }
    }

    pub fn apply_plan(&mut self, plan: AnalysisPlan) {
        self.plan = plan.analysis_plan;
        self.focus_areas = plan.focus_areas;
        self.user_intent = plan.user_intent;
    }

    /// Number of completed dispatch/execute/analyze iterations.
    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    pub fn tool_history(&self) -> &[ToolInvocationRecord] {
        &self.tool_history
    }

    /// Records made during `iteration`.
    pub fn records_of_iteration(&self, iteration: u32) -> &[ToolInvocationRecord] {
        let start = self.tool_history.partition_point(|record| record.iteration < iteration);
        let end = self.tool_history.partition_point(|record| record.iteration <= iteration);
        &self.tool_history[start..end]
    }

    pub fn analysis_history(&self) -> &[AnalysisResult] {
        &self.analysis_history
    }

    pub fn latest_analysis(&self) -> Option<&AnalysisResult> {
        self.analysis_history.last()
    }

    /// Total successful payloads seen across all iterations.
    pub fn payloads_received(&self) -> usize {
        self.payloads_received
    }

    /// Whether `call` was already attempted in this run, whatever its outcome.
    pub fn has_attempted(&self, call: &ToolCall) -> bool {
        self.tool_history.iter().any(|record| record.matches(call))
    }

    /// Append a record. Returns `false` and leaves history untouched when an
    /// identical (operation, parameters) pair is already recorded.
    pub fn record_invocation(&mut self, record: ToolInvocationRecord) -> bool {
        let duplicate = self.tool_history.iter().any(|existing| {
            existing.operation_name == record.operation_name
                && existing.parameters == record.parameters
        });
        if duplicate {
            return false;
        }
        if record.is_success() {
            self.payloads_received += 1;
        }
        self.tool_history.push(record);
        true
    }

    /// Append one iteration's finding and count the iteration as complete.
    pub fn push_analysis(&mut self, result: AnalysisResult) {
        self.analysis_history.push(result);
        self.loop_count += 1;
    }

    /// Iteration number (1-based) of the iteration currently in flight.
    pub fn current_iteration(&self) -> u32 {
        self.loop_count + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::tool::{OutcomeStatus, ToolParams};

    fn state() -> ExecutionState {
        ExecutionState::new(
            "how did I sleep?",
            7,
            Tz::UTC,
            NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
            None,
        )
    }

    fn record(name: &str, date: &str, status: OutcomeStatus) -> ToolInvocationRecord {
        let mut parameters = ToolParams::new();
        parameters.insert("target_date".to_string(), date.into());
        ToolInvocationRecord {
            operation_name: name.to_string(),
            parameters,
            outcome_status: status,
            error: None,
            iteration: 1,
        }
    }

    #[test]
    fn test_new_state_starts_in_planning() {
        let state = state();
        assert_eq!(state.phase, RunPhase::Planning);
        assert_eq!(state.loop_count(), 0);
        assert_eq!(state.current_iteration(), 1);
        assert!(state.tool_history().is_empty());
        assert!(state.final_report.is_none());
    }

    #[test]
    fn test_record_invocation_rejects_duplicates() {
        let mut state = state();
        assert!(state.record_invocation(record("sleep_timeseries", "2025-04-09", OutcomeStatus::Success)));
        assert!(!state.record_invocation(record("sleep_timeseries", "2025-04-09", OutcomeStatus::Error)));
        assert!(state.record_invocation(record("sleep_timeseries", "2025-04-08", OutcomeStatus::Error)));

        assert_eq!(state.tool_history().len(), 2);
        assert_eq!(state.payloads_received(), 1);
    }

    #[test]
    fn test_records_of_iteration_slices_history() {
        let mut state = state();
        state.record_invocation(record("sleep_timeseries", "2025-04-09", OutcomeStatus::Success));
        state.record_invocation(ToolInvocationRecord {
            iteration: 2,
            ..record("stress_timeseries", "2025-04-09", OutcomeStatus::Error)
        });

        assert_eq!(state.records_of_iteration(1).len(), 1);
        let second = state.records_of_iteration(2);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].operation_name, "stress_timeseries");
        assert!(state.records_of_iteration(3).is_empty());
    }

    #[test]
    fn test_push_analysis_counts_iterations() {
        let mut state = state();
        state.push_analysis(AnalysisResult::new("first", vec![], true, None));
        state.push_analysis(AnalysisResult::new("second", vec![], false, None));

        assert_eq!(state.loop_count(), 2);
        assert_eq!(state.latest_analysis().map(|a| a.summary.as_str()), Some("second"));
    }
}
