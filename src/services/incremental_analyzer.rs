//! Incremental analysis: fold one batch of payloads into a new finding.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::domain::errors::{RunError, RunResult};
use crate::domain::models::{AnalysisDigest, AnalysisResult, ExecutionState, Insight, RunPhase, ToolPayload};
use crate::domain::ports::{complete_json, CompletionClient};
use crate::services::prompts::{self, AnalysisContext};
use crate::services::tool_catalog::ToolCatalog;

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    insights: Vec<RawInsight>,
    #[serde(default, alias = "continuation_needed")]
    additional_analysis_needed: bool,
    #[serde(default, alias = "additional_targets")]
    additional_analysis_targets: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawInsight {
    Structured(Insight),
    Text(String),
}

impl From<RawInsight> for Insight {
    fn from(raw: RawInsight) -> Self {
        match raw {
            RawInsight::Structured(insight) => insight,
            RawInsight::Text(comment) => Insight::new(comment),
        }
    }
}

pub struct IncrementalAnalyzer {
    client: Arc<dyn CompletionClient>,
    timeout: Duration,
    comment_limit: usize,
}

impl IncrementalAnalyzer {
    pub fn new(client: Arc<dyn CompletionClient>, timeout: Duration, comment_limit: usize) -> Self {
        Self {
            client,
            timeout,
            comment_limit,
        }
    }

    /// Produce exactly one analysis result for this iteration and append it
    /// to the state. A response without a summary is fatal.
    pub async fn analyze(
        &self,
        state: &mut ExecutionState,
        payloads: &[ToolPayload],
        catalog: &ToolCatalog,
    ) -> RunResult<()> {
        let digests = AnalysisDigest::from_history(state.analysis_history(), self.comment_limit);
        let request = prompts::analysis(&AnalysisContext {
            query: &state.query,
            date_range: &state.date_range,
            plan: &state.plan,
            tools: catalog.descriptors(),
            payloads,
            records: state.records_of_iteration(state.current_iteration()),
            digests: &digests,
            comment_limit: self.comment_limit,
        });

        let raw: RawAnalysis = complete_json(self.client.as_ref(), request, self.timeout)
            .await
            .map_err(|e| RunError::from_completion(RunPhase::Analyzing, e, RunError::Analysis))?;

        let summary = raw
            .summary
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RunError::Analysis("response has no summary".to_string()))?;

        let result = AnalysisResult::new(
            summary,
            raw.insights.into_iter().map(Insight::from).collect(),
            raw.additional_analysis_needed,
            raw.additional_analysis_targets,
        );

        info!(
            iteration = state.current_iteration(),
            insights = result.insights.len(),
            continuation_needed = result.continuation_needed,
            targets = result.targets().len(),
            "Analysis step complete"
        );
        state.push_analysis(result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::completion::ScriptedCompletionClient;
    use crate::domain::ports::RequestKind;
    use chrono::NaiveDate;
    use chrono_tz::Tz;

    fn state() -> ExecutionState {
        ExecutionState::new("q", 1, Tz::UTC, NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(), None)
    }

    fn analyzer(response: &str) -> (IncrementalAnalyzer, Arc<ScriptedCompletionClient>) {
        let client = Arc::new(ScriptedCompletionClient::new().with_response(RequestKind::Analysis, response));
        (
            IncrementalAnalyzer::new(client.clone(), Duration::from_secs(5), 20),
            client,
        )
    }

    #[tokio::test]
    async fn test_result_appended_and_counted() {
        let (analyzer, _) = analyzer(
            r#"{"summary": "Short sleep on 2025-04-09", "insights": [{"comment": "2025-04-09 - 5h sleep"}, "plain text insight"], "additional_analysis_needed": true, "additional_analysis_targets": ["2025-04-08 activity_summary"]}"#,
        );
        let mut state = state();
        analyzer.analyze(&mut state, &[], &ToolCatalog::wearable()).await.unwrap();

        assert_eq!(state.loop_count(), 1);
        let latest = state.latest_analysis().unwrap();
        assert_eq!(latest.insights.len(), 2);
        assert_eq!(latest.insights[1].comment, "plain text insight");
        assert!(latest.continuation_needed);
        assert_eq!(latest.targets(), ["2025-04-08 activity_summary"]);
    }

    #[tokio::test]
    async fn test_targets_dropped_when_not_continuing() {
        let (analyzer, _) = analyzer(
            r#"{"summary": "done", "additional_analysis_needed": false, "additional_analysis_targets": ["x"]}"#,
        );
        let mut state = state();
        analyzer.analyze(&mut state, &[], &ToolCatalog::wearable()).await.unwrap();
        assert!(state.latest_analysis().unwrap().additional_targets.is_none());
    }

    #[tokio::test]
    async fn test_missing_summary_is_fatal() {
        let (analyzer, _) = analyzer(r#"{"summary": "   ", "insights": []}"#);
        let mut state = state();
        let err = analyzer
            .analyze(&mut state, &[], &ToolCatalog::wearable())
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Analysis(_)));
        assert_eq!(state.loop_count(), 0);
    }

    #[tokio::test]
    async fn test_previous_insights_truncated_in_prompt() {
        let (analyzer, client) = analyzer(r#"{"summary": "ok"}"#);
        let mut state = state();
        state.push_analysis(AnalysisResult::new(
            "earlier",
            vec![Insight::new("a".repeat(50))],
            true,
            None,
        ));
        analyzer.analyze(&mut state, &[], &ToolCatalog::wearable()).await.unwrap();

        let transcript = client.requests()[0].transcript();
        assert!(transcript.contains(&format!("{}...", "a".repeat(17))));
        assert!(!transcript.contains(&"a".repeat(18)));
        assert_eq!(state.analysis_history()[0].insights[0].comment.len(), 50);
    }
}
