//! Final report synthesis from the distilled analysis history.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::domain::errors::{RunError, RunResult};
use crate::domain::models::{AnalysisDigest, ExecutionState, RunPhase};
use crate::domain::ports::{complete_text, CompletionClient};
use crate::services::prompts::{self, ReportContext};

pub struct ReportSynthesizer {
    client: Arc<dyn CompletionClient>,
    timeout: Duration,
    comment_limit: usize,
}

impl ReportSynthesizer {
    pub fn new(client: Arc<dyn CompletionClient>, timeout: Duration, comment_limit: usize) -> Self {
        Self {
            client,
            timeout,
            comment_limit,
        }
    }

    /// Write the Markdown report into `state.final_report`. Raw payloads are
    /// never consulted, only the analysis history.
    pub async fn synthesize(&self, state: &mut ExecutionState) -> RunResult<()> {
        if state.analysis_history().is_empty() {
            return Err(RunError::Inconclusive);
        }

        let digests = AnalysisDigest::from_history(state.analysis_history(), self.comment_limit);
        let request = prompts::report(&ReportContext {
            query: &state.query,
            date_range: &state.date_range,
            focus_areas: &state.focus_areas,
            user_intent: &state.user_intent,
            digests: &digests,
        });

        let text = complete_text(self.client.as_ref(), request, self.timeout)
            .await
            .map_err(|e| RunError::from_completion(RunPhase::Reporting, e, RunError::Report))?;

        let report = strip_markdown_fence(&text);
        if report.is_empty() {
            return Err(RunError::Report("empty report".to_string()));
        }

        info!(chars = report.chars().count(), "Final report written");
        state.final_report = Some(report);
        Ok(())
    }
}

/// Remove a fence wrapping the whole report, which models add despite
/// being told not to.
fn strip_markdown_fence(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed.to_string();
    };
    let body = body
        .strip_prefix("markdown")
        .or_else(|| body.strip_prefix("md"))
        .unwrap_or(body);
    body.trim().to_string()
}
