//! Plan generation: sub-goals, focus areas and user intent for a run.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::errors::{RunError, RunResult};
use crate::domain::models::{AnalysisPlan, DateRange, RunPhase};
use crate::domain::ports::{complete_json, CompletionClient};
use crate::services::prompts::{self, DEFAULT_USER_INTENT};
use crate::services::tool_catalog::ToolCatalog;

pub struct PlanGenerator {
    client: Arc<dyn CompletionClient>,
    timeout: Duration,
}

impl PlanGenerator {
    pub fn new(client: Arc<dyn CompletionClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Ask for a plan. A failed call is fatal; a partial answer is completed
    /// with an empty plan and the default intent.
    pub async fn generate(
        &self,
        query: &str,
        date_range: &DateRange,
        catalog: &ToolCatalog,
    ) -> RunResult<AnalysisPlan> {
        let request = prompts::planning(query, date_range, catalog.descriptors());
        let plan: AnalysisPlan = complete_json(self.client.as_ref(), request, self.timeout)
            .await
            .map_err(|e| RunError::from_completion(RunPhase::Planning, e, RunError::Planning))?;

        let plan = normalize(plan);
        if plan.analysis_plan.is_empty() {
            warn!("Planner returned no sub-goals, continuing with an empty plan");
        }
        info!(
            goals = plan.analysis_plan.len(),
            focus_areas = ?plan.focus_areas,
            "Analysis plan generated"
        );
        Ok(plan)
    }
}

fn normalize(plan: AnalysisPlan) -> AnalysisPlan {
    let clean = |items: Vec<String>| -> Vec<String> {
        items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    };

    let mut focus_areas: Vec<String> = Vec::new();
    for area in clean(plan.focus_areas) {
        if !focus_areas.contains(&area) {
            focus_areas.push(area);
        }
    }

    let user_intent = plan.user_intent.trim();
    AnalysisPlan {
        analysis_plan: clean(plan.analysis_plan),
        focus_areas,
        user_intent: if user_intent.is_empty() {
            DEFAULT_USER_INTENT.to_string()
        } else {
            user_intent.to_string()
        },
    }
}
