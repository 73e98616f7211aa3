//! Final report returned by a successful run.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::analysis::AnalysisResult;
use super::date_range::{DateRange, DateResolution};
use super::tool::ToolInvocationRecord;

/// Why the analysis loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The analyzer reported that no further data was needed.
    Concluded,
    /// The iteration cap was hit while the analyzer still asked for more.
    IterationLimitReached,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Concluded => "concluded",
            Self::IterationLimitReached => "iteration_limit_reached",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalReport {
    pub run_id: Uuid,
    pub subject_id: i64,
    pub query: String,
    pub date_range: DateRange,
    pub date_resolution: DateResolution,
    pub plan: Vec<String>,
    pub focus_areas: Vec<String>,
    pub user_intent: String,
    /// Markdown narrative.
    pub report: String,
    pub iterations: u32,
    pub termination: Termination,
    pub tool_history: Vec<ToolInvocationRecord>,
    pub analysis_history: Vec<AnalysisResult>,
}
