//! Run-level error taxonomy.
//!
//! Non-fatal conditions (date resolution falling back to the default window,
//! individual tool failures) never surface here: they are absorbed by the step
//! that hit them and recorded on the execution state. Everything in
//! [`RunError`] aborts the run.

use serde::Serialize;
use thiserror::Error;

use super::models::{DateRange, RunPhase};
use super::ports::CompletionError;

/// Fatal errors that end a run without a report.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Planning failed: {0}")]
    Planning(String),

    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Report synthesis failed: {0}")]
    Report(String),

    #[error("No data available for {date_range}")]
    NoData { date_range: DateRange },

    #[error("Upstream service unavailable during {phase}: {message}")]
    UpstreamUnavailable { phase: RunPhase, message: String },

    #[error("Run cancelled after {completed_iterations} iteration(s)")]
    Cancelled { completed_iterations: u32 },

    #[error("Analysis was inconclusive: no iteration produced a finding")]
    Inconclusive,
}

pub type RunResult<T> = Result<T, RunError>;

/// Coarse classification callers use to pick a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunErrorCategory {
    InvalidInput,
    NoData,
    AnalysisFailed,
    UpstreamUnavailable,
    Cancelled,
    Inconclusive,
}

impl RunError {
    pub fn category(&self) -> RunErrorCategory {
        match self {
            Self::InvalidInput(_) => RunErrorCategory::InvalidInput,
            Self::Planning(_) | Self::Dispatch(_) | Self::Analysis(_) | Self::Report(_) => {
                RunErrorCategory::AnalysisFailed
            }
            Self::NoData { .. } => RunErrorCategory::NoData,
            Self::UpstreamUnavailable { .. } => RunErrorCategory::UpstreamUnavailable,
            Self::Cancelled { .. } => RunErrorCategory::Cancelled,
            Self::Inconclusive => RunErrorCategory::Inconclusive,
        }
    }

    /// Classify a completion failure raised during `phase`: an unreachable
    /// service becomes [`RunError::UpstreamUnavailable`], anything else goes
    /// through `otherwise`.
    pub fn from_completion(
        phase: RunPhase,
        err: CompletionError,
        otherwise: impl FnOnce(String) -> Self,
    ) -> Self {
        if err.is_unavailable() {
            Self::UpstreamUnavailable {
                phase,
                message: err.to_string(),
            }
        } else {
            otherwise(err.to_string())
        }
    }
}

impl RunErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::NoData => "no_data",
            Self::AnalysisFailed => "analysis_failed",
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::Cancelled => "cancelled",
            Self::Inconclusive => "inconclusive",
        }
    }
}
