//! HealthAnalysisAgent - bounded iterative analysis of one health question.
//!
//! Drives a run through the phases decided by [`loop_controller`]:
//! date resolution and planning, then up to `max_iterations` rounds of
//! dispatch/execute/analyze, then report synthesis. The agent owns no state
//! between runs; every run gets a fresh [`ExecutionState`].
//!
//! Callers that deduplicate runs (a job queue, say) should key them on the
//! subject id, the resolved date range or user intent, and a fingerprint of
//! the query text. The agent itself neither computes nor checks such a key.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, instrument, warn, Instrument, Span};

use crate::application::loop_controller::{self, LoopDecision};
use crate::domain::errors::{RunError, RunResult};
use crate::domain::models::{
    AgentConfig, DateHint, DateResolution, ExecutionState, FinalReport, RunPhase, Termination, ToolCall, ToolPayload,
};
use crate::domain::ports::{CompletionClient, DataProvider, UNAVAILABLE_LABEL};
use crate::services::{
    DateResolver, IncrementalAnalyzer, PlanGenerator, ReportSynthesizer, ToolCatalog, ToolDispatcher,
    ToolExecutor, TIMEOUT_LABEL,
};

/// Input of one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub query: String,
    pub subject_id: i64,
    /// IANA timezone name used to determine "today".
    pub timezone: String,
    pub date_hint: Option<DateHint>,
    /// Overrides the current date in `timezone`; used for reproducible runs.
    pub today: Option<NaiveDate>,
}

impl RunRequest {
    pub fn new(query: impl Into<String>, subject_id: i64) -> Self {
        Self {
            query: query.into(),
            subject_id,
            timezone: "UTC".to_string(),
            date_hint: None,
            today: None,
        }
    }

    #[must_use]
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    #[must_use]
    pub fn with_date_hint(mut self, hint: DateHint) -> Self {
        self.date_hint = Some(hint);
        self
    }

    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }
}

pub struct HealthAnalysisAgent {
    catalog: ToolCatalog,
    config: AgentConfig,
    date_resolver: DateResolver,
    plan_generator: PlanGenerator,
    dispatcher: ToolDispatcher,
    executor: ToolExecutor,
    analyzer: IncrementalAnalyzer,
    reporter: ReportSynthesizer,
}

impl HealthAnalysisAgent {
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        provider: Arc<dyn DataProvider>,
        catalog: ToolCatalog,
        config: AgentConfig,
    ) -> Self {
        let timeout = Duration::from_secs(config.call_timeout_secs);
        let comment_limit = config.insight_comment_limit;

        Self {
            date_resolver: DateResolver::new(completion.clone(), timeout, config.default_window_days),
            plan_generator: PlanGenerator::new(completion.clone(), timeout),
            dispatcher: ToolDispatcher::new(
                completion.clone(),
                timeout,
                config.max_calls_per_iteration,
                comment_limit,
            ),
            executor: ToolExecutor::new(provider, timeout),
            analyzer: IncrementalAnalyzer::new(completion.clone(), timeout, comment_limit),
            reporter: ReportSynthesizer::new(completion, timeout, comment_limit),
            catalog,
            config,
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run one analysis to completion.
    ///
    /// Cancellation is honoured before every dispatch; a batch already in
    /// flight drains first.
    #[instrument(
        skip_all,
        fields(subject_id = request.subject_id, run_id = tracing::field::Empty)
    )]
    pub async fn run(&self, request: RunRequest, cancel: &CancellationToken) -> RunResult<FinalReport> {
        let mut state = self.prepare(request)?;
        Span::current().record("run_id", tracing::field::display(state.run_id));
        info!(query = %state.query, today = %state.today, timezone = %state.timezone, "Run started");

        self.execute(&mut state, cancel).await?;
        let report = build_report(state)?;
        info!(
            iterations = report.iterations,
            termination = report.termination.as_str(),
            tool_calls = report.tool_history.len(),
            "Run finished"
        );
        Ok(report)
    }

    fn prepare(&self, request: RunRequest) -> RunResult<ExecutionState> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(RunError::InvalidInput("query is empty".to_string()));
        }
        if request.subject_id <= 0 {
            return Err(RunError::InvalidInput(format!(
                "subject id must be positive, got {}",
                request.subject_id
            )));
        }
        let timezone: Tz = request
            .timezone
            .parse()
            .map_err(|_| RunError::InvalidInput(format!("unknown timezone: {}", request.timezone)))?;
        let today = request
            .today
            .unwrap_or_else(|| Utc::now().with_timezone(&timezone).date_naive());

        Ok(ExecutionState::new(query, request.subject_id, timezone, today, request.date_hint))
    }

    /// Drive `state` from its current phase to `Done`.
    ///
    /// On error the state is left in [`RunPhase::Failed`] with its histories
    /// intact; a failed state cannot be resumed.
    pub async fn execute(&self, state: &mut ExecutionState, cancel: &CancellationToken) -> RunResult<()> {
        let outcome = self.drive(state, cancel).await;
        if let Err(e) = &outcome {
            error!(
                phase = %state.phase,
                category = e.category().as_str(),
                iterations = state.loop_count(),
                error = %e,
                "Run failed"
            );
            state.phase = RunPhase::Failed;
        }
        outcome
    }

    async fn drive(&self, state: &mut ExecutionState, cancel: &CancellationToken) -> RunResult<()> {
        let max_iterations = self.config.max_iterations;
        let mut pending: Vec<ToolCall> = Vec::new();
        let mut payloads: Vec<ToolPayload> = Vec::new();

        loop {
            let iteration = info_span!("iteration", iteration = state.current_iteration());
            match state.phase {
                RunPhase::Planning => self.plan(state).await?,
                RunPhase::Dispatching => {
                    if cancel.is_cancelled() {
                        warn!(completed_iterations = state.loop_count(), "Run cancelled");
                        return Err(RunError::Cancelled {
                            completed_iterations: state.loop_count(),
                        });
                    }
                    pending = self
                        .dispatcher
                        .dispatch(state, &self.catalog)
                        .instrument(iteration)
                        .await?;
                }
                RunPhase::Executing => {
                    payloads = self
                        .executor
                        .execute(state, std::mem::take(&mut pending))
                        .instrument(iteration)
                        .await;
                }
                RunPhase::Analyzing => {
                    self.analyzer
                        .analyze(state, &payloads, &self.catalog)
                        .instrument(iteration)
                        .await?;
                    payloads.clear();

                    let decision = loop_controller::decide(state.loop_count(), max_iterations, state.latest_analysis());
                    if decision == LoopDecision::LimitReached {
                        warn!(max_iterations, "Iteration limit reached, moving to report");
                    }
                    state.termination = decision.termination();
                }
                RunPhase::Reporting => {
                    if state.payloads_received() == 0 {
                        return Err(nothing_received(state));
                    }
                    self.reporter.synthesize(state).await?;
                }
                RunPhase::Done => return Ok(()),
                RunPhase::Failed => {
                    return Err(RunError::InvalidInput("cannot resume a failed run".to_string()));
                }
            }

            state.phase = loop_controller::next_phase(
                state.phase,
                state.loop_count(),
                max_iterations,
                state.latest_analysis(),
            );
        }
    }

    async fn plan(&self, state: &mut ExecutionState) -> RunResult<()> {
        let resolved = self
            .date_resolver
            .resolve(&state.query, state.date_hint.as_ref(), state.today)
            .await;
        if let DateResolution::Degraded { reason } = &resolved.resolution {
            warn!(%reason, range = %resolved.range, "Date resolution degraded");
        }
        state.date_range = resolved.range;
        state.date_resolution = resolved.resolution;

        let plan = self
            .plan_generator
            .generate(&state.query, &state.date_range, &self.catalog)
            .await?;
        state.apply_plan(plan);
        Ok(())
    }
}

/// Error for a run that ended without a single payload. Missing data and an
/// unreachable provider must stay distinguishable for the caller.
fn nothing_received(state: &ExecutionState) -> RunError {
    let history = state.tool_history();
    let provider_down = !history.is_empty()
        && history
            .iter()
            .all(|record| record.error.as_deref().is_some_and(is_outage));
    if provider_down {
        let last = history.last().and_then(|record| record.error.as_deref()).unwrap_or_default();
        RunError::UpstreamUnavailable {
            phase: RunPhase::Executing,
            message: format!("data provider failed all {} call(s), last: {last}", history.len()),
        }
    } else {
        RunError::NoData {
            date_range: state.date_range,
        }
    }
}

fn is_outage(label: &str) -> bool {
    label == TIMEOUT_LABEL || label.starts_with(UNAVAILABLE_LABEL)
}

fn build_report(state: ExecutionState) -> RunResult<FinalReport> {
    let report = state
        .final_report
        .clone()
        .ok_or_else(|| RunError::Report("run finished without a report".to_string()))?;
    let termination = state.termination.unwrap_or(Termination::Concluded);

    Ok(FinalReport {
        run_id: state.run_id,
        subject_id: state.subject_id,
        query: state.query.clone(),
        date_range: state.date_range,
        date_resolution: state.date_resolution.clone(),
        plan: state.plan.clone(),
        focus_areas: state.focus_areas.clone(),
        user_intent: state.user_intent.clone(),
        report,
        iterations: state.loop_count(),
        termination,
        tool_history: state.tool_history().to_vec(),
        analysis_history: state.analysis_history().to_vec(),
    })
}
